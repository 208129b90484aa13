//! Error types for world and body configuration.

use thiserror::Error;

/// Errors reported by the checked configuration paths.
///
/// These cover input validation only; the simulation itself has no
/// runtime failure modes (see the crate docs on preconditions).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PhysicsError {
    /// Invalid world configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the configuration error.
        reason: String,
    },

    /// Invalid body definition.
    #[error("invalid body: {reason}")]
    InvalidBody {
        /// Description of what is wrong with the body.
        reason: String,
    },
}

impl PhysicsError {
    /// Create an invalid-configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create an invalid-body error.
    #[must_use]
    pub fn invalid_body(reason: impl Into<String>) -> Self {
        Self::InvalidBody {
            reason: reason.into(),
        }
    }

    /// Check if this is a configuration error.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::InvalidConfig { .. })
    }
}
