//! Error types for service supervision.

use std::io;

use thiserror::Error;

use cloudplay_config::RuntimePathsError;

/// Errors surfaced while bringing up supervised services.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// A service never passed its readiness check.
    #[error("service '{name}' did not become ready after {attempts} attempts")]
    ServiceStartupFailed {
        /// Service name.
        name: String,
        /// Readiness checks attempted.
        attempts: u32,
    },
    /// A service process could not be spawned.
    #[error("failed to spawn service '{name}': {source}")]
    Spawn {
        /// Service name.
        name: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Runtime directories could not be prepared.
    #[error(transparent)]
    RuntimeDirectory(#[from] RuntimePathsError),
    /// `start_all` was called outside the idle state.
    #[error("supervisor cannot start from state {state}")]
    InvalidState {
        /// Description of the current state.
        state: String,
    },
}

impl SupervisorError {
    /// Name of the service the error concerns, when there is one.
    #[must_use]
    pub fn service(&self) -> Option<&str> {
        match self {
            Self::ServiceStartupFailed { name, .. } | Self::Spawn { name, .. } => Some(name.as_str()),
            Self::RuntimeDirectory(_) | Self::InvalidState { .. } => None,
        }
    }
}
