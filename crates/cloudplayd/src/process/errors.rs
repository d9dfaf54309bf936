//! Defines the unified error surface for a session run.

use std::io;

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::bootstrap::BootstrapError;
use crate::session::ArtifactError;
use crate::supervisor::SupervisorError;

use super::signals::SignalError;

/// Errors that end a session before the web server exits on its own.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Configuration or telemetry could not be set up.
    #[error("session bootstrap failed: {source}")]
    Bootstrap {
        /// Underlying bootstrap error.
        #[source]
        source: BootstrapError,
    },
    /// Signal handlers could not be installed.
    #[error("failed to listen for termination signals: {source}")]
    Signals {
        /// Underlying signal error.
        #[source]
        source: SignalError,
    },
    /// A supervised service failed to start.
    #[error("service startup failed: {source}")]
    Supervisor {
        /// Underlying supervisor error.
        #[source]
        source: SupervisorError,
    },
    /// The session artifact could not be persisted.
    #[error("session artifact unavailable: {source}")]
    Artifact {
        /// Underlying artifact error.
        #[source]
        source: ArtifactError,
    },
    /// Printing the artifact failed.
    #[error("failed to print session artifact: {source}")]
    Print {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The web server could not be spawned.
    #[error("failed to launch web server '{binary}': {source}")]
    ServerLaunch {
        /// Server executable.
        binary: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Waiting on the web server failed.
    #[error("failed to wait for web server: {source}")]
    ServerWait {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

impl From<BootstrapError> for SessionError {
    fn from(source: BootstrapError) -> Self {
        Self::Bootstrap { source }
    }
}

impl From<SignalError> for SessionError {
    fn from(source: SignalError) -> Self {
        Self::Signals { source }
    }
}

impl From<SupervisorError> for SessionError {
    fn from(source: SupervisorError) -> Self {
        Self::Supervisor { source }
    }
}

impl From<ArtifactError> for SessionError {
    fn from(source: ArtifactError) -> Self {
        Self::Artifact { source }
    }
}
