//! Derives the runtime directories shared by the supervised services.
//!
//! The display server, message bus, audio server and streaming daemon each
//! expect a directory to exist before they start: the XDG runtime directory
//! hosts the bus socket, the PulseAudio directory hosts the native socket, and
//! the persistent volume holds the streaming daemon state and the session
//! artifact. Preparation is idempotent so a restarted session reuses whatever
//! the previous one left behind.

use std::fs::DirBuilder;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

use crate::Config;

/// Canonical directories prepared before any service is launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePaths {
    runtime_dir: Utf8PathBuf,
    pulse_dir: Utf8PathBuf,
    sunshine_config_dir: Utf8PathBuf,
    server_dir: Utf8PathBuf,
    artifact_dir: Utf8PathBuf,
}

impl RuntimePaths {
    /// Derives runtime paths from the shared configuration without touching
    /// the filesystem.
    pub fn from_config(config: &Config) -> Result<Self, RuntimePathsError> {
        let artifact_dir = config
            .artifact_path()
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .map(Utf8Path::to_path_buf)
            .ok_or_else(|| RuntimePathsError::MissingArtifactParent {
                path: config.artifact_path().to_path_buf(),
            })?;
        Ok(Self {
            runtime_dir: config.runtime_dir().to_path_buf(),
            pulse_dir: config.pulse_dir().to_path_buf(),
            sunshine_config_dir: config.sunshine_config_dir().to_path_buf(),
            server_dir: config.server_dir().to_path_buf(),
            artifact_dir,
        })
    }

    /// Creates every directory, leaving existing ones untouched.
    pub fn prepare(&self) -> Result<(), RuntimePathsError> {
        // XDG requires the runtime directory to be private to its owner.
        create_directory(&self.runtime_dir, Some(0o700))?;
        create_directory(&self.pulse_dir, Some(0o700))?;
        create_directory(&self.sunshine_config_dir, None)?;
        create_directory(&self.server_dir, None)?;
        create_directory(&self.artifact_dir, None)?;
        Ok(())
    }

    /// Directory exported as `XDG_RUNTIME_DIR`.
    #[must_use]
    pub fn runtime_dir(&self) -> &Utf8Path {
        self.runtime_dir.as_path()
    }

    /// Path of the PulseAudio native socket.
    #[must_use]
    pub fn pulse_socket(&self) -> Utf8PathBuf {
        self.pulse_dir.join("native")
    }

    /// Path of the session message bus socket.
    #[must_use]
    pub fn bus_socket(&self) -> Utf8PathBuf {
        self.runtime_dir.join("bus")
    }

    /// Directory exported as `SUNSHINE_CONFIG_DIR`.
    #[must_use]
    pub fn sunshine_config_dir(&self) -> &Utf8Path {
        self.sunshine_config_dir.as_path()
    }
}

fn create_directory(path: &Utf8Path, mode: Option<u32>) -> Result<(), RuntimePathsError> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        if let Some(mode) = mode {
            builder.mode(mode);
        }
    }
    #[cfg(not(unix))]
    let _ = mode;

    match builder.create(path.as_std_path()) {
        Ok(()) => Ok(()),
        Err(source) if source.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(source) => Err(RuntimePathsError::RuntimeDirectory {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Errors raised while deriving or preparing runtime directories.
#[derive(Debug, Error)]
pub enum RuntimePathsError {
    /// The artifact path lacked a parent directory.
    #[error("artifact path '{path}' has no parent directory")]
    MissingArtifactParent { path: Utf8PathBuf },
    /// Creating a runtime directory failed.
    #[error("failed to prepare runtime directory '{path}': {source}")]
    RuntimeDirectory {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
}
