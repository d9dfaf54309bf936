//! Rendering and atomic persistence of the session artifact.

use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::Builder;
use thiserror::Error;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use super::SessionConfig;

/// Errors raised while persisting the session artifact.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// The configuration could not be encoded.
    #[error("failed to serialise session artifact: {source}")]
    Serialise {
        /// Underlying serialisation error.
        #[from]
        source: serde_json::Error,
    },
    /// The artifact could not be written.
    #[error("failed to write session artifact '{path}': {source}")]
    Write {
        /// Artifact location.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Renders the artifact as pretty-printed JSON.
pub fn render_artifact(config: &SessionConfig) -> Result<String, ArtifactError> {
    Ok(serde_json::to_string_pretty(config)?)
}

/// Writes the artifact to `path`, replacing any previous session's copy.
///
/// The document lands in a sibling temporary file first and is renamed into
/// place, so the server never reads a partial artifact. The file is readable
/// only by its owner because it carries relay and application secrets.
pub fn write_artifact(path: &Utf8Path, config: &SessionConfig) -> Result<(), ArtifactError> {
    let mut contents = render_artifact(config)?.into_bytes();
    contents.push(b'\n');
    atomic_write(path, &contents).map_err(|source| ArtifactError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn atomic_write(path: &Utf8Path, contents: &[u8]) -> io::Result<()> {
    let directory = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                "target path did not have a parent directory",
            )
        })?;

    let mut builder = Builder::new();
    builder.prefix(path.file_name().unwrap_or("session"));
    #[cfg(unix)]
    {
        use std::fs::Permissions;
        builder.permissions(Permissions::from_mode(0o600));
    }

    let mut file = builder.tempfile_in(directory)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|error| error.error)?;
    Ok(())
}
