//! Operational configuration for the cloudplay session orchestrator.
//!
//! Settings are layered with `ortho_config`: built-in defaults, then a
//! configuration file (`--config-path`, `CLOUDPLAY_CONFIG_PATH`, or
//! `.cloudplay.toml`), then `CLOUDPLAY_*` environment variables, then
//! command-line flags. Relay and application secrets are deliberately absent
//! here; they are read from the session environment by the orchestrator.

mod defaults;
mod logging;
mod runtime;

use std::net::SocketAddr;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use defaults::{
    DEFAULT_BIND_ADDRESS, DEFAULT_CLOUD_RELAY_ENDPOINT, DEFAULT_DISPLAY,
    DEFAULT_DISPLAY_RESOLUTION, DEFAULT_LOG_FILTER, DEFAULT_READINESS_ATTEMPTS,
    DEFAULT_READINESS_INTERVAL_MS, DEFAULT_RELAY_LABEL, DEFAULT_RELAY_TIMEOUT_SECS,
    DEFAULT_RELAY_TTL_SECS, DEFAULT_SERVER_LOG_FILTER, default_artifact_path,
    default_bind_address, default_cloud_relay_endpoint, default_display,
    default_display_resolution, default_log_filter, default_log_filter_string,
    default_log_format, default_pulse_dir, default_relay_label, default_runtime_dir,
    default_server_binary, default_server_dir, default_server_log_filter,
    default_server_workdir, default_storage_path, default_streamer_path,
    default_sunshine_config_dir, default_sunshine_config_file,
};
pub use logging::{LogFormat, LogFormatParseError, QUIETED_DEPENDENCIES, orchestrator_log_filter};
pub use runtime::{RuntimePaths, RuntimePathsError};

/// Orchestrator configuration shared by the supervisor, the relay chain and
/// the session synthesizer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "CLOUDPLAY")]
pub struct Config {
    /// X display served by the virtual framebuffer.
    #[ortho_config(default = defaults::default_display())]
    pub display: String,
    /// Virtual screen geometry (`WIDTHxHEIGHTxDEPTH`).
    #[ortho_config(default = defaults::default_display_resolution())]
    pub display_resolution: String,
    /// Directory exported to children as `XDG_RUNTIME_DIR`.
    #[ortho_config(default = defaults::default_runtime_dir())]
    pub runtime_dir: Utf8PathBuf,
    /// Directory holding the PulseAudio native socket.
    #[ortho_config(default = defaults::default_pulse_dir())]
    pub pulse_dir: Utf8PathBuf,
    /// Persistent state directory for the streaming daemon.
    #[ortho_config(default = defaults::default_sunshine_config_dir())]
    pub sunshine_config_dir: Utf8PathBuf,
    /// Configuration file handed to the streaming daemon.
    #[ortho_config(default = defaults::default_sunshine_config_file())]
    pub sunshine_config_file: Utf8PathBuf,
    /// Persistent state directory for the web server.
    #[ortho_config(default = defaults::default_server_dir())]
    pub server_dir: Utf8PathBuf,
    /// Where the session artifact is written.
    #[ortho_config(default = defaults::default_artifact_path())]
    pub artifact_path: Utf8PathBuf,
    /// JSON store referenced by the artifact.
    #[ortho_config(default = defaults::default_storage_path())]
    pub storage_path: Utf8PathBuf,
    /// Streaming web server executable.
    #[ortho_config(default = defaults::default_server_binary())]
    pub server_binary: Utf8PathBuf,
    /// Working directory for the web server.
    #[ortho_config(default = defaults::default_server_workdir())]
    pub server_workdir: Utf8PathBuf,
    /// Value exported to the web server as `RUST_LOG`.
    #[ortho_config(default = defaults::default_server_log_filter())]
    pub server_log_filter: String,
    /// Streamer executable recorded in the artifact.
    #[ortho_config(default = defaults::default_streamer_path())]
    pub streamer_path: Utf8PathBuf,
    /// Socket address the web server binds.
    #[ortho_config(default = defaults::default_bind_address())]
    pub bind_address: String,
    /// Lifetime requested for relay credentials, in seconds.
    #[ortho_config(default = defaults::DEFAULT_RELAY_TTL_SECS)]
    pub relay_ttl_secs: u64,
    /// Upper bound on the cloud relay request, in seconds.
    #[ortho_config(default = defaults::DEFAULT_RELAY_TIMEOUT_SECS)]
    pub relay_timeout_secs: u64,
    /// Base URL of the cloud relay credential API.
    #[ortho_config(default = defaults::default_cloud_relay_endpoint())]
    pub cloud_relay_endpoint: String,
    /// Label embedded in self-hosted relay usernames.
    #[ortho_config(default = defaults::default_relay_label())]
    pub relay_label: String,
    /// Readiness checks attempted per service.
    #[ortho_config(default = defaults::DEFAULT_READINESS_ATTEMPTS)]
    pub readiness_attempts: u32,
    /// Pause between readiness checks, in milliseconds.
    #[ortho_config(default = defaults::DEFAULT_READINESS_INTERVAL_MS)]
    pub readiness_interval_ms: u64,
    /// Tracing filter for the orchestrator's own logs.
    #[ortho_config(default = defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Output format for the orchestrator's own logs.
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
    /// Print the synthesized artifact and exit without starting services.
    #[ortho_config(default = false)]
    pub print_config: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            display: default_display(),
            display_resolution: default_display_resolution(),
            runtime_dir: default_runtime_dir(),
            pulse_dir: default_pulse_dir(),
            sunshine_config_dir: default_sunshine_config_dir(),
            sunshine_config_file: default_sunshine_config_file(),
            server_dir: default_server_dir(),
            artifact_path: default_artifact_path(),
            storage_path: default_storage_path(),
            server_binary: default_server_binary(),
            server_workdir: default_server_workdir(),
            server_log_filter: default_server_log_filter(),
            streamer_path: default_streamer_path(),
            bind_address: default_bind_address(),
            relay_ttl_secs: DEFAULT_RELAY_TTL_SECS,
            relay_timeout_secs: DEFAULT_RELAY_TIMEOUT_SECS,
            cloud_relay_endpoint: default_cloud_relay_endpoint(),
            relay_label: default_relay_label(),
            readiness_attempts: DEFAULT_READINESS_ATTEMPTS,
            readiness_interval_ms: DEFAULT_READINESS_INTERVAL_MS,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            print_config: false,
        }
    }
}

impl Config {
    /// Rejects values that would make the session unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.readiness_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "readiness_attempts",
                reason: "at least one readiness check is required".to_owned(),
            });
        }
        if self.relay_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "relay_timeout_secs",
                reason: "the relay request needs a non-zero timeout".to_owned(),
            });
        }
        self.bind_address
            .parse::<SocketAddr>()
            .map_err(|error| ConfigError::Invalid {
                field: "bind_address",
                reason: error.to_string(),
            })?;
        Ok(())
    }

    /// X display served by the virtual framebuffer.
    #[must_use]
    pub fn display(&self) -> &str {
        self.display.as_str()
    }

    /// Virtual screen geometry.
    #[must_use]
    pub fn display_resolution(&self) -> &str {
        self.display_resolution.as_str()
    }

    /// Directory exported as `XDG_RUNTIME_DIR`.
    #[must_use]
    pub fn runtime_dir(&self) -> &Utf8Path {
        self.runtime_dir.as_path()
    }

    /// Directory holding the PulseAudio socket.
    #[must_use]
    pub fn pulse_dir(&self) -> &Utf8Path {
        self.pulse_dir.as_path()
    }

    /// Streaming daemon state directory.
    #[must_use]
    pub fn sunshine_config_dir(&self) -> &Utf8Path {
        self.sunshine_config_dir.as_path()
    }

    /// Streaming daemon configuration file.
    #[must_use]
    pub fn sunshine_config_file(&self) -> &Utf8Path {
        self.sunshine_config_file.as_path()
    }

    /// Web server state directory.
    #[must_use]
    pub fn server_dir(&self) -> &Utf8Path {
        self.server_dir.as_path()
    }

    /// Session artifact location.
    #[must_use]
    pub fn artifact_path(&self) -> &Utf8Path {
        self.artifact_path.as_path()
    }

    /// JSON store referenced by the artifact.
    #[must_use]
    pub fn storage_path(&self) -> &Utf8Path {
        self.storage_path.as_path()
    }

    /// Web server executable.
    #[must_use]
    pub fn server_binary(&self) -> &Utf8Path {
        self.server_binary.as_path()
    }

    /// Web server working directory.
    #[must_use]
    pub fn server_workdir(&self) -> &Utf8Path {
        self.server_workdir.as_path()
    }

    /// `RUST_LOG` override handed to the web server.
    #[must_use]
    pub fn server_log_filter(&self) -> &str {
        self.server_log_filter.as_str()
    }

    /// Streamer executable recorded in the artifact.
    #[must_use]
    pub fn streamer_path(&self) -> &Utf8Path {
        self.streamer_path.as_path()
    }

    /// Web server bind address as configured.
    #[must_use]
    pub fn bind_address(&self) -> &str {
        self.bind_address.as_str()
    }

    /// Relay credential lifetime.
    #[must_use]
    pub fn relay_ttl(&self) -> Duration {
        Duration::from_secs(self.relay_ttl_secs)
    }

    /// Cloud relay request timeout.
    #[must_use]
    pub fn relay_timeout(&self) -> Duration {
        Duration::from_secs(self.relay_timeout_secs)
    }

    /// Cloud relay API base URL.
    #[must_use]
    pub fn cloud_relay_endpoint(&self) -> &str {
        self.cloud_relay_endpoint.as_str()
    }

    /// Self-hosted relay username label.
    #[must_use]
    pub fn relay_label(&self) -> &str {
        self.relay_label.as_str()
    }

    /// Readiness checks per service.
    #[must_use]
    pub fn readiness_attempts(&self) -> u32 {
        self.readiness_attempts
    }

    /// Pause between readiness checks.
    #[must_use]
    pub fn readiness_interval(&self) -> Duration {
        Duration::from_millis(self.readiness_interval_ms)
    }

    /// Orchestrator log filter.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Orchestrator log format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Whether the run only prints the synthesized artifact.
    #[must_use]
    pub fn print_config(&self) -> bool {
        self.print_config
    }
}

/// Errors raised while validating loaded configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A loaded value is unusable.
    #[error("invalid configuration value for '{field}': {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}
