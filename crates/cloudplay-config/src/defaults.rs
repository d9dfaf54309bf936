//! Built-in defaults mirroring the session container layout.

use camino::Utf8PathBuf;

use crate::logging::LogFormat;

/// X display the virtual framebuffer serves.
pub const DEFAULT_DISPLAY: &str = ":99";

/// Screen geometry handed to the virtual framebuffer.
pub const DEFAULT_DISPLAY_RESOLUTION: &str = "1920x1080x24";

/// Default log filter expression used by the orchestrator.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Log filter exported to the streaming web server as `RUST_LOG`.
pub const DEFAULT_SERVER_LOG_FILTER: &str = "info";

/// Address the streaming web server binds.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Base URL of the cloud relay credential API.
pub const DEFAULT_CLOUD_RELAY_ENDPOINT: &str = "https://rtc.live.cloudflare.com/v1/turn/keys";

/// Label embedded in self-hosted relay usernames.
pub const DEFAULT_RELAY_LABEL: &str = "cloudplay";

/// Lifetime requested for relay credentials: one day.
pub const DEFAULT_RELAY_TTL_SECS: u64 = 24 * 60 * 60;

/// Upper bound on the cloud relay credential request.
pub const DEFAULT_RELAY_TIMEOUT_SECS: u64 = 10;

/// Readiness checks attempted per service before giving up.
pub const DEFAULT_READINESS_ATTEMPTS: u32 = 10;

/// Pause between readiness checks.
pub const DEFAULT_READINESS_INTERVAL_MS: u64 = 500;

/// Default X display.
#[must_use]
pub fn default_display() -> String {
    DEFAULT_DISPLAY.to_owned()
}

/// Default virtual screen geometry.
#[must_use]
pub fn default_display_resolution() -> String {
    DEFAULT_DISPLAY_RESOLUTION.to_owned()
}

/// Runtime directory exported as `XDG_RUNTIME_DIR` to child services.
#[must_use]
pub fn default_runtime_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("/tmp/runtime")
}

/// Directory holding the PulseAudio native socket.
#[must_use]
pub fn default_pulse_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("/tmp/pulse")
}

/// Persistent state directory for the streaming daemon.
#[must_use]
pub fn default_sunshine_config_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("/data/sunshine")
}

/// Configuration file passed to the streaming daemon.
#[must_use]
pub fn default_sunshine_config_file() -> Utf8PathBuf {
    Utf8PathBuf::from("/etc/sunshine/sunshine.conf")
}

/// Persistent state directory for the web server.
#[must_use]
pub fn default_server_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("/data/server")
}

/// Location of the session configuration artifact.
#[must_use]
pub fn default_artifact_path() -> Utf8PathBuf {
    Utf8PathBuf::from("/data/server/config.json")
}

/// JSON store used by the web server for users and hosts.
#[must_use]
pub fn default_storage_path() -> Utf8PathBuf {
    Utf8PathBuf::from("/data/server/data.json")
}

/// Streaming web server executable.
#[must_use]
pub fn default_server_binary() -> Utf8PathBuf {
    Utf8PathBuf::from("/app/web-server")
}

/// Working directory for the web server (static assets live here).
#[must_use]
pub fn default_server_workdir() -> Utf8PathBuf {
    Utf8PathBuf::from("/app")
}

/// Companion streamer executable referenced from the artifact.
#[must_use]
pub fn default_streamer_path() -> Utf8PathBuf {
    Utf8PathBuf::from("/app/streamer")
}

/// Owned bind address.
#[must_use]
pub fn default_bind_address() -> String {
    DEFAULT_BIND_ADDRESS.to_owned()
}

/// Owned cloud relay endpoint.
#[must_use]
pub fn default_cloud_relay_endpoint() -> String {
    DEFAULT_CLOUD_RELAY_ENDPOINT.to_owned()
}

/// Owned relay label.
#[must_use]
pub fn default_relay_label() -> String {
    DEFAULT_RELAY_LABEL.to_owned()
}

/// Default log filter expression used by the orchestrator.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Owned server log filter.
#[must_use]
pub fn default_server_log_filter() -> String {
    DEFAULT_SERVER_LOG_FILTER.to_owned()
}

/// Default logging format for the orchestrator.
#[must_use]
pub fn default_log_format() -> LogFormat {
    LogFormat::Compact
}
