//! Session configuration consumed by the streaming web server.
//!
//! [`synthesize`] assembles a [`SessionConfig`] from resolved ICE servers,
//! the session environment and static defaults; [`write_artifact`] persists
//! it where the server expects to find it.

mod artifact;
mod synthesize;

use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::ice::IceServer;

pub use artifact::{ArtifactError, render_artifact, write_artifact};
pub use synthesize::{SessionDefaults, parse_port_range, synthesize};

/// How often the server sweeps expired login sessions.
pub const SESSION_EXPIRATION_CHECK_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Complete configuration document for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Where the server keeps users and hosts.
    pub data_storage: DataStorage,
    /// WebRTC connectivity settings.
    pub webrtc: WebRtcSettings,
    /// HTTP listener and first-login behaviour.
    pub web_server: WebServerSettings,
    /// Companion streamer executable.
    pub streamer_path: Utf8PathBuf,
    /// Server log verbosity.
    pub log: LogSettings,
    /// Optional third-party login integration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discord: Option<DiscordSettings>,
}

/// Storage backend descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DataStorage {
    /// Single JSON file store.
    Json {
        /// Store location.
        path: Utf8PathBuf,
        /// Interval between expired-session sweeps.
        session_expiration_check_interval: Duration,
    },
}

/// WebRTC connectivity settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebRtcSettings {
    /// STUN entries first, relay entries after.
    pub ice_servers: Vec<IceServer>,
    /// Restricts media to a UDP port range.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_range: Option<PortRange>,
    /// Candidate network types the server gathers.
    pub network_types: Vec<NetworkType>,
    /// Whether loopback candidates are offered.
    pub include_loopback_candidates: bool,
}

/// Inclusive UDP port range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    /// Lowest port.
    pub min: u16,
    /// Highest port.
    pub max: u16,
}

/// ICE candidate network types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    /// UDP over IPv4.
    Udp4,
    /// UDP over IPv6.
    Udp6,
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebServerSettings {
    /// Listener address.
    pub bind_address: String,
    /// Marks the session cookie `Secure`.
    pub session_cookie_secure: bool,
    /// The first account to log in becomes an administrator.
    pub first_login_create_admin: bool,
    /// The first account to log in receives every global host.
    pub first_login_assign_global_hosts: bool,
}

/// Server log settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSettings {
    /// Level name understood by the server (`Info`, `Debug`, ...).
    pub level_filter: String,
}

/// Third-party login integration credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordSettings {
    /// Application client identifier.
    pub client_id: String,
    /// Application client secret.
    pub client_secret: String,
    /// OAuth redirect target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
}
