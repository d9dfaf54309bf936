//! Builds the web server's session configuration from resolved ICE servers
//! and the captured environment.

use camino::Utf8PathBuf;
use tracing::warn;

use cloudplay_config::Config;

use crate::environment::{self, EnvironmentView};
use crate::ice::IceServer;

use super::{
    DataStorage, DiscordSettings, LogSettings, NetworkType, PortRange,
    SESSION_EXPIRATION_CHECK_INTERVAL, SessionConfig, WebRtcSettings, WebServerSettings,
};

const SESSION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::session");

/// Static values folded into every synthesized session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDefaults {
    /// JSON store location.
    pub storage_path: Utf8PathBuf,
    /// Web server listener address.
    pub bind_address: String,
    /// Companion streamer executable.
    pub streamer_path: Utf8PathBuf,
    /// Server log level name.
    pub log_level: String,
}

impl SessionDefaults {
    /// Derives defaults from the orchestrator configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            storage_path: config.storage_path().to_path_buf(),
            bind_address: config.bind_address().to_owned(),
            streamer_path: config.streamer_path().to_path_buf(),
            log_level: level_name(config.server_log_filter()).to_owned(),
        }
    }
}

/// Maps a bare `RUST_LOG` level to the server's level name. Anything more
/// elaborate than a single level falls back to `Info`.
fn level_name(filter: &str) -> &'static str {
    match filter.trim().to_ascii_lowercase().as_str() {
        "off" => "Off",
        "error" => "Error",
        "warn" => "Warn",
        "debug" => "Debug",
        "trace" => "Trace",
        _ => "Info",
    }
}

/// Builds the session configuration.
///
/// Never fails. Missing or malformed optional environment values only narrow
/// the produced feature set: the application integration block needs both a
/// client identifier and secret, and a malformed port range is dropped.
#[must_use]
pub fn synthesize(
    ice_servers: Vec<IceServer>,
    env: &EnvironmentView,
    defaults: &SessionDefaults,
) -> SessionConfig {
    SessionConfig {
        data_storage: DataStorage::Json {
            path: defaults.storage_path.clone(),
            session_expiration_check_interval: SESSION_EXPIRATION_CHECK_INTERVAL,
        },
        webrtc: WebRtcSettings {
            ice_servers,
            port_range: port_range(env),
            network_types: vec![NetworkType::Udp4, NetworkType::Udp6],
            include_loopback_candidates: false,
        },
        web_server: WebServerSettings {
            bind_address: defaults.bind_address.clone(),
            session_cookie_secure: true,
            first_login_create_admin: true,
            first_login_assign_global_hosts: true,
        },
        streamer_path: defaults.streamer_path.clone(),
        log: LogSettings {
            level_filter: defaults.log_level.clone(),
        },
        discord: discord(env),
    }
}

fn port_range(env: &EnvironmentView) -> Option<PortRange> {
    let raw = env.get(environment::WEBRTC_PORT_RANGE)?;
    let parsed = parse_port_range(raw);
    if parsed.is_none() {
        warn!(
            target: SESSION_TARGET,
            value = raw,
            "ignoring malformed WebRTC port range; expected MIN:MAX"
        );
    }
    parsed
}

/// Parses `MIN:MAX` into an inclusive range with `MIN <= MAX`.
#[must_use]
pub fn parse_port_range(raw: &str) -> Option<PortRange> {
    let (min, max) = raw.split_once(':')?;
    let min = min.trim().parse::<u16>().ok()?;
    let max = max.trim().parse::<u16>().ok()?;
    (min <= max).then_some(PortRange { min, max })
}

fn discord(env: &EnvironmentView) -> Option<DiscordSettings> {
    let (client_id, client_secret) =
        env.pair(environment::DISCORD_CLIENT_ID, environment::DISCORD_CLIENT_SECRET)?;
    Some(DiscordSettings {
        client_id: client_id.to_owned(),
        client_secret: client_secret.to_owned(),
        redirect_uri: env.get(environment::DISCORD_REDIRECT_URI).map(str::to_owned),
    })
}
