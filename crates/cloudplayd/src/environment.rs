//! Immutable snapshot of the variables that steer a session.
//!
//! The orchestrator reads the process environment exactly once, at the entry
//! point, and hands the snapshot to every component that needs it. Relay
//! strategies and the session synthesizer never call `std::env` themselves.

use std::collections::BTreeMap;
use std::env;

/// Cloud relay API key identifier.
pub const CLOUD_RELAY_KEY_ID: &str = "CLOUDFLARE_TURN_KEY_ID";
/// Cloud relay API bearer token.
pub const CLOUD_RELAY_API_TOKEN: &str = "CLOUDFLARE_TURN_API_TOKEN";
/// Relay server URL shared by the manual and shared-secret strategies.
pub const RELAY_URL: &str = "TURN_SERVER_URL";
/// Manual relay username.
pub const RELAY_USERNAME: &str = "TURN_USERNAME";
/// Manual relay credential.
pub const RELAY_CREDENTIAL: &str = "TURN_CREDENTIAL";
/// Shared secret for time-limited relay credentials.
pub const RELAY_SHARED_SECRET: &str = "TURN_STATIC_AUTH_SECRET";
/// Optional label embedded in time-limited relay usernames.
pub const RELAY_CREDENTIAL_LABEL: &str = "TURN_CREDENTIAL_LABEL";
/// Application integration client identifier.
pub const DISCORD_CLIENT_ID: &str = "DISCORD_CLIENT_ID";
/// Application integration client secret.
pub const DISCORD_CLIENT_SECRET: &str = "DISCORD_CLIENT_SECRET";
/// Optional application integration redirect URI.
pub const DISCORD_REDIRECT_URI: &str = "DISCORD_REDIRECT_URI";
/// Optional UDP port range for media traffic, formatted `MIN:MAX`.
pub const WEBRTC_PORT_RANGE: &str = "WEBRTC_PORT_RANGE";

/// Read-only view over environment variables captured at session start.
///
/// Blank or whitespace-only values are indistinguishable from missing ones.
/// Present values are returned exactly as captured.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentView {
    values: BTreeMap<String, String>,
}

impl EnvironmentView {
    /// Captures the current process environment, skipping non UTF-8 entries.
    #[must_use]
    pub fn capture() -> Self {
        let values = env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
            .collect();
        Self { values }
    }

    /// Builds a view from explicit key/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let values = pairs
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        Self { values }
    }

    /// Returns the value for `key` unless it is missing or blank.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    /// Returns both values when, and only when, both keys are present.
    #[must_use]
    pub fn pair(&self, first: &str, second: &str) -> Option<(&str, &str)> {
        Some((self.get(first)?, self.get(second)?))
    }

    /// Whether `key` holds a non-empty value.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}
