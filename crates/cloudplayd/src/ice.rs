//! ICE server records handed to the streaming web server.

use serde::{Deserialize, Serialize};

/// Public STUN servers every session advertises ahead of any relay.
pub const BASELINE_STUN_URLS: [&str; 3] = [
    "stun:stun.l.google.com:19302",
    "stun:stun1.l.google.com:3478",
    "stun:stun2.l.google.com:19302",
];

/// A single STUN or TURN server entry.
///
/// Order matters once entries are collected into a list: the consuming server
/// prefers earlier entries, so STUN entries always precede relay entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServer {
    /// URIs served by this entry.
    pub urls: Vec<String>,
    /// Username for relay authentication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Credential for relay authentication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

impl IceServer {
    /// Builds an unauthenticated STUN entry.
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }

    /// Builds an authenticated relay entry for a single URL.
    pub fn relay(
        url: impl Into<String>,
        username: impl Into<String>,
        credential: impl Into<String>,
    ) -> Self {
        Self {
            urls: vec![url.into()],
            username: Some(username.into()),
            credential: Some(credential.into()),
        }
    }

    /// Whether the entry carries relay credentials.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.username.is_some() && self.credential.is_some()
    }
}

/// Returns the built-in STUN fallback, one entry per URI.
#[must_use]
pub fn baseline_stun() -> Vec<IceServer> {
    BASELINE_STUN_URLS.iter().map(|url| IceServer::stun(*url)).collect()
}
