//! Time-limited relay credentials derived from a shared secret.
//!
//! This is the scheme relay servers implement as "REST API" or
//! `use-auth-secret` authentication: the username is
//! `"<expiry unix timestamp>:<label>"` and the credential is the base64
//! encoding of `HMAC-SHA1(secret, username)`. The relay recomputes the HMAC
//! on every allocation, so the encoding must match byte for byte.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::environment::{self, EnvironmentView};
use crate::ice::IceServer;

use super::errors::{CredentialRejection, RelayProviderError};
use super::{RelayOutcome, RelaySource, RelaySourceKind};

type HmacSha1 = Hmac<Sha1>;

/// A derived relay username/credential pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayCredential {
    /// `"<expiry>:<label>"` username.
    pub username: String,
    /// Base64 HMAC-SHA1 of the username.
    pub credential: String,
    /// Unix timestamp after which the relay rejects the pair.
    pub expires_at: u64,
}

/// Derives the credential pair for `label`, valid until `expires_at`.
pub fn derive_relay_credential(
    secret: &str,
    label: &str,
    expires_at: u64,
) -> Result<RelayCredential, RelayProviderError> {
    let username = format!("{expires_at}:{label}");
    let mac = keyed_mac(secret, &username)?;
    let credential = STANDARD.encode(mac.finalize().into_bytes());
    Ok(RelayCredential {
        username,
        credential,
        expires_at,
    })
}

/// Checks a credential the way a relay server would.
///
/// The HMAC comparison runs in constant time. A credential is rejected when
/// its expiry lies strictly before `now`.
pub fn verify_relay_credential(
    secret: &str,
    username: &str,
    credential: &str,
    now: u64,
) -> Result<(), CredentialRejection> {
    let expired_at = username
        .split_once(':')
        .map_or(username, |(timestamp, _)| timestamp)
        .parse::<u64>()
        .map_err(|_| CredentialRejection::MalformedUsername {
            username: username.to_owned(),
        })?;
    if expired_at < now {
        return Err(CredentialRejection::Expired { expired_at, now });
    }

    let expected = STANDARD
        .decode(credential)
        .map_err(|_| CredentialRejection::Encoding)?;
    let mac = keyed_mac(secret, username).map_err(|_| CredentialRejection::Mismatch)?;
    mac.verify_slice(&expected)
        .map_err(|_| CredentialRejection::Mismatch)
}

fn keyed_mac(secret: &str, username: &str) -> Result<HmacSha1, RelayProviderError> {
    let mut mac =
        HmacSha1::new_from_slice(secret.as_bytes()).map_err(|error| RelayProviderError::Hmac {
            reason: error.to_string(),
        })?;
    mac.update(username.as_bytes());
    Ok(mac)
}

/// Source of wall-clock time for credential expiry.
pub trait Clock: Send + Sync {
    /// Current time.
    fn now(&self) -> SystemTime;
}

/// Clock backed by [`SystemTime::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Relay source minting credentials for a self-hosted relay.
///
/// Configured by `TURN_SERVER_URL` plus `TURN_STATIC_AUTH_SECRET`. The label
/// comes from `TURN_CREDENTIAL_LABEL` when set, otherwise from configuration.
pub struct SharedSecretRelaySource<C = SystemClock> {
    label: String,
    clock: C,
}

impl SharedSecretRelaySource<SystemClock> {
    /// Builds a source using the system clock.
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_clock(label, SystemClock)
    }
}

impl<C> SharedSecretRelaySource<C>
where
    C: Clock,
{
    /// Builds a source with an injected clock.
    pub fn with_clock(label: impl Into<String>, clock: C) -> Self {
        Self {
            label: label.into(),
            clock,
        }
    }

    fn expiry(&self, ttl: Duration) -> u64 {
        let now = self
            .clock
            .now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        now.saturating_add(ttl).as_secs()
    }
}

impl<C> RelaySource for SharedSecretRelaySource<C>
where
    C: Clock,
{
    fn kind(&self) -> RelaySourceKind {
        RelaySourceKind::SharedSecret
    }

    fn resolve(&self, env: &EnvironmentView, ttl: Duration) -> RelayOutcome {
        let Some((url, secret)) = env.pair(environment::RELAY_URL, environment::RELAY_SHARED_SECRET)
        else {
            return RelayOutcome::Unconfigured;
        };
        let label = env
            .get(environment::RELAY_CREDENTIAL_LABEL)
            .unwrap_or(self.label.as_str());
        match derive_relay_credential(secret, label, self.expiry(ttl)) {
            Ok(pair) => {
                RelayOutcome::Resolved(vec![IceServer::relay(url, pair.username, pair.credential)])
            }
            Err(error) => RelayOutcome::Failed(error),
        }
    }
}
