//! Relay credential provider chain.
//!
//! Each [`RelaySource`] inspects the session environment and reports a tagged
//! [`RelayOutcome`]. The chain walks the sources in order and stops at the
//! first one that resolves; unconfigured and failed sources are reported and
//! skipped. Whatever happens, the baseline STUN list comes first and is never
//! replaced, so a session always has at least public STUN connectivity.

mod cloud;
mod errors;
mod shared_secret;

use std::sync::Arc;
use std::time::Duration;

use cloudplay_config::Config;
use strum::{Display, EnumString};

use crate::environment::{self, EnvironmentView};
use crate::ice::IceServer;
use crate::lifecycle::LifecycleReporter;

pub use cloud::{CloudRelaySource, HttpRelayApiClient, RelayApiClient, parse_ice_servers};
pub use errors::{CredentialRejection, RelayProviderError};
pub use shared_secret::{
    Clock, RelayCredential, SharedSecretRelaySource, SystemClock, derive_relay_credential,
    verify_relay_credential,
};

pub(crate) const RELAY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::relay");

/// Identifies a relay strategy in logs and lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum RelaySourceKind {
    /// Hosted relay with API-issued credentials.
    Cloud,
    /// Relay URL and credentials supplied verbatim.
    Manual,
    /// Self-hosted relay with HMAC-derived credentials.
    SharedSecret,
    /// Relay reachable through a platform tunnel.
    LocalTunnel,
}

/// Result of asking one source for relay entries.
#[derive(Debug)]
pub enum RelayOutcome {
    /// The source lacks the environment it needs.
    Unconfigured,
    /// The source was configured but could not produce entries.
    Failed(RelayProviderError),
    /// The source produced relay entries.
    Resolved(Vec<IceServer>),
}

/// A strategy for obtaining relay entries.
pub trait RelaySource: Send + Sync {
    /// Which strategy this is.
    fn kind(&self) -> RelaySourceKind;

    /// Produces entries valid for `ttl`, or explains why it cannot.
    fn resolve(&self, env: &EnvironmentView, ttl: Duration) -> RelayOutcome;
}

/// Relay entry taken verbatim from `TURN_SERVER_URL`, `TURN_USERNAME` and
/// `TURN_CREDENTIAL`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManualRelaySource;

impl RelaySource for ManualRelaySource {
    fn kind(&self) -> RelaySourceKind {
        RelaySourceKind::Manual
    }

    fn resolve(&self, env: &EnvironmentView, _ttl: Duration) -> RelayOutcome {
        let triple = env.get(environment::RELAY_URL).zip(
            env.pair(environment::RELAY_USERNAME, environment::RELAY_CREDENTIAL),
        );
        match triple {
            Some((url, (username, credential))) => {
                RelayOutcome::Resolved(vec![IceServer::relay(url, username, credential)])
            }
            None => RelayOutcome::Unconfigured,
        }
    }
}

/// Placeholder for a relay process reachable only through a platform tunnel.
///
/// Nothing configures it yet, so it always reports [`RelayOutcome::Unconfigured`].
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalTunnelRelaySource;

impl RelaySource for LocalTunnelRelaySource {
    fn kind(&self) -> RelaySourceKind {
        RelaySourceKind::LocalTunnel
    }

    fn resolve(&self, _env: &EnvironmentView, _ttl: Duration) -> RelayOutcome {
        RelayOutcome::Unconfigured
    }
}

/// ICE servers produced by the chain, with the source that contributed relays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayResolution {
    /// Baseline entries followed by any relay entries.
    pub ice_servers: Vec<IceServer>,
    /// Source that resolved, or `None` when only the baseline remains.
    pub source: Option<RelaySourceKind>,
}

impl RelayResolution {
    /// Whether no relay source contributed entries.
    #[must_use]
    pub fn is_baseline_only(&self) -> bool {
        self.source.is_none()
    }
}

/// Ordered list of relay strategies.
pub struct RelayChain {
    sources: Vec<Box<dyn RelaySource>>,
    reporter: Arc<dyn LifecycleReporter>,
}

impl RelayChain {
    /// Builds a chain trying `sources` in order.
    pub fn new(sources: Vec<Box<dyn RelaySource>>, reporter: Arc<dyn LifecycleReporter>) -> Self {
        Self { sources, reporter }
    }

    /// Builds the production chain: cloud API, manual triple, shared secret,
    /// local tunnel.
    ///
    /// When the cloud endpoint is unusable the cloud strategy is left out and
    /// the failure is reported against it.
    pub fn from_config(config: &Config, reporter: Arc<dyn LifecycleReporter>) -> Self {
        let mut sources: Vec<Box<dyn RelaySource>> = Vec::with_capacity(4);
        match HttpRelayApiClient::new(config.cloud_relay_endpoint(), config.relay_timeout()) {
            Ok(client) => sources.push(Box::new(CloudRelaySource::new(client))),
            Err(error) => reporter.relay_failed(RelaySourceKind::Cloud, &error),
        }
        sources.push(Box::new(ManualRelaySource));
        sources.push(Box::new(SharedSecretRelaySource::new(config.relay_label())));
        sources.push(Box::new(LocalTunnelRelaySource));
        Self::new(sources, reporter)
    }

    /// Appends the first resolving source's entries to `baseline`.
    ///
    /// Never fails: when every source is unconfigured or fails, the baseline
    /// comes back unchanged.
    pub fn resolve_ice_servers(
        &self,
        baseline: Vec<IceServer>,
        env: &EnvironmentView,
        ttl: Duration,
    ) -> RelayResolution {
        let resolved = self.sources.iter().find_map(|source| {
            let kind = source.kind();
            match source.resolve(env, ttl) {
                RelayOutcome::Unconfigured => {
                    self.reporter.relay_skipped(kind);
                    None
                }
                RelayOutcome::Failed(error) => {
                    self.reporter.relay_failed(kind, &error);
                    None
                }
                RelayOutcome::Resolved(entries) => {
                    self.reporter.relay_resolved(kind, entries.len());
                    Some((kind, entries))
                }
            }
        });

        let mut ice_servers = baseline;
        let source = resolved.map(|(kind, entries)| {
            ice_servers.extend(entries);
            kind
        });
        RelayResolution {
            ice_servers,
            source,
        }
    }
}
