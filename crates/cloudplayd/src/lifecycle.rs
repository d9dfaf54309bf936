//! Structured lifecycle reporting for a session.

use std::sync::Arc;

use camino::Utf8Path;

use cloudplay_config::Config;

use crate::bootstrap::BootstrapError;
use crate::relay::{RelayProviderError, RelaySourceKind};
use crate::supervisor::SupervisorError;

const LIFECYCLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lifecycle");

/// Observer trait used to surface session lifecycle events to telemetry sinks.
pub trait LifecycleReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn session_starting(&self);

    /// Invoked once configuration and telemetry are in place.
    fn session_configured(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked before a supervised service is launched.
    fn service_starting(&self, name: &str);

    /// Invoked once a service passes its readiness check.
    fn service_ready(&self, name: &str, pid: u32);

    /// Invoked when a service cannot be started.
    fn service_failed(&self, error: &SupervisorError);

    /// Invoked when a service receives its termination signal.
    fn service_stopped(&self, name: &str, pid: u32);

    /// Invoked when a relay source lacks configuration.
    fn relay_skipped(&self, kind: RelaySourceKind);

    /// Invoked when a configured relay source fails.
    fn relay_failed(&self, kind: RelaySourceKind, error: &RelayProviderError);

    /// Invoked when a relay source contributes entries.
    fn relay_resolved(&self, kind: RelaySourceKind, entries: usize);

    /// Invoked when only the baseline STUN servers are available.
    fn connectivity_at_risk(&self, baseline: usize);

    /// Invoked after the session artifact is persisted.
    fn artifact_written(&self, path: &Utf8Path, ice_servers: usize);

    /// Invoked after the web server process is spawned.
    fn server_launched(&self, binary: &Utf8Path, pid: u32);

    /// Invoked when the web server process exits.
    fn server_exited(&self, code: i32);

    /// Invoked before supervised services are signalled.
    fn shutdown_started(&self, signal: Option<i32>);
}

impl<T> LifecycleReporter for Arc<T>
where
    T: LifecycleReporter,
{
    fn session_starting(&self) {
        (**self).session_starting();
    }

    fn session_configured(&self, config: &Config) {
        (**self).session_configured(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn service_starting(&self, name: &str) {
        (**self).service_starting(name);
    }

    fn service_ready(&self, name: &str, pid: u32) {
        (**self).service_ready(name, pid);
    }

    fn service_failed(&self, error: &SupervisorError) {
        (**self).service_failed(error);
    }

    fn service_stopped(&self, name: &str, pid: u32) {
        (**self).service_stopped(name, pid);
    }

    fn relay_skipped(&self, kind: RelaySourceKind) {
        (**self).relay_skipped(kind);
    }

    fn relay_failed(&self, kind: RelaySourceKind, error: &RelayProviderError) {
        (**self).relay_failed(kind, error);
    }

    fn relay_resolved(&self, kind: RelaySourceKind, entries: usize) {
        (**self).relay_resolved(kind, entries);
    }

    fn connectivity_at_risk(&self, baseline: usize) {
        (**self).connectivity_at_risk(baseline);
    }

    fn artifact_written(&self, path: &Utf8Path, ice_servers: usize) {
        (**self).artifact_written(path, ice_servers);
    }

    fn server_launched(&self, binary: &Utf8Path, pid: u32) {
        (**self).server_launched(binary, pid);
    }

    fn server_exited(&self, code: i32) {
        (**self).server_exited(code);
    }

    fn shutdown_started(&self, signal: Option<i32>) {
        (**self).shutdown_started(signal);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredLifecycleReporter;

impl StructuredLifecycleReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl LifecycleReporter for StructuredLifecycleReporter {
    fn session_starting(&self) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "session_starting",
            "starting session bootstrap"
        );
    }

    fn session_configured(&self, config: &Config) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "session_configured",
            display = %config.display(),
            artifact = %config.artifact_path(),
            server = %config.server_binary(),
            log_filter = %config.log_filter(),
            log_format = %config.log_format(),
            "session configuration loaded"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: LIFECYCLE_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "session bootstrap failed"
        );
    }

    fn service_starting(&self, name: &str) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "service_starting",
            service = name,
            "starting service"
        );
    }

    fn service_ready(&self, name: &str, pid: u32) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "service_ready",
            service = name,
            pid,
            "service ready"
        );
    }

    fn service_failed(&self, error: &SupervisorError) {
        tracing::error!(
            target: LIFECYCLE_TARGET,
            event = "service_failed",
            error = %error,
            "service failed to start"
        );
    }

    fn service_stopped(&self, name: &str, pid: u32) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "service_stopped",
            service = name,
            pid,
            "service signalled"
        );
    }

    fn relay_skipped(&self, kind: RelaySourceKind) {
        tracing::debug!(
            target: LIFECYCLE_TARGET,
            event = "relay_skipped",
            source = %kind,
            "relay source not configured"
        );
    }

    fn relay_failed(&self, kind: RelaySourceKind, error: &RelayProviderError) {
        tracing::warn!(
            target: LIFECYCLE_TARGET,
            event = "relay_failed",
            source = %kind,
            error = %error,
            "relay source failed; trying the next one"
        );
    }

    fn relay_resolved(&self, kind: RelaySourceKind, entries: usize) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "relay_resolved",
            source = %kind,
            entries,
            "relay credentials resolved"
        );
    }

    fn connectivity_at_risk(&self, baseline: usize) {
        tracing::warn!(
            target: LIFECYCLE_TARGET,
            event = "connectivity_at_risk",
            baseline,
            "no relay available; clients behind symmetric NAT may fail to connect"
        );
    }

    fn artifact_written(&self, path: &Utf8Path, ice_servers: usize) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "artifact_written",
            path = %path,
            ice_servers,
            "session artifact written"
        );
    }

    fn server_launched(&self, binary: &Utf8Path, pid: u32) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "server_launched",
            binary = %binary,
            pid,
            "web server launched"
        );
    }

    fn server_exited(&self, code: i32) {
        if code == 0 {
            tracing::info!(
                target: LIFECYCLE_TARGET,
                event = "server_exited",
                code,
                "web server exited"
            );
        } else {
            tracing::error!(
                target: LIFECYCLE_TARGET,
                event = "server_exited",
                code,
                "web server exited with failure"
            );
        }
    }

    fn shutdown_started(&self, signal: Option<i32>) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "shutdown_started",
            signal = ?signal,
            "stopping supervised services"
        );
    }
}
