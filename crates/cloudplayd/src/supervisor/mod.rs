//! Ordered startup and best-effort teardown of the session's local services.
//!
//! Services start strictly in catalogue order. After each launch the
//! supervisor polls the service's readiness check a bounded number of times;
//! the next service starts only once the previous one is ready. A service
//! that never becomes ready fails the whole startup immediately, since every
//! later service depends on sockets created by the earlier ones.
//!
//! The supervisor owns the PIDs it spawns and is the only component that
//! signals them. [`Supervisor::shutdown`] signals every tracked service in
//! reverse start order and never fails.

mod errors;
mod launcher;
mod service;

use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cloudplay_config::{Config, RuntimePaths};
use tracing::{debug, warn};

use crate::lifecycle::LifecycleReporter;

pub use errors::SupervisorError;
pub use launcher::{
    ProcessLauncher, ProcessSignaller, ReadinessChecker, SystemProcessLauncher,
    SystemProcessSignaller, SystemReadinessChecker,
};
pub use service::{ReadinessCheck, ServiceSpec, child_environment, service_catalogue};

const SUPERVISOR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::supervisor");

/// Bounded readiness polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    /// Checks attempted per service.
    pub attempts: u32,
    /// Pause before each check.
    pub interval: Duration,
}

impl ReadinessPolicy {
    /// Reads the policy from configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            attempts: config.readiness_attempts(),
            interval: config.readiness_interval(),
        }
    }
}

/// A running service tracked by the supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceHandle {
    /// Service name.
    pub name: &'static str,
    /// Process identifier.
    pub pid: u32,
}

/// Supervisor lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorState {
    /// Nothing started yet.
    Idle,
    /// Bringing up the service at this catalogue index.
    Starting(usize),
    /// Every service passed its readiness check.
    Ready,
    /// A service failed to start; carries its name.
    Failed {
        /// Service that failed.
        service: String,
    },
    /// Signalling tracked services.
    ShuttingDown,
    /// Shutdown finished.
    Stopped,
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => formatter.write_str("idle"),
            Self::Starting(index) => write!(formatter, "starting({index})"),
            Self::Ready => formatter.write_str("ready"),
            Self::Failed { service } => write!(formatter, "failed({service})"),
            Self::ShuttingDown => formatter.write_str("shutting down"),
            Self::Stopped => formatter.write_str("stopped"),
        }
    }
}

/// Process collaborators injected into the supervisor.
pub struct ProcessControls<L, P, S> {
    /// Spawns services.
    pub launcher: L,
    /// Checks readiness.
    pub readiness: P,
    /// Delivers shutdown signals.
    pub signaller: S,
}

impl ProcessControls<SystemProcessLauncher, SystemReadinessChecker, SystemProcessSignaller> {
    /// Collaborators acting on real processes.
    #[must_use]
    pub fn system() -> Self {
        Self {
            launcher: SystemProcessLauncher,
            readiness: SystemReadinessChecker,
            signaller: SystemProcessSignaller,
        }
    }
}

/// Starts and stops the session's local services.
pub struct Supervisor<L, P, S> {
    services: Vec<ServiceSpec>,
    environment: Vec<(String, String)>,
    policy: ReadinessPolicy,
    controls: ProcessControls<L, P, S>,
    reporter: Arc<dyn LifecycleReporter>,
    paths: Option<RuntimePaths>,
    state: SupervisorState,
    running: Vec<ServiceHandle>,
}

impl<L, P, S> Supervisor<L, P, S>
where
    L: ProcessLauncher,
    P: ReadinessChecker,
    S: ProcessSignaller,
{
    /// Builds a supervisor for an explicit service list.
    pub fn new(
        services: Vec<ServiceSpec>,
        environment: Vec<(String, String)>,
        policy: ReadinessPolicy,
        controls: ProcessControls<L, P, S>,
        reporter: Arc<dyn LifecycleReporter>,
    ) -> Self {
        Self {
            services,
            environment,
            policy,
            controls,
            reporter,
            paths: None,
            state: SupervisorState::Idle,
            running: Vec::new(),
        }
    }

    /// Builds the session supervisor from configuration.
    ///
    /// Runtime directories are created by [`Supervisor::start_all`].
    pub fn from_config(
        config: &Config,
        controls: ProcessControls<L, P, S>,
        reporter: Arc<dyn LifecycleReporter>,
    ) -> Result<Self, SupervisorError> {
        let paths = RuntimePaths::from_config(config)?;
        let mut supervisor = Self::new(
            service_catalogue(config, &paths),
            child_environment(config, &paths),
            ReadinessPolicy::from_config(config),
            controls,
            reporter,
        );
        supervisor.paths = Some(paths);
        Ok(supervisor)
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> &SupervisorState {
        &self.state
    }

    /// Services started so far, in start order.
    #[must_use]
    pub fn running(&self) -> &[ServiceHandle] {
        &self.running
    }

    /// Starts every service in order, waiting for each to become ready.
    ///
    /// Stops at the first service that fails to spawn or never becomes ready;
    /// later services are not launched. Services already running stay
    /// tracked so [`Supervisor::shutdown`] can stop them.
    pub fn start_all(&mut self) -> Result<Vec<ServiceHandle>, SupervisorError> {
        if self.state != SupervisorState::Idle {
            return Err(SupervisorError::InvalidState {
                state: self.state.to_string(),
            });
        }
        if let Some(paths) = &self.paths {
            paths.prepare()?;
        }

        for index in 0..self.services.len() {
            self.state = SupervisorState::Starting(index);
            if let Err(error) = self.start_service(index) {
                self.reporter.service_failed(&error);
                return Err(error);
            }
        }

        self.state = SupervisorState::Ready;
        Ok(self.running.clone())
    }

    fn start_service(&mut self, index: usize) -> Result<(), SupervisorError> {
        let Some(spec) = self.services.get(index) else {
            return Ok(());
        };
        self.reporter.service_starting(spec.name);

        let pid = match self.controls.launcher.launch(spec, &self.environment) {
            Ok(pid) => pid,
            Err(source) => {
                self.state = SupervisorState::Failed {
                    service: spec.name.to_owned(),
                };
                return Err(SupervisorError::Spawn {
                    name: spec.name.to_owned(),
                    source,
                });
            }
        };
        self.running.push(ServiceHandle {
            name: spec.name,
            pid,
        });

        if self.await_ready(spec, pid) {
            self.reporter.service_ready(spec.name, pid);
            Ok(())
        } else {
            self.state = SupervisorState::Failed {
                service: spec.name.to_owned(),
            };
            Err(SupervisorError::ServiceStartupFailed {
                name: spec.name.to_owned(),
                attempts: self.policy.attempts,
            })
        }
    }

    fn await_ready(&self, spec: &ServiceSpec, pid: u32) -> bool {
        (1..=self.policy.attempts).any(|attempt| {
            thread::sleep(self.policy.interval);
            let ready = self
                .controls
                .readiness
                .is_ready(&spec.readiness, pid, &self.environment);
            debug!(
                target: SUPERVISOR_TARGET,
                service = spec.name,
                attempt,
                ready,
                "readiness check"
            );
            ready
        })
    }

    /// Signals every tracked service in reverse start order.
    ///
    /// Delivery errors (typically a service that already exited) are logged
    /// and ignored. Calling this more than once is harmless.
    pub fn shutdown(&mut self) {
        if self.state == SupervisorState::Stopped {
            return;
        }
        self.state = SupervisorState::ShuttingDown;
        while let Some(handle) = self.running.pop() {
            let signal = self
                .services
                .iter()
                .find(|spec| spec.name == handle.name)
                .map_or(nix::sys::signal::Signal::SIGTERM, |spec| spec.shutdown_signal);
            match self.controls.signaller.signal(handle.pid, signal) {
                Ok(()) => self.reporter.service_stopped(handle.name, handle.pid),
                Err(errno) => warn!(
                    target: SUPERVISOR_TARGET,
                    service = handle.name,
                    pid = handle.pid,
                    error = %errno,
                    "failed to signal service; assuming it already exited"
                ),
            }
        }
        self.state = SupervisorState::Stopped;
    }
}
