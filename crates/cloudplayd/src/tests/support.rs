//! Test doubles shared by the orchestrator's unit and behavioural suites.
//!
//! [`RecordingLifecycleReporter`] captures lifecycle events so tests can
//! assert on observable behaviour. The process fakes stand in for real
//! services, the web server and the signal listener.

use std::collections::BTreeSet;
use std::io;
use std::process::{Child, Command};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use camino::{Utf8Path, Utf8PathBuf};
use nix::errno::Errno;
use nix::sys::signal::Signal;
use tempfile::TempDir;

use cloudplay_config::Config;

use crate::bootstrap::BootstrapError;
use crate::lifecycle::LifecycleReporter;
use crate::process::{ServerCommand, ServerLauncher, TerminationSignals};
use crate::relay::{RelayProviderError, RelaySourceKind};
use crate::supervisor::{
    ProcessLauncher, ProcessSignaller, ReadinessCheck, ReadinessChecker, ServiceSpec,
    SupervisorError,
};

/// Lifecycle events tracked during tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Bootstrap started.
    SessionStarting,
    /// Configuration and telemetry ready.
    SessionConfigured,
    /// Bootstrap failed with an error description.
    BootstrapFailed(String),
    /// Service launch initiated.
    ServiceStarting(String),
    /// Service passed readiness.
    ServiceReady(String),
    /// Service failed to start.
    ServiceFailed(String),
    /// Service signalled during shutdown.
    ServiceStopped(String),
    /// Relay source lacked configuration.
    RelaySkipped(RelaySourceKind),
    /// Relay source failed.
    RelayFailed(RelaySourceKind),
    /// Relay source contributed entries.
    RelayResolved(RelaySourceKind, usize),
    /// Only baseline STUN entries were available.
    ConnectivityAtRisk,
    /// Artifact persisted with this many ICE servers.
    ArtifactWritten(usize),
    /// Web server spawned.
    ServerLaunched,
    /// Web server exited with this code.
    ServerExited(i32),
    /// Shutdown began, possibly because of a signal.
    ShutdownStarted(Option<i32>),
}

/// Records lifecycle events for assertions.
#[derive(Debug, Default)]
pub struct RecordingLifecycleReporter {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingLifecycleReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events
            .lock()
            .expect("lifecycle reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: LifecycleEvent) {
        self.events
            .lock()
            .expect("lifecycle reporter mutex poisoned")
            .push(event);
    }
}

impl LifecycleReporter for RecordingLifecycleReporter {
    fn session_starting(&self) {
        self.record(LifecycleEvent::SessionStarting);
    }

    fn session_configured(&self, _config: &Config) {
        self.record(LifecycleEvent::SessionConfigured);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(LifecycleEvent::BootstrapFailed(error.to_string()));
    }

    fn service_starting(&self, name: &str) {
        self.record(LifecycleEvent::ServiceStarting(name.to_owned()));
    }

    fn service_ready(&self, name: &str, _pid: u32) {
        self.record(LifecycleEvent::ServiceReady(name.to_owned()));
    }

    fn service_failed(&self, error: &SupervisorError) {
        let service = error.service().unwrap_or("unknown").to_owned();
        self.record(LifecycleEvent::ServiceFailed(service));
    }

    fn service_stopped(&self, name: &str, _pid: u32) {
        self.record(LifecycleEvent::ServiceStopped(name.to_owned()));
    }

    fn relay_skipped(&self, kind: RelaySourceKind) {
        self.record(LifecycleEvent::RelaySkipped(kind));
    }

    fn relay_failed(&self, kind: RelaySourceKind, _error: &RelayProviderError) {
        self.record(LifecycleEvent::RelayFailed(kind));
    }

    fn relay_resolved(&self, kind: RelaySourceKind, entries: usize) {
        self.record(LifecycleEvent::RelayResolved(kind, entries));
    }

    fn connectivity_at_risk(&self, _baseline: usize) {
        self.record(LifecycleEvent::ConnectivityAtRisk);
    }

    fn artifact_written(&self, _path: &Utf8Path, ice_servers: usize) {
        self.record(LifecycleEvent::ArtifactWritten(ice_servers));
    }

    fn server_launched(&self, _binary: &Utf8Path, _pid: u32) {
        self.record(LifecycleEvent::ServerLaunched);
    }

    fn server_exited(&self, code: i32) {
        self.record(LifecycleEvent::ServerExited(code));
    }

    fn shutdown_started(&self, signal: Option<i32>) {
        self.record(LifecycleEvent::ShutdownStarted(signal));
    }
}

/// Configuration rooted in a temporary directory so nothing touches `/data`.
pub fn temp_config(root: &TempDir) -> Config {
    let base = Utf8Path::from_path(root.path()).expect("temp dir should be UTF-8");
    Config {
        runtime_dir: base.join("runtime"),
        pulse_dir: base.join("pulse"),
        sunshine_config_dir: base.join("sunshine"),
        server_dir: base.join("server"),
        artifact_path: base.join("server/config.json"),
        storage_path: base.join("server/data.json"),
        server_workdir: base.to_path_buf(),
        readiness_attempts: 2,
        readiness_interval_ms: 0,
        ..Config::default()
    }
}

/// Launcher handing out sequential fake PIDs and recording service order.
#[derive(Debug, Clone, Default)]
pub struct FakeProcessLauncher {
    next_pid: Arc<AtomicU32>,
    launched: Arc<Mutex<Vec<String>>>,
}

impl FakeProcessLauncher {
    /// Names of the services launched so far.
    pub fn launched(&self) -> Vec<String> {
        self.launched.lock().expect("launcher mutex poisoned").clone()
    }
}

impl ProcessLauncher for FakeProcessLauncher {
    fn launch(&self, spec: &ServiceSpec, _env: &[(String, String)]) -> io::Result<u32> {
        self.launched
            .lock()
            .expect("launcher mutex poisoned")
            .push(spec.name.to_owned());
        Ok(1000 + self.next_pid.fetch_add(1, Ordering::SeqCst))
    }
}

/// Checker reporting every service ready except the ones marked stuck.
#[derive(Debug, Clone, Default)]
pub struct FakeReadinessChecker {
    stuck_pids: Arc<Mutex<BTreeSet<u32>>>,
}

impl FakeReadinessChecker {
    /// Makes the service that receives `pid` never become ready.
    pub fn never_ready(&self, pid: u32) {
        self.stuck_pids
            .lock()
            .expect("readiness mutex poisoned")
            .insert(pid);
    }
}

impl ReadinessChecker for FakeReadinessChecker {
    fn is_ready(&self, _check: &ReadinessCheck, pid: u32, _env: &[(String, String)]) -> bool {
        !self
            .stuck_pids
            .lock()
            .expect("readiness mutex poisoned")
            .contains(&pid)
    }
}

/// Signaller recording delivered signals.
#[derive(Debug, Clone, Default)]
pub struct FakeProcessSignaller {
    signalled: Arc<Mutex<Vec<(u32, Signal)>>>,
}

impl FakeProcessSignaller {
    /// PIDs signalled so far, in delivery order.
    pub fn signalled(&self) -> Vec<u32> {
        self.signalled
            .lock()
            .expect("signaller mutex poisoned")
            .iter()
            .map(|(pid, _)| *pid)
            .collect()
    }
}

impl ProcessSignaller for FakeProcessSignaller {
    fn signal(&self, pid: u32, signal: Signal) -> Result<(), Errno> {
        self.signalled
            .lock()
            .expect("signaller mutex poisoned")
            .push((pid, signal));
        Ok(())
    }
}

/// Server launcher running a shell that exits with a fixed code.
#[derive(Debug, Clone)]
pub struct ExitingServerLauncher {
    exit_code: i32,
    commands: Arc<Mutex<Vec<ServerCommand>>>,
}

impl ExitingServerLauncher {
    /// Server that exits with `exit_code`.
    pub fn new(exit_code: i32) -> Self {
        Self {
            exit_code,
            commands: Arc::default(),
        }
    }

    /// Commands the orchestrator asked to spawn.
    pub fn commands(&self) -> Vec<ServerCommand> {
        self.commands
            .lock()
            .expect("server launcher mutex poisoned")
            .clone()
    }
}

impl ServerLauncher for ExitingServerLauncher {
    fn spawn(&self, command: &ServerCommand) -> io::Result<Child> {
        self.commands
            .lock()
            .expect("server launcher mutex poisoned")
            .push(command.clone());
        Command::new("sh")
            .args(["-c", &format!("exit {}", self.exit_code)])
            .spawn()
    }
}

/// Signal source with an optional signal already queued.
#[derive(Debug, Clone, Copy, Default)]
pub struct FakeSignals {
    queued: Option<i32>,
}

impl FakeSignals {
    /// A signal already received during startup.
    pub fn queued(signal: Signal) -> Self {
        Self {
            queued: Some(signal as i32),
        }
    }
}

impl TerminationSignals for FakeSignals {
    fn pending(&mut self) -> Option<i32> {
        self.queued
    }

    fn supervise(&mut self, child: &mut Child) -> io::Result<std::process::ExitStatus> {
        child.wait()
    }
}

/// Reads the artifact written for `config`.
pub fn read_artifact(config: &Config) -> serde_json::Value {
    let path: Utf8PathBuf = config.artifact_path().to_path_buf();
    let raw = std::fs::read_to_string(&path).expect("artifact should be readable");
    serde_json::from_str(&raw).expect("artifact should be JSON")
}
