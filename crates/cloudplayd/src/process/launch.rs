//! Sequences a session from service startup to web server exit.

use std::io::{self, Write};
use std::process::{Child, Command, ExitCode, ExitStatus};
use std::sync::Arc;

use camino::Utf8PathBuf;
use tracing::{error, info};

use cloudplay_config::Config;

use crate::bootstrap::{SystemConfigLoader, bootstrap_with};
use crate::environment::EnvironmentView;
use crate::ice::baseline_stun;
use crate::lifecycle::{LifecycleReporter, StructuredLifecycleReporter};
use crate::relay::RelayChain;
use crate::session::{SessionConfig, SessionDefaults, render_artifact, synthesize, write_artifact};
use crate::supervisor::{
    ProcessControls, ProcessLauncher, ProcessSignaller, ReadinessChecker, Supervisor,
};

use super::PROCESS_TARGET;
use super::errors::SessionError;
use super::signals::{SignalListener, TerminationSignals};

/// Exit status the orchestrator reports to its host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionExit(u8);

impl SessionExit {
    /// Clean exit.
    pub const SUCCESS: Self = Self(0);

    /// Exit code for a process ended by `signal`, following the shell
    /// convention of `128 + signal`.
    #[must_use]
    pub fn from_signal(signal: i32) -> Self {
        Self(u8::try_from(signal.saturating_add(128)).unwrap_or(u8::MAX))
    }

    /// Mirrors a child's exit status.
    #[must_use]
    pub fn from_status(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Self(u8::try_from(code & 0xff).unwrap_or(u8::MAX));
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Self::from_signal(signal);
            }
        }
        Self(1)
    }

    /// Numeric exit code.
    #[must_use]
    pub const fn code(self) -> u8 {
        self.0
    }
}

impl From<SessionExit> for ExitCode {
    fn from(exit: SessionExit) -> Self {
        Self::from(exit.code())
    }
}

/// How the web server is started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCommand {
    /// Server executable.
    pub binary: Utf8PathBuf,
    /// Arguments: `--config <artifact>`.
    pub args: Vec<String>,
    /// Working directory.
    pub workdir: Utf8PathBuf,
    /// Variables added to the inherited environment.
    pub env: Vec<(String, String)>,
}

impl ServerCommand {
    /// Builds the launch command from configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            binary: config.server_binary().to_path_buf(),
            args: vec!["--config".to_owned(), config.artifact_path().to_string()],
            workdir: config.server_workdir().to_path_buf(),
            env: vec![("RUST_LOG".to_owned(), config.server_log_filter().to_owned())],
        }
    }
}

/// Spawns the web server.
pub trait ServerLauncher {
    /// Starts the server described by `command`.
    fn spawn(&self, command: &ServerCommand) -> io::Result<Child>;
}

/// Launcher spawning the real web server.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemServerLauncher;

impl ServerLauncher for SystemServerLauncher {
    fn spawn(&self, command: &ServerCommand) -> io::Result<Child> {
        Command::new(&command.binary)
            .args(&command.args)
            .current_dir(&command.workdir)
            .envs(command.env.iter().map(|(key, value)| (key, value)))
            .spawn()
    }
}

/// Collaborators required to run a session.
pub struct SessionPlan<L, P, S, R, G> {
    /// Resolved configuration.
    pub config: Config,
    /// Environment captured at startup.
    pub environment: EnvironmentView,
    /// Lifecycle observer.
    pub reporter: Arc<dyn LifecycleReporter>,
    /// Local service supervisor.
    pub supervisor: Supervisor<L, P, S>,
    /// Relay provider chain.
    pub relays: RelayChain,
    /// Web server launcher.
    pub server: R,
    /// Termination signal source.
    pub signals: G,
}

/// Runs the binary: a session, or a configuration dump with `--print-config`.
///
/// Errors are written to `stderr` and logged; the exit code mirrors the web
/// server's.
pub fn run<W, E>(stdout: &mut W, stderr: &mut E) -> ExitCode
where
    W: Write,
    E: Write,
{
    match run_session(stdout) {
        Ok(exit) => exit.into(),
        Err(session_error) => {
            error!(
                target: PROCESS_TARGET,
                error = %session_error,
                "session failed"
            );
            let _ = writeln!(stderr, "cloudplayd: {session_error}");
            ExitCode::FAILURE
        }
    }
}

/// Runs a session using the production collaborators.
pub fn run_session<W>(stdout: &mut W) -> Result<SessionExit, SessionError>
where
    W: Write,
{
    let reporter: Arc<dyn LifecycleReporter> = Arc::new(StructuredLifecycleReporter::new());
    let config = bootstrap_with(&SystemConfigLoader, reporter.as_ref())?;
    let environment = EnvironmentView::capture();
    let relays = RelayChain::from_config(&config, Arc::clone(&reporter));

    if config.print_config() {
        print_session_config(&config, &environment, &relays, reporter.as_ref(), stdout)?;
        return Ok(SessionExit::SUCCESS);
    }

    let signals = SignalListener::install()?;
    let supervisor =
        Supervisor::from_config(&config, ProcessControls::system(), Arc::clone(&reporter))?;
    run_session_with(SessionPlan {
        config,
        environment,
        reporter,
        supervisor,
        relays,
        server: SystemServerLauncher,
        signals,
    })
}

/// Runs a session with injected collaborators.
///
/// Supervised services are always signalled before this returns, whether
/// the session ended normally, by signal or by error.
pub fn run_session_with<L, P, S, R, G>(
    plan: SessionPlan<L, P, S, R, G>,
) -> Result<SessionExit, SessionError>
where
    L: ProcessLauncher,
    P: ReadinessChecker,
    S: ProcessSignaller,
    R: ServerLauncher,
    G: TerminationSignals,
{
    let SessionPlan {
        config,
        environment,
        reporter,
        mut supervisor,
        relays,
        server,
        mut signals,
    } = plan;

    info!(target: PROCESS_TARGET, "starting session");
    let outcome = serve(
        &config,
        &environment,
        reporter.as_ref(),
        &mut supervisor,
        &relays,
        &server,
        &mut signals,
    );
    reporter.shutdown_started(signals.pending());
    supervisor.shutdown();
    info!(target: PROCESS_TARGET, "session finished");
    outcome
}

fn serve<L, P, S, R, G>(
    config: &Config,
    environment: &EnvironmentView,
    reporter: &dyn LifecycleReporter,
    supervisor: &mut Supervisor<L, P, S>,
    relays: &RelayChain,
    server: &R,
    signals: &mut G,
) -> Result<SessionExit, SessionError>
where
    L: ProcessLauncher,
    P: ReadinessChecker,
    S: ProcessSignaller,
    R: ServerLauncher,
    G: TerminationSignals,
{
    supervisor.start_all()?;

    let session = session_config(config, environment, relays, reporter);
    write_artifact(config.artifact_path(), &session)?;
    reporter.artifact_written(config.artifact_path(), session.webrtc.ice_servers.len());

    if let Some(signal) = signals.pending() {
        return Ok(SessionExit::from_signal(signal));
    }

    let command = ServerCommand::from_config(config);
    let mut child = server
        .spawn(&command)
        .map_err(|source| SessionError::ServerLaunch {
            binary: command.binary.clone(),
            source,
        })?;
    reporter.server_launched(&command.binary, child.id());

    let status = signals
        .supervise(&mut child)
        .map_err(|source| SessionError::ServerWait { source })?;
    let exit = SessionExit::from_status(status);
    reporter.server_exited(i32::from(exit.code()));
    Ok(exit)
}

/// Resolves relays and synthesizes the session configuration.
///
/// Reports a connectivity risk when no relay source contributed entries.
pub fn session_config(
    config: &Config,
    environment: &EnvironmentView,
    relays: &RelayChain,
    reporter: &dyn LifecycleReporter,
) -> SessionConfig {
    let resolution = relays.resolve_ice_servers(baseline_stun(), environment, config.relay_ttl());
    if resolution.is_baseline_only() {
        reporter.connectivity_at_risk(resolution.ice_servers.len());
    }
    synthesize(
        resolution.ice_servers,
        environment,
        &SessionDefaults::from_config(config),
    )
}

/// Writes the synthesized artifact to `out` without starting anything.
pub fn print_session_config<W>(
    config: &Config,
    environment: &EnvironmentView,
    relays: &RelayChain,
    reporter: &dyn LifecycleReporter,
    out: &mut W,
) -> Result<(), SessionError>
where
    W: Write + ?Sized,
{
    let session = session_config(config, environment, relays, reporter);
    let rendered = render_artifact(&session)?;
    writeln!(out, "{rendered}").map_err(|source| SessionError::Print { source })?;
    out.flush().map_err(|source| SessionError::Print { source })
}
