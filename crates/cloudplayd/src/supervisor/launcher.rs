//! Process-level collaborators used by the supervisor.

use std::io;
use std::process::{Command, Stdio};

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;

use super::service::{ReadinessCheck, ServiceSpec};

/// Spawns service processes.
pub trait ProcessLauncher: Send + Sync {
    /// Starts `spec` with `env` added to the inherited environment, returning
    /// its PID.
    fn launch(&self, spec: &ServiceSpec, env: &[(String, String)]) -> io::Result<u32>;
}

/// Runs readiness checks.
pub trait ReadinessChecker: Send + Sync {
    /// Runs `check` once for the service running as `pid`.
    fn is_ready(&self, check: &ReadinessCheck, pid: u32, env: &[(String, String)]) -> bool;
}

/// Delivers signals to service processes.
pub trait ProcessSignaller: Send + Sync {
    /// Sends `signal` to `pid`.
    fn signal(&self, pid: u32, signal: Signal) -> Result<(), Errno>;
}

fn to_pid(pid: u32) -> Result<Pid, Errno> {
    i32::try_from(pid).map(Pid::from_raw).map_err(|_| Errno::ESRCH)
}

/// Launcher spawning real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessLauncher;

impl ProcessLauncher for SystemProcessLauncher {
    fn launch(&self, spec: &ServiceSpec, env: &[(String, String)]) -> io::Result<u32> {
        let child = Command::new(&spec.program)
            .args(&spec.args)
            .envs(env.iter().map(|(key, value)| (key, value)))
            .stdin(Stdio::null())
            .spawn()?;
        Ok(child.id())
    }
}

/// Checker running real readiness checks.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemReadinessChecker;

impl ReadinessChecker for SystemReadinessChecker {
    fn is_ready(&self, check: &ReadinessCheck, pid: u32, env: &[(String, String)]) -> bool {
        match check {
            ReadinessCheck::Command { program, args } => Command::new(program)
                .args(args)
                .envs(env.iter().map(|(key, value)| (key, value)))
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .is_ok_and(|status| status.success()),
            ReadinessCheck::SocketExists(path) => path.exists(),
            ReadinessCheck::ProcessAlive => process_alive(pid),
        }
    }
}

/// Reaps `pid` if it has exited; a reaped or unknown child is not alive.
fn process_alive(pid: u32) -> bool {
    let Ok(pid) = to_pid(pid) else {
        return false;
    };
    matches!(
        waitpid(pid, Some(WaitPidFlag::WNOHANG)),
        Ok(WaitStatus::StillAlive)
    )
}

/// Signaller delivering real signals.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessSignaller;

impl ProcessSignaller for SystemProcessSignaller {
    fn signal(&self, pid: u32, signal: Signal) -> Result<(), Errno> {
        kill(to_pid(pid)?, signal)
    }
}
