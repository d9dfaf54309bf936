//! Termination signal handling and forwarding to the web server.

use std::io;
use std::process::{Child, ExitStatus};
use std::thread;

use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tracing::{info, warn};

use super::PROCESS_TARGET;

/// Termination signals delivered to the orchestrator.
pub trait TerminationSignals {
    /// Returns the first termination signal received so far, if any.
    fn pending(&mut self) -> Option<i32>;

    /// Waits for `child` to exit, relaying termination signals to it.
    fn supervise(&mut self, child: &mut Child) -> io::Result<ExitStatus>;
}

/// Errors reported by the signal listener.
#[derive(Debug, Error)]
pub enum SignalError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Listener for SIGTERM, SIGINT, SIGQUIT and SIGHUP.
///
/// Installed before any service starts so a signal arriving mid-startup is
/// queued rather than killing the orchestrator outright.
pub struct SignalListener {
    signals: Signals,
    received: Option<i32>,
}

impl SignalListener {
    /// Installs the signal handlers.
    pub fn install() -> Result<Self, SignalError> {
        let signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
            .map_err(|source| SignalError::Install { source })?;
        Ok(Self {
            signals,
            received: None,
        })
    }
}

impl TerminationSignals for SignalListener {
    fn pending(&mut self) -> Option<i32> {
        if self.received.is_none() {
            self.received = self.signals.pending().next();
            if let Some(signal) = self.received {
                info!(
                    target: PROCESS_TARGET,
                    signal,
                    "termination signal received during startup"
                );
            }
        }
        self.received
    }

    fn supervise(&mut self, child: &mut Child) -> io::Result<ExitStatus> {
        let handle = self.signals.handle();
        let pid = child.id();
        let Self { signals, received } = self;
        thread::scope(|scope| {
            let forwarder = scope.spawn(move || {
                let mut first = None;
                for signal in signals.forever() {
                    info!(
                        target: PROCESS_TARGET,
                        signal,
                        pid,
                        "forwarding termination signal to web server"
                    );
                    forward(pid, signal);
                    first = first.or(Some(signal));
                }
                first
            });
            let status = child.wait();
            handle.close();
            if let Ok(Some(signal)) = forwarder.join() {
                received.get_or_insert(signal);
            }
            status
        })
    }
}

fn forward(pid: u32, signal: i32) {
    let target = match (i32::try_from(pid), Signal::try_from(signal)) {
        (Ok(pid), Ok(signal)) => (Pid::from_raw(pid), signal),
        _ => return,
    };
    if let Err(errno) = kill(target.0, target.1) {
        warn!(
            target: PROCESS_TARGET,
            pid,
            signal,
            error = %errno,
            "failed to forward signal"
        );
    }
}
