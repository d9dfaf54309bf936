//! Session entry point: signal handling, server launch and exit mirroring.

mod errors;
mod launch;
mod signals;

pub use errors::SessionError;
pub use launch::{
    ServerCommand, ServerLauncher, SessionExit, SessionPlan, SystemServerLauncher,
    print_session_config, run, run_session, run_session_with, session_config,
};
pub use signals::{SignalError, SignalListener, TerminationSignals};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
