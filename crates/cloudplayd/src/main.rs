//! Container entrypoint for the cloud play session orchestrator.
//!
//! Delegates to [`cloudplayd::run`]. The standard streams are passed
//! unlocked because the signal forwarding thread logs while the web server
//! runs.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    cloudplayd::run(&mut stdout, &mut stderr)
}
