//! Session bootstrap for the cloud play streaming container.
//!
//! `cloudplayd` is the container's entry point. It loads layered
//! configuration through [`cloudplay_config`], initialises structured
//! telemetry, then brings up the local services a streaming session needs:
//! a virtual display, a message bus, an audio server and the game streaming
//! daemon. Each service must pass a readiness check before the next one
//! starts.
//!
//! Once the services are up, the orchestrator works out which ICE servers
//! browsers should use. Public STUN servers are always present; relay
//! (TURN) entries come from the first configured provider in a fixed chain:
//! a cloud credential API, static credentials, or credentials derived from a
//! shared secret. The result is written to the web server's configuration
//! artifact, after which the web server is launched in the foreground.
//!
//! Termination signals are forwarded to the web server. When it exits the
//! supervised services are signalled in reverse order and the orchestrator
//! exits with the web server's status.

mod bootstrap;
pub mod environment;
pub mod ice;
mod lifecycle;
mod process;
pub mod relay;
pub mod session;
pub mod supervisor;
mod telemetry;

pub use bootstrap::{BootstrapError, ConfigLoader, SystemConfigLoader, bootstrap_with};
pub use lifecycle::{LifecycleReporter, StructuredLifecycleReporter};
pub use process::{
    ServerCommand, ServerLauncher, SessionError, SessionExit, SessionPlan, SignalError,
    SignalListener, SystemServerLauncher, TerminationSignals, print_session_config, run,
    run_session, run_session_with, session_config,
};
pub use telemetry::TelemetryError;

#[cfg(test)]
mod tests;
