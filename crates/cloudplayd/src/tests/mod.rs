//! Test suites for the session orchestrator.

mod session_behaviour;
pub(crate) mod support;
