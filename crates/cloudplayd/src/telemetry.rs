//! Structured telemetry for the orchestrator.
//!
//! Events always go to stderr: stdout carries the `--print-config` artifact
//! and is left to the web server once it runs in the foreground.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use cloudplay_config::{Config, orchestrator_log_filter};

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The configured log filter expression does not parse.
    #[error("invalid log filter '{filter}': {message}")]
    Filter { filter: String, message: String },
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Installs the global subscriber on first use. Later calls are no-ops.
pub fn initialise(config: &Config) -> Result<(), TelemetryError> {
    TELEMETRY_GUARD.get_or_try_init(|| install_subscriber(config))?;
    Ok(())
}

/// Builds the event filter from the configured expression with the HTTP
/// stack capped at `warn`.
fn session_filter(config: &Config) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(orchestrator_log_filter(config.log_filter())).map_err(|error| {
        TelemetryError::Filter {
            filter: config.log_filter().to_owned(),
            message: error.to_string(),
        }
    })
}

fn install_subscriber(config: &Config) -> Result<(), TelemetryError> {
    let filter = session_filter(config)?;
    let format = config.log_format();
    let ansi = !format.is_structured() && io::stderr().is_terminal();

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .with_ansi(ansi)
        .with_timer(fmt::time::UtcTime::rfc_3339());

    let subscriber: Box<dyn Subscriber + Send + Sync> = if format.is_structured() {
        Box::new(
            builder
                .json()
                .flatten_event(true)
                .with_current_span(false)
                .with_span_list(false)
                .finish(),
        )
    } else {
        Box::new(builder.compact().finish())
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_filter(filter: &str) -> Config {
        Config {
            log_filter: filter.to_owned(),
            ..Config::default()
        }
    }

    #[test]
    fn rejects_unparsable_filter_before_installing() {
        let error = install_subscriber(&config_with_filter("cloudplayd=notalevel"))
            .expect_err("filter must be rejected");
        let TelemetryError::Filter { filter, .. } = error else {
            panic!("expected filter error, got {error:?}");
        };
        assert_eq!(filter, "cloudplayd=notalevel");
    }

    #[test]
    fn session_filter_caps_the_http_stack() {
        let filter = session_filter(&config_with_filter("debug")).expect("filter parses");
        let rendered = filter.to_string();
        assert!(rendered.contains("reqwest=warn"), "{rendered}");
        assert!(rendered.contains("hyper=warn"), "{rendered}");
    }

    #[test]
    fn session_filter_respects_explicit_dependency_levels() {
        let filter =
            session_filter(&config_with_filter("info,reqwest=debug")).expect("filter parses");
        let rendered = filter.to_string();
        assert!(rendered.contains("reqwest=debug"), "{rendered}");
        assert!(!rendered.contains("reqwest=warn"), "{rendered}");
    }
}
