//! Log output settings for the orchestrator process.
//!
//! The orchestrator talks to a relay credential API over HTTP, and the HTTP
//! stack logs every connection at `debug`. [`orchestrator_log_filter`] caps
//! those crates at `warn` unless the operator's filter names them.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Crates whose logging is capped unless the configured filter names them.
pub const QUIETED_DEPENDENCIES: &[&str] = &["hyper", "hyper_util", "reqwest", "rustls"];

/// Supported logging output formats for the orchestrator itself.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON object per event for the hosting platform's log collector.
    Json,
    /// Human-readable single line output.
    #[default]
    Compact,
}

impl LogFormat {
    /// Whether events are emitted as machine-readable records.
    ///
    /// Structured records never carry ANSI colour codes.
    #[must_use]
    pub const fn is_structured(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Errors encountered while parsing a [`LogFormat`] from text.
pub type LogFormatParseError = strum::ParseError;

/// Extends `filter` with a `warn` cap for each quieted HTTP dependency the
/// filter does not already mention.
#[must_use]
pub fn orchestrator_log_filter(filter: &str) -> String {
    let filter = filter.trim();
    let mut directives: Vec<String> = filter
        .split(',')
        .map(str::trim)
        .filter(|directive| !directive.is_empty())
        .map(str::to_owned)
        .collect();
    for dependency in QUIETED_DEPENDENCIES {
        if !directives
            .iter()
            .any(|directive| names_target(directive, dependency))
        {
            directives.push(format!("{dependency}=warn"));
        }
    }
    directives.join(",")
}

fn names_target(directive: &str, target: &str) -> bool {
    let head = directive
        .split(['=', '['])
        .next()
        .unwrap_or(directive)
        .trim();
    head == target || head.starts_with(&format!("{target}::"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("json", LogFormat::Json)]
    #[case("JSON", LogFormat::Json)]
    #[case("compact", LogFormat::Compact)]
    fn parses_case_insensitively(#[case] input: &str, #[case] expected: LogFormat) {
        let parsed: LogFormat = input.parse().expect("format should parse");
        assert_eq!(parsed, expected);
    }

    #[test]
    fn rejects_unknown_format() {
        assert!("pretty".parse::<LogFormat>().is_err());
    }

    #[test]
    fn only_json_is_structured() {
        assert!(LogFormat::Json.is_structured());
        assert!(!LogFormat::Compact.is_structured());
    }

    #[test]
    fn caps_http_dependencies_after_the_configured_directives() {
        assert_eq!(
            orchestrator_log_filter("info"),
            "info,hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn"
        );
    }

    #[test]
    fn keeps_operator_directives_for_named_dependencies() {
        assert_eq!(
            orchestrator_log_filter("debug, reqwest=trace,hyper::proto=debug"),
            "debug,reqwest=trace,hyper::proto=debug,hyper_util=warn,rustls=warn"
        );
    }

    #[test]
    fn similarly_prefixed_targets_are_still_capped() {
        let filter = orchestrator_log_filter("hyperion=debug");
        assert!(filter.contains("hyper=warn"));
    }

    #[test]
    fn empty_filter_yields_only_the_caps() {
        assert_eq!(
            orchestrator_log_filter("  "),
            "hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn"
        );
    }
}
