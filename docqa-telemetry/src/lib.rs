//! # docqa-telemetry
//!
//! Installs the process-wide `tracing` subscriber for DocQA binaries.
//!
//! Log lines go to stderr so they never mix with answers printed on stdout.
//! `RUST_LOG` overrides the configured default directive.
//!
//! ```rust,ignore
//! use docqa_telemetry::{TelemetryConfig, init_telemetry};
//!
//! init_telemetry(&TelemetryConfig::default().with_directive("debug"))?;
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

/// Directive used when neither the config nor `RUST_LOG` says otherwise.
pub const DEFAULT_DIRECTIVE: &str = "warn,docqa_rag=info,docqa_model=info,docqa_cli=info";

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A filter directive could not be parsed.
    #[error("Invalid log directive '{directive}': {message}")]
    InvalidDirective {
        /// The directive as given.
        directive: String,
        /// Parser detail.
        message: String,
    },
}

/// Logging options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive applied when `RUST_LOG` is unset.
    pub default_directive: String,
    /// Emit one JSON object per event instead of human-readable lines.
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { default_directive: DEFAULT_DIRECTIVE.to_string(), json: false }
    }
}

impl TelemetryConfig {
    /// Replace the default directive.
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.default_directive = directive.into();
        self
    }

    /// Toggle JSON output.
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }
}

/// Build the event filter: `rust_log` when present and non-blank, else `default_directive`.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidDirective`] if the chosen directive does not parse.
pub fn build_filter(default_directive: &str, rust_log: Option<&str>) -> Result<EnvFilter, TelemetryError> {
    let directive = rust_log.filter(|d| !d.trim().is_empty()).unwrap_or(default_directive);
    EnvFilter::try_new(directive).map_err(|e| TelemetryError::InvalidDirective {
        directive: directive.to_string(),
        message: e.to_string(),
    })
}

/// Install the global subscriber.
///
/// Calling this again after a subscriber is installed leaves the first one in
/// place and returns `Ok(false)`.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidDirective`] for an unparsable directive.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<bool, TelemetryError> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(&config.default_directive, rust_log.as_deref())?;

    let installed = if config.json {
        fmt().with_env_filter(filter).with_writer(std::io::stderr).json().try_init().is_ok()
    } else {
        fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false).try_init().is_ok()
    };

    if installed {
        tracing::debug!(json = config.json, "telemetry initialized");
    }
    Ok(installed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_directive_parses() {
        assert!(build_filter(DEFAULT_DIRECTIVE, None).is_ok());
    }

    #[test]
    fn rust_log_takes_precedence_unless_blank() {
        let filter = build_filter("info", Some("docqa_rag=trace")).unwrap();
        assert!(filter.to_string().contains("docqa_rag=trace"));

        let filter = build_filter("info", Some("  ")).unwrap().to_string();
        assert!(filter.contains("info"));
        assert!(!filter.contains("trace"));
    }

    #[test]
    fn bad_directive_is_reported() {
        let err = build_filter("docqa_rag=loudest", None).unwrap_err();
        assert!(matches!(
            err,
            TelemetryError::InvalidDirective { ref directive, .. } if directive == "docqa_rag=loudest"
        ));
    }

    #[test]
    fn second_init_keeps_the_first_subscriber() {
        let config = TelemetryConfig::default().with_directive("warn");
        init_telemetry(&config).unwrap();
        let second = init_telemetry(&config.with_json(true)).unwrap();
        assert!(!second);
    }
}
