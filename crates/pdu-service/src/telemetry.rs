//! Process-wide `tracing` subscriber shared by the server and the CLI.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use pdu_config::{Config, LogFormat};
use tracing::Subscriber;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::fmt;

static INSTALLED: OnceCell<()> = OnceCell::new();

/// Proof that the global subscriber is in place.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The configured filter expression does not parse.
    #[error("invalid log filter '{expression}': {source}")]
    Filter {
        /// Expression as configured.
        expression: String,
        /// Parser error.
        #[source]
        source: ParseError,
    },
    /// Another global subscriber was installed first.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(#[source] SetGlobalDefaultError),
}

/// Installs the global subscriber on first use; later calls are no-ops even
/// when `config` differs.
///
/// ```rust
/// use pdu_config::Config;
/// use pdu_service::telemetry;
///
/// # fn main() -> Result<(), telemetry::TelemetryError> {
/// telemetry::initialise(&Config::default())?;
/// telemetry::initialise(&Config::default())?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] for an unparsable filter and
/// [`TelemetryError::Subscriber`] when another subscriber is installed.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    INSTALLED.get_or_try_init(|| {
        let filter = parse_filter(config.log_filter())?;
        tracing::subscriber::set_global_default(build_subscriber(filter, config.log_format()))
            .map_err(TelemetryError::Subscriber)
    })?;
    Ok(TelemetryHandle)
}

fn parse_filter(expression: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(expression).map_err(|source| TelemetryError::Filter {
        expression: expression.to_owned(),
        source,
    })
}

/// Stderr subscriber with UTC RFC 3339 timestamps; colour only on a terminal.
fn build_subscriber(filter: EnvFilter, format: LogFormat) -> Box<dyn Subscriber + Send + Sync> {
    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_timer(fmt::time::UtcTime::rfc_3339());
    match format {
        LogFormat::Json => Box::new(
            builder
                .json()
                .flatten_event(true)
                .with_current_span(false)
                .finish(),
        ),
        LogFormat::Compact => Box::new(builder.compact().finish()),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn rejects_unparsable_filter() {
        let error = parse_filter("pdu_service=loudest").expect_err("filter should be rejected");
        assert!(
            matches!(error, TelemetryError::Filter { ref expression, .. } if expression == "pdu_service=loudest")
        );
    }

    #[rstest]
    #[case(LogFormat::Json)]
    #[case(LogFormat::Compact)]
    fn builds_a_subscriber_for_each_format(#[case] format: LogFormat) {
        let filter = parse_filter("pdu_service=debug,warn").expect("valid filter");
        let subscriber = build_subscriber(filter, format);
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "pdu_service::telemetry", "subscriber active");
        });
    }
}
