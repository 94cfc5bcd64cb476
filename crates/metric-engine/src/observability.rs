//! Tracing setup and the spans the engine opens.

use tracing_subscriber::EnvFilter;

use metric_core::config::ObservabilityConfig;

/// Install the global subscriber described by `config`.
///
/// `RUST_LOG` overrides the configured level when set. Returns false when a
/// subscriber was already installed, which makes repeated calls harmless.
pub fn init_tracing(config: &ObservabilityConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true);
    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.is_ok()
}

/// Span covering one calculation request.
#[macro_export]
macro_rules! calculation_span {
    ($measure:expr, $subset:expr, $average:expr) => {
        tracing::info_span!(
            "metric.calculation",
            measure = %$measure,
            subset = %$subset,
            average = %$average
        )
    };
}

/// Span covering the data load of one calculation.
#[macro_export]
macro_rules! fetch_span {
    ($subset:expr, $fields:expr) => {
        tracing::debug_span!("metric.fetch", subset = %$subset, fields = $fields)
    };
}

/// Span names as constants for programmatic use.
pub mod names {
    pub const CALCULATION: &str = "metric.calculation";
    pub const FETCH: &str = "metric.fetch";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_initialisation_is_a_no_op() {
        let config = ObservabilityConfig::default();
        init_tracing(&config);
        assert!(!init_tracing(&config));
    }

    #[test]
    fn span_macros_carry_their_names() {
        let span = calculation_span!("Awareness", "uk", "Monthly");
        let fetch = fetch_span!("uk", 3usize);
        if let Some(metadata) = span.metadata() {
            assert_eq!(metadata.name(), names::CALCULATION);
        }
        if let Some(metadata) = fetch.metadata() {
            assert_eq!(metadata.name(), names::FETCH);
        }
    }
}
