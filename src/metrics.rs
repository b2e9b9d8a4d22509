//! Observability hooks.
//!
//! With the `metrics` feature, [`METRICS`] records query counts, failures and
//! durations through the global OpenTelemetry meter; install a meter provider
//! (Prometheus exporter, OTLP, ...) in the application to collect them.
//! With the `tracing` feature, [`tracing_helpers`] builds the spans the
//! executor and connection code enter.

#[cfg(feature = "metrics")]
pub use self::otel::{LifelineMetrics, METRICS};

#[cfg(feature = "metrics")]
mod otel {
    use once_cell::sync::Lazy;
    use opentelemetry::{
        global,
        metrics::{Counter, Histogram},
    };
    use std::time::Duration;

    pub static METRICS: Lazy<LifelineMetrics> = Lazy::new(LifelineMetrics::init);

    pub struct LifelineMetrics {
        pub queries_total: Counter<u64>,
        pub query_failures_total: Counter<u64>,
        pub query_duration: Histogram<f64>,
    }

    impl LifelineMetrics {
        pub fn init() -> Self {
            let meter = global::meter("lifeline");

            let queries_total = meter
                .u64_counter("lifeline_queries_total")
                .with_description("Total statements executed")
                .build();

            let query_failures_total = meter
                .u64_counter("lifeline_query_failures_total")
                .with_description("Statements that finished with an error state")
                .build();

            let query_duration = meter
                .f64_histogram("lifeline_query_duration_seconds")
                .with_description("Duration of prepare, bind and execute")
                .build();

            Self {
                queries_total,
                query_failures_total,
                query_duration,
            }
        }

        pub fn record_query(&self, elapsed: Duration) {
            self.queries_total.add(1, &[]);
            self.query_duration.record(elapsed.as_secs_f64(), &[]);
        }

        pub fn record_query_error(&self) {
            self.query_failures_total.add(1, &[]);
        }
    }

}

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::Span;

    pub fn execute_query_span(query: &str) -> Span {
        tracing::debug_span!("lifeline.execute_query", db.statement = %query)
    }

    pub fn acquire_connection_span(driver: &str) -> Span {
        tracing::debug_span!("lifeline.connect", db.system = %driver)
    }
}
