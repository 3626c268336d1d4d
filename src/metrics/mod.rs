//! Metrics collection for observability

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec_with_registry, register_counter_with_registry,
    register_histogram_vec_with_registry, Counter, CounterVec, HistogramVec, Opts, Registry,
};
use std::sync::Arc;

/// Global metrics registry
pub static METRICS: Lazy<Arc<Metrics>> =
    Lazy::new(|| Arc::new(Metrics::new().expect("Failed to initialize metrics")));

/// Metrics collector
pub struct Metrics {
    registry: Registry,

    // Question pipeline metrics
    pub questions_total: CounterVec,
    pub intent_fallbacks: CounterVec,
    pub followup_rewrites: Counter,

    // Retrieval metrics
    pub graph_degradations: CounterVec,
    pub vector_degradations: Counter,
    pub retrieval_duration: HistogramVec,

    // Collaborator metrics
    pub llm_requests: CounterVec,
    pub embedding_requests: CounterVec,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let registry = Registry::new();

        let questions_total = register_counter_vec_with_registry!(
            Opts::new("questions_total", "Total questions handled"),
            &["intent"],
            registry
        )?;

        let intent_fallbacks = register_counter_vec_with_registry!(
            Opts::new(
                "intent_fallbacks_total",
                "Intent classifications that fell back to keyword rules"
            ),
            &["reason"],
            registry
        )?;

        let followup_rewrites = register_counter_with_registry!(
            Opts::new("followup_rewrites_total", "Total follow-up question rewrites"),
            registry
        )?;

        let graph_degradations = register_counter_vec_with_registry!(
            Opts::new(
                "graph_degradations_total",
                "Graph lookups degraded to empty evidence"
            ),
            &["operation"],
            registry
        )?;

        let vector_degradations = register_counter_with_registry!(
            Opts::new(
                "vector_degradations_total",
                "Vector searches degraded to empty evidence"
            ),
            registry
        )?;

        let retrieval_duration = register_histogram_vec_with_registry!(
            "retrieval_duration_seconds",
            "Retrieval stage duration in seconds",
            &["stage"],
            registry
        )?;

        let llm_requests = register_counter_vec_with_registry!(
            Opts::new("llm_requests_total", "Total language-model requests"),
            &["operation", "status"],
            registry
        )?;

        let embedding_requests = register_counter_vec_with_registry!(
            Opts::new("embedding_requests_total", "Total embedding requests"),
            &["status"],
            registry
        )?;

        Ok(Self {
            registry,
            questions_total,
            intent_fallbacks,
            followup_rewrites,
            graph_degradations,
            vector_degradations,
            retrieval_duration,
            llm_requests,
            embedding_requests,
        })
    }

    /// Prometheus registry for exposition
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_initialization() {
        let metrics = Metrics::new().unwrap();
        metrics.questions_total.with_label_values(&["rbi_query"]).inc();
        metrics.graph_degradations.with_label_values(&["related"]).inc();

        let families = metrics.registry().gather();
        assert!(!families.is_empty());
    }

    #[test]
    fn test_global_metrics() {
        METRICS.followup_rewrites.inc();
        assert!(METRICS.followup_rewrites.get() >= 1.0);
    }
}
