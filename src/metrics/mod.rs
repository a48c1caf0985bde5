// Private module declaration
mod server;

use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry,
};

// Re-export for public API
pub use server::start_metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for the order workflow
// ============================================================================
//
// Provides metrics for:
// - Orders created and items composed
// - Lifecycle transitions by name
// - Ticket and item edits by event type
// - Rejected order commands by error kind
// - Composition latency (catalog lookups included)
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

/// Central metrics registry for the entire application
pub struct Metrics {
    registry: Registry,

    // Order Metrics
    pub orders_created: IntCounter,
    pub order_items_composed: IntCounter,
    pub order_transitions: IntCounterVec,
    pub order_edits: IntCounterVec,
    pub order_commands_rejected: IntCounterVec,

    // Composition Metrics
    pub composition_duration: Histogram,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let orders_created = IntCounter::new(
            "orders_created_total",
            "Total orders created",
        )?;
        registry.register(Box::new(orders_created.clone()))?;

        let order_items_composed = IntCounter::new(
            "order_items_composed_total",
            "Total order item snapshots produced by composition",
        )?;
        registry.register(Box::new(order_items_composed.clone()))?;

        let order_transitions = IntCounterVec::new(
            Opts::new("order_transitions_total", "Accepted lifecycle transitions"),
            &["transition"],
        )?;
        registry.register(Box::new(order_transitions.clone()))?;

        let order_edits = IntCounterVec::new(
            Opts::new("order_edits_total", "Ticket and item changes recorded on existing orders"),
            &["change"],
        )?;
        registry.register(Box::new(order_edits.clone()))?;

        let order_commands_rejected = IntCounterVec::new(
            Opts::new("order_commands_rejected_total", "Order commands rejected by error kind"),
            &["kind"],
        )?;
        registry.register(Box::new(order_commands_rejected.clone()))?;

        let composition_duration = Histogram::with_opts(
            HistogramOpts::new("order_composition_duration_seconds", "Order item composition duration")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        )?;
        registry.register(Box::new(composition_duration.clone()))?;

        Ok(Self {
            registry,
            orders_created,
            order_items_composed,
            order_transitions,
            order_edits,
            order_commands_rejected,
            composition_duration,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Helper to record a successful composition
    pub fn record_composition(&self, items: usize, duration_secs: f64) {
        self.order_items_composed.inc_by(items as u64);
        self.composition_duration.observe(duration_secs);
    }

    pub fn record_order_created(&self) {
        self.orders_created.inc();
    }

    /// Helper to record an accepted lifecycle transition
    pub fn record_transition(&self, transition: &str) {
        self.order_transitions.with_label_values(&[transition]).inc();
    }

    /// One call per event an edit actually emitted
    pub fn record_edit(&self, change: &str) {
        self.order_edits.with_label_values(&[change]).inc();
    }

    /// Helper to record a rejected command
    pub fn record_rejection(&self, kind: &str) {
        self.order_commands_rejected.with_label_values(&[kind]).inc();
    }
}
