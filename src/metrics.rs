//! Prometheus metrics collection for dealport.
//!
//! Tracks controller transitions, context acquisition, the change-flush
//! pipeline and remote update delivery.
//!
//! - `dealport_transitions_total{state}` - Controller states entered
//! - `dealport_transition_duration_seconds{target}` - Transition latency histogram
//! - `dealport_flushes_total{outcome}` - Change flushes by outcome
//! - `dealport_operations_submitted_total` - Field operations accepted by the store

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Counters (monotonic increasing)
// ========================================================================

/// Controller states entered, by state segment.
pub static TRANSITIONS: OnceLock<IntCounterVec> = OnceLock::new();

/// Transitions aborted by a failing `enter`, by error code.
pub static TRANSITION_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

/// Context acquisitions by result (`ok`, or an error code).
pub static ACQUISITIONS: OnceLock<IntCounterVec> = OnceLock::new();

/// Change flushes by outcome (`saved`, `partial`, `empty`).
pub static FLUSHES: OnceLock<IntCounterVec> = OnceLock::new();

/// Field operations accepted by the collaborative store.
pub static OPERATIONS_SUBMITTED: OnceLock<IntCounter> = OnceLock::new();

/// Dirty items dropped because their context was missing.
pub static MISSING_CONTEXTS: OnceLock<IntCounter> = OnceLock::new();

/// Remote updates applied to a mounted view, by target (`grid`, `detail`).
pub static REMOTE_UPDATES: OnceLock<IntCounterVec> = OnceLock::new();

/// Named entities pointing at a record that does not exist.
pub static RESOLUTION_INCONSISTENCIES: OnceLock<IntCounter> = OnceLock::new();

// ========================================================================
// Gauges (can increase/decrease)
// ========================================================================

/// Saves currently in flight.
pub static PENDING_SAVES: OnceLock<IntGauge> = OnceLock::new();

// ========================================================================
// Histograms
// ========================================================================

/// Transition latency by target state path.
pub static TRANSITION_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Must be called once at startup before any metrics are recorded. Recording
/// before `init` is a silent no-op.
pub fn init() {
    let r = registry();

    // Helper macro to register metric
    macro_rules! register {
        ($metric:ident, $init:expr) => {
            let m = $init.expect(concat!(stringify!($metric), " creation failed"));
            if let Err(e) = r.register(Box::new(m.clone())) {
                tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
            }
            let _ = $metric.set(m);
        };
    }

    register!(TRANSITIONS, IntCounterVec::new(Opts::new("dealport_transitions_total", "Controller states entered"), &["state"]));
    register!(TRANSITION_ERRORS, IntCounterVec::new(Opts::new("dealport_transition_errors_total", "Transitions aborted by a failing enter"), &["error"]));
    register!(ACQUISITIONS, IntCounterVec::new(Opts::new("dealport_acquisitions_total", "Collaborative context acquisitions"), &["result"]));
    register!(FLUSHES, IntCounterVec::new(Opts::new("dealport_flushes_total", "Change flushes by outcome"), &["outcome"]));
    register!(OPERATIONS_SUBMITTED, IntCounter::new("dealport_operations_submitted_total", "Field operations accepted by the store"));
    register!(MISSING_CONTEXTS, IntCounter::new("dealport_missing_contexts_total", "Dirty items dropped for lack of a context"));
    register!(REMOTE_UPDATES, IntCounterVec::new(Opts::new("dealport_remote_updates_total", "Remote updates applied to the page view"), &["target"]));
    register!(RESOLUTION_INCONSISTENCIES, IntCounter::new("dealport_resolution_inconsistencies_total", "Named entities referencing a missing record"));
    register!(PENDING_SAVES, IntGauge::new("dealport_pending_saves", "Saves currently in flight"));
    register!(TRANSITION_LATENCY, HistogramVec::new(
        HistogramOpts::new("dealport_transition_duration_seconds", "Controller transition latency")
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        &["target"]));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

// ============================================================================
// Helper functions
// ============================================================================

/// Record a controller entering `state`.
#[inline]
pub fn record_transition(state: &str) {
    if let Some(c) = TRANSITIONS.get() {
        c.with_label_values(&[state]).inc();
    }
}

#[inline]
pub fn record_transition_error(error: &str) {
    if let Some(c) = TRANSITION_ERRORS.get() {
        c.with_label_values(&[error]).inc();
    }
}

#[inline]
pub fn record_transition_latency(target: &str, duration_secs: f64) {
    if let Some(h) = TRANSITION_LATENCY.get() {
        h.with_label_values(&[target]).observe(duration_secs);
    }
}

#[inline]
pub fn record_acquisition(result: &str) {
    if let Some(c) = ACQUISITIONS.get() {
        c.with_label_values(&[result]).inc();
    }
}

#[inline]
pub fn record_flush(outcome: &str) {
    if let Some(c) = FLUSHES.get() {
        c.with_label_values(&[outcome]).inc();
    }
}

#[inline]
pub fn record_operations(count: usize) {
    if let Some(c) = OPERATIONS_SUBMITTED.get() {
        c.inc_by(count as u64);
    }
}

#[inline]
pub fn record_missing_context() {
    if let Some(c) = MISSING_CONTEXTS.get() {
        c.inc();
    }
}

#[inline]
pub fn record_remote_update(target: &str) {
    if let Some(c) = REMOTE_UPDATES.get() {
        c.with_label_values(&[target]).inc();
    }
}

#[inline]
pub fn record_inconsistency() {
    if let Some(c) = RESOLUTION_INCONSISTENCIES.get() {
        c.inc();
    }
}

#[inline]
pub fn set_pending_saves(count: usize) {
    if let Some(g) = PENDING_SAVES.get() {
        g.set(count as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_lifecycle() {
        init();

        record_transition("home");
        record_transition_latency("page/home/none", 0.001);
        record_flush("saved");
        record_operations(3);

        let output = gather_metrics();
        assert!(output.contains("dealport_transitions_total"));
        assert!(output.contains("dealport_operations_submitted_total"));
    }
}
