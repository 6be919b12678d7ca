//! Prometheus metrics for the loop operator.
//!
//! Covers:
//! - Loop-cycle step outcomes and latency
//! - Sequence outcomes
//! - Trade wizard submissions and validation rejects
//! - Degraded venue reads
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration fails,
//! it indicates a fatal configuration error (e.g., duplicate metric names)
//! that should cause an immediate crash at startup rather than silent failure.
//! These panics only occur during static initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_gauge, CounterVec, Encoder,
    HistogramVec, IntGauge, TextEncoder,
};

use crate::error::TelemetryResult;

/// Step outcomes.
/// Labels: step, result (submitted/confirmed/failed)
pub static STEP_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "delpho_step_total",
        "Loop-cycle step outcomes",
        &["step", "result"]
    )
    .unwrap()
});

/// Time from step start to receipt confirmation.
pub static STEP_LATENCY_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "delpho_step_latency_ms",
        "Loop-cycle step latency in milliseconds (start to confirmation)",
        &["step"],
        vec![250.0, 500.0, 1000.0, 2000.0, 5000.0, 10000.0, 30000.0, 60000.0, 120000.0]
    )
    .unwrap()
});

/// Sequence outcomes.
/// Labels: outcome (done/aborted/cancelled)
pub static SEQUENCE_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "delpho_sequence_total",
        "Loop-cycle sequence outcomes",
        &["outcome"]
    )
    .unwrap()
});

/// Sequences currently running.
pub static SEQUENCE_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("delpho_sequence_running", "Loop-cycle sequences in flight").unwrap()
});

/// Wizard submissions.
/// Labels: form (swap/transfer/open_position/close_position), result
pub static WIZARD_SUBMIT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "delpho_wizard_submit_total",
        "Trade wizard submissions",
        &["form", "result"]
    )
    .unwrap()
});

/// Inputs rejected before any network call.
pub static VALIDATION_REJECTED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "delpho_validation_rejected_total",
        "Trade parameters rejected by local validation",
        &["reason"]
    )
    .unwrap()
});

/// Venue state slices that fell back to defaults.
pub static VENUE_SLICE_DEGRADED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "delpho_venue_slice_degraded_total",
        "Complete-state slices replaced by defaults after a failed read",
        &["slice"]
    )
    .unwrap()
});

/// Metrics facade.
pub struct Metrics;

impl Metrics {
    pub fn step_submitted(step: &str) {
        STEP_TOTAL.with_label_values(&[step, "submitted"]).inc();
    }

    /// Record a confirmed step and its latency.
    pub fn step_confirmed(step: &str, latency_ms: f64) {
        STEP_TOTAL.with_label_values(&[step, "confirmed"]).inc();
        STEP_LATENCY_MS.with_label_values(&[step]).observe(latency_ms);
    }

    pub fn step_failed(step: &str) {
        STEP_TOTAL.with_label_values(&[step, "failed"]).inc();
    }

    pub fn sequence_started() {
        SEQUENCE_RUNNING.inc();
    }

    /// Record a finished sequence (`done`, `aborted` or `cancelled`).
    pub fn sequence_finished(outcome: &str) {
        SEQUENCE_RUNNING.dec();
        SEQUENCE_TOTAL.with_label_values(&[outcome]).inc();
    }

    pub fn wizard_submitted(form: &str, ok: bool) {
        let result = if ok { "ok" } else { "error" };
        WIZARD_SUBMIT_TOTAL.with_label_values(&[form, result]).inc();
    }

    pub fn validation_rejected(reason: &str) {
        VALIDATION_REJECTED_TOTAL.with_label_values(&[reason]).inc();
    }

    pub fn venue_slice_degraded(slice: &str) {
        VENUE_SLICE_DEGRADED_TOTAL.with_label_values(&[slice]).inc();
    }

    /// Render every registered metric in the Prometheus text format.
    pub fn render() -> TelemetryResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
