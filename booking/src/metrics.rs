//! Business metrics for the booking engine.
//!
//! Uses the `metrics` facade; installing an exporter is left to the host process.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `booking_admissions_total{outcome}` - Submissions by outcome
//!   (pending, request, waitlisted, promoted)
//! - `booking_rejections_total{reason}` - Refused submissions by error code
//! - `booking_rate_limited_total{class}` - New blocks issued by the rate limiter
//! - `booking_transitions_total{to}` - Lifecycle transitions by target status (plus `deleted`)
//! - `booking_capacity_overrides_total{overbooked}` - Override writes, split by overbooking warning

use crate::rate_limiter::LimitClass;
use metrics::describe_counter;

/// Initialize and register all booking metric descriptions.
///
/// Call once at startup, before any metrics are recorded.
pub fn register_booking_metrics() {
    describe_counter!(
        "booking_admissions_total",
        "Total number of admitted submissions by outcome (pending, request, waitlisted, promoted)"
    );
    describe_counter!(
        "booking_rejections_total",
        "Total number of refused submissions by reason"
    );
    describe_counter!(
        "booking_rate_limited_total",
        "Total number of rate limit blocks by limit class"
    );
    describe_counter!(
        "booking_transitions_total",
        "Total number of reservation lifecycle transitions by target status"
    );
    describe_counter!(
        "booking_capacity_overrides_total",
        "Total number of capacity override writes, labelled by whether they overbook"
    );

    tracing::info!("Booking metrics registered");
}

/// Record an admission outcome.
pub fn record_admission(outcome: &'static str) {
    metrics::counter!("booking_admissions_total", "outcome" => outcome).increment(1);
    tracing::debug!(outcome, "Recorded admission metric");
}

/// Record a refused submission.
///
/// # Arguments
///
/// * `reason` - Error code, see [`crate::error::BookingError::code`]
pub fn record_rejection(reason: &'static str) {
    metrics::counter!("booking_rejections_total", "reason" => reason).increment(1);
    tracing::debug!(reason, "Recorded rejection metric");
}

/// Record a new rate limit block.
pub fn record_rate_limited(class: LimitClass) {
    metrics::counter!("booking_rate_limited_total", "class" => class.as_str()).increment(1);
}

/// Record a lifecycle transition.
pub fn record_transition(to: &'static str) {
    metrics::counter!("booking_transitions_total", "to" => to).increment(1);
    tracing::debug!(to, "Recorded transition metric");
}

/// Record a capacity override write.
pub fn record_capacity_override(overbooked: bool) {
    let label = if overbooked { "true" } else { "false" };
    metrics::counter!("booking_capacity_overrides_total", "overbooked" => label).increment(1);
}
