//! Metrics for the USSD dialog path.

use metrics::{describe_counter, describe_histogram};

// === Metric Name Constants ===

/// Turns processed counter metric name.
pub const METRIC_TURNS: &str = "ussd_turns_total";
/// Sessions created counter metric name.
pub const METRIC_SESSIONS_CREATED: &str = "ussd_sessions_created_total";
/// Sessions closed by the user counter metric name.
pub const METRIC_SESSIONS_CLOSED: &str = "ussd_sessions_closed_total";
/// Sessions terminated on invalid input or failure counter metric name.
pub const METRIC_SESSIONS_INVALID: &str = "ussd_sessions_invalid_total";
/// Sessions purged by the expiry sweep counter metric name.
pub const METRIC_SESSIONS_EXPIRED: &str = "ussd_sessions_expired_total";
/// BMI records persisted counter metric name.
pub const METRIC_RECORDS_SAVED: &str = "bmi_records_saved_total";
/// Turn latency histogram metric name.
pub const METRIC_TURN_LATENCY: &str = "ussd_turn_latency_ms";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    describe_counter!(METRIC_TURNS, "USSD turns processed");
    describe_counter!(METRIC_SESSIONS_CREATED, "Sessions created");
    describe_counter!(METRIC_SESSIONS_CLOSED, "Sessions closed by the user");
    describe_counter!(
        METRIC_SESSIONS_INVALID,
        "Sessions terminated on invalid input or internal failure"
    );
    describe_counter!(METRIC_SESSIONS_EXPIRED, "Sessions purged by the expiry sweep");
    describe_counter!(METRIC_RECORDS_SAVED, "BMI records persisted");
    describe_histogram!(METRIC_TURN_LATENCY, "Turn processing latency in milliseconds");
}
