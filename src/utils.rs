//! Utility functions shared by the tournament services

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate a new correlation id
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generate a new unique tournament id
pub fn generate_tournament_id() -> Uuid {
    Uuid::new_v4()
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Trim a caller-supplied correlation id, regenerating it when blank.
///
/// The first hop that notices a blank id mints a fresh one; downstream hops
/// apply the same rule again as a fallback, so an id is never blank past the
/// first service even when callers misbehave.
pub fn normalize_correlation_id(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(trimmed) if !trimmed.is_empty() => trimmed.to_string(),
        _ => generate_correlation_id(),
    }
}
