//! Core memory engine: durable log, file lock, derived index, retrieval
//! scoring, and prune/summarize policies.

pub mod engine;
pub mod index;
pub mod lock;
pub mod log;
pub mod prune;
pub mod schema;
pub mod search;
pub mod types;

use chrono::{DateTime, Utc};

use types::MemoryItem;

/// Current time as an RFC 3339 string, the format every record stores.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

/// Lenient instant parse. Returns `None` for anything chrono cannot read.
pub fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// The timestamp that orders a record: `updatedAt`, falling back to
/// `createdAt`, falling back to the Unix epoch when neither parses.
pub fn resolved_timestamp(item: &MemoryItem) -> DateTime<Utc> {
    parse_instant(&item.updated_at)
        .or_else(|| parse_instant(&item.created_at))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Age of a timestamp in fractional days relative to `now`, floored at zero.
pub fn age_days(ts: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let secs = (now - ts).num_milliseconds() as f64 / 1000.0;
    (secs / 86_400.0).max(0.0)
}
