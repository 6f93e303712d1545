//! Core memory type definitions.
//!
//! Defines [`MemoryItem`] (one durable record), [`MemoryPatch`] (a partial
//! update with absent-vs-null semantics), and the transient diagnostic values
//! returned by reads, health checks, and repair.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

/// Importance assigned when a record carries none.
pub const DEFAULT_IMPORTANCE: f64 = 0.5;

/// A single memory record as stored in the log.
///
/// Records are never rewritten in place — every revision of an `id` is a new
/// appended line, and the latest-wins rule resolves the current value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryItem {
    /// Opaque unique identifier, immutable once assigned (UUID v7).
    pub id: String,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
    /// ISO 8601 timestamp of the last revision.
    pub updated_at: String,
    /// Free-text namespace, trimmed of surrounding whitespace.
    pub scope: String,
    /// Lower-cased, deduplicated tag list (first-seen order preserved).
    pub tags: Vec<String>,
    /// Raw text payload.
    pub content: String,
    /// Derived summary text, `None` until summarization occurs.
    pub summary: Option<String>,
    /// Opaque structured payload, passed through untouched.
    pub metadata: Option<serde_json::Value>,
    /// Relevance weight in `[0.0, 1.0]`.
    pub importance: f64,
    /// Soft-delete flag. History survives until compaction.
    pub deleted: bool,
}

/// A partial update to a [`MemoryItem`].
///
/// Each field is independently markable as "not supplied" (outer `None`,
/// prior value retained). For the nullable fields `summary` and `metadata`,
/// an explicitly supplied JSON `null` deserializes to `Some(None)` and clears
/// the stored value — distinct from omitting the field entirely.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MemoryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub importance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<bool>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_or_null"
    )]
    pub summary: Option<Option<String>>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_or_null"
    )]
    pub metadata: Option<Option<serde_json::Value>>,
}

impl MemoryPatch {
    /// A patch that only soft-deletes.
    pub fn soft_delete() -> Self {
        Self {
            deleted: Some(true),
            ..Self::default()
        }
    }

    /// `true` when no field is supplied at all.
    pub fn is_empty(&self) -> bool {
        self.scope.is_none()
            && self.content.is_none()
            && self.tags.is_none()
            && self.importance.is_none()
            && self.deleted.is_none()
            && self.summary.is_none()
            && self.metadata.is_none()
    }
}

/// Deserializer marking a present field as `Some(...)`, so that an explicit
/// JSON `null` becomes `Some(None)` while an absent field stays `None` via
/// `#[serde(default)]`.
fn present_or_null<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

/// Trim surrounding whitespace from a scope. Case is preserved.
pub fn normalize_scope(scope: &str) -> String {
    scope.trim().to_string()
}

/// Lower-case, trim, and deduplicate tags, keeping first-seen order.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

/// Clamp importance into `[0.0, 1.0]`; non-finite values fall back to the
/// default.
pub fn clamp_importance(importance: f64) -> f64 {
    if importance.is_finite() {
        importance.clamp(0.0, 1.0)
    } else {
        DEFAULT_IMPORTANCE
    }
}

// ── Transient diagnostic values ──────────────────────────────────────────────

/// A line-scoped parse or validation failure found while reading the log.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineDiagnostic {
    /// 1-based line number in the log file.
    pub line_number: usize,
    /// Human-readable decode or validation error.
    pub error: String,
    /// The offending raw line.
    pub raw: String,
}

/// Aggregate physical statistics from a full log read.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadStats {
    pub total_lines: usize,
    pub empty_lines: usize,
    pub valid_lines: usize,
    pub invalid_lines: usize,
    pub bytes: u64,
}

/// Outcome of a health check over the log.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResult {
    pub stats: ReadStats,
    /// Number of distinct, latest-resolved items.
    pub latest_items: usize,
    /// Valid lines per latest item, once enough lines exist to be meaningful.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_ratio: Option<f64>,
    pub compaction_recommended: bool,
    /// Discrete trigger tags: `line-ratio`, `max-bytes`, `invalid-lines`.
    pub reasons: Vec<String>,
}

/// Outcome of a repair pass over the log.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairResult {
    /// Whether the primary log was rewritten.
    pub repaired: bool,
    pub stats: ReadStats,
    /// Side file holding the corrupt lines, when quarantine was requested and
    /// corruption was found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quarantine_path: Option<PathBuf>,
    /// Timestamped copy of the log prior to the rewrite.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<PathBuf>,
}

/// Outcome of a compaction.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompactResult {
    /// Number of latest-view records written to the new log.
    pub items_kept: usize,
    /// Timestamped copy of the log prior to the rewrite.
    pub backup_path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_tags_dedups_and_lowercases() {
        let tags = normalize_tags(["Rust", "  rust ", "CLI", "cli", ""]);
        assert_eq!(tags, vec!["rust", "cli"]);
    }

    #[test]
    fn clamp_importance_bounds() {
        assert_eq!(clamp_importance(1.7), 1.0);
        assert_eq!(clamp_importance(-0.2), 0.0);
        assert_eq!(clamp_importance(0.42), 0.42);
        assert_eq!(clamp_importance(f64::NAN), DEFAULT_IMPORTANCE);
    }

    #[test]
    fn patch_absent_vs_null() {
        // Absent summary — keep prior value
        let patch: MemoryPatch = serde_json::from_str(r#"{"content":"x"}"#).unwrap();
        assert!(patch.summary.is_none());
        assert_eq!(patch.content.as_deref(), Some("x"));

        // Explicit null summary — clear it
        let patch: MemoryPatch = serde_json::from_str(r#"{"summary":null}"#).unwrap();
        assert_eq!(patch.summary, Some(None));

        // Explicit value
        let patch: MemoryPatch = serde_json::from_str(r#"{"summary":"short"}"#).unwrap();
        assert_eq!(patch.summary, Some(Some("short".to_string())));
    }

    #[test]
    fn empty_patch_detected() {
        let patch: MemoryPatch = serde_json::from_str("{}").unwrap();
        assert!(patch.is_empty());
        assert!(!MemoryPatch::soft_delete().is_empty());
    }
}
