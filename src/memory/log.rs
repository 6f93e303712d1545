//! Durable log and latest-record resolution.
//!
//! [`MemoryLog`] maintains an append-only sequence of newline-delimited JSON
//! records. Reads are corruption-tolerant: a line that fails to decode or
//! validate becomes a line-numbered diagnostic, never a fatal error. Writes
//! go through the cooperative file lock; full rewrites (compaction, repair)
//! use a write-temp → rename-to-backup → rename-into-place sequence so the
//! primary path always holds a complete file.

use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::lock::{with_path_lock, LockOptions};
use super::schema::{describe, validate_record};
use super::types::{
    clamp_importance, normalize_scope, normalize_tags, CompactResult, HealthResult,
    LineDiagnostic, MemoryItem, MemoryPatch, ReadStats, RepairResult, DEFAULT_IMPORTANCE,
};
use super::{now_rfc3339, resolved_timestamp};
use crate::config::MaintenanceConfig;
use crate::error::{MemoryError, Result};

/// Everything a full read produces.
#[derive(Debug)]
pub struct ReadOutcome {
    pub items: Vec<MemoryItem>,
    pub diagnostics: Vec<LineDiagnostic>,
    pub stats: ReadStats,
}

/// The latest-resolved view: one current record per identity.
#[derive(Debug)]
pub struct LatestView {
    pub items: HashMap<String, MemoryItem>,
    pub diagnostics: Vec<LineDiagnostic>,
}

/// Options for [`MemoryLog::repair`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RepairOptions {
    /// Also compact to the latest view while rewriting.
    pub compact: bool,
    /// Write corrupt lines to a timestamped side file.
    pub quarantine: bool,
}

/// Append-only JSON-lines store at a configured path.
#[derive(Debug, Clone)]
pub struct MemoryLog {
    path: PathBuf,
    lock: LockOptions,
}

impl MemoryLog {
    /// Open the log, creating parent directories and an empty file on first
    /// use.
    pub fn open(path: impl Into<PathBuf>, lock: LockOptions) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        if !path.exists() {
            fs::write(&path, b"")?;
        }
        Ok(Self { path, lock })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // ── Reading ──────────────────────────────────────────────────────────────

    /// Read every line, skipping blanks and reporting corrupt lines as
    /// diagnostics.
    pub fn read_all(&self) -> Result<ReadOutcome> {
        let raw = fs::read_to_string(&self.path)?;
        let bytes = raw.len() as u64;

        let mut items = Vec::new();
        let mut diagnostics = Vec::new();
        let mut stats = ReadStats {
            bytes,
            ..ReadStats::default()
        };

        for (index, line) in raw.lines().enumerate() {
            stats.total_lines += 1;
            if line.trim().is_empty() {
                stats.empty_lines += 1;
                continue;
            }
            match parse_line(line) {
                Ok(item) => {
                    stats.valid_lines += 1;
                    items.push(item);
                }
                Err(error) => {
                    stats.invalid_lines += 1;
                    diagnostics.push(LineDiagnostic {
                        line_number: index + 1,
                        error,
                        raw: line.to_string(),
                    });
                }
            }
        }

        Ok(ReadOutcome {
            items,
            diagnostics,
            stats,
        })
    }

    /// Resolve one current record per identity: greatest resolved timestamp
    /// wins, with an exact tie going to the record later in the scan.
    pub fn resolve_latest(&self) -> Result<LatestView> {
        let outcome = self.read_all()?;
        Ok(LatestView {
            items: resolve_from(outcome.items),
            diagnostics: outcome.diagnostics,
        })
    }

    /// Latest view as a list, ordered by each identity's first appearance in
    /// the log. Policy passes (prune, index builds) depend on this order
    /// being the log's physical order.
    pub fn latest_in_order(&self) -> Result<Vec<MemoryItem>> {
        let outcome = self.read_all()?;
        let mut order: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for item in &outcome.items {
            if seen.insert(item.id.clone()) {
                order.push(item.id.clone());
            }
        }
        let mut latest = resolve_from(outcome.items);
        Ok(order
            .into_iter()
            .filter_map(|id| latest.remove(&id))
            .collect())
    }

    // ── Appending ────────────────────────────────────────────────────────────

    /// Create a new item and append it. Fails on empty scope or content
    /// before anything is written.
    pub fn add(
        &self,
        scope: &str,
        content: &str,
        tags: Vec<String>,
        metadata: Option<serde_json::Value>,
        importance: Option<f64>,
    ) -> Result<MemoryItem> {
        let scope = normalize_scope(scope);
        if scope.is_empty() {
            return Err(MemoryError::Validation("scope must not be empty".into()));
        }
        if content.trim().is_empty() {
            return Err(MemoryError::Validation("content must not be empty".into()));
        }

        let now = now_rfc3339();
        let item = MemoryItem {
            id: uuid::Uuid::now_v7().to_string(),
            created_at: now.clone(),
            updated_at: now,
            scope,
            tags: normalize_tags(tags),
            content: content.to_string(),
            summary: None,
            metadata,
            importance: clamp_importance(importance.unwrap_or(DEFAULT_IMPORTANCE)),
            deleted: false,
        };

        with_path_lock(&self.path, &self.lock, || self.append_line(&item))?;
        tracing::debug!(id = %item.id, scope = %item.scope, "memory appended");
        Ok(item)
    }

    /// Merge a patch onto the latest record for `id` and append the result as
    /// a new revision. Patch fields that are absent keep the prior value; an
    /// explicit null for `summary`/`metadata` clears it.
    pub fn update(&self, id: &str, patch: &MemoryPatch) -> Result<MemoryItem> {
        if id.trim().is_empty() {
            return Err(MemoryError::Validation("id must not be empty".into()));
        }
        if patch.is_empty() {
            return Err(MemoryError::Validation(
                "patch must supply at least one field".into(),
            ));
        }

        with_path_lock(&self.path, &self.lock, || {
            let view = self.resolve_latest()?;
            let mut item = view
                .items
                .get(id)
                .cloned()
                .ok_or_else(|| MemoryError::NotFound(id.to_string()))?;

            if let Some(scope) = &patch.scope {
                let scope = normalize_scope(scope);
                if scope.is_empty() {
                    return Err(MemoryError::Validation("scope must not be empty".into()));
                }
                item.scope = scope;
            }
            if let Some(content) = &patch.content {
                if content.trim().is_empty() {
                    return Err(MemoryError::Validation("content must not be empty".into()));
                }
                item.content = content.clone();
            }
            if let Some(tags) = &patch.tags {
                item.tags = normalize_tags(tags);
            }
            if let Some(importance) = patch.importance {
                item.importance = clamp_importance(importance);
            }
            if let Some(deleted) = patch.deleted {
                item.deleted = deleted;
            }
            if let Some(summary) = &patch.summary {
                item.summary = summary.clone();
            }
            if let Some(metadata) = &patch.metadata {
                item.metadata = metadata.clone();
            }
            item.updated_at = now_rfc3339();

            self.append_line(&item)?;
            Ok(item)
        })
    }

    /// Soft delete: an appended revision with `deleted = true`.
    pub fn delete(&self, id: &str) -> Result<MemoryItem> {
        self.update(id, &MemoryPatch::soft_delete())
    }

    /// Append one serialized record. A single write call, so the line is
    /// atomic with respect to readers of complete files.
    fn append_line(&self, item: &MemoryItem) -> Result<()> {
        let mut line = serde_json::to_string(item)?;
        line.push('\n');
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    // ── Rewriting ────────────────────────────────────────────────────────────

    /// Rewrite the log to contain only the latest view.
    ///
    /// Writes a temp sibling, renames the existing log to a timestamped
    /// backup, then renames the temp into place — at every instant the
    /// primary path holds either the full old or full new content.
    pub fn compact(&self) -> Result<CompactResult> {
        with_path_lock(&self.path, &self.lock, || {
            let view = self.resolve_latest()?;
            let mut items: Vec<&MemoryItem> = view.items.values().collect();
            items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

            let mut body = String::new();
            for item in &items {
                body.push_str(&serde_json::to_string(item)?);
                body.push('\n');
            }

            let backup_path = self.replace_with(&body)?;
            tracing::info!(
                kept = items.len(),
                backup = %backup_path.display(),
                "log compacted"
            );
            Ok(CompactResult {
                items_kept: items.len(),
                backup_path,
            })
        })
    }

    /// Re-parse every line, optionally quarantine corrupt entries, and
    /// rewrite the log when corruption was found or compaction requested.
    pub fn repair(&self, options: RepairOptions) -> Result<RepairResult> {
        with_path_lock(&self.path, &self.lock, || {
            let raw = fs::read_to_string(&self.path)?;
            let mut stats = ReadStats {
                bytes: raw.len() as u64,
                ..ReadStats::default()
            };
            let mut valid_lines: Vec<&str> = Vec::new();
            let mut items: Vec<MemoryItem> = Vec::new();
            let mut corrupt: Vec<LineDiagnostic> = Vec::new();

            for (index, line) in raw.lines().enumerate() {
                stats.total_lines += 1;
                if line.trim().is_empty() {
                    stats.empty_lines += 1;
                    continue;
                }
                match parse_line(line) {
                    Ok(item) => {
                        stats.valid_lines += 1;
                        valid_lines.push(line);
                        items.push(item);
                    }
                    Err(error) => {
                        stats.invalid_lines += 1;
                        corrupt.push(LineDiagnostic {
                            line_number: index + 1,
                            error,
                            raw: line.to_string(),
                        });
                    }
                }
            }

            let quarantine_path = if options.quarantine && !corrupt.is_empty() {
                let path = timestamped_sibling(&self.path, "quarantine", "jsonl");
                let mut body = String::new();
                for entry in &corrupt {
                    body.push_str(&serde_json::to_string(entry)?);
                    body.push('\n');
                }
                fs::write(&path, body)?;
                tracing::warn!(
                    lines = corrupt.len(),
                    path = %path.display(),
                    "corrupt lines quarantined"
                );
                Some(path)
            } else {
                None
            };

            let needs_rewrite = stats.invalid_lines > 0 || options.compact;
            let backup_path = if needs_rewrite {
                let body = if options.compact {
                    let mut latest: Vec<MemoryItem> =
                        resolve_from(items).into_values().collect();
                    latest.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
                    let mut body = String::new();
                    for item in &latest {
                        body.push_str(&serde_json::to_string(item)?);
                        body.push('\n');
                    }
                    body
                } else {
                    // Repair-only: keep the valid lines byte-for-byte.
                    let mut body = valid_lines.join("\n");
                    if !body.is_empty() {
                        body.push('\n');
                    }
                    body
                };
                Some(self.replace_with(&body)?)
            } else {
                None
            };

            Ok(RepairResult {
                repaired: needs_rewrite,
                stats,
                quarantine_path,
                backup_path,
            })
        })
    }

    /// Diagnose the log's physical condition and flag when compaction is
    /// worthwhile. Reasons are discrete tags so callers can react per
    /// trigger.
    pub fn health(&self, config: &MaintenanceConfig) -> Result<HealthResult> {
        let outcome = self.read_all()?;
        let latest_items = resolve_from(outcome.items).len();

        let line_ratio = if outcome.stats.valid_lines >= config.min_lines && latest_items > 0 {
            Some(outcome.stats.valid_lines as f64 / latest_items as f64)
        } else {
            None
        };

        let mut reasons = Vec::new();
        if line_ratio.is_some_and(|ratio| ratio >= config.max_line_ratio) {
            reasons.push("line-ratio".to_string());
        }
        if outcome.stats.bytes > config.max_bytes {
            reasons.push("max-bytes".to_string());
        }
        if outcome.stats.invalid_lines > 0 {
            reasons.push("invalid-lines".to_string());
        }

        Ok(HealthResult {
            stats: outcome.stats,
            latest_items,
            line_ratio,
            compaction_recommended: !reasons.is_empty(),
            reasons,
        })
    }

    /// Swap in new content atomically: temp file, backup rename, final
    /// rename. Returns the backup path.
    fn replace_with(&self, body: &str) -> Result<PathBuf> {
        let temp_path = timestamped_sibling(&self.path, "tmp", "jsonl");
        let backup_path = timestamped_sibling(&self.path, "backup", "bak");

        fs::write(&temp_path, body)?;
        fs::rename(&self.path, &backup_path)?;
        fs::rename(&temp_path, &self.path)?;
        Ok(backup_path)
    }
}

/// Decode and validate one non-blank line.
fn parse_line(line: &str) -> std::result::Result<MemoryItem, String> {
    let value: serde_json::Value =
        serde_json::from_str(line).map_err(|err| format!("invalid JSON: {err}"))?;
    validate_record(&value).map_err(|errors| describe(&errors))
}

/// Latest-wins fold over records in scan order. A strictly greater resolved
/// timestamp replaces; an exact tie also replaces, so the later record wins.
fn resolve_from(items: Vec<MemoryItem>) -> HashMap<String, MemoryItem> {
    let mut latest: HashMap<String, MemoryItem> = HashMap::new();
    for item in items {
        match latest.get(&item.id) {
            Some(existing) if resolved_timestamp(&item) < resolved_timestamp(existing) => {}
            _ => {
                latest.insert(item.id.clone(), item);
            }
        }
    }
    latest
}

/// `<path>.<label>.<UTC stamp>.<ext>` next to the log.
fn timestamped_sibling(path: &Path, label: &str, ext: &str) -> PathBuf {
    let stamp = Utc::now().format("%Y%m%dT%H%M%S%3f");
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".{label}.{stamp}.{ext}"));
    PathBuf::from(name)
}
