//! The engine facade tying log, index, scorer, and prune policies together.
//!
//! Every operation is synchronous and runs to completion; concurrency only
//! exists across independent processes sharing the same files, mediated by
//! the cooperative lock inside [`MemoryLog`]. Index refreshes happen outside
//! the log's lock and are best-effort — a failed refresh costs retrieval
//! speed, never data, and `rebuild_index` repairs it wholesale.

use chrono::Utc;
use serde::Serialize;
use std::path::PathBuf;

use super::index::MemoryIndex;
use super::log::{MemoryLog, RepairOptions};
use super::prune::{plan_prune, PruneAction, PruneStats};
use super::search::{rank, ScoredItem, SearchQuery};
use super::types::{
    CompactResult, HealthResult, MemoryItem, MemoryPatch, RepairResult,
};
use crate::config::MnemoConfig;
use crate::error::{MemoryError, Result};

/// Outcome of a prune operation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PruneOutcome {
    pub actions: Vec<PruneAction>,
    pub stats: PruneStats,
    pub dry_run: bool,
}

/// Stateless handle over the configured log and index paths.
#[derive(Debug, Clone)]
pub struct MemoryEngine {
    config: MnemoConfig,
    log: MemoryLog,
    index_path: PathBuf,
}

impl MemoryEngine {
    /// Open the engine, ensuring the log file exists.
    pub fn open(config: MnemoConfig) -> Result<Self> {
        let log = MemoryLog::open(config.resolved_log_path(), config.lock.options())?;
        let index_path = config.resolved_index_path();
        Ok(Self {
            config,
            log,
            index_path,
        })
    }

    pub fn config(&self) -> &MnemoConfig {
        &self.config
    }

    pub fn log(&self) -> &MemoryLog {
        &self.log
    }

    // ── Write path ───────────────────────────────────────────────────────────

    /// Append a new memory and patch the index for it.
    pub fn add(
        &self,
        scope: &str,
        content: &str,
        tags: Vec<String>,
        metadata: Option<serde_json::Value>,
        importance: Option<f64>,
    ) -> Result<MemoryItem> {
        let item = self.log.add(scope, content, tags, metadata, importance)?;
        self.refresh_index(std::slice::from_ref(&item));
        Ok(item)
    }

    /// Merge a patch onto the latest record and patch the index.
    pub fn update(&self, id: &str, patch: &MemoryPatch) -> Result<MemoryItem> {
        let item = self.log.update(id, patch)?;
        self.refresh_index(std::slice::from_ref(&item));
        Ok(item)
    }

    /// Soft delete.
    pub fn delete(&self, id: &str) -> Result<MemoryItem> {
        let item = self.log.delete(id)?;
        self.refresh_index(std::slice::from_ref(&item));
        Ok(item)
    }

    // ── Read path ────────────────────────────────────────────────────────────

    /// Latest record for an id, soft-deleted or not.
    pub fn get(&self, id: &str) -> Result<MemoryItem> {
        if id.trim().is_empty() {
            return Err(MemoryError::Validation("id must not be empty".into()));
        }
        let view = self.log.resolve_latest()?;
        view.items
            .get(id)
            .cloned()
            .ok_or_else(|| MemoryError::NotFound(id.to_string()))
    }

    /// Filter the latest view by the query's scope and tags, then score and
    /// rank what remains.
    ///
    /// A requested scope must match exactly; requested tags must overlap the
    /// item's tags in at least one place. When both are present and a usable
    /// index exists, the candidate set is narrowed through the (scope, tag)
    /// buckets first — the filter below makes the two paths return identical
    /// results, so losing the index never changes an answer.
    pub fn search(&self, query: &SearchQuery) -> Result<Vec<ScoredItem>> {
        let latest = self.log.latest_in_order()?;

        let mut effective = query.clone();
        if effective.limit.is_none() {
            effective.limit = Some(self.config.scoring.default_limit);
        }

        let requested_tags: Vec<String> = effective
            .tags
            .iter()
            .map(|t| t.trim().to_lowercase())
            .collect();

        // The index only holds non-deleted items, so it cannot serve queries
        // that ask for deleted ones.
        let narrowed: Option<Vec<String>> = match (&effective.scope, requested_tags.is_empty()) {
            (Some(scope), false) if !effective.include_deleted => {
                let index = MemoryIndex::load(&self.index_path);
                if index.is_empty() {
                    None
                } else {
                    Some(index.candidates_for(scope, &requested_tags))
                }
            }
            _ => None,
        };

        let candidates: Vec<&MemoryItem> = latest
            .iter()
            .filter(|item| match &narrowed {
                Some(ids) => ids.contains(&item.id),
                None => true,
            })
            .filter(|item| match &effective.scope {
                Some(scope) => item.scope == *scope,
                None => true,
            })
            .filter(|item| {
                requested_tags.is_empty()
                    || requested_tags.iter().any(|tag| item.tags.contains(tag))
            })
            .collect();

        Ok(rank(
            candidates,
            &effective,
            &self.config.scoring,
            Utc::now(),
        ))
    }

    // ── Maintenance ──────────────────────────────────────────────────────────

    /// Plan prune actions and, unless `dry_run`, apply each through the
    /// normal update path and refresh the index for the affected ids.
    pub fn prune(&self, scope: Option<&str>, dry_run: bool) -> Result<PruneOutcome> {
        let mut items = self.log.latest_in_order()?;
        if let Some(scope) = scope {
            items.retain(|item| item.scope == scope);
        }

        let (actions, stats) = plan_prune(
            &items,
            &self.config.prune,
            &self.config.summarize,
            Utc::now(),
        );

        if !dry_run && !actions.is_empty() {
            let mut affected = Vec::with_capacity(actions.len());
            for action in &actions {
                affected.push(self.log.update(&action.id, &action.patch)?);
            }
            self.refresh_index(&affected);
            tracing::info!(
                applied = actions.len(),
                deduped = stats.deduped,
                deleted = stats.deleted,
                summarized = stats.summarized,
                "prune applied"
            );
        }

        Ok(PruneOutcome {
            actions,
            stats,
            dry_run,
        })
    }

    /// Rebuild the index wholesale from the log's latest view.
    pub fn rebuild_index(&self) -> Result<MemoryIndex> {
        let latest = self.log.latest_in_order()?;
        let index = MemoryIndex::build(latest.iter());
        index.save(&self.index_path)?;
        tracing::info!(
            scopes = index.by_scope.len(),
            tags = index.by_tag.len(),
            "index rebuilt"
        );
        Ok(index)
    }

    /// Physical log diagnostics.
    pub fn health(&self) -> Result<HealthResult> {
        self.log.health(&self.config.maintenance)
    }

    /// Repair the log, then rebuild the index if the file was rewritten.
    pub fn repair(&self, compact: bool, quarantine: bool) -> Result<RepairResult> {
        let result = self.log.repair(RepairOptions {
            compact,
            quarantine,
        })?;
        if result.repaired {
            if let Err(err) = self.rebuild_index() {
                tracing::warn!(error = %err, "index rebuild after repair failed");
            }
        }
        Ok(result)
    }

    /// Compact the log to its latest view and rebuild the index.
    pub fn compact(&self) -> Result<CompactResult> {
        let result = self.log.compact()?;
        if let Err(err) = self.rebuild_index() {
            tracing::warn!(error = %err, "index rebuild after compaction failed");
        }
        Ok(result)
    }

    /// Incrementally patch the index for just-written items. Best-effort:
    /// the log is the source of truth and a stale index only costs speed.
    fn refresh_index(&self, affected: &[MemoryItem]) {
        let result = (|| -> Result<()> {
            let view = self.log.resolve_latest()?;
            let mut index = MemoryIndex::load(&self.index_path);
            index.apply_update(affected, &view.items);
            index.save(&self.index_path)
        })();
        if let Err(err) = result {
            tracing::warn!(error = %err, "incremental index refresh failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MnemoConfig;

    fn test_engine() -> (tempfile::TempDir, MemoryEngine) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = MnemoConfig::default();
        config.storage.log_path = dir
            .path()
            .join("memory.jsonl")
            .to_string_lossy()
            .into_owned();
        config.storage.index_path = dir
            .path()
            .join("index.json")
            .to_string_lossy()
            .into_owned();
        (dir, MemoryEngine::open(config).unwrap())
    }

    #[test]
    fn add_then_get_round_trips() {
        let (_dir, engine) = test_engine();
        let item = engine
            .add("proj", "the port is 5432", vec!["DB".into()], None, Some(0.8))
            .unwrap();

        let fetched = engine.get(&item.id).unwrap();
        assert_eq!(fetched.content, "the port is 5432");
        assert_eq!(fetched.tags, vec!["db"]);
        assert_eq!(fetched.importance, 0.8);
    }

    #[test]
    fn get_unknown_id_is_not_found() {
        let (_dir, engine) = test_engine();
        assert!(engine.get("missing").unwrap_err().is_not_found());
    }

    #[test]
    fn search_narrows_through_index_and_verifies_against_log() {
        let (_dir, engine) = test_engine();
        let a = engine
            .add("s", "alpha", vec!["x".into()], None, Some(0.9))
            .unwrap();
        engine
            .add("s", "beta", vec!["y".into()], None, Some(0.1))
            .unwrap();
        engine.rebuild_index().unwrap();

        let query = SearchQuery {
            scope: Some("s".into()),
            tags: vec!["x".into()],
            ..SearchQuery::default()
        };
        let results = engine.search(&query).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].item.id, a.id);
        assert!(results[0].score > 0.0);
    }

    #[test]
    fn search_works_without_an_index() {
        let (_dir, engine) = test_engine();
        engine.add("s", "alpha", vec!["x".into()], None, None).unwrap();
        std::fs::remove_file(engine.config.resolved_index_path()).ok();

        let query = SearchQuery {
            scope: Some("s".into()),
            tags: vec!["x".into()],
            ..SearchQuery::default()
        };
        assert_eq!(engine.search(&query).unwrap().len(), 1);
    }

    #[test]
    fn delete_hides_from_search_but_keeps_history() {
        let (_dir, engine) = test_engine();
        let item = engine.add("s", "to forget", vec![], None, None).unwrap();
        let deleted = engine.delete(&item.id).unwrap();
        assert!(deleted.deleted);

        let results = engine.search(&SearchQuery::default()).unwrap();
        assert!(results.is_empty());

        // Still resolvable directly
        assert!(engine.get(&item.id).unwrap().deleted);
    }
}
