//! Derived scope/tag index.
//!
//! A persisted, versioned accelerator over the log's latest view. The index
//! is advisory: it narrows candidate sets for combined scope+tag queries, but
//! the log stays the source of truth. A version mismatch, unreadable file, or
//! any suspected inconsistency is answered by treating the index as empty and
//! rebuilding it from the log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use super::types::MemoryItem;
use super::{now_rfc3339, resolved_timestamp};
use crate::error::Result;

/// Bump when the document layout changes; older documents load as empty.
pub const INDEX_VERSION: u32 = 2;

/// Key for the combined (scope, tag) buckets.
fn scope_tag_key(scope: &str, tag: &str) -> String {
    format!("{scope}::{tag}")
}

/// Scope/tag → id mappings over current, non-deleted items. Buckets are
/// ordered by descending `updatedAt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MemoryIndex {
    pub version: u32,
    pub updated_at: String,
    pub by_scope: BTreeMap<String, Vec<String>>,
    pub by_tag: BTreeMap<String, Vec<String>>,
    pub by_scope_tag: BTreeMap<String, Vec<String>>,
}

impl Default for MemoryIndex {
    fn default() -> Self {
        Self {
            version: INDEX_VERSION,
            updated_at: now_rfc3339(),
            by_scope: BTreeMap::new(),
            by_tag: BTreeMap::new(),
            by_scope_tag: BTreeMap::new(),
        }
    }
}

impl MemoryIndex {
    /// Load from disk, treating a missing, unreadable, malformed, or
    /// version-mismatched document as an empty index.
    pub fn load(path: &Path) -> Self {
        let Ok(raw) = fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str::<Self>(&raw) {
            Ok(index) if index.version == INDEX_VERSION => index,
            Ok(index) => {
                tracing::warn!(
                    found = index.version,
                    expected = INDEX_VERSION,
                    "index version mismatch — starting empty"
                );
                Self::default()
            }
            Err(err) => {
                tracing::warn!(error = %err, "unreadable index — starting empty");
                Self::default()
            }
        }
    }

    /// Persist atomically (temp file + rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string(self)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.by_scope.is_empty() && self.by_tag.is_empty() && self.by_scope_tag.is_empty()
    }

    /// Full rebuild from a set of current, non-deleted items.
    pub fn build<'a>(items: impl IntoIterator<Item = &'a MemoryItem>) -> Self {
        let mut index = Self::default();
        let mut timestamps: HashMap<String, DateTime<Utc>> = HashMap::new();

        for item in items {
            if item.deleted {
                continue;
            }
            timestamps.insert(item.id.clone(), resolved_timestamp(item));
            index
                .by_scope
                .entry(item.scope.clone())
                .or_default()
                .push(item.id.clone());
            for tag in &item.tags {
                index
                    .by_tag
                    .entry(tag.clone())
                    .or_default()
                    .push(item.id.clone());
                index
                    .by_scope_tag
                    .entry(scope_tag_key(&item.scope, tag))
                    .or_default()
                    .push(item.id.clone());
            }
        }

        for bucket in index
            .by_scope
            .values_mut()
            .chain(index.by_tag.values_mut())
            .chain(index.by_scope_tag.values_mut())
        {
            sort_bucket(bucket, &timestamps);
        }
        index
    }

    /// Incrementally patch the index for a set of just-written items.
    ///
    /// Each affected id is first removed from every bucket, then re-added
    /// unless the item is now soft-deleted, and only the touched buckets are
    /// re-sorted. Applying the same update twice yields the same index.
    pub fn apply_update(&mut self, affected: &[MemoryItem], latest: &HashMap<String, MemoryItem>) {
        for item in affected {
            self.remove_id(&item.id);
        }

        let timestamps: HashMap<String, DateTime<Utc>> = latest
            .values()
            .map(|item| (item.id.clone(), resolved_timestamp(item)))
            .collect();

        let mut touched: BTreeSet<(u8, String)> = BTreeSet::new();
        for item in affected {
            if item.deleted {
                continue;
            }
            self.by_scope
                .entry(item.scope.clone())
                .or_default()
                .push(item.id.clone());
            touched.insert((0, item.scope.clone()));
            for tag in &item.tags {
                self.by_tag
                    .entry(tag.clone())
                    .or_default()
                    .push(item.id.clone());
                touched.insert((1, tag.clone()));
                let key = scope_tag_key(&item.scope, tag);
                self.by_scope_tag
                    .entry(key.clone())
                    .or_default()
                    .push(item.id.clone());
                touched.insert((2, key));
            }
        }

        for (kind, key) in touched {
            let bucket = match kind {
                0 => self.by_scope.get_mut(&key),
                1 => self.by_tag.get_mut(&key),
                _ => self.by_scope_tag.get_mut(&key),
            };
            if let Some(bucket) = bucket {
                sort_bucket(bucket, &timestamps);
            }
        }

        self.updated_at = now_rfc3339();
    }

    /// Union of ids in the (scope, tag) buckets for the requested tags.
    /// Order within each bucket (descending recency) is preserved.
    pub fn candidates_for(&self, scope: &str, tags: &[String]) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut ids = Vec::new();
        for tag in tags {
            if let Some(bucket) = self.by_scope_tag.get(&scope_tag_key(scope, tag)) {
                for id in bucket {
                    if seen.insert(id.clone()) {
                        ids.push(id.clone());
                    }
                }
            }
        }
        ids
    }

    /// Drop an id from every bucket, pruning buckets that become empty.
    fn remove_id(&mut self, id: &str) {
        for map in [
            &mut self.by_scope,
            &mut self.by_tag,
            &mut self.by_scope_tag,
        ] {
            map.retain(|_, bucket| {
                bucket.retain(|existing| existing != id);
                !bucket.is_empty()
            });
        }
    }
}

/// Descending `updatedAt`; the sort is stable, so equal timestamps keep their
/// relative order.
fn sort_bucket(bucket: &mut Vec<String>, timestamps: &HashMap<String, DateTime<Utc>>) {
    bucket.sort_by_key(|id| {
        std::cmp::Reverse(
            timestamps
                .get(id)
                .copied()
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        )
    });
}
