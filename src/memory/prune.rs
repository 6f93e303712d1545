//! Prune planning and summarization.
//!
//! [`plan_prune`] is a pure policy function: given an item set and the prune
//! and summarization settings, it proposes patches without performing any
//! I/O, which makes dry runs free. Each scope is handled independently:
//! duplicate content is deduplicated by fingerprint, the most valuable items
//! are retained untouched, and everything past the retention cutoff either
//! ages out or gets compressed to a summary.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet};

use super::types::{normalize_tags, MemoryItem, MemoryPatch};
use super::{age_days, resolved_timestamp};
use crate::config::{PruneConfig, SummarizeConfig};

/// A proposed mutation: soft-delete, tag merge, or summary assignment.
/// Transient — consumed by the write path, never persisted itself.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PruneAction {
    pub id: String,
    pub patch: MemoryPatch,
    pub reason: String,
}

/// Aggregate counts over one planning pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PruneStats {
    pub deduped: usize,
    pub deleted: usize,
    pub summarized: usize,
    pub retained: usize,
}

/// Hash of whitespace-normalized, lower-cased content. Two items with the
/// same fingerprint in a scope are duplicates.
pub fn content_fingerprint(content: &str) -> String {
    let normalized = content
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    format!("{:x}", Sha256::digest(normalized.as_bytes()))
}

/// Whether an item qualifies for summarization: old enough and long enough.
pub fn needs_summary(item: &MemoryItem, config: &SummarizeConfig, now: DateTime<Utc>) -> bool {
    age_days(resolved_timestamp(item), now) >= config.older_than_days
        && item.content.chars().count() >= config.max_content_length
}

/// Build the summary text for an item.
///
/// An optional `"Tags: t1, t2. "` prefix (only when tags exist) followed by
/// the content itself if it fits, otherwise the first `max_content_length`
/// characters cut at the last sentence-terminating mark — provided that cut
/// falls beyond 60% of the window — else hard-truncated with an ellipsis.
pub fn build_summary(item: &MemoryItem, config: &SummarizeConfig) -> String {
    let mut out = String::new();
    if !item.tags.is_empty() {
        out.push_str("Tags: ");
        out.push_str(&item.tags.join(", "));
        out.push_str(". ");
    }

    let content = item.content.trim();
    if content.chars().count() <= config.max_content_length {
        out.push_str(content);
        return out;
    }

    let window: String = content.chars().take(config.max_content_length).collect();
    let threshold = (window.len() as f64 * 0.6) as usize;
    match window.rfind(['.', '!', '?']) {
        Some(cut) if cut >= threshold => out.push_str(&window[..=cut]),
        _ => {
            out.push_str(&window);
            out.push_str("...");
        }
    }
    out
}

/// Plan prune actions for an item set. Pure; safe as a dry run.
pub fn plan_prune(
    items: &[MemoryItem],
    prune: &PruneConfig,
    summarize: &SummarizeConfig,
    now: DateTime<Utc>,
) -> (Vec<PruneAction>, PruneStats) {
    let mut actions = Vec::new();
    let mut stats = PruneStats::default();

    // Partition by scope, preserving original order within each scope.
    let mut by_scope: BTreeMap<&str, Vec<&MemoryItem>> = BTreeMap::new();
    for item in items {
        by_scope.entry(item.scope.as_str()).or_default().push(item);
    }

    for scope_items in by_scope.values() {
        plan_scope(scope_items, prune, summarize, now, &mut actions, &mut stats);
    }

    (actions, stats)
}

fn plan_scope(
    scope_items: &[&MemoryItem],
    prune: &PruneConfig,
    summarize: &SummarizeConfig,
    now: DateTime<Utc>,
    actions: &mut Vec<PruneAction>,
    stats: &mut PruneStats,
) {
    let mut removed: HashSet<&str> = HashSet::new();

    // 1. Dedup by content fingerprint; the first item seen is canonical.
    if prune.dedupe {
        let mut canonical: HashMap<String, (&MemoryItem, Vec<String>)> = HashMap::new();
        for item in scope_items.iter().filter(|item| !item.deleted) {
            let fingerprint = content_fingerprint(&item.content);
            match canonical.get_mut(&fingerprint) {
                None => {
                    canonical.insert(fingerprint, (item, item.tags.clone()));
                }
                Some((keeper, merged_tags)) => {
                    actions.push(PruneAction {
                        id: item.id.clone(),
                        patch: MemoryPatch::soft_delete(),
                        reason: "duplicate content in scope".into(),
                    });
                    removed.insert(item.id.as_str());
                    stats.deduped += 1;

                    // Fold any new tags from the duplicate into the keeper.
                    let combined =
                        normalize_tags(merged_tags.iter().chain(item.tags.iter()));
                    if combined != *merged_tags {
                        *merged_tags = combined.clone();
                        actions.push(PruneAction {
                            id: keeper.id.clone(),
                            patch: MemoryPatch {
                                tags: Some(combined),
                                ..MemoryPatch::default()
                            },
                            reason: "merge tags from duplicate".into(),
                        });
                    }
                }
            }
        }
    }

    // 2. Retention ranking: importance + 1/(1+ageDays), top N untouched.
    let survivors: Vec<&MemoryItem> = scope_items
        .iter()
        .copied()
        .filter(|item| !item.deleted && !removed.contains(item.id.as_str()))
        .collect();

    let mut ranked: Vec<(f64, &MemoryItem)> = survivors
        .iter()
        .map(|item| {
            let age = age_days(resolved_timestamp(item), now);
            (item.importance + 1.0 / (1.0 + age), *item)
        })
        .collect();
    ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    let cutoff = prune.max_per_scope.min(ranked.len());
    stats.retained += cutoff;

    // 3. Aging for everything past the retention cutoff.
    for (_, item) in &ranked[cutoff..] {
        let age = age_days(resolved_timestamp(item), now);
        if age >= prune.delete_older_than_days {
            actions.push(PruneAction {
                id: item.id.clone(),
                patch: MemoryPatch::soft_delete(),
                reason: "aged out".into(),
            });
            stats.deleted += 1;
        } else if age >= prune.compress_older_than_days && needs_summary(item, summarize, now) {
            let summary = build_summary(item, summarize);
            if item.summary.as_deref() != Some(summary.as_str()) {
                actions.push(PruneAction {
                    id: item.id.clone(),
                    patch: MemoryPatch {
                        summary: Some(Some(summary)),
                        ..MemoryPatch::default()
                    },
                    reason: "compress older memory".into(),
                });
                stats.summarized += 1;
            } else {
                stats.retained += 1;
            }
        } else {
            stats.retained += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap()
    }

    fn aged(id: &str, scope: &str, content: &str, days_ago: i64, importance: f64) -> MemoryItem {
        let ts = (now() - chrono::Duration::days(days_ago)).to_rfc3339();
        MemoryItem {
            id: id.into(),
            created_at: ts.clone(),
            updated_at: ts,
            scope: scope.into(),
            tags: vec![],
            content: content.into(),
            summary: None,
            metadata: None,
            importance,
            deleted: false,
        }
    }

    fn prune_config() -> PruneConfig {
        PruneConfig {
            max_per_scope: 1,
            delete_older_than_days: 180.0,
            compress_older_than_days: 30.0,
            dedupe: true,
        }
    }

    fn summarize_config() -> SummarizeConfig {
        SummarizeConfig {
            max_content_length: 40,
            older_than_days: 14.0,
        }
    }

    #[test]
    fn fingerprint_ignores_case_and_whitespace() {
        assert_eq!(
            content_fingerprint("Hello   World"),
            content_fingerprint("hello world")
        );
        assert_ne!(
            content_fingerprint("hello world"),
            content_fingerprint("hello there")
        );
    }

    #[test]
    fn dedup_keeps_first_and_merges_tags() {
        let mut first = aged("first", "s", "Same Thing", 1, 0.5);
        first.tags = vec!["alpha".into()];
        let mut second = aged("second", "s", "same   thing", 0, 0.5);
        second.tags = vec!["beta".into()];

        let (actions, stats) =
            plan_prune(&[first, second], &prune_config(), &summarize_config(), now());

        assert_eq!(stats.deduped, 1);
        let delete = actions
            .iter()
            .find(|a| a.reason == "duplicate content in scope")
            .unwrap();
        assert_eq!(delete.id, "second");
        assert_eq!(delete.patch.deleted, Some(true));

        let merge = actions
            .iter()
            .find(|a| a.reason == "merge tags from duplicate")
            .unwrap();
        assert_eq!(merge.id, "first");
        assert_eq!(
            merge.patch.tags,
            Some(vec!["alpha".to_string(), "beta".to_string()])
        );
    }

    #[test]
    fn dedup_scoped_per_scope() {
        let a = aged("a", "one", "same", 1, 0.5);
        let b = aged("b", "two", "same", 0, 0.5);
        let (actions, stats) = plan_prune(&[a, b], &prune_config(), &summarize_config(), now());
        assert!(actions.is_empty());
        assert_eq!(stats.deduped, 0);
    }

    #[test]
    fn retention_keeps_top_items_untouched() {
        // Both items are ancient; only the retained one survives untouched.
        let keeper = aged("keeper", "s", "important fact", 400, 0.9);
        let loser = aged("loser", "s", "forgettable", 400, 0.1);

        let (actions, stats) =
            plan_prune(&[keeper, loser], &prune_config(), &summarize_config(), now());

        assert_eq!(stats.retained, 1);
        assert_eq!(stats.deleted, 1);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].id, "loser");
        assert_eq!(actions[0].reason, "aged out");
    }

    #[test]
    fn aging_compresses_before_it_deletes() {
        let retained = aged("retained", "s", "fresh", 0, 0.9);
        let long_content = "word ".repeat(30); // 150 chars, well past the window
        let compressible = aged("compressible", "s", &long_content, 60, 0.2);

        let prune = PruneConfig {
            delete_older_than_days: 9999.0,
            compress_older_than_days: 1.0,
            ..prune_config()
        };
        let (actions, stats) =
            plan_prune(&[retained, compressible], &prune, &summarize_config(), now());

        assert_eq!(stats.deleted, 0);
        assert_eq!(stats.summarized, 1);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].reason, "compress older memory");
        let summary = actions[0].patch.summary.clone().unwrap().unwrap();
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn unchanged_summary_is_not_reproposed() {
        let long_content = "word ".repeat(30);
        let mut item = aged("a", "s", &long_content, 60, 0.2);
        let retained = aged("keep", "s", "fresh", 0, 0.9);

        let prune = PruneConfig {
            delete_older_than_days: 9999.0,
            compress_older_than_days: 1.0,
            ..prune_config()
        };
        item.summary = Some(build_summary(&item, &summarize_config()));

        let (actions, stats) =
            plan_prune(&[retained, item], &prune, &summarize_config(), now());
        assert!(actions.is_empty());
        assert_eq!(stats.summarized, 0);
        assert_eq!(stats.retained, 2);
    }

    #[test]
    fn young_or_short_items_are_retained() {
        let retained = aged("top", "s", "fresh", 0, 0.9);
        let young = aged("young", "s", "short note", 5, 0.2);

        let (actions, stats) =
            plan_prune(&[retained, young], &prune_config(), &summarize_config(), now());
        assert!(actions.is_empty());
        assert_eq!(stats.retained, 2);
    }

    #[test]
    fn summary_prefix_and_sentence_cut() {
        let config = SummarizeConfig {
            max_content_length: 30,
            older_than_days: 0.0,
        };

        // Short content: prefix + content verbatim.
        let mut short = aged("a", "s", "Just a short fact", 10, 0.5);
        short.tags = vec!["db".into(), "infra".into()];
        assert_eq!(
            build_summary(&short, &config),
            "Tags: db, infra. Just a short fact"
        );

        // Sentence terminator past 60% of the window: cut there.
        let sentence = aged(
            "b",
            "s",
            "First part ends here today. And then it rambles on far past the window",
            10,
            0.5,
        );
        assert_eq!(
            build_summary(&sentence, &config),
            "First part ends here today."
        );

        // No usable terminator: hard truncation with ellipsis.
        let rambling = aged(
            "c",
            "s",
            "no punctuation anywhere just one long breathless run of words",
            10,
            0.5,
        );
        let summary = build_summary(&rambling, &config);
        assert!(summary.ends_with("..."));
        assert_eq!(summary.chars().count(), 33);
    }

    #[test]
    fn needs_summary_requires_age_and_length() {
        let config = summarize_config();
        let long_content = "x".repeat(50);

        let old_long = aged("a", "s", &long_content, 20, 0.5);
        assert!(needs_summary(&old_long, &config, now()));

        let young_long = aged("b", "s", &long_content, 2, 0.5);
        assert!(!needs_summary(&young_long, &config, now()));

        let old_short = aged("c", "s", "tiny", 20, 0.5);
        assert!(!needs_summary(&old_short, &config, now()));
    }

    #[test]
    fn already_deleted_items_are_ignored() {
        let mut gone = aged("gone", "s", "dup content", 1, 0.5);
        gone.deleted = true;
        let live = aged("live", "s", "dup content", 0, 0.5);

        let (actions, stats) = plan_prune(&[gone, live], &prune_config(), &summarize_config(), now());
        assert!(actions.is_empty());
        assert_eq!(stats.deduped, 0);
        assert_eq!(stats.retained, 1);
    }
}
