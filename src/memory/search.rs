//! Retrieval scoring and ranking.
//!
//! A pure function from (candidate items, query, weights, reference time) to
//! a ranked list — the same inputs always produce the same output. Five
//! signals, each normalized to `[0, 1]` before weighting: exact scope match,
//! requested-tag coverage, exponential recency decay, stored importance, and
//! substring token coverage over content + summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::MemoryItem;
use super::{age_days, parse_instant, resolved_timestamp};
use crate::config::ScoringConfig;

/// A retrieval request. All filters are optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchQuery {
    /// Exact scope to favor (and to narrow candidates with, together with
    /// `tags`).
    pub scope: Option<String>,
    /// Requested tags, matched case-insensitively.
    pub tags: Vec<String>,
    /// Free-text query, token-matched as substrings.
    pub query: Option<String>,
    /// Maximum results; absent or non-positive means all.
    pub limit: Option<usize>,
    /// Include soft-deleted items in the results.
    pub include_deleted: bool,
}

/// One ranked result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredItem {
    pub item: MemoryItem,
    pub score: f64,
}

/// Score one item against a query. Deterministic for fixed inputs.
pub fn score_item(
    item: &MemoryItem,
    query: &SearchQuery,
    weights: &ScoringConfig,
    now: DateTime<Utc>,
) -> f64 {
    let scope_signal = match &query.scope {
        Some(scope) if item.scope == *scope => 1.0,
        _ => 0.0,
    };

    let tag_signal = if query.tags.is_empty() {
        0.0
    } else {
        let matched = query
            .tags
            .iter()
            .filter(|tag| {
                let tag = tag.trim().to_lowercase();
                item.tags.iter().any(|t| *t == tag)
            })
            .count();
        matched as f64 / query.tags.len() as f64
    };

    let recency_signal = if weights.half_life_days <= 0.0 {
        1.0
    } else {
        match parse_instant(&item.updated_at) {
            Some(ts) => (-age_days(ts, now) / weights.half_life_days).exp(),
            None => 0.0,
        }
    };

    let text_signal = match query.query.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => {
            let haystack = match &item.summary {
                Some(summary) => format!("{} {}", item.content, summary).to_lowercase(),
                None => item.content.to_lowercase(),
            };
            let tokens: Vec<String> = text.split_whitespace().map(str::to_lowercase).collect();
            let matched = tokens
                .iter()
                .filter(|token| haystack.contains(token.as_str()))
                .count();
            matched as f64 / tokens.len() as f64
        }
        _ => 0.0,
    };

    weights.scope * scope_signal
        + weights.tag * tag_signal
        + weights.recency * recency_signal
        + weights.importance * item.importance
        + weights.text * text_signal
}

/// Rank candidates: score, filter deleted (unless requested), sort by
/// descending score with descending `updatedAt` as the tie-break, truncate to
/// the limit.
pub fn rank<'a>(
    candidates: impl IntoIterator<Item = &'a MemoryItem>,
    query: &SearchQuery,
    weights: &ScoringConfig,
    now: DateTime<Utc>,
) -> Vec<ScoredItem> {
    let mut results: Vec<ScoredItem> = candidates
        .into_iter()
        .filter(|item| query.include_deleted || !item.deleted)
        .map(|item| ScoredItem {
            score: score_item(item, query, weights, now),
            item: item.clone(),
        })
        .collect();

    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| resolved_timestamp(&b.item).cmp(&resolved_timestamp(&a.item)))
    });

    if let Some(limit) = query.limit.filter(|l| *l > 0) {
        results.truncate(limit);
    }
    results
}
