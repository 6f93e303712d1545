//! CLI maintenance commands — `prune`, `compact`, `health`, `repair`, and
//! `rebuild-index` for memory lifecycle management.

use anyhow::Result;

use crate::config::MnemoConfig;

/// Run the prune policies, optionally scoped, optionally as a dry run.
pub fn prune(config: &MnemoConfig, scope: Option<&str>, dry_run: bool) -> Result<()> {
    let engine = super::open_engine(config)?;
    let outcome = engine.prune(scope, dry_run)?;

    if outcome.actions.is_empty() {
        println!("Nothing to prune.");
        return Ok(());
    }

    if dry_run {
        println!(
            "Planned {} action(s) (dry run — nothing applied):\n",
            outcome.actions.len()
        );
        println!("{:<38} {}", "ID", "Action");
        println!("{}", "-".repeat(70));
        for action in &outcome.actions {
            println!("{:<38} {}", action.id, action.reason);
        }
        println!();
    } else {
        println!("Applied {} action(s).", outcome.actions.len());
    }

    let stats = &outcome.stats;
    println!(
        "  deduped: {}  deleted: {}  summarized: {}  retained: {}",
        stats.deduped, stats.deleted, stats.summarized, stats.retained
    );
    Ok(())
}

/// Compact the log to one line per memory.
pub fn compact(config: &MnemoConfig) -> Result<()> {
    let engine = super::open_engine(config)?;
    let result = engine.compact()?;

    println!("Compacted to {} record(s).", result.items_kept);
    println!("  backup: {}", result.backup_path.display());
    Ok(())
}

/// Print physical log health.
pub fn health(config: &MnemoConfig) -> Result<()> {
    let engine = super::open_engine(config)?;
    let health = engine.health()?;

    let stats = &health.stats;
    println!("Log: {}", config.resolved_log_path().display());
    println!(
        "  lines: {} total, {} valid, {} invalid, {} empty",
        stats.total_lines, stats.valid_lines, stats.invalid_lines, stats.empty_lines
    );
    println!("  bytes: {}", stats.bytes);
    println!("  latest items: {}", health.latest_items);
    if let Some(ratio) = health.line_ratio {
        println!("  line ratio: {ratio:.2}");
    }

    if health.compaction_recommended {
        println!("Compaction recommended ({}).", health.reasons.join(", "));
    } else {
        println!("Log is healthy.");
    }
    Ok(())
}

/// Drop unreadable lines, quarantining them unless told otherwise.
pub fn repair(config: &MnemoConfig, compact: bool, no_quarantine: bool) -> Result<()> {
    let engine = super::open_engine(config)?;
    let result = engine.repair(compact, !no_quarantine)?;

    if !result.repaired {
        println!("Log is clean — nothing to repair.");
        return Ok(());
    }

    println!(
        "Repaired log: dropped {} unreadable line(s).",
        result.stats.invalid_lines
    );
    if let Some(path) = &result.quarantine_path {
        println!("  quarantine: {}", path.display());
    }
    if let Some(path) = &result.backup_path {
        println!("  backup: {}", path.display());
    }
    Ok(())
}

/// Rebuild the scope/tag index from the log.
pub fn rebuild_index(config: &MnemoConfig) -> Result<()> {
    let engine = super::open_engine(config)?;
    let index = engine.rebuild_index()?;

    println!(
        "Index rebuilt: {} scope(s), {} tag(s).",
        index.by_scope.len(),
        index.by_tag.len()
    );
    println!("  path: {}", config.resolved_index_path().display());
    Ok(())
}
