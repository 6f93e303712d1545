use anyhow::Result;

use crate::config::MnemoConfig;
use crate::memory::search::SearchQuery;

/// Run a search from the terminal and print a ranked listing.
pub fn search(
    config: &MnemoConfig,
    scope: Option<String>,
    tags: Vec<String>,
    query: Option<String>,
    limit: Option<usize>,
    include_deleted: bool,
) -> Result<()> {
    let engine = super::open_engine(config)?;

    let results = engine.search(&SearchQuery {
        scope,
        tags,
        query,
        limit,
        include_deleted,
    })?;

    if results.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!("Found {} result(s)\n", results.len());

    for (i, result) in results.iter().enumerate() {
        let item = &result.item;
        let flag = if item.deleted { " [deleted]" } else { "" };
        println!(
            "  {}. [{}] {}{} (importance: {:.2}, score: {:.4})",
            i + 1,
            item.scope,
            item.id,
            flag,
            item.importance,
            result.score,
        );
        if !item.tags.is_empty() {
            println!("     tags: {}", item.tags.join(", "));
        }
        println!("     {}", super::preview(&item.content, 120));
        println!();
    }

    Ok(())
}
