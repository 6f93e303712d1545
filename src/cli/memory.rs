//! CLI write-path commands — `add`, `get`, `update`, `delete`.

use anyhow::{Context, Result};

use crate::config::MnemoConfig;
use crate::memory::types::MemoryPatch;

/// Store a new memory and print its id.
pub fn add(
    config: &MnemoConfig,
    scope: &str,
    content: &str,
    tags: Vec<String>,
    importance: Option<f64>,
) -> Result<()> {
    let engine = super::open_engine(config)?;
    let item = engine.add(scope, content, tags, None, importance)?;

    println!("Stored {} in scope '{}'", item.id, item.scope);
    if !item.tags.is_empty() {
        println!("  tags: {}", item.tags.join(", "));
    }
    Ok(())
}

/// Print one memory as pretty JSON.
pub fn get(config: &MnemoConfig, id: &str) -> Result<()> {
    let engine = super::open_engine(config)?;
    let item = engine.get(id)?;
    println!("{}", serde_json::to_string_pretty(&item)?);
    Ok(())
}

/// Apply a JSON patch to a memory and print the merged result.
pub fn update(config: &MnemoConfig, id: &str, patch_json: &str) -> Result<()> {
    let patch: MemoryPatch =
        serde_json::from_str(patch_json).context("patch must be a JSON object")?;

    let engine = super::open_engine(config)?;
    let item = engine.update(id, &patch)?;
    println!("{}", serde_json::to_string_pretty(&item)?);
    Ok(())
}

/// Soft-delete a memory.
pub fn delete(config: &MnemoConfig, id: &str) -> Result<()> {
    let engine = super::open_engine(config)?;
    let item = engine.delete(id)?;
    println!("Deleted {} (history kept in the log)", item.id);
    Ok(())
}
