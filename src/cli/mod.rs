//! Terminal command implementations. Each function opens the engine over the
//! configured paths, runs one operation, and prints a human-readable result.

pub mod maintenance;
pub mod memory;
pub mod search;

use anyhow::Result;

use crate::config::MnemoConfig;
use crate::memory::engine::MemoryEngine;

/// Open the engine for a one-shot CLI command.
pub(crate) fn open_engine(config: &MnemoConfig) -> Result<MemoryEngine> {
    Ok(MemoryEngine::open(config.clone())?)
}

/// First line of content, clipped for table output.
pub(crate) fn preview(content: &str, max_chars: usize) -> String {
    let first_line = content.lines().next().unwrap_or("");
    if first_line.chars().count() > max_chars {
        let clipped: String = first_line.chars().take(max_chars).collect();
        format!("{clipped}...")
    } else {
        first_line.to_string()
    }
}
