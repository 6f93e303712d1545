#![allow(dead_code)]

use chrono::{Duration, SecondsFormat, Utc};
use std::path::Path;
use tempfile::TempDir;

use mnemo::config::MnemoConfig;
use mnemo::memory::engine::MemoryEngine;

/// Config rooted in a temp directory so tests never touch `~/.mnemo`.
pub fn test_config(dir: &TempDir) -> MnemoConfig {
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
    config
}

/// Open a fresh engine over a temp directory.
pub fn test_engine() -> (TempDir, MemoryEngine) {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let engine = MemoryEngine::open(config).unwrap();
    (dir, engine)
}

/// Rewrite every log record for `id` so it appears `days` days old. Keeps the
/// line order intact so latest-wins resolution is unaffected.
pub fn backdate(log_path: &Path, id: &str, days: i64) {
    let stamp = (Utc::now() - Duration::days(days)).to_rfc3339_opts(SecondsFormat::Millis, true);
    let raw = std::fs::read_to_string(log_path).unwrap();

    let mut out = String::new();
    for line in raw.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let mut value: serde_json::Value = serde_json::from_str(line).unwrap();
        if value["id"] == id {
            value["createdAt"] = stamp.clone().into();
            value["updatedAt"] = stamp.clone().into();
        }
        out.push_str(&value.to_string());
        out.push('\n');
    }
    std::fs::write(log_path, out).unwrap();
}

/// Append a raw line to the log, bypassing validation.
pub fn raw_append(log_path: &Path, line: &str) {
    use std::io::Write;
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(log_path)
        .unwrap();
    writeln!(file, "{line}").unwrap();
}
