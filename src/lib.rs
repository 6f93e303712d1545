//! Durable, scoped memory for automation agents — append-only, crash-consistent,
//! and shared safely across processes, exposed over MCP and a CLI.
//!
//! Mnemo stores memory items as newline-delimited JSON in an append-only log.
//! Every create or update is a new appended record; the current value per id
//! is resolved by a deterministic latest-wins rule. A derived scope/tag index
//! accelerates filtered retrieval, a weighted scorer ranks results, and prune
//! policies dedup, age out, and summarize old memories.
//!
//! # Architecture
//!
//! - **Storage**: an append-only JSON-lines log with corruption-tolerant
//!   reads, plus a rebuildable scope/tag index document
//! - **Concurrency**: a cooperative marker-file lock serializes mutation
//!   across processes; full rewrites go temp → backup → rename so a crash
//!   never leaves a partial file at the primary path
//! - **Retrieval**: deterministic weighted scoring over scope, tags,
//!   recency, importance, and text-token overlap
//! - **Transport**: MCP over stdio (primary) or Streamable HTTP/SSE
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`error`] — The engine error taxonomy
//! - [`memory`] — Core engine: log, lock, index, scoring, prune/summarize

pub mod config;
pub mod error;
pub mod memory;
