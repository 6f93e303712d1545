pub mod add_memory;
pub mod delete_memory;
pub mod get_memory;
pub mod maintenance;
pub mod prune_memory;
pub mod search_memory;
pub mod update_memory;

use add_memory::AddMemoryParams;
use delete_memory::DeleteMemoryParams;
use get_memory::GetMemoryParams;
use maintenance::{CompactLogParams, MemoryHealthParams, RebuildIndexParams, RepairLogParams};
use prune_memory::PruneMemoryParams;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use search_memory::SearchMemoryParams;
use std::sync::Arc;
use update_memory::UpdateMemoryParams;

use crate::memory::engine::MemoryEngine;
use crate::memory::search::SearchQuery;
use crate::memory::types::MemoryPatch;

/// The mnemo MCP tool handler. Holds the shared engine and exposes all MCP
/// tools via the `#[tool_router]` macro.
///
/// Engine operations are synchronous file IO, so every tool body runs them
/// through `spawn_blocking`.
#[derive(Clone)]
pub struct MnemoTools {
    tool_router: ToolRouter<Self>,
    engine: Arc<MemoryEngine>,
}

#[tool_router]
impl MnemoTools {
    pub fn new(engine: Arc<MemoryEngine>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            engine,
        }
    }

    /// Run a blocking engine call off the async runtime and serialize the result.
    async fn run_blocking<T, F>(&self, f: F) -> Result<String, String>
    where
        T: serde::Serialize + Send + 'static,
        F: FnOnce(Arc<MemoryEngine>) -> crate::error::Result<T> + Send + 'static,
    {
        let engine = Arc::clone(&self.engine);
        let result = tokio::task::spawn_blocking(move || f(engine))
            .await
            .map_err(|e| format!("task failed: {e}"))?
            .map_err(|e| e.to_string())?;
        serde_json::to_string(&result).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Store a new memory in the append-only log.
    #[tool(
        description = "Store a durable memory. Give it a scope (project/agent name) and tags so it can be found again later."
    )]
    async fn add_memory(
        &self,
        Parameters(params): Parameters<AddMemoryParams>,
    ) -> Result<String, String> {
        if params.content.trim().is_empty() {
            return Err("content must not be empty".into());
        }
        if let Some(importance) = params.importance {
            if !(0.0..=1.0).contains(&importance) {
                return Err("importance must be between 0.0 and 1.0".into());
            }
        }

        let scope = params.scope.unwrap_or_else(|| "global".into());
        tracing::info!(
            content_len = params.content.len(),
            scope = %scope,
            "add_memory called"
        );

        self.run_blocking(move |engine| {
            engine.add(
                &scope,
                &params.content,
                params.tags.unwrap_or_default(),
                params.metadata,
                params.importance,
            )
        })
        .await
    }

    /// Search memories by scope, tags, and free text.
    #[tool(
        description = "Search memories. Results are ranked by scope match, tag overlap, recency, importance, and text match."
    )]
    async fn search_memory(
        &self,
        Parameters(params): Parameters<SearchMemoryParams>,
    ) -> Result<String, String> {
        let query = SearchQuery {
            scope: params.scope,
            tags: params.tags.unwrap_or_default(),
            query: params.query,
            limit: params.limit.map(|n| n.max(0) as usize),
            include_deleted: params.include_deleted.unwrap_or(false),
        };
        tracing::info!(
            scope = query.scope.as_deref().unwrap_or("-"),
            tags = query.tags.len(),
            "search_memory called"
        );

        self.run_blocking(move |engine| engine.search(&query)).await
    }

    /// Fetch one memory by id, including soft-deleted ones.
    #[tool(description = "Fetch a single memory by id. Soft-deleted memories are still returned.")]
    async fn get_memory(
        &self,
        Parameters(params): Parameters<GetMemoryParams>,
    ) -> Result<String, String> {
        self.run_blocking(move |engine| engine.get(&params.id)).await
    }

    /// Merge a partial update onto a memory.
    #[tool(
        description = "Update fields of a memory. Only the keys present in the patch change; null clears summary or metadata."
    )]
    async fn update_memory(
        &self,
        Parameters(params): Parameters<UpdateMemoryParams>,
    ) -> Result<String, String> {
        let patch: MemoryPatch = serde_json::from_value(params.patch)
            .map_err(|e| format!("invalid patch: {e}"))?;
        tracing::info!(id = %params.id, "update_memory called");

        self.run_blocking(move |engine| engine.update(&params.id, &patch))
            .await
    }

    /// Soft-delete a memory.
    #[tool(
        description = "Soft-delete a memory. It disappears from search but its history stays in the log."
    )]
    async fn delete_memory(
        &self,
        Parameters(params): Parameters<DeleteMemoryParams>,
    ) -> Result<String, String> {
        tracing::info!(id = %params.id, "delete_memory called");
        self.run_blocking(move |engine| engine.delete(&params.id))
            .await
    }

    /// Apply retention policies: dedup, age-out, summarize.
    #[tool(
        description = "Prune memories: soft-delete duplicates and aged-out items, summarize long old content. Use dry_run to preview."
    )]
    async fn prune_memory(
        &self,
        Parameters(params): Parameters<PruneMemoryParams>,
    ) -> Result<String, String> {
        let dry_run = params.dry_run.unwrap_or(false);
        tracing::info!(
            scope = params.scope.as_deref().unwrap_or("-"),
            dry_run,
            "prune_memory called"
        );

        self.run_blocking(move |engine| engine.prune(params.scope.as_deref(), dry_run))
            .await
    }

    /// Report physical log health.
    #[tool(
        description = "Check memory log health: line counts, invalid lines, size, and whether compaction is recommended."
    )]
    async fn memory_health(
        &self,
        Parameters(_params): Parameters<MemoryHealthParams>,
    ) -> Result<String, String> {
        self.run_blocking(move |engine| engine.health()).await
    }

    /// Drop unreadable lines from the log.
    #[tool(
        description = "Repair the memory log by removing unreadable lines. Quarantines them by default and keeps a backup of the original file."
    )]
    async fn repair_log(
        &self,
        Parameters(params): Parameters<RepairLogParams>,
    ) -> Result<String, String> {
        let compact = params.compact.unwrap_or(false);
        let quarantine = params.quarantine.unwrap_or(true);
        tracing::info!(compact, quarantine, "repair_log called");

        self.run_blocking(move |engine| engine.repair(compact, quarantine))
            .await
    }

    /// Rewrite the log to one line per memory.
    #[tool(
        description = "Compact the memory log to its latest state, one line per memory. Keeps a backup of the original file."
    )]
    async fn compact_log(
        &self,
        Parameters(_params): Parameters<CompactLogParams>,
    ) -> Result<String, String> {
        tracing::info!("compact_log called");
        self.run_blocking(move |engine| engine.compact()).await
    }

    /// Rebuild the scope/tag index from the log.
    #[tool(
        description = "Rebuild the derived scope/tag index from the log. Safe to run any time; the log is the source of truth."
    )]
    async fn rebuild_index(
        &self,
        Parameters(_params): Parameters<RebuildIndexParams>,
    ) -> Result<String, String> {
        tracing::info!("rebuild_index called");
        self.run_blocking(move |engine| engine.rebuild_index()).await
    }
}

#[tool_handler]
impl ServerHandler for MnemoTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "Mnemo is a durable memory store for agents. Use add_memory to save facts, \
                 search_memory to retrieve them, and prune_memory to keep the store tidy."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
