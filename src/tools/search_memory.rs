//! MCP `search_memory` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SearchMemoryParams {
    #[schemars(description = "Restrict results to this exact scope")]
    pub scope: Option<String>,

    #[schemars(description = "Tags to match (case-insensitive). More matches score higher.")]
    pub tags: Option<Vec<String>>,

    #[schemars(description = "Free-text query matched against content and summary")]
    pub query: Option<String>,

    #[schemars(
        description = "Maximum number of results. Defaults to the configured limit; 0 means unlimited."
    )]
    pub limit: Option<i64>,

    #[schemars(description = "Include soft-deleted memories. Defaults to false.")]
    pub include_deleted: Option<bool>,
}
