//! MCP `prune_memory` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct PruneMemoryParams {
    #[schemars(description = "Only prune memories in this scope")]
    pub scope: Option<String>,

    #[schemars(description = "Plan actions without applying them. Defaults to false.")]
    pub dry_run: Option<bool>,
}
