//! MCP `update_memory` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct UpdateMemoryParams {
    #[schemars(description = "The memory id to update")]
    pub id: String,

    #[schemars(
        description = "Fields to change, as a JSON object. Supported keys: scope, content, \
                       tags, importance, deleted, summary, metadata. Absent keys are left \
                       untouched; an explicit null clears summary or metadata."
    )]
    pub patch: serde_json::Value,
}
