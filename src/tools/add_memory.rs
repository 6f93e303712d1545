use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct AddMemoryParams {
    #[schemars(description = "The natural language content of the memory")]
    pub content: String,

    #[schemars(
        description = "Scope the memory belongs to, e.g. a project or agent name. Defaults to 'global'."
    )]
    pub scope: Option<String>,

    #[schemars(description = "Tags for filtering. Normalized to trimmed lowercase.")]
    pub tags: Option<Vec<String>>,

    #[schemars(description = "Importance score 0.0-1.0. Defaults to 0.5.")]
    pub importance: Option<f64>,

    #[schemars(description = "Optional JSON metadata blob")]
    pub metadata: Option<serde_json::Value>,
}
