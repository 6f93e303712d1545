use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct GetMemoryParams {
    #[schemars(description = "The memory id to fetch")]
    pub id: String,
}
