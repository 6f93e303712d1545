use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct DeleteMemoryParams {
    #[schemars(description = "The memory id to soft-delete. History is kept in the log.")]
    pub id: String,
}
