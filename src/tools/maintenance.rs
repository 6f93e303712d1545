//! Parameter types for the log maintenance tools.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MemoryHealthParams {}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RepairLogParams {
    #[schemars(description = "Also compact the log to one line per memory. Defaults to false.")]
    pub compact: Option<bool>,

    #[schemars(
        description = "Write unreadable lines to a quarantine file next to the log. Defaults to true."
    )]
    pub quarantine: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CompactLogParams {}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RebuildIndexParams {}
