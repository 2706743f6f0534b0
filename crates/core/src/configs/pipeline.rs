use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::configs::tasks::TaskConfig;
use crate::types::DroverResult;

#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PipelineConfig {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Tasks run by `drover run` without arguments
    pub default: Option<Vec<String>>,
    pub rebuild: Option<RebuildConfig>,
    pub tasks: Vec<TaskConfig>,
    pub watch: Option<Vec<WatchConfig>>,
    /// Quiet period in milliseconds before a watch run starts
    pub watch_debounce_ms: Option<u64>,
}

/// Clean-then-build sequence
#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RebuildConfig {
    pub clean: String,
    pub build: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WatchConfig {
    /// Globs relative to the workspace root; prefix with `!` to exclude
    pub patterns: Vec<String>,
    pub tasks: Vec<String>,
}

pub fn parse_pipeline_config(yaml_str: &str) -> DroverResult<PipelineConfig> {
    let config: PipelineConfig = serde_yaml::from_str(yaml_str)?;
    Ok(config)
}
