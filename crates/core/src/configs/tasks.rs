use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Command {
    Single(String),
    Multiple(Vec<String>),
}

#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TaskConfig {
    pub name: String,
    pub description: Option<String>,
    /// Free-form grouping tag such as `build` or `deploy`
    pub group: Option<String>,
    /// Tasks that must finish before this one starts
    pub dependencies: Option<Vec<String>>,
    pub script: Option<String>,
    pub command: Option<Command>,
    /// Paths to delete, relative to the workspace root
    pub remove: Option<Vec<String>>,
    /// Extra environment for `command` and `script`
    pub env: Option<BTreeMap<String, String>>,
}

impl TaskConfig {
    pub fn dependencies(&self) -> &[String] {
        self.dependencies.as_deref().unwrap_or_default()
    }

    /// Number of action kinds set on this task
    pub(crate) fn action_count(&self) -> usize {
        [
            self.script.is_some(),
            self.command.is_some(),
            self.remove.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }
}
