//! Pipeline file configuration

pub mod pipeline;
pub mod tasks;

pub use pipeline::{parse_pipeline_config, PipelineConfig, RebuildConfig, WatchConfig};
pub use tasks::{Command, TaskConfig};
