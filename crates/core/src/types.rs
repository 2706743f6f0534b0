use thiserror::Error;

/// The main error type for Drover operations
#[derive(Debug, Error)]
pub enum DroverError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid glob pattern: {0}")]
    Glob(#[from] globset::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Task '{0}' is already registered")]
    DuplicateTask(String),

    #[error("Task '{task}' depends on '{prerequisite}' which is not registered")]
    UnknownPrerequisite { task: String, prerequisite: String },

    #[error("Circular dependency detected: {}", format_cycle(.cycle))]
    CyclicDependency { task: String, cycle: Vec<String> },

    #[error("Task '{0}' not found")]
    UnknownTask(String),

    #[error("Watch error: {0}")]
    Watch(String),
}

impl From<notify::Error> for DroverError {
    fn from(error: notify::Error) -> Self {
        DroverError::Watch(error.to_string())
    }
}

/// Render a cycle as `a -> b -> a`
pub fn format_cycle(cycle: &[String]) -> String {
    let mut path = cycle.to_vec();
    if let Some(first) = path.first().cloned() {
        path.push(first);
    }
    path.join(" -> ")
}

/// Result type alias for Drover operations
pub type DroverResult<T> = Result<T, DroverError>;
