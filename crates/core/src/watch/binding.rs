use std::path::Path;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::types::{DroverError, DroverResult};

/// Association between path patterns and the tasks they re-trigger.
///
/// Patterns are globs relative to the workspace root. A pattern prefixed with
/// `!` excludes matching paths, e.g. `["src/img/**/*.*", "!**/*.svg"]`.
#[derive(Debug, Clone)]
pub struct WatchBinding {
    patterns: Vec<String>,
    includes: GlobSet,
    excludes: GlobSet,
    tasks: Vec<String>,
}

impl WatchBinding {
    pub fn new<S: AsRef<str>>(patterns: &[S], tasks: Vec<String>) -> DroverResult<Self> {
        if tasks.is_empty() {
            return Err(DroverError::Config(
                "Watch binding must name at least one task".to_string(),
            ));
        }

        let mut include_builder = GlobSetBuilder::new();
        let mut exclude_builder = GlobSetBuilder::new();
        let mut include_count = 0;

        for pattern in patterns {
            let pattern = pattern.as_ref();
            if let Some(negated) = pattern.strip_prefix('!') {
                exclude_builder.add(GlobBuilder::new(negated).literal_separator(true).build()?);
            } else {
                include_builder.add(GlobBuilder::new(pattern).literal_separator(true).build()?);
                include_count += 1;
            }
        }

        if include_count == 0 {
            return Err(DroverError::Config(format!(
                "Watch binding for {} has no include pattern",
                tasks.join(", ")
            )));
        }

        Ok(Self {
            patterns: patterns.iter().map(|p| p.as_ref().to_string()).collect(),
            includes: include_builder.build()?,
            excludes: exclude_builder.build()?,
            tasks,
        })
    }

    pub fn matches(&self, path: &Path) -> bool {
        self.includes.is_match(path) && !self.excludes.is_match(path)
    }

    pub fn tasks(&self) -> &[String] {
        &self.tasks
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}
