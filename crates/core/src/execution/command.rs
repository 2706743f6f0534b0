//! Built-in task actions
//!
//! Pipeline files describe their external tools as shell commands, argument
//! lists or scripts. This module turns those into [`TaskAction`]s with
//! consistent working directory, environment and error reporting, plus the
//! output removal action used by clean tasks.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use tokio::process::Command;

use crate::action::TaskAction;

/// What a command action launches
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandSpec {
    /// A single shell command line, run with `sh -c`
    Shell(String),
    /// An executable followed by its arguments
    Argv(Vec<String>),
    /// A script file, relative paths resolved against the workspace root
    Script(PathBuf),
}

/// Runs an external command in the workspace root
#[derive(Debug, Clone)]
pub struct CommandAction {
    task_name: String,
    root: PathBuf,
    spec: CommandSpec,
    env: BTreeMap<String, String>,
}

impl CommandAction {
    pub fn new(task_name: &str, root: &Path, spec: CommandSpec) -> Self {
        Self {
            task_name: task_name.to_string(),
            root: root.to_path_buf(),
            spec,
            env: BTreeMap::new(),
        }
    }

    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn spec(&self) -> &CommandSpec {
        &self.spec
    }

    /// Execute a command with common setup and error handling
    async fn execute(
        &self,
        mut command: Command,
        execution_error_message: &str,
        failure_error_message: &str,
    ) -> anyhow::Result<()> {
        command.current_dir(&self.root);
        command.env("DROVER_TASK", &self.task_name);
        command.envs(&self.env);
        command.kill_on_drop(true);

        let status = command
            .status()
            .await
            .map_err(|e| anyhow!("{}: {}", execution_error_message, e))?;

        if !status.success() {
            bail!(
                "{}: {}",
                failure_error_message,
                status.code().unwrap_or(-1)
            );
        }

        Ok(())
    }

    async fn execute_shell_command(&self, cmd: &str) -> anyhow::Result<()> {
        let mut command = Command::new("sh");
        command.arg("-c").arg(cmd);
        self.execute(
            command,
            &format!("Failed to execute command '{}'", cmd),
            &format!("Command '{}' failed with exit code", cmd),
        )
        .await
    }

    async fn execute_command_with_args(&self, argv: &[String]) -> anyhow::Result<()> {
        let Some((program, args)) = argv.split_first() else {
            return Ok(());
        };
        let mut command = Command::new(program);
        command.args(args);
        self.execute(
            command,
            &format!("Failed to execute command '{}'", program),
            &format!("Command '{}' failed with exit code", program),
        )
        .await
    }

    async fn execute_script(&self, script_path: &Path) -> anyhow::Result<()> {
        let full_script_path = if script_path.is_relative() {
            self.root.join(script_path)
        } else {
            script_path.to_path_buf()
        };

        if !full_script_path.exists() {
            bail!("Script file '{}' not found", full_script_path.display());
        }

        self.execute(
            Command::new(&full_script_path),
            &format!("Failed to execute script: {}", full_script_path.display()),
            "Script execution failed with exit code",
        )
        .await
    }
}

#[async_trait]
impl TaskAction for CommandAction {
    async fn run(&self) -> anyhow::Result<()> {
        match &self.spec {
            CommandSpec::Shell(cmd) => self.execute_shell_command(cmd).await,
            CommandSpec::Argv(argv) => self.execute_command_with_args(argv).await,
            CommandSpec::Script(path) => self.execute_script(path).await,
        }
    }
}

/// Deletes build output. Paths that do not exist are ignored.
#[derive(Debug, Clone)]
pub struct RemoveAction {
    root: PathBuf,
    paths: Vec<PathBuf>,
}

impl RemoveAction {
    pub fn new(root: &Path, paths: Vec<PathBuf>) -> Self {
        Self {
            root: root.to_path_buf(),
            paths,
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Resolve a removal path inside the workspace root.
    ///
    /// Only plain relative paths below the root are accepted: absolute paths
    /// and `..` segments could reach outside it, and a path made of nothing
    /// but `.` segments names the root itself.
    fn target(&self, path: &Path) -> anyhow::Result<PathBuf> {
        let mut below_root = false;
        for component in path.components() {
            match component {
                Component::Normal(_) => below_root = true,
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => bail!(
                    "Refusing to remove '{}': paths must stay inside the workspace root",
                    path.display()
                ),
            }
        }

        if !below_root {
            bail!("Refusing to remove the workspace root '{}'", self.root.display());
        }
        Ok(self.root.join(path))
    }
}

#[async_trait]
impl TaskAction for RemoveAction {
    async fn run(&self) -> anyhow::Result<()> {
        let targets = self
            .paths
            .iter()
            .map(|path| self.target(path))
            .collect::<anyhow::Result<Vec<_>>>()?;

        for target in targets {
            let metadata = match tokio::fs::symlink_metadata(&target).await {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => bail!("Failed to inspect {}: {}", target.display(), e),
            };

            let removed = if metadata.is_dir() {
                tokio::fs::remove_dir_all(&target).await
            } else {
                tokio::fs::remove_file(&target).await
            };
            removed.map_err(|e| anyhow!("Failed to remove {}: {}", target.display(), e))?;
            tracing::debug!(path = %target.display(), "removed build output");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_remove_action_deletes_tree_and_ignores_missing() {
        let dir = tempfile::tempdir().unwrap();
        let dist = dir.path().join("dist");
        std::fs::create_dir_all(dist.join("css")).unwrap();
        std::fs::write(dist.join("css/main.min.css"), "body{}").unwrap();
        std::fs::write(dir.path().join("stale.map"), "{}").unwrap();

        let action = RemoveAction::new(
            dir.path(),
            vec![
                PathBuf::from("dist"),
                PathBuf::from("stale.map"),
                PathBuf::from("never-built"),
            ],
        );
        action.run().await.unwrap();

        assert!(!dist.exists());
        assert!(!dir.path().join("stale.map").exists());
    }

    #[tokio::test]
    async fn test_remove_action_refuses_root() {
        let dir = tempfile::tempdir().unwrap();
        let action = RemoveAction::new(dir.path(), vec![PathBuf::from("")]);
        assert!(action.run().await.is_err());
        assert!(dir.path().exists());
    }

    #[tokio::test]
    async fn test_remove_action_refuses_paths_leaving_root() {
        let outer = tempfile::tempdir().unwrap();
        let root = outer.path().join("site");
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::create_dir_all(root.join("dist")).unwrap();
        std::fs::write(root.join("src/index.html"), "<h1>hi</h1>").unwrap();
        std::fs::write(outer.path().join("keep.txt"), "keep").unwrap();

        for path in ["dist/..", "..", "./.", "../keep.txt"] {
            let action = RemoveAction::new(&root, vec![PathBuf::from(path)]);
            assert!(action.run().await.is_err(), "'{path}' should be refused");
        }
        let absolute = RemoveAction::new(&root, vec![outer.path().join("keep.txt")]);
        assert!(absolute.run().await.is_err());

        assert!(root.join("src/index.html").exists());
        assert!(root.join("dist").exists());
        assert!(outer.path().join("keep.txt").exists());
    }

    #[tokio::test]
    async fn test_remove_action_checks_every_path_before_removing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("dist")).unwrap();

        let action = RemoveAction::new(
            dir.path(),
            vec![PathBuf::from("./dist"), PathBuf::from("dist/../..")],
        );
        assert!(action.run().await.is_err());
        assert!(dir.path().join("dist").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_shell_command_sees_task_env() {
        let dir = tempfile::tempdir().unwrap();
        let mut env = BTreeMap::new();
        env.insert("NODE_ENV".to_string(), "production".to_string());

        let action = CommandAction::new(
            "styles",
            dir.path(),
            CommandSpec::Shell("echo \"$DROVER_TASK $NODE_ENV\" > out.txt".to_string()),
        )
        .with_env(env);
        action.run().await.unwrap();

        let written = std::fs::read_to_string(dir.path().join("out.txt")).unwrap();
        assert_eq!(written.trim(), "styles production");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_command_reports_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let action = CommandAction::new("js", dir.path(), CommandSpec::Shell("exit 3".to_string()));
        let error = action.run().await.unwrap_err();
        assert_eq!(error.to_string(), "Command 'exit 3' failed with exit code: 3");
    }

    #[tokio::test]
    async fn test_missing_script_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let action = CommandAction::new(
            "deploy",
            dir.path(),
            CommandSpec::Script(PathBuf::from("scripts/deploy.sh")),
        );
        let error = action.run().await.unwrap_err();
        assert!(error.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_empty_argv_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let action = CommandAction::new("noop", dir.path(), CommandSpec::Argv(Vec::new()));
        assert!(action.run().await.is_ok());
    }
}
