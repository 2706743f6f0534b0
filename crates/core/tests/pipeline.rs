//! End-to-end runs of pipeline files against a temporary workspace.
//!
//! Tasks shell out with `sh -c`, so these tests only run on unix.
#![cfg(unix)]

use std::fs;
use std::path::Path;

use drover_core::orchestrator::{Orchestrator, OrchestratorConfig};
use drover_core::{DroverError, RunResult};

const SITE_PIPELINE: &str = r#"
name: site
description: Static site build
tasks:
  - name: clean
    description: Remove build output
    remove: [dist]
  - name: html
    group: build
    command: "mkdir -p dist && cp src/index.html dist/index.html"
  - name: fonts
    group: build
    command: ["sh", "-c", "mkdir -p dist/fonts && echo woff > dist/fonts/font.woff"]
  - name: styles
    group: build
    command: "mkdir -p dist/css && echo \"$DROVER_TASK:$THEME\" > dist/css/main.min.css"
    env:
      THEME: dark
  - name: deploy
    dependencies: [html, fonts, styles]
    command: "touch dist/.deployed"
rebuild:
  clean: clean
watch:
  - patterns: ["src/*.html"]
    tasks: [html]
"#;

fn workspace(pipeline: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::write(dir.path().join("src/index.html"), "<h1>hello</h1>").unwrap();
    fs::write(dir.path().join("drover.yml"), pipeline).unwrap();
    dir
}

fn load(root: &Path) -> Orchestrator {
    Orchestrator::load(OrchestratorConfig {
        workspace_root: root.to_path_buf(),
        config_path: None,
    })
    .unwrap()
}

#[tokio::test]
async fn test_full_rebuild_removes_stale_output_then_builds() {
    let dir = workspace(SITE_PIPELINE);
    fs::create_dir_all(dir.path().join("dist/old")).unwrap();
    fs::write(dir.path().join("dist/old/stale.js"), "var a;").unwrap();

    let orchestrator = load(dir.path());
    assert_eq!(
        orchestrator.default_tasks(),
        ["html".to_string(), "fonts".to_string(), "styles".to_string()]
    );

    let report = orchestrator.run_full_rebuild().await.unwrap();
    assert!(report.is_success(), "{report:?}");
    assert_eq!(report.len(), 4);
    assert_eq!(report.outcomes()[0].name, "clean");

    assert!(!dir.path().join("dist/old").exists());
    assert_eq!(
        fs::read_to_string(dir.path().join("dist/index.html")).unwrap(),
        "<h1>hello</h1>"
    );
    assert!(dir.path().join("dist/fonts/font.woff").exists());
    assert_eq!(
        fs::read_to_string(dir.path().join("dist/css/main.min.css")).unwrap(),
        "styles:dark\n"
    );
}

#[tokio::test]
async fn test_failing_task_skips_dependents_and_spares_siblings() {
    let pipeline = SITE_PIPELINE.replace(
        "command: \"mkdir -p dist/css && echo \\\"$DROVER_TASK:$THEME\\\" > dist/css/main.min.css\"",
        "command: \"exit 3\"",
    );
    let dir = workspace(&pipeline);
    let orchestrator = load(dir.path());

    let report = orchestrator.run_named(&["deploy"]).await.unwrap();
    assert!(!report.is_success());
    assert_eq!(report.get("html"), Some(&RunResult::Succeeded));
    assert_eq!(report.get("fonts"), Some(&RunResult::Succeeded));
    assert_eq!(
        report.get("styles"),
        Some(&RunResult::Failed(
            "Command 'exit 3' failed with exit code: 3".to_string()
        ))
    );
    assert_eq!(
        report.get("deploy"),
        Some(&RunResult::Skipped {
            prerequisite: "styles".to_string()
        })
    );
    assert!(!dir.path().join("dist/.deployed").exists());
}

#[tokio::test]
async fn test_plan_lists_waves_without_running() {
    let dir = workspace(SITE_PIPELINE);
    let orchestrator = load(dir.path());

    let result = orchestrator.plan(&["deploy"]).unwrap();
    assert_eq!(
        result.plan.waves(),
        [
            vec!["html".to_string(), "fonts".to_string(), "styles".to_string()],
            vec!["deploy".to_string()],
        ]
    );
    assert!(!dir.path().join("dist").exists());
}

#[test]
fn test_cyclic_pipeline_fails_to_load() {
    let dir = workspace(
        r#"
tasks:
  - name: js
    dependencies: [bundle]
  - name: bundle
    dependencies: [js]
"#,
    );

    let err = Orchestrator::load(OrchestratorConfig {
        workspace_root: dir.path().to_path_buf(),
        config_path: None,
    })
    .err()
    .unwrap();
    assert!(matches!(err, DroverError::CyclicDependency { .. }));
    assert_eq!(
        err.to_string(),
        "Circular dependency detected: bundle -> js -> bundle"
    );
}

#[test]
fn test_missing_pipeline_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Orchestrator::load(OrchestratorConfig {
        workspace_root: dir.path().to_path_buf(),
        config_path: None,
    })
    .err()
    .unwrap();
    assert!(matches!(err, DroverError::Config(_)));
}
