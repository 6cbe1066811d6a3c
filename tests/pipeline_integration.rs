//! End-to-end pipeline tests
//!
//! These run the full detector pipeline against throwaway repositories and
//! check the properties every analysis must hold.

mod support;

use argus::analysis::{DependencyType, HttpMethod};
use argus::pipeline::{Engine, EngineError, EngineOptions, ScheduleMode};
use argus::progress::{ProgressEvent, ProgressHandler};
use std::path::Path;
use std::sync::{Arc, Mutex};
use support::{express_service, minimal_go_project, react_project, repo_with, ParksUntilCancelled};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn engine() -> Engine {
    Engine::new(EngineOptions::default())
}

fn sequential_engine() -> Engine {
    Engine::new(EngineOptions {
        schedule: ScheduleMode::Sequential,
        ..EngineOptions::default()
    })
}

#[tokio::test]
async fn test_minimal_go_project() {
    let repo = minimal_go_project();
    let analysis = engine().analyze(repo.path(), CancellationToken::new()).await.unwrap();

    let languages = &analysis.tech_stack.languages;
    assert_eq!(languages.len(), 1);
    assert_eq!(languages[0].name, "Go");
    assert_eq!(languages[0].version.as_deref(), Some("1.21"));
    assert_eq!(languages[0].percentage, 100.0);

    assert!(analysis
        .commands
        .iter()
        .any(|c| c.command.contains("gofmt") || c.command.starts_with("go build")));
    assert!(analysis
        .conventions
        .iter()
        .any(|c| c.description.starts_with("Go project")));

    let arch = analysis.architecture_info.as_deref().expect("architecture info");
    assert_eq!(arch.entry_point.as_deref(), Some("main.go"));
}

#[tokio::test]
async fn test_package_json_dev_dependencies() {
    let repo = react_project();
    let analysis = engine().analyze(repo.path(), CancellationToken::new()).await.unwrap();

    let react = analysis.dependencies.iter().find(|d| d.name == "react").unwrap();
    let jest = analysis.dependencies.iter().find(|d| d.name == "jest").unwrap();
    assert_eq!(react.dep_type, DependencyType::Runtime);
    assert_eq!(jest.dep_type, DependencyType::Dev);
    assert_eq!(analysis.dependencies.len(), 2);

    assert!(analysis.has_framework("React"));
}

#[tokio::test]
async fn test_repeated_runs_are_identical() {
    let repo = express_service();
    let first = engine().analyze(repo.path(), CancellationToken::new()).await.unwrap();
    let second = engine().analyze(repo.path(), CancellationToken::new()).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[tokio::test]
async fn test_parallel_matches_sequential() {
    for repo in [minimal_go_project(), react_project(), express_service()] {
        let parallel = engine().analyze(repo.path(), CancellationToken::new()).await.unwrap();
        let sequential = sequential_engine()
            .analyze(repo.path(), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(parallel, sequential);
    }
}

#[tokio::test]
async fn test_empty_repository() {
    let repo = TempDir::new().unwrap();
    let analysis = engine().analyze(repo.path(), CancellationToken::new()).await.unwrap();

    assert!(analysis.tech_stack.languages.is_empty());
    assert!(analysis.dependencies.is_empty());
    assert!(analysis.endpoints.is_empty());
    assert!(analysis.commands.is_empty());
    assert!(analysis.conventions.is_empty());
}

#[tokio::test]
async fn test_missing_root_is_input_error() {
    let result = engine()
        .analyze(Path::new("/definitely/not/here"), CancellationToken::new())
        .await;
    assert!(matches!(result, Err(EngineError::Inventory(_)) | Err(EngineError::InvalidInput(_))));
}

#[tokio::test]
async fn test_cancelled_run_returns_no_analysis() {
    let repo = express_service();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = engine().analyze(repo.path(), cancel).await.unwrap_err();
    assert!(err.is_cancelled());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancel_during_stage_two_returns_no_analysis() {
    let repo = express_service();
    let parked = Arc::new(ParksUntilCancelled::default());
    let engine = engine().with_registry(parked.registry());
    let cancel = CancellationToken::new();

    let root = repo.path().to_path_buf();
    let token = cancel.clone();
    let run = tokio::spawn(async move { engine.analyze(&root, token).await });

    parked.wait_started().await;
    cancel.cancel();

    let result = run.await.unwrap();
    assert!(matches!(result, Err(EngineError::Cancelled)), "{:?}", result.map(|_| ()));
}

#[tokio::test]
async fn test_non_utf8_manifest_does_not_abort() {
    let repo = repo_with(&[("main.go", "package main\n"), ("go.mod", "module x\n\ngo 1.21\n")]);
    std::fs::write(repo.path().join("pom.xml"), b"<project><name>caf\xe9</name></project>").unwrap();

    let analysis = engine().analyze(repo.path(), CancellationToken::new()).await.unwrap();
    assert_eq!(analysis.tech_stack.languages[0].name, "Go");
}

#[tokio::test]
async fn test_language_percentages_never_exceed_100() {
    let repo = repo_with(&[
        ("main.go", "package main\n"),
        ("lib/util.go", "package lib\n"),
        ("scripts/gen.py", "print(1)\n"),
        ("web/app.ts", "export {}\n"),
        ("web/view.tsx", "export {}\n"),
        ("notes.md", "# notes\n"),
    ]);
    let analysis = engine().analyze(repo.path(), CancellationToken::new()).await.unwrap();

    let total = analysis.tech_stack.total_percentage();
    assert!(total <= 100.0 + f64::EPSILON, "total {}", total);
    assert!(analysis.tech_stack.languages.len() >= 3);
}

#[tokio::test]
async fn test_endpoint_invariants() {
    let repo = express_service();
    let analysis = engine().analyze(repo.path(), CancellationToken::new()).await.unwrap();

    assert!(!analysis.endpoints.is_empty());
    for endpoint in &analysis.endpoints {
        assert!(endpoint.path.starts_with('/'), "{}", endpoint.path);
        assert!(matches!(
            endpoint.method,
            HttpMethod::Get | HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch | HttpMethod::Delete | HttpMethod::All
        ));
    }
    assert!(analysis
        .endpoints
        .iter()
        .any(|e| e.method == HttpMethod::Delete && e.path == "/orders/:id"));
}

#[tokio::test]
async fn test_vendored_dependencies_excluded() {
    let repo = repo_with(&[
        ("package.json", r#"{"dependencies": {"lodash": "^4.17.21"}}"#),
        ("node_modules/left-pad/package.json", r#"{"dependencies": {"evil": "1.0.0"}}"#),
        ("vendor/github.com/x/y/go.mod", "module y\n\nrequire github.com/z/z v1.0.0\n"),
    ]);
    let analysis = engine().analyze(repo.path(), CancellationToken::new()).await.unwrap();

    let names: Vec<&str> = analysis.dependencies.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["lodash"]);
}

#[derive(Default)]
struct RecordingHandler {
    events: Mutex<Vec<String>>,
}

impl ProgressHandler for RecordingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        let label = match event {
            ProgressEvent::Started { .. } => "started".to_string(),
            ProgressEvent::StageStarted { stage, .. } => format!("stage-{}", stage),
            ProgressEvent::Completed { .. } => "completed".to_string(),
            _ => return,
        };
        self.events.lock().unwrap().push(label);
    }
}

#[tokio::test]
async fn test_progress_events_follow_stage_order() {
    let repo = minimal_go_project();
    let handler = Arc::new(RecordingHandler::default());
    let engine = Engine::new(EngineOptions::default()).with_progress(handler.clone());

    engine.analyze(repo.path(), CancellationToken::new()).await.unwrap();

    let events = handler.events.lock().unwrap().clone();
    assert_eq!(events, vec!["started", "stage-1", "stage-2", "stage-3", "completed"]);
}
