//! Incremental re-analysis tests

mod support;

use argus::analysis::{Analysis, Facet};
use argus::detectors::{detector_for, DetectContext, Detector, DetectorError, DetectorId, DetectorRegistry, FailureMode};
use argus::pipeline::{classify_impact, detectors_for, Engine, EngineOptions, Impact, IncrementalEngine};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use support::{minimal_go_project, write_files};
use tokio_util::sync::CancellationToken;

/// Delegates to the real detector and records that it ran
struct Recording {
    inner: Arc<dyn Detector>,
    log: Arc<Mutex<Vec<DetectorId>>>,
}

impl Detector for Recording {
    fn id(&self) -> DetectorId {
        self.inner.id()
    }

    fn failure_mode(&self) -> FailureMode {
        self.inner.failure_mode()
    }

    fn detect(&self, ctx: &DetectContext, analysis: &Analysis) -> Result<Facet, DetectorError> {
        self.log.lock().unwrap().push(self.id());
        self.inner.detect(ctx, analysis)
    }
}

fn recording_registry(log: &Arc<Mutex<Vec<DetectorId>>>) -> DetectorRegistry {
    DetectorId::all_variants()
        .iter()
        .fold(DetectorRegistry::with_defaults(), |registry, id| {
            registry.with_override(Arc::new(Recording {
                inner: detector_for(*id),
                log: Arc::clone(log),
            }))
        })
}

/// Fails every call after the first
struct FailsAfterFirst {
    calls: Mutex<usize>,
}

impl Detector for FailsAfterFirst {
    fn id(&self) -> DetectorId {
        DetectorId::Endpoints
    }

    fn failure_mode(&self) -> FailureMode {
        FailureMode::Soft
    }

    fn detect(&self, _ctx: &DetectContext, _analysis: &Analysis) -> Result<Facet, DetectorError> {
        let mut calls = self.calls.lock().unwrap();
        *calls += 1;
        if *calls == 2 {
            Err(DetectorError::Other("route table unreadable".to_string()))
        } else {
            Ok(Facet::Endpoints(Vec::new()))
        }
    }
}

fn tags(impacts: &BTreeSet<Impact>) -> Vec<&'static str> {
    impacts.iter().map(|i| i.as_str()).collect()
}

#[tokio::test]
async fn test_source_edit_keeps_tech_stack_shared() {
    let repo = minimal_go_project();
    let engine = IncrementalEngine::new(Engine::new(EngineOptions::default()), repo.path());

    let full = engine.analyze_full(CancellationToken::new()).await.unwrap();
    let (updated, impacts) = engine
        .analyze_incremental("main.go", CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(tags(&impacts), vec!["conventions", "endpoints"]);
    assert!(Arc::ptr_eq(&full.tech_stack, &updated.tech_stack));
    assert!(Arc::ptr_eq(&full.structure, &updated.structure));
    assert_eq!(*full, *updated);

    let cached = engine.cached().unwrap().unwrap();
    assert!(Arc::ptr_eq(&cached, &updated));
}

#[tokio::test]
async fn test_only_mapped_detectors_run() {
    let repo = minimal_go_project();
    let log = Arc::new(Mutex::new(Vec::new()));
    let engine = IncrementalEngine::new(
        Engine::new(EngineOptions::default()).with_registry(recording_registry(&log)),
        repo.path(),
    );
    engine.analyze_full(CancellationToken::new()).await.unwrap();
    assert_eq!(log.lock().unwrap().len(), DetectorId::all_variants().len());

    for changed in ["go.mod", "Makefile", "README.md", ".github/workflows/ci.yml", "main.go", "cmd"] {
        log.lock().unwrap().clear();
        let (_, impacts) = engine
            .analyze_incremental(changed, CancellationToken::new())
            .await
            .unwrap();
        assert!(!impacts.contains(&Impact::All), "{}", changed);

        let ran: BTreeSet<DetectorId> = log.lock().unwrap().iter().copied().collect();
        let expected: BTreeSet<DetectorId> = detectors_for(&classify_impact(changed)).into_iter().collect();
        assert_eq!(ran, expected, "detectors run for {}", changed);
    }
}

#[tokio::test]
async fn test_unknown_extension_reuses_cache() {
    let repo = minimal_go_project();
    let engine = IncrementalEngine::new(Engine::new(EngineOptions::default()), repo.path());
    let full = engine.analyze_full(CancellationToken::new()).await.unwrap();

    let (same, impacts) = engine
        .analyze_incremental("logo.png", CancellationToken::new())
        .await
        .unwrap();

    assert!(impacts.is_empty());
    assert!(Arc::ptr_eq(&full, &same));
}

#[tokio::test]
async fn test_no_cache_runs_full_analysis() {
    let repo = minimal_go_project();
    let engine = IncrementalEngine::new(Engine::new(EngineOptions::default()), repo.path());

    let (analysis, impacts) = engine
        .analyze_incremental("main.go", CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(tags(&impacts), vec!["all"]);
    assert_eq!(analysis.tech_stack.languages[0].name, "Go");
}

#[tokio::test]
async fn test_config_change_is_full_run() {
    let repo = minimal_go_project();
    let engine = IncrementalEngine::new(Engine::new(EngineOptions::default()), repo.path());
    engine.analyze_full(CancellationToken::new()).await.unwrap();

    let (_, impacts) = engine
        .analyze_incremental(".argus.yaml", CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(tags(&impacts), vec!["all"]);
}

#[tokio::test]
async fn test_partial_failure_falls_back_to_full() {
    let repo = minimal_go_project();
    let registry = DetectorRegistry::with_defaults().with_override(Arc::new(FailsAfterFirst {
        calls: Mutex::new(0),
    }));
    let engine = IncrementalEngine::new(
        Engine::new(EngineOptions::default()).with_registry(registry),
        repo.path(),
    );
    let full = engine.analyze_full(CancellationToken::new()).await.unwrap();

    let (fallback, impacts) = engine
        .analyze_incremental("main.go", CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(tags(&impacts), vec!["all"]);
    assert!(!Arc::ptr_eq(&full.tech_stack, &fallback.tech_stack));
    assert_eq!(*full, *fallback);
}

#[tokio::test]
async fn test_manifest_edit_picks_up_new_version() {
    let repo = minimal_go_project();
    let engine = IncrementalEngine::new(Engine::new(EngineOptions::default()), repo.path());
    let full = engine.analyze_full(CancellationToken::new()).await.unwrap();
    assert_eq!(full.tech_stack.languages[0].version.as_deref(), Some("1.21"));

    write_files(repo.path(), &[("go.mod", "module test\n\ngo 1.22\n")]);
    let changed = repo.path().join("go.mod");
    let (updated, impacts) = engine
        .analyze_incremental(&changed.to_string_lossy(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(tags(&impacts), vec!["techstack", "development"]);
    assert_eq!(updated.tech_stack.languages[0].version.as_deref(), Some("1.22"));
    assert_eq!(full.tech_stack.languages[0].version.as_deref(), Some("1.21"));
}

#[tokio::test]
async fn test_cancelled_incremental_does_not_fall_back() {
    let repo = minimal_go_project();
    let engine = IncrementalEngine::new(Engine::new(EngineOptions::default()), repo.path());
    let full = engine.analyze_full(CancellationToken::new()).await.unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = engine.analyze_incremental("main.go", cancel).await.unwrap_err();

    assert!(err.is_cancelled());
    assert!(Arc::ptr_eq(&engine.cached().unwrap().unwrap(), &full));
}
