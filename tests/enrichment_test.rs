//! AI enrichment tests against an in-process text generator

mod support;

use argus::ai::{BackendError, Enricher, MockTextGenerator, TextGenerator};
use argus::pipeline::{Engine, EngineOptions};
use std::sync::Arc;
use support::express_service;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_partial_failure_attaches_successful_insights() {
    let repo = express_service();
    let analysis = Engine::new(EngineOptions::default())
        .analyze(repo.path(), CancellationToken::new())
        .await
        .unwrap();

    let generator = Arc::new(
        MockTextGenerator::new("Keep handlers thin.")
            .reply_when("Task: project summary", "An order service built on Express.")
            .fail_when(
                "Task: patterns insights",
                BackendError::ApiError {
                    message: "model overloaded".to_string(),
                    status_code: 503,
                },
            ),
    );
    let enricher = Enricher::new(generator.clone());

    let enriched = enricher
        .enrich_analysis(&analysis, CancellationToken::new())
        .await
        .unwrap();

    let insights = enriched.ai_enrichment.as_deref().unwrap();
    assert_eq!(insights.insight_count(), 4);
    assert_eq!(insights.project_summary.as_deref(), Some("An order service built on Express."));
    assert!(insights.patterns_insights.is_none());
    assert_eq!(insights.model, generator.model());
    assert_eq!(generator.prompts().len(), 5);

    assert!(analysis.ai_enrichment.is_none());
    assert_eq!(enriched.endpoints, analysis.endpoints);
}

#[tokio::test]
async fn test_prompts_describe_the_analysis() {
    let repo = express_service();
    let analysis = Engine::new(EngineOptions::default())
        .analyze(repo.path(), CancellationToken::new())
        .await
        .unwrap();

    let generator = Arc::new(MockTextGenerator::new("ok"));
    Enricher::new(generator.clone())
        .enrich(&analysis, CancellationToken::new())
        .await
        .unwrap();

    let prompts = generator.prompts();
    assert!(prompts.iter().all(|p| p.contains("JavaScript")));
    assert!(prompts.iter().any(|p| p.contains("Task: best practices")));
}

#[tokio::test]
async fn test_every_call_failing_is_an_error() {
    let repo = express_service();
    let analysis = Engine::new(EngineOptions::default())
        .analyze(repo.path(), CancellationToken::new())
        .await
        .unwrap();

    let generator = Arc::new(MockTextGenerator::failing(BackendError::NetworkError {
        message: "connection refused".to_string(),
    }));
    let err = Enricher::new(generator)
        .enrich(&analysis, CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, BackendError::AllFailed { attempted: 5, .. }));
}
