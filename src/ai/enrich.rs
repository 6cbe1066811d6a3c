use super::client::TextGenerator;
use super::error::BackendError;
use super::prompts::{build_prompt, InsightKind};
use crate::analysis::{AiEnrichment, Analysis};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Post-pass that asks a text generator for narrative insights
pub struct Enricher {
    generator: Arc<dyn TextGenerator>,
}

impl Enricher {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub async fn health_check(&self) -> Result<bool, BackendError> {
        self.generator.health_check().await
    }

    /// Runs every insight request concurrently
    ///
    /// Failed requests are logged and left out. Fails only when every request
    /// failed, or on cancellation.
    pub async fn enrich(&self, analysis: &Analysis, cancel: CancellationToken) -> Result<AiEnrichment, BackendError> {
        let merged = Arc::new(Mutex::new(AiEnrichment {
            model: self.generator.model().to_string(),
            ..AiEnrichment::default()
        }));
        let mut join_set: JoinSet<Result<(), (InsightKind, BackendError)>> = JoinSet::new();

        for kind in InsightKind::all_variants().iter().copied() {
            let prompt = build_prompt(kind, analysis);
            let generator = Arc::clone(&self.generator);
            let merged = Arc::clone(&merged);
            let cancel = cancel.clone();

            join_set.spawn(async move {
                let result = tokio::select! {
                    _ = cancel.cancelled() => Err(BackendError::Cancelled),
                    result = generator.generate(&prompt) => result,
                };
                let text = result.map_err(|e| (kind, e))?;

                let mut guard = merged.lock().await;
                *slot(&mut guard, kind) = Some(text.trim().to_string());
                Ok(())
            });
        }

        let attempted = join_set.len();
        let mut last_error: Option<BackendError> = None;
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err((kind, e))) => {
                    if !e.is_cancelled() {
                        warn!(insight = %kind, error = %e, "Enrichment call failed");
                    }
                    last_error = Some(e);
                }
                Err(e) => {
                    warn!(error = %e, "Enrichment task failed");
                    last_error = Some(BackendError::NetworkError { message: e.to_string() });
                }
            }
        }

        if cancel.is_cancelled() {
            return Err(BackendError::Cancelled);
        }

        let enrichment = merged.lock().await.clone();
        if enrichment.insight_count() == 0 {
            let last = last_error.map(|e| e.to_string()).unwrap_or_default();
            return Err(BackendError::AllFailed { attempted, last });
        }

        info!(
            model = %enrichment.model,
            insights = enrichment.insight_count(),
            attempted,
            "Enrichment complete"
        );
        Ok(enrichment)
    }

    /// Enriches and attaches the result to a copy of `analysis`
    pub async fn enrich_analysis(&self, analysis: &Analysis, cancel: CancellationToken) -> Result<Analysis, BackendError> {
        let enrichment = self.enrich(analysis, cancel).await?;
        let mut enriched = analysis.clone();
        enriched.ai_enrichment = Some(Arc::new(enrichment));
        Ok(enriched)
    }
}

fn slot(enrichment: &mut AiEnrichment, kind: InsightKind) -> &mut Option<String> {
    match kind {
        InsightKind::ProjectSummary => &mut enrichment.project_summary,
        InsightKind::Conventions => &mut enrichment.conventions_insights,
        InsightKind::Architecture => &mut enrichment.architecture_insights,
        InsightKind::BestPractices => &mut enrichment.best_practices,
        InsightKind::Patterns => &mut enrichment.patterns_insights,
    }
}
