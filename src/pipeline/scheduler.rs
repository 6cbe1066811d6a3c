//! Staged detector scheduler
//!
//! Each stage fans its detectors out onto blocking worker threads against a
//! frozen snapshot of the `Analysis`, waits for all of them, then applies the
//! returned facets serially in stage order. No detector ever observes another
//! detector of the same stage.

use super::EngineError;
use crate::analysis::{merge_facets, Analysis, Convention, Facet};
use crate::detectors::{
    DetectContext, Detector, DetectorError, DetectorId, DetectorRegistry, FailureMode, STAGES,
};
use crate::progress::{ProgressEvent, ProgressHandler};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::debug;

/// How a stage's detectors are executed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScheduleMode {
    /// Every detector of a stage on its own blocking worker
    #[default]
    Parallel,
    /// Detectors one after another on a single worker, in declaration order
    Sequential,
}

/// What happens to a soft detector failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SoftFailure {
    /// Reset the detector's field and keep going
    Reset,
    /// Abort the run; used by partial re-runs that must never cache a
    /// degraded result
    Abort,
}

type DetectorOutcome = (DetectorId, Result<Facet, DetectorError>, Duration);

pub struct Scheduler {
    registry: DetectorRegistry,
    mode: ScheduleMode,
    progress: Option<Arc<dyn ProgressHandler>>,
}

impl Scheduler {
    pub fn new(registry: DetectorRegistry, mode: ScheduleMode) -> Self {
        Self {
            registry,
            mode,
            progress: None,
        }
    }

    pub fn with_progress(mut self, handler: Arc<dyn ProgressHandler>) -> Self {
        self.progress = Some(handler);
        self
    }

    pub fn mode(&self) -> ScheduleMode {
        self.mode
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(handler) = &self.progress {
            handler.on_progress(&event);
        }
    }

    /// Runs every stage in order
    pub async fn run_all(
        &self,
        ctx: &DetectContext,
        analysis: &mut Analysis,
        custom: &[Convention],
    ) -> Result<(), EngineError> {
        self.run_subset(ctx, analysis, DetectorId::all_variants(), custom, SoftFailure::Reset)
            .await
    }

    /// Runs only `ids`, still honoring stage order
    pub(crate) async fn run_subset(
        &self,
        ctx: &DetectContext,
        analysis: &mut Analysis,
        ids: &[DetectorId],
        custom: &[Convention],
        soft: SoftFailure,
    ) -> Result<(), EngineError> {
        for (idx, stage) in STAGES.iter().enumerate() {
            let selected: Vec<DetectorId> = stage.iter().copied().filter(|id| ids.contains(id)).collect();
            if selected.is_empty() {
                continue;
            }
            let facets = self.run_stage(idx + 1, ctx, analysis, &selected, soft).await?;
            merge_facets(analysis, facets, custom);
        }
        Ok(())
    }

    /// Runs one stage and returns its facets in `ids` order
    async fn run_stage(
        &self,
        stage: usize,
        ctx: &DetectContext,
        analysis: &Analysis,
        ids: &[DetectorId],
        soft: SoftFailure,
    ) -> Result<Vec<Facet>, EngineError> {
        ctx.check_cancelled().map_err(|_| EngineError::Cancelled)?;

        self.emit(ProgressEvent::StageStarted {
            stage,
            detectors: ids.to_vec(),
        });
        let start = Instant::now();

        let detectors = self.registry.select(ids);
        let snapshot = Arc::new(analysis.clone());

        let mut outcomes = match self.mode {
            ScheduleMode::Parallel => run_parallel(detectors, ctx, snapshot).await?,
            ScheduleMode::Sequential => run_sequential(detectors, ctx, snapshot).await?,
        };
        outcomes.sort_by_key(|(id, _, _)| ids.iter().position(|i| i == id));

        let mut facets = Vec::with_capacity(outcomes.len());
        for (id, result, elapsed) in outcomes {
            match result {
                Ok(facet) => {
                    debug!(detector = %id, elapsed_ms = elapsed.as_millis() as u64, "Detector finished");
                    facets.push(facet);
                }
                Err(e) if e.is_cancelled() => return Err(EngineError::Cancelled),
                Err(e) => {
                    let fatal = id.failure_mode() == FailureMode::Fatal || soft == SoftFailure::Abort;
                    self.emit(ProgressEvent::DetectorFailed {
                        detector: id,
                        error: e.to_string(),
                        fatal,
                    });
                    if fatal {
                        return Err(EngineError::Detector {
                            detector: id,
                            source: e,
                        });
                    }
                    debug!(detector = %id, error = %e, "Detector failed, resetting its field");
                    facets.push(Facet::empty(id));
                }
            }
        }

        self.emit(ProgressEvent::StageComplete {
            stage,
            duration: start.elapsed(),
        });
        Ok(facets)
    }
}

fn run_one(detector: &dyn Detector, ctx: &DetectContext, analysis: &Analysis) -> DetectorOutcome {
    let start = Instant::now();
    let result = detector.detect(ctx, analysis);
    (detector.id(), result, start.elapsed())
}

async fn run_parallel(
    detectors: Vec<Arc<dyn Detector>>,
    ctx: &DetectContext,
    snapshot: Arc<Analysis>,
) -> Result<Vec<DetectorOutcome>, EngineError> {
    let mut join_set: JoinSet<DetectorOutcome> = JoinSet::new();

    for detector in detectors {
        let ctx = ctx.clone();
        let snapshot = Arc::clone(&snapshot);
        join_set.spawn_blocking(move || run_one(detector.as_ref(), &ctx, &snapshot));
    }

    let mut outcomes = Vec::with_capacity(join_set.len());
    loop {
        tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => {
                join_set.abort_all();
                return Err(EngineError::Cancelled);
            }
            joined = join_set.join_next() => match joined {
                Some(Ok(outcome)) => outcomes.push(outcome),
                Some(Err(e)) => return Err(EngineError::Join(e.to_string())),
                None => break,
            }
        }
    }
    Ok(outcomes)
}

async fn run_sequential(
    detectors: Vec<Arc<dyn Detector>>,
    ctx: &DetectContext,
    snapshot: Arc<Analysis>,
) -> Result<Vec<DetectorOutcome>, EngineError> {
    let ctx = ctx.clone();
    let worker = tokio::task::spawn_blocking(move || {
        let mut outcomes = Vec::with_capacity(detectors.len());
        for detector in detectors {
            if ctx.cancel.is_cancelled() {
                break;
            }
            outcomes.push(run_one(detector.as_ref(), &ctx, &snapshot));
        }
        (outcomes, ctx.cancel.is_cancelled())
    });

    let (outcomes, cancelled) = worker.await.map_err(|e| EngineError::Join(e.to_string()))?;
    if cancelled {
        return Err(EngineError::Cancelled);
    }
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ConventionSource, ProjectCommand};
    use crate::fs::FileInventory;
    use crate::detectors::DetectorOptions;
    use std::path::Path;
    use tokio_util::sync::CancellationToken;

    struct Fixed(Facet);

    impl Detector for Fixed {
        fn id(&self) -> DetectorId {
            self.0.detector()
        }

        fn detect(&self, _ctx: &DetectContext, _analysis: &Analysis) -> Result<Facet, DetectorError> {
            Ok(self.0.clone())
        }
    }

    struct Failing(DetectorId);

    impl Detector for Failing {
        fn id(&self) -> DetectorId {
            self.0
        }

        fn detect(&self, _ctx: &DetectContext, _analysis: &Analysis) -> Result<Facet, DetectorError> {
            Err(DetectorError::Other("boom".to_string()))
        }
    }

    fn empty_ctx() -> DetectContext {
        DetectContext::new(
            "/repo",
            Arc::new(FileInventory::new(Vec::new())),
            CancellationToken::new(),
            DetectorOptions::default(),
        )
    }

    /// Registry where every detector returns its empty facet
    fn quiet_registry() -> DetectorRegistry {
        DetectorId::all_variants()
            .iter()
            .fold(DetectorRegistry::with_defaults(), |registry, id| {
                registry.with_override(Arc::new(Fixed(Facet::empty(*id))))
            })
    }

    fn conventions(source: ConventionSource, text: &str) -> Facet {
        Facet::Conventions {
            source,
            items: vec![Convention::new(crate::analysis::ConventionCategory::Style, text)],
        }
    }

    #[tokio::test]
    async fn test_conventions_order_is_fixed_in_both_modes() {
        for mode in [ScheduleMode::Parallel, ScheduleMode::Sequential] {
            let registry = quiet_registry()
                .with_override(Arc::new(Fixed(conventions(ConventionSource::Framework, "framework"))))
                .with_override(Arc::new(Fixed(conventions(ConventionSource::Patterns, "patterns"))))
                .with_override(Arc::new(Fixed(conventions(ConventionSource::Base, "base"))));
            let scheduler = Scheduler::new(registry, mode);

            let mut analysis = Analysis::new(Path::new("/repo"));
            scheduler.run_all(&empty_ctx(), &mut analysis, &[]).await.unwrap();

            let order: Vec<_> = analysis.conventions.iter().map(|c| c.description.as_str()).collect();
            assert_eq!(order, vec!["base", "patterns", "framework"], "{:?}", mode);
        }
    }

    #[tokio::test]
    async fn test_soft_failure_resets_field() {
        let registry = quiet_registry().with_override(Arc::new(Failing(DetectorId::Commands)));
        let scheduler = Scheduler::new(registry, ScheduleMode::Parallel);

        let mut analysis = Analysis::new(Path::new("/repo"));
        analysis.commands.push(ProjectCommand::new("stale", "make stale"));
        scheduler.run_all(&empty_ctx(), &mut analysis, &[]).await.unwrap();

        assert!(analysis.commands.is_empty());
    }

    #[tokio::test]
    async fn test_soft_failure_aborts_when_requested() {
        let registry = quiet_registry().with_override(Arc::new(Failing(DetectorId::Readme)));
        let scheduler = Scheduler::new(registry, ScheduleMode::Parallel);

        let mut analysis = Analysis::new(Path::new("/repo"));
        let err = scheduler
            .run_subset(&empty_ctx(), &mut analysis, &[DetectorId::Readme], &[], SoftFailure::Abort)
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Detector { detector: DetectorId::Readme, .. }));
    }

    #[tokio::test]
    async fn test_stage_one_failure_is_fatal() {
        let registry = quiet_registry().with_override(Arc::new(Failing(DetectorId::Structure)));
        let scheduler = Scheduler::new(registry, ScheduleMode::Sequential);

        let mut analysis = Analysis::new(Path::new("/repo"));
        let err = scheduler.run_all(&empty_ctx(), &mut analysis, &[]).await.unwrap_err();

        assert!(matches!(err, EngineError::Detector { detector: DetectorId::Structure, .. }));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let ctx = empty_ctx();
        ctx.cancel.cancel();
        let scheduler = Scheduler::new(quiet_registry(), ScheduleMode::Parallel);

        let mut analysis = Analysis::new(Path::new("/repo"));
        let err = scheduler.run_all(&ctx, &mut analysis, &[]).await.unwrap_err();

        assert!(err.is_cancelled());
    }
}
