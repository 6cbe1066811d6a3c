use super::scheduler::{ScheduleMode, Scheduler, SoftFailure};
use crate::analysis::{Analysis, Convention, ConventionCategory, Framework, FrameworkCategory, Language, ReadmeContent};
use crate::detectors::{DetectContext, DetectorError, DetectorId, DetectorOptions, DetectorRegistry};
use crate::fs::{self, InventoryError};
use crate::progress::{ProgressEvent, ProgressHandler};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error("{detector} detector failed: {source}")]
    Detector {
        detector: DetectorId,
        #[source]
        source: DetectorError,
    },

    #[error("Analysis cancelled")]
    Cancelled,

    #[error("Worker task failed: {0}")]
    Join(String),

    #[error("Analysis cache lock poisoned")]
    LockPoisoned,
}

impl EngineError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Values that replace or extend what the detectors found
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisOverrides {
    pub project_name: Option<String>,
    pub description: Option<String>,
    /// Added to the tech stack when absent
    pub language: Option<String>,
    /// Added to the tech stack when absent
    pub framework: Option<String>,
}

/// Runtime knobs for one engine
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Gitignore-style patterns added to the default excludes
    pub extra_ignores: Vec<String>,
    pub detector: DetectorOptions,
    pub schedule: ScheduleMode,
    /// Workspaces analysed at once by the monorepo orchestrator
    pub monorepo_concurrency: usize,
    /// Appended after detector conventions on every run
    pub custom_conventions: Vec<String>,
    pub overrides: AnalysisOverrides,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            extra_ignores: Vec::new(),
            detector: DetectorOptions::default(),
            schedule: ScheduleMode::Parallel,
            monorepo_concurrency: 4,
            custom_conventions: Vec::new(),
            overrides: AnalysisOverrides::default(),
        }
    }
}

/// Runs the full detector pipeline over a repository
///
/// Each call to [`Engine::analyze`] walks the tree afresh and builds a new
/// `Analysis`; the engine keeps no state between runs.
pub struct Engine {
    options: EngineOptions,
    scheduler: Scheduler,
    progress: Option<Arc<dyn ProgressHandler>>,
}

impl Engine {
    pub fn new(options: EngineOptions) -> Self {
        let scheduler = Scheduler::new(DetectorRegistry::with_defaults(), options.schedule);
        Self {
            options,
            scheduler,
            progress: None,
        }
    }

    /// Replaces the detector set, used to inject failures and probes
    pub fn with_registry(mut self, registry: DetectorRegistry) -> Self {
        self.scheduler = Scheduler::new(registry, self.options.schedule);
        if let Some(handler) = &self.progress {
            self.scheduler = self.scheduler.with_progress(Arc::clone(handler));
        }
        self
    }

    pub fn with_progress(mut self, handler: Arc<dyn ProgressHandler>) -> Self {
        self.scheduler = self.scheduler.with_progress(Arc::clone(&handler));
        self.progress = Some(handler);
        self
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub(crate) fn progress(&self) -> Option<&Arc<dyn ProgressHandler>> {
        self.progress.as_ref()
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(handler) = &self.progress {
            handler.on_progress(&event);
        }
    }

    /// Full analysis of `root`
    pub async fn analyze(&self, root: &Path, cancel: CancellationToken) -> Result<Analysis, EngineError> {
        let start = Instant::now();
        let root = resolve_root(root);
        self.emit(ProgressEvent::Started {
            repo_path: root.display().to_string(),
        });

        let result = self.analyze_inner(&root, cancel).await;
        match &result {
            Ok(analysis) => {
                info!(
                    project = %analysis.project_name,
                    languages = analysis.tech_stack.languages.len(),
                    conventions = analysis.conventions.len(),
                    "Analysis finished"
                );
                self.emit(ProgressEvent::Completed {
                    total_time: start.elapsed(),
                });
            }
            Err(e) => {
                if !e.is_cancelled() {
                    error!(root = %root.display(), error = %e, "Analysis failed");
                }
                self.emit(ProgressEvent::Failed { error: e.to_string() });
            }
        }
        result
    }

    async fn analyze_inner(&self, root: &Path, cancel: CancellationToken) -> Result<Analysis, EngineError> {
        let ctx = self.prepare(root, cancel).await?;
        let mut analysis = Analysis::new(root);
        self.scheduler
            .run_all(&ctx, &mut analysis, &self.custom_conventions())
            .await?;
        self.apply_overrides(&mut analysis);
        Ok(analysis)
    }

    /// Walks `root` and builds the context every detector shares
    pub(crate) async fn prepare(&self, root: &Path, cancel: CancellationToken) -> Result<DetectContext, EngineError> {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        let walk_root = root.to_path_buf();
        let ignores = self.options.extra_ignores.clone();
        let inventory = tokio::task::spawn_blocking(move || fs::walk(&walk_root, &ignores))
            .await
            .map_err(|e| EngineError::Join(e.to_string()))??;

        Ok(DetectContext::new(
            root,
            Arc::new(inventory),
            cancel,
            self.options.detector.clone(),
        ))
    }

    /// Re-runs `ids` into `analysis`; any detector failure aborts
    pub(crate) async fn rerun(
        &self,
        ctx: &DetectContext,
        analysis: &mut Analysis,
        ids: &[DetectorId],
    ) -> Result<(), EngineError> {
        self.scheduler
            .run_subset(ctx, analysis, ids, &self.custom_conventions(), SoftFailure::Abort)
            .await?;
        self.apply_overrides(analysis);
        Ok(())
    }

    fn custom_conventions(&self) -> Vec<Convention> {
        self.options
            .custom_conventions
            .iter()
            .map(|text| Convention::new(ConventionCategory::Custom, text.clone()))
            .collect()
    }

    /// Applies configured overrides; a no-op when the record already agrees
    pub fn apply_overrides(&self, analysis: &mut Analysis) {
        let overrides = &self.options.overrides;

        if let Some(name) = &overrides.project_name {
            analysis.project_name = name.clone();
        }

        if let Some(description) = &overrides.description {
            let current = analysis.readme_content.as_ref().and_then(|r| r.description.as_ref());
            if current != Some(description) {
                let mut readme = analysis
                    .readme_content
                    .as_deref()
                    .cloned()
                    .unwrap_or_else(ReadmeContent::default);
                readme.description = Some(description.clone());
                analysis.readme_content = Some(Arc::new(readme));
            }
        }

        if let Some(language) = &overrides.language {
            if !analysis.has_language(language) {
                Arc::make_mut(&mut analysis.tech_stack).languages.push(Language {
                    name: language.clone(),
                    version: None,
                    percentage: 0.0,
                });
            }
        }

        if let Some(framework) = &overrides.framework {
            if !analysis.has_framework(framework) {
                Arc::make_mut(&mut analysis.tech_stack).frameworks.push(Framework {
                    name: framework.clone(),
                    version: None,
                    category: FrameworkCategory::Other,
                });
            }
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineOptions::default())
    }
}

/// Absolute form of `root` when it exists, so the project name is never `.`
fn resolve_root(root: &Path) -> PathBuf {
    root.canonicalize().unwrap_or_else(|_| root.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as stdfs;
    use tempfile::TempDir;

    fn go_repo() -> TempDir {
        let dir = TempDir::new().unwrap();
        stdfs::write(dir.path().join("go.mod"), "module test\n\ngo 1.21\n").unwrap();
        stdfs::write(dir.path().join("main.go"), "package main\n\nfunc main() {}\n").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_missing_root_is_input_error() {
        let err = Engine::default()
            .analyze(Path::new("/definitely/not/here"), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Inventory(InventoryError::PathNotFound(_))));
    }

    #[tokio::test]
    async fn test_cancelled_token_yields_no_analysis() {
        let dir = go_repo();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = Engine::default().analyze(dir.path(), cancel).await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_overrides_and_custom_conventions() {
        let dir = go_repo();
        let options = EngineOptions {
            custom_conventions: vec!["Wrap errors with context".to_string()],
            overrides: AnalysisOverrides {
                project_name: Some("billing".to_string()),
                description: Some("Billing service".to_string()),
                language: Some("Go".to_string()),
                framework: Some("Kratos".to_string()),
            },
            ..EngineOptions::default()
        };

        let analysis = Engine::new(options)
            .analyze(dir.path(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(analysis.project_name, "billing");
        assert_eq!(
            analysis.readme_content.as_ref().and_then(|r| r.description.as_deref()),
            Some("Billing service")
        );
        assert_eq!(analysis.tech_stack.languages.len(), 1);
        assert!(analysis.has_framework("Kratos"));
        assert!(analysis.tech_stack.total_percentage() <= 100.0);

        let last = analysis.conventions.last().unwrap();
        assert_eq!(last.category, ConventionCategory::Custom);
        assert_eq!(last.description, "Wrap errors with context");
    }

    #[tokio::test]
    async fn test_overrides_leave_matching_record_shared() {
        let dir = go_repo();
        let engine = Engine::new(EngineOptions {
            overrides: AnalysisOverrides {
                language: Some("Go".to_string()),
                ..AnalysisOverrides::default()
            },
            ..EngineOptions::default()
        });
        let mut analysis = engine.analyze(dir.path(), CancellationToken::new()).await.unwrap();
        let before = Arc::clone(&analysis.tech_stack);

        engine.apply_overrides(&mut analysis);

        assert!(Arc::ptr_eq(&before, &analysis.tech_stack));
    }
}
