//! Per-workspace analysis of a monorepo

use super::engine::{Engine, EngineError};
use super::scheduler::ScheduleMode;
use crate::analysis::{Analysis, MonorepoInfo};
use crate::detectors::workspace_name;
use crate::progress::ProgressEvent;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Outcome of analysing one workspace
#[derive(Debug)]
pub struct WorkspaceResult {
    /// Position in the resolved workspace list
    pub index: usize,
    pub name: String,
    /// Root-relative directory
    pub path: String,
    pub result: Result<Analysis, EngineError>,
}

/// Resolves the workspace directories of a monorepo, relative to `root`
///
/// Workspace globs are expanded against the filesystem and only directories
/// are kept; each declared package then contributes its sub-packages (or
/// itself when it has none). The first occurrence of a path wins.
pub fn resolve_workspaces(root: &Path, info: &MonorepoInfo) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut resolved = Vec::new();
    let mut push = |path: String| {
        if !path.is_empty() && seen.insert(path.clone()) {
            resolved.push(path);
        }
    };

    for pattern in &info.workspaces {
        let Some(root_str) = root.to_str() else {
            continue;
        };
        let full = Path::new(&glob::Pattern::escape(root_str)).join(pattern);
        let Some(full) = full.to_str() else {
            continue;
        };
        let entries = match glob::glob(full) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(pattern = %pattern, error = %e, "Skipping invalid workspace pattern");
                continue;
            }
        };
        for path in entries.flatten() {
            if path.is_dir() {
                push(relative_path(root, &path));
            }
        }
    }

    for package in &info.packages {
        if package.sub_packages.is_empty() {
            if root.join(&package.path).is_dir() {
                push(package.path.clone());
            }
            continue;
        }
        for sub in &package.sub_packages {
            let joined = format!("{}/{}", package.path.trim_end_matches('/'), sub);
            if root.join(&joined).is_dir() {
                push(joined);
            }
        }
    }

    resolved
}

fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Runs the full pipeline once per workspace
pub struct WorkspaceOrchestrator {
    engine: Arc<Engine>,
    concurrency: usize,
}

impl WorkspaceOrchestrator {
    pub fn new(engine: Arc<Engine>) -> Self {
        let concurrency = engine.options().monorepo_concurrency.max(1);
        Self { engine, concurrency }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Analyses every workspace of `info`, returning results in workspace order
    pub async fn analyze(
        &self,
        root: &Path,
        info: &MonorepoInfo,
        cancel: CancellationToken,
    ) -> Vec<WorkspaceResult> {
        let workspaces = resolve_workspaces(root, info);
        let total = workspaces.len();
        debug!(total, concurrency = self.concurrency, "Resolved workspaces");

        let mut results = match self.engine.options().schedule {
            ScheduleMode::Parallel => self.run_parallel(root, workspaces, cancel).await,
            ScheduleMode::Sequential => self.run_sequential(root, workspaces, cancel).await,
        };
        results.sort_by_key(|r| r.index);
        results
    }

    async fn run_sequential(
        &self,
        root: &Path,
        workspaces: Vec<String>,
        cancel: CancellationToken,
    ) -> Vec<WorkspaceResult> {
        let total = workspaces.len();
        let mut results = Vec::with_capacity(total);
        for (index, path) in workspaces.into_iter().enumerate() {
            let dir = root.join(&path);
            if cancel.is_cancelled() {
                results.push(skipped(index, &dir, path));
                continue;
            }
            results.push(analyze_workspace(&self.engine, index, total, dir, path, cancel.clone()).await);
        }
        results
    }

    async fn run_parallel(
        &self,
        root: &Path,
        workspaces: Vec<String>,
        cancel: CancellationToken,
    ) -> Vec<WorkspaceResult> {
        let total = workspaces.len();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut join_set: JoinSet<WorkspaceResult> = JoinSet::new();

        let mut tasks = HashMap::new();
        for (index, path) in workspaces.into_iter().enumerate() {
            let engine = Arc::clone(&self.engine);
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            let dir = root.join(&path);
            let task_dir = dir.clone();
            let task_path = path.clone();

            let handle = join_set.spawn(async move {
                let permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    permit = semaphore.acquire_owned() => permit.ok(),
                };
                let Some(_permit) = permit else {
                    return skipped(index, &task_dir, task_path);
                };
                if cancel.is_cancelled() {
                    return skipped(index, &task_dir, task_path);
                }
                analyze_workspace(&engine, index, total, task_dir, task_path, cancel).await
            });
            tasks.insert(handle.id(), (index, dir, path));
        }

        let mut results = Vec::with_capacity(total);
        while let Some(joined) = join_set.join_next_with_id().await {
            match joined {
                Ok((_, result)) => results.push(result),
                Err(e) => {
                    warn!(error = %e, "Workspace task failed");
                    if let Some((index, dir, path)) = tasks.remove(&e.id()) {
                        results.push(WorkspaceResult {
                            index,
                            name: workspace_name(&dir),
                            path,
                            result: Err(EngineError::Join(e.to_string())),
                        });
                    }
                }
            }
        }
        results
    }
}

async fn analyze_workspace(
    engine: &Engine,
    index: usize,
    total: usize,
    dir: PathBuf,
    path: String,
    cancel: CancellationToken,
) -> WorkspaceResult {
    let name = workspace_name(&dir);
    let start = Instant::now();
    if let Some(handler) = engine.progress() {
        handler.on_progress(&ProgressEvent::WorkspaceStarted {
            workspace: name.clone(),
            index,
            total,
        });
    }

    let result = engine.analyze(&dir, cancel).await;
    match &result {
        Ok(_) => {
            if let Some(handler) = engine.progress() {
                handler.on_progress(&ProgressEvent::WorkspaceComplete {
                    workspace: name.clone(),
                    index,
                    total,
                    duration: start.elapsed(),
                });
            }
        }
        Err(e) if e.is_cancelled() => {}
        Err(e) => warn!(workspace = %name, error = %e, "Workspace analysis failed"),
    }

    WorkspaceResult {
        index,
        name,
        path,
        result,
    }
}

fn skipped(index: usize, dir: &Path, path: String) -> WorkspaceResult {
    WorkspaceResult {
        index,
        name: workspace_name(dir),
        path,
        result: Err(EngineError::Cancelled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{MonorepoTool, WorkspacePackage};
    use crate::progress::ProgressHandler;
    use std::fs;
    use tempfile::TempDir;

    fn info(workspaces: &[&str], packages: Vec<WorkspacePackage>) -> MonorepoInfo {
        MonorepoInfo {
            tool: MonorepoTool::PnpmWorkspaces,
            workspaces: workspaces.iter().map(|w| w.to_string()).collect(),
            packages,
        }
    }

    #[test]
    fn test_globs_keep_directories_only() {
        let dir = TempDir::new().unwrap();
        for d in ["packages/a", "packages/b"] {
            fs::create_dir_all(dir.path().join(d)).unwrap();
        }
        fs::write(dir.path().join("packages/README.md"), "").unwrap();

        let resolved = resolve_workspaces(dir.path(), &info(&["packages/*"], Vec::new()));
        assert_eq!(resolved, vec!["packages/a", "packages/b"]);
    }

    #[test]
    fn test_sub_packages_joined_and_deduplicated() {
        let dir = TempDir::new().unwrap();
        for d in ["packages/a", "packages/tools/cli", "packages/tools/lint"] {
            fs::create_dir_all(dir.path().join(d)).unwrap();
        }
        let packages = vec![
            WorkspacePackage {
                name: "a".to_string(),
                path: "packages/a".to_string(),
                description: None,
                sub_packages: Vec::new(),
            },
            WorkspacePackage {
                name: "tools".to_string(),
                path: "packages/tools".to_string(),
                description: None,
                sub_packages: vec!["cli".to_string(), "lint".to_string()],
            },
        ];

        let resolved = resolve_workspaces(dir.path(), &info(&["packages/*"], packages));
        assert_eq!(
            resolved,
            vec!["packages/a", "packages/tools", "packages/tools/cli", "packages/tools/lint"]
        );
    }

    #[tokio::test]
    async fn test_cancelled_workspaces_report_cancellation() {
        let dir = TempDir::new().unwrap();
        for d in ["apps/web", "apps/api"] {
            fs::create_dir_all(dir.path().join(d)).unwrap();
        }
        let cancel = CancellationToken::new();
        cancel.cancel();

        let orchestrator = WorkspaceOrchestrator::new(Arc::new(Engine::default()));
        let results = orchestrator
            .analyze(dir.path(), &info(&["apps/*"], Vec::new()), cancel)
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].path, "apps/api");
        assert_eq!(results[0].name, "api");
        assert!(results.iter().all(|r| matches!(r.result, Err(EngineError::Cancelled))));
    }

    #[test]
    fn test_root_with_glob_metacharacters() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("repo [v2]*");
        for d in ["packages/a", "packages/b"] {
            fs::create_dir_all(root.join(d)).unwrap();
        }

        let resolved = resolve_workspaces(&root, &info(&["packages/*"], Vec::new()));
        assert_eq!(resolved, vec!["packages/a", "packages/b"]);
    }

    struct PanicsOn(&'static str);

    impl ProgressHandler for PanicsOn {
        fn on_progress(&self, event: &ProgressEvent) {
            if let ProgressEvent::WorkspaceStarted { workspace, .. } = event {
                if workspace == self.0 {
                    panic!("handler failed for {}", workspace);
                }
            }
        }
    }

    #[tokio::test]
    async fn test_panicked_workspace_still_reported() {
        let dir = TempDir::new().unwrap();
        for d in ["apps/api", "apps/web"] {
            fs::create_dir_all(dir.path().join(d)).unwrap();
            fs::write(dir.path().join(d).join("main.go"), "package main\n").unwrap();
        }
        let engine = Engine::default().with_progress(Arc::new(PanicsOn("web")));

        let results = WorkspaceOrchestrator::new(Arc::new(engine))
            .analyze(dir.path(), &info(&["apps/*"], Vec::new()), CancellationToken::new())
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].path, "apps/api");
        assert!(results[0].result.is_ok());
        assert_eq!(results[1].path, "apps/web");
        assert_eq!(results[1].name, "web");
        assert!(matches!(results[1].result, Err(EngineError::Join(_))));
    }

    #[test]
    fn test_concurrency_never_zero() {
        let orchestrator = WorkspaceOrchestrator::new(Arc::new(Engine::default())).with_concurrency(0);
        assert_eq!(orchestrator.concurrency(), 1);
    }
}
