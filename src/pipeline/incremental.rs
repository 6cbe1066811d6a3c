//! Incremental re-analysis driven by a single changed path
//!
//! A changed path is classified into impact tags without touching the disk.
//! Each tag maps to the detectors whose output can depend on that kind of
//! file; only those re-run, into a working copy of the cached `Analysis`.

use super::engine::{Engine, EngineError};
use crate::analysis::Analysis;
use crate::config::CONFIG_FILE_NAME;
use crate::detectors::{is_tool_config, DetectorId};
use crate::stack::is_source_ext;
use crate::stack::manifest::MANIFEST_FILES;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

crate::define_id_enum! {
    /// Kind of re-analysis a file change calls for
    Impact {
        All => "all" : "All",
        TechStack => "techstack" : "Tech stack",
        Structure => "structure" : "Structure",
        Commands => "commands" : "Commands",
        Conventions => "conventions" : "Conventions",
        Endpoints => "endpoints" : "Endpoints",
        Config => "config" : "Config",
        Development => "development" : "Development",
        Readme => "readme" : "README",
        Git => "git" : "Git",
    }
}

/// Impact tags, iterated in declaration order
pub type ImpactSet = BTreeSet<Impact>;

impl Impact {
    /// Detectors re-run for this tag; empty for `All`, which means a full run
    pub fn detectors(&self) -> &'static [DetectorId] {
        match self {
            Self::All => &[],
            Self::TechStack => &[DetectorId::TechStack, DetectorId::Dependencies],
            Self::Structure => &[DetectorId::Structure, DetectorId::Monorepo, DetectorId::Architecture],
            Self::Commands => &[DetectorId::Commands],
            Self::Conventions => &[
                DetectorId::Conventions,
                DetectorId::Patterns,
                DetectorId::FrameworkPatterns,
                DetectorId::CodePatterns,
            ],
            Self::Endpoints => &[DetectorId::Endpoints],
            Self::Config => &[DetectorId::ConfigFiles],
            Self::Development => &[DetectorId::Development, DetectorId::Cli],
            Self::Readme => &[DetectorId::Readme, DetectorId::ProjectTools],
            Self::Git => &[DetectorId::Git],
        }
    }
}

/// Lockfiles and requirement files that change resolved dependencies
const DEPENDENCY_FILES: &[&str] = &[
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "bun.lockb",
    "go.sum",
    "Cargo.lock",
    "poetry.lock",
    "uv.lock",
    "Pipfile.lock",
    "Gemfile.lock",
    "composer.lock",
    "requirements-dev.txt",
];

const MAKEFILES: &[&str] = &["Makefile", "makefile", "GNUmakefile"];

const HOOK_DIRS: &[&str] = &[".githooks", ".husky"];

const HOOK_FILES: &[&str] = &["lefthook.yml", ".pre-commit-config.yaml"];

fn set(tags: &[Impact]) -> ImpactSet {
    tags.iter().copied().collect()
}

/// Classifies a changed path, relative or absolute, into impact tags
///
/// Looks at the path text only. A path without an extension is assumed to be
/// a directory.
pub fn classify_impact(changed: &str) -> ImpactSet {
    let normalized = changed.replace('\\', "/");
    let normalized = normalized.trim_start_matches("./").trim_end_matches('/');
    let segments: Vec<&str> = normalized.split('/').filter(|s| !s.is_empty()).collect();
    let Some(name) = segments.last().copied() else {
        return ImpactSet::new();
    };

    if name == CONFIG_FILE_NAME {
        return set(&[Impact::All]);
    }
    if MANIFEST_FILES.contains(&name) || DEPENDENCY_FILES.contains(&name) {
        return set(&[Impact::TechStack, Impact::Development]);
    }
    if MAKEFILES.contains(&name) {
        return set(&[Impact::Commands, Impact::Development]);
    }
    if name.to_lowercase().starts_with("readme") {
        return set(&[Impact::Readme]);
    }
    if segments.iter().any(|s| HOOK_DIRS.contains(s)) || HOOK_FILES.contains(&name) {
        return set(&[Impact::Development]);
    }
    if segments.contains(&".github") {
        return set(&[Impact::Config]);
    }
    if is_tool_config(normalized) {
        return set(&[Impact::Config, Impact::Development]);
    }

    match Path::new(name).extension().and_then(|e| e.to_str()) {
        Some(ext) if is_source_ext(&ext.to_lowercase()) => set(&[Impact::Conventions, Impact::Endpoints]),
        Some(_) => ImpactSet::new(),
        None => set(&[Impact::Structure]),
    }
}

/// Detectors for `impacts`, deduplicated, in canonical order
pub fn detectors_for(impacts: &ImpactSet) -> Vec<DetectorId> {
    let selected: BTreeSet<DetectorId> = impacts
        .iter()
        .flat_map(|impact| impact.detectors().iter().copied())
        .collect();
    selected.into_iter().collect()
}

/// Engine that keeps the last `Analysis` and re-runs only what a change
/// affects
pub struct IncrementalEngine {
    engine: Engine,
    root: PathBuf,
    cache: RwLock<Option<Arc<Analysis>>>,
}

impl IncrementalEngine {
    pub fn new(engine: Engine, root: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            root: root.into(),
            cache: RwLock::new(None),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The last committed analysis, if any
    pub fn cached(&self) -> Result<Option<Arc<Analysis>>, EngineError> {
        let guard = self.cache.read().map_err(|_| EngineError::LockPoisoned)?;
        Ok(guard.clone())
    }

    fn store(&self, analysis: Analysis) -> Result<Arc<Analysis>, EngineError> {
        let analysis = Arc::new(analysis);
        let mut guard = self.cache.write().map_err(|_| EngineError::LockPoisoned)?;
        *guard = Some(Arc::clone(&analysis));
        Ok(analysis)
    }

    /// Full analysis; replaces the cache
    pub async fn analyze_full(&self, cancel: CancellationToken) -> Result<Arc<Analysis>, EngineError> {
        let analysis = self.engine.analyze(&self.root, cancel).await?;
        self.store(analysis)
    }

    /// Re-analyses after `changed` was modified
    ///
    /// Without a cached analysis, or when the change affects everything, this
    /// is a full run reported as `{all}`. A failing partial run also falls
    /// back to a full run; a partial result is never cached.
    pub async fn analyze_incremental(
        &self,
        changed: &str,
        cancel: CancellationToken,
    ) -> Result<(Arc<Analysis>, ImpactSet), EngineError> {
        let Some(cached) = self.cached()? else {
            debug!("No cached analysis, running full analysis");
            return self.full_as_all(cancel).await;
        };

        let relative = self.relative(changed);
        let impacts = classify_impact(&relative);
        if impacts.contains(&Impact::All) {
            info!(path = %relative, "Change affects everything, running full analysis");
            return self.full_as_all(cancel).await;
        }
        if impacts.is_empty() {
            debug!(path = %relative, "Change has no impact");
            return Ok((cached, impacts));
        }

        let ids = detectors_for(&impacts);
        let tags: Vec<&str> = impacts.iter().map(|i| i.as_str()).collect();
        info!(path = %relative, impacts = ?tags, detectors = ids.len(), "Incremental analysis");

        match self.partial(&cached, &ids, cancel.clone()).await {
            Ok(working) => Ok((self.store(working)?, impacts)),
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                warn!(error = %e, "Partial re-analysis failed, falling back to full analysis");
                self.full_as_all(cancel).await
            }
        }
    }

    async fn partial(
        &self,
        cached: &Analysis,
        ids: &[DetectorId],
        cancel: CancellationToken,
    ) -> Result<Analysis, EngineError> {
        let ctx = self.engine.prepare(&cached.root_path, cancel).await?;
        let mut working = cached.clone();
        self.engine.rerun(&ctx, &mut working, ids).await?;
        Ok(working)
    }

    async fn full_as_all(&self, cancel: CancellationToken) -> Result<(Arc<Analysis>, ImpactSet), EngineError> {
        let analysis = self.analyze_full(cancel).await?;
        Ok((analysis, set(&[Impact::All])))
    }

    fn relative(&self, changed: &str) -> String {
        let path = Path::new(changed);
        if let Ok(stripped) = path.strip_prefix(&self.root) {
            return stripped.to_string_lossy().to_string();
        }
        if let Ok(root) = self.root.canonicalize() {
            if let Ok(stripped) = path.strip_prefix(root) {
                return stripped.to_string_lossy().to_string();
            }
        }
        changed.to_string()
    }
}
