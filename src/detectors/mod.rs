//! Detectors: independent extractors for one facet of the analysis each
//!
//! A detector reads the shared [`FileInventory`] (and file bytes through
//! [`DetectContext`]) and returns a [`Facet`]. Detectors never mutate the
//! `Analysis` they are given; the scheduler applies facets after each stage.
//! Stage 3 detectors read fields produced by earlier stages.

mod architecture;
mod cli;
mod code_patterns;
mod commands;
mod config_files;
mod conventions;
mod dependencies;
mod development;
mod endpoints;
mod framework_patterns;
mod git;
mod monorepo;
mod patterns;
mod project_tools;
mod readme;
mod structure;
mod tech_stack;

pub use architecture::ArchitectureDetector;
pub use cli::CliDetector;
pub use code_patterns::CodePatternsDetector;
pub use commands::CommandsDetector;
pub use config_files::{is_tool_config, ConfigFilesDetector};
pub use conventions::ConventionsDetector;
pub use dependencies::{is_vendored_path, DependenciesDetector};
pub use development::DevelopmentDetector;
pub use endpoints::EndpointsDetector;
pub use framework_patterns::FrameworkPatternsDetector;
pub use git::GitDetector;
pub use monorepo::{workspace_name, MonorepoDetector};
pub use patterns::PatternsDetector;
pub use project_tools::ProjectToolsDetector;
pub use readme::ReadmeDetector;
pub use structure::StructureDetector;
pub use tech_stack::{collect_manifest_dependencies, TechStackDetector};

use crate::analysis::{Analysis, Facet};
use crate::fs::{FileEntry, FileInventory};
use crate::stack::ManifestError;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

crate::define_id_enum! {
    /// Every detector, in canonical order
    DetectorId {
        TechStack => "tech-stack" : "TechStack",
        Structure => "structure" : "Structure",
        Commands => "commands" : "Commands",
        Dependencies => "dependencies" : "Dependencies",
        Conventions => "conventions" : "Conventions",
        Patterns => "patterns" : "Patterns",
        FrameworkPatterns => "framework-patterns" : "FrameworkPatterns",
        CodePatterns => "code-patterns" : "CodePatterns",
        Endpoints => "endpoints" : "Endpoints",
        Readme => "readme" : "README",
        Monorepo => "monorepo" : "Monorepo",
        Git => "git" : "Git",
        Architecture => "architecture" : "Architecture",
        Development => "development" : "Development",
        ConfigFiles => "config-files" : "ConfigFiles",
        Cli => "cli" : "CLI",
        ProjectTools => "project-tools" : "ProjectTools",
    }
}

/// Detectors with no prerequisites
pub const STAGE_ONE: &[DetectorId] = &[DetectorId::TechStack, DetectorId::Structure];

/// Detectors that only need the inventory, run after stage one
pub const STAGE_TWO: &[DetectorId] = &[
    DetectorId::Commands,
    DetectorId::Dependencies,
    DetectorId::Conventions,
    DetectorId::Patterns,
    DetectorId::FrameworkPatterns,
    DetectorId::CodePatterns,
    DetectorId::Endpoints,
    DetectorId::Readme,
    DetectorId::Monorepo,
    DetectorId::Git,
    DetectorId::Architecture,
    DetectorId::Development,
    DetectorId::ConfigFiles,
];

/// Detectors that read stage one and two outputs
pub const STAGE_THREE: &[DetectorId] = &[DetectorId::Cli, DetectorId::ProjectTools];

pub const STAGES: &[&[DetectorId]] = &[STAGE_ONE, STAGE_TWO, STAGE_THREE];

impl DetectorId {
    /// 1-based stage this detector runs in
    pub fn stage(&self) -> usize {
        STAGES
            .iter()
            .position(|stage| stage.contains(self))
            .map(|idx| idx + 1)
            .unwrap_or(STAGES.len())
    }

    pub fn failure_mode(&self) -> FailureMode {
        match self {
            Self::TechStack | Self::Structure => FailureMode::Fatal,
            _ => FailureMode::Soft,
        }
    }
}

/// How the scheduler treats a detector error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Aborts the pipeline
    Fatal,
    /// Resets the detector's field and continues
    Soft,
}

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {file}: {source}")]
    Manifest {
        file: String,
        #[source]
        source: ManifestError,
    },

    #[error("failed to parse {file}: {message}")]
    Parse { file: String, message: String },

    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error("cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

impl DetectorError {
    pub fn manifest(file: impl Into<String>, source: ManifestError) -> Self {
        Self::Manifest {
            file: file.into(),
            source,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Files larger than this are not read when sampling source code
pub const MAX_SOURCE_BYTES: u64 = 512 * 1024;

/// Tunables shared by every detector in a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectorOptions {
    /// Example paths kept per pattern
    pub max_examples: usize,
    /// Commits sampled for commit style classification
    pub max_commits: usize,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            max_examples: 5,
            max_commits: 20,
        }
    }
}

/// Read-only state handed to every detector
#[derive(Debug, Clone)]
pub struct DetectContext {
    pub root: PathBuf,
    pub inventory: Arc<FileInventory>,
    pub cancel: CancellationToken,
    pub options: DetectorOptions,
}

impl DetectContext {
    pub fn new(
        root: impl Into<PathBuf>,
        inventory: Arc<FileInventory>,
        cancel: CancellationToken,
        options: DetectorOptions,
    ) -> Self {
        Self {
            root: root.into(),
            inventory,
            cancel,
            options,
        }
    }

    pub fn check_cancelled(&self) -> Result<(), DetectorError> {
        if self.cancel.is_cancelled() {
            Err(DetectorError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub fn abs(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Reads a root-relative file, checking cancellation first
    pub fn read_to_string(&self, relative: &str) -> Result<String, DetectorError> {
        self.check_cancelled()?;
        let path = self.abs(relative);
        std::fs::read_to_string(&path).map_err(|source| DetectorError::Io { path, source })
    }

    /// Reads a file only when the inventory lists it
    pub fn read_if_present(&self, relative: &str) -> Result<Option<String>, DetectorError> {
        if !self.inventory.has_file(relative) {
            return Ok(None);
        }
        self.read_to_string(relative).map(Some)
    }

    /// Reads a manifest or version file
    ///
    /// Files that are not valid UTF-8, or that vanished after the walk, are
    /// logged and yield `None`.
    pub fn read_manifest(&self, relative: &str) -> Result<Option<String>, DetectorError> {
        match self.read_to_string(relative) {
            Ok(content) => Ok(Some(content)),
            Err(DetectorError::Io { source, .. })
                if matches!(
                    source.kind(),
                    io::ErrorKind::InvalidData | io::ErrorKind::NotFound
                ) =>
            {
                debug!(file = %relative, error = %source, "Skipping unreadable manifest");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Reads a source file for sampling
    ///
    /// Oversized files and files that are not valid UTF-8 yield `None`.
    pub fn read_source(&self, entry: &FileEntry) -> Result<Option<String>, DetectorError> {
        if entry.size > MAX_SOURCE_BYTES {
            return Ok(None);
        }
        self.check_cancelled()?;
        match std::fs::read_to_string(self.abs(&entry.path)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::InvalidData => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(DetectorError::Io {
                path: self.abs(&entry.path),
                source,
            }),
        }
    }

    pub fn root_path(&self) -> &Path {
        &self.root
    }
}

/// One facet extractor
pub trait Detector: Send + Sync {
    fn id(&self) -> DetectorId;

    fn failure_mode(&self) -> FailureMode {
        self.id().failure_mode()
    }

    /// Computes this detector's facet. `analysis` holds everything earlier
    /// stages produced.
    fn detect(&self, ctx: &DetectContext, analysis: &Analysis) -> Result<Facet, DetectorError>;
}

/// Instantiates the detector for `id`
pub fn detector_for(id: DetectorId) -> Arc<dyn Detector> {
    match id {
        DetectorId::TechStack => Arc::new(TechStackDetector),
        DetectorId::Structure => Arc::new(StructureDetector),
        DetectorId::Commands => Arc::new(CommandsDetector),
        DetectorId::Dependencies => Arc::new(DependenciesDetector),
        DetectorId::Conventions => Arc::new(ConventionsDetector),
        DetectorId::Patterns => Arc::new(PatternsDetector),
        DetectorId::FrameworkPatterns => Arc::new(FrameworkPatternsDetector),
        DetectorId::CodePatterns => Arc::new(CodePatternsDetector),
        DetectorId::Endpoints => Arc::new(EndpointsDetector),
        DetectorId::Readme => Arc::new(ReadmeDetector),
        DetectorId::Monorepo => Arc::new(MonorepoDetector),
        DetectorId::Git => Arc::new(GitDetector),
        DetectorId::Architecture => Arc::new(ArchitectureDetector),
        DetectorId::Development => Arc::new(DevelopmentDetector),
        DetectorId::ConfigFiles => Arc::new(ConfigFilesDetector),
        DetectorId::Cli => Arc::new(CliDetector),
        DetectorId::ProjectTools => Arc::new(ProjectToolsDetector),
    }
}

/// Detector set used by a run
#[derive(Clone)]
pub struct DetectorRegistry {
    detectors: Vec<Arc<dyn Detector>>,
}

impl DetectorRegistry {
    pub fn with_defaults() -> Self {
        Self {
            detectors: DetectorId::all_variants()
                .iter()
                .map(|id| detector_for(*id))
                .collect(),
        }
    }

    /// Registry with one detector replaced, used to inject failures in tests
    pub fn with_override(mut self, detector: Arc<dyn Detector>) -> Self {
        let id = detector.id();
        match self.detectors.iter().position(|d| d.id() == id) {
            Some(idx) => self.detectors[idx] = detector,
            None => self.detectors.push(detector),
        }
        self
    }

    pub fn get(&self, id: DetectorId) -> Option<Arc<dyn Detector>> {
        self.detectors.iter().find(|d| d.id() == id).cloned()
    }

    /// Detectors for `ids`, in the order given
    pub fn select(&self, ids: &[DetectorId]) -> Vec<Arc<dyn Detector>> {
        ids.iter().filter_map(|id| self.get(*id)).collect()
    }
}

impl Default for DetectorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for DetectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.detectors.iter().map(|d| d.id()))
            .finish()
    }
}

/// Keeps the first `max` paths in inventory order
pub(crate) fn take_examples<'a>(paths: impl IntoIterator<Item = &'a str>, max: usize) -> Vec<String> {
    paths.into_iter().take(max).map(String::from).collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Writes `files` under a fresh temp dir and returns a context over it
    pub fn context_with(files: &[(&str, &str)]) -> (TempDir, DetectContext) {
        let dir = TempDir::new().unwrap();
        for (path, content) in files {
            let full = dir.path().join(path);
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(full, content).unwrap();
        }
        let inventory = crate::fs::walk(dir.path(), &[]).unwrap();
        let ctx = DetectContext::new(
            dir.path(),
            Arc::new(inventory),
            CancellationToken::new(),
            DetectorOptions::default(),
        );
        (dir, ctx)
    }

    pub fn empty_analysis(ctx: &DetectContext) -> Analysis {
        Analysis::new(&ctx.root)
    }
}
