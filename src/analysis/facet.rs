//! Detector outputs and the serial merge into an `Analysis`

use super::*;
use crate::detectors::DetectorId;

/// Which detector contributed a slice of conventions
///
/// Slices are merged in declaration order, so base conventions always precede
/// pattern conventions, which precede framework conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConventionSource {
    Base,
    Patterns,
    Framework,
}

impl ConventionSource {
    pub fn detector(self) -> DetectorId {
        match self {
            Self::Base => DetectorId::Conventions,
            Self::Patterns => DetectorId::Patterns,
            Self::Framework => DetectorId::FrameworkPatterns,
        }
    }
}

/// The field group owned by one detector
///
/// Applying a facet replaces its field group wholesale.
#[derive(Debug, Clone, PartialEq)]
pub enum Facet {
    TechStack(Arc<TechStack>),
    Structure {
        structure: Arc<ProjectStructure>,
        key_files: Vec<KeyFile>,
    },
    Commands(Vec<ProjectCommand>),
    Dependencies(Vec<Dependency>),
    Conventions {
        source: ConventionSource,
        items: Vec<Convention>,
    },
    CodePatterns(Arc<CodePatterns>),
    Endpoints(Vec<Endpoint>),
    Readme(Option<Arc<ReadmeContent>>),
    Monorepo(Option<Arc<MonorepoInfo>>),
    Git(Option<Arc<GitConventions>>),
    Architecture(Option<Arc<ArchitectureInfo>>),
    Development(Option<Arc<DevelopmentInfo>>),
    ConfigFiles(Vec<ConfigFile>),
    Cli(Option<Arc<CliInfo>>),
    ProjectTools(Vec<ProjectTool>),
}

impl Facet {
    /// The reset value for a detector's field group, used on soft failure
    pub fn empty(id: DetectorId) -> Self {
        match id {
            DetectorId::TechStack => Self::TechStack(Arc::default()),
            DetectorId::Structure => Self::Structure {
                structure: Arc::default(),
                key_files: Vec::new(),
            },
            DetectorId::Commands => Self::Commands(Vec::new()),
            DetectorId::Dependencies => Self::Dependencies(Vec::new()),
            DetectorId::Conventions => Self::Conventions {
                source: ConventionSource::Base,
                items: Vec::new(),
            },
            DetectorId::Patterns => Self::Conventions {
                source: ConventionSource::Patterns,
                items: Vec::new(),
            },
            DetectorId::FrameworkPatterns => Self::Conventions {
                source: ConventionSource::Framework,
                items: Vec::new(),
            },
            DetectorId::CodePatterns => Self::CodePatterns(Arc::default()),
            DetectorId::Endpoints => Self::Endpoints(Vec::new()),
            DetectorId::Readme => Self::Readme(None),
            DetectorId::Monorepo => Self::Monorepo(None),
            DetectorId::Git => Self::Git(None),
            DetectorId::Architecture => Self::Architecture(None),
            DetectorId::Development => Self::Development(None),
            DetectorId::ConfigFiles => Self::ConfigFiles(Vec::new()),
            DetectorId::Cli => Self::Cli(None),
            DetectorId::ProjectTools => Self::ProjectTools(Vec::new()),
        }
    }

    /// Detector that owns this facet
    pub fn detector(&self) -> DetectorId {
        match self {
            Self::TechStack(_) => DetectorId::TechStack,
            Self::Structure { .. } => DetectorId::Structure,
            Self::Commands(_) => DetectorId::Commands,
            Self::Dependencies(_) => DetectorId::Dependencies,
            Self::Conventions { source, .. } => source.detector(),
            Self::CodePatterns(_) => DetectorId::CodePatterns,
            Self::Endpoints(_) => DetectorId::Endpoints,
            Self::Readme(_) => DetectorId::Readme,
            Self::Monorepo(_) => DetectorId::Monorepo,
            Self::Git(_) => DetectorId::Git,
            Self::Architecture(_) => DetectorId::Architecture,
            Self::Development(_) => DetectorId::Development,
            Self::ConfigFiles(_) => DetectorId::ConfigFiles,
            Self::Cli(_) => DetectorId::Cli,
            Self::ProjectTools(_) => DetectorId::ProjectTools,
        }
    }

    /// Replaces an exclusively owned field; convention slices are handled by
    /// [`merge_facets`]
    fn apply_exclusive(self, analysis: &mut Analysis) {
        match self {
            Self::TechStack(v) => analysis.tech_stack = v,
            Self::Structure {
                structure,
                key_files,
            } => {
                analysis.structure = structure;
                analysis.key_files = key_files;
            }
            Self::Commands(v) => analysis.commands = v,
            Self::Dependencies(v) => analysis.dependencies = v,
            Self::CodePatterns(v) => analysis.code_patterns = v,
            Self::Endpoints(v) => analysis.endpoints = v,
            Self::Readme(v) => analysis.readme_content = v,
            Self::Monorepo(v) => analysis.monorepo_info = v,
            Self::Git(v) => analysis.git_conventions = v,
            Self::Architecture(v) => analysis.architecture_info = v,
            Self::Development(v) => analysis.development_info = v,
            Self::ConfigFiles(v) => analysis.config_files = v,
            Self::Cli(v) => analysis.cli_info = v,
            Self::ProjectTools(v) => analysis.project_tools = v,
            Self::Conventions { .. } => {}
        }
    }
}

/// Applies a stage's facets to `analysis`
///
/// Exclusive fields are replaced in the order given. When any convention slice
/// is present, `conventions` is rebuilt from every slice ordered by
/// [`ConventionSource`], followed by `custom` conventions. Convention-producing
/// detectors always re-run together, so a partial set never occurs outside
/// tests.
pub fn merge_facets(analysis: &mut Analysis, facets: Vec<Facet>, custom: &[Convention]) {
    let mut slices: Vec<(ConventionSource, Vec<Convention>)> = Vec::new();

    for facet in facets {
        match facet {
            Facet::Conventions { source, items } => slices.push((source, items)),
            other => other.apply_exclusive(analysis),
        }
    }

    if slices.is_empty() {
        return;
    }

    slices.sort_by_key(|(source, _)| *source);

    let mut conventions: Vec<Convention> = slices.into_iter().flat_map(|(_, items)| items).collect();
    conventions.extend(custom.iter().cloned());
    analysis.conventions = conventions;
}
