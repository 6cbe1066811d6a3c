//! The aggregate `Analysis` record and its sub-records
//!
//! An `Analysis` is created empty per run, filled in by the scheduler from
//! detector facets, then frozen behind an `Arc` for consumers.
//!
//! Sub-records that detectors always replace wholesale are held behind `Arc`.
//! Cloning an `Analysis` therefore duplicates every `Vec` field while sharing
//! those sub-records; the incremental engine relies on this to take a cheap
//! working copy. Any future detector that mutates one of these sub-records in
//! place must switch to a full deep copy first.

mod facet;

pub use facet::{merge_facets, ConventionSource, Facet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

crate::define_id_enum! {
    /// Broad role a detected framework plays in the project
    FrameworkCategory {
        Frontend => "frontend" : "Frontend",
        Backend => "backend" : "Backend",
        Fullstack => "fullstack" : "Fullstack",
        Database => "database" : "Database",
        Testing => "testing" : "Testing",
        Styling => "styling" : "Styling",
        State => "state" : "State management",
        Cli => "cli" : "CLI",
        Tooling => "tooling" : "Tooling",
        Other => "other" : "Other",
    }
}

crate::define_id_enum! {
    ConventionCategory {
        Naming => "naming" : "Naming",
        Structure => "structure" : "Structure",
        Style => "style" : "Style",
        Testing => "testing" : "Testing",
        Imports => "imports" : "Imports",
        Components => "components" : "Components",
        ErrorHandling => "error-handling" : "Error handling",
        Api => "api" : "API",
        Git => "git" : "Git",
        Tooling => "tooling" : "Tooling",
        Documentation => "documentation" : "Documentation",
        Security => "security" : "Security",
        Performance => "performance" : "Performance",
        Custom => "custom" : "Custom",
    }
}

crate::define_id_enum! {
    DependencyType {
        Runtime => "runtime" : "Runtime",
        Dev => "dev" : "Development",
    }
}

crate::define_id_enum! {
    HttpMethod {
        Get => "GET" : "get",
        Post => "POST" : "post",
        Put => "PUT" : "put",
        Patch => "PATCH" : "patch",
        Delete => "DELETE" : "delete",
        All => "ALL" : "all" | "any" | "ANY" | "use",
    }
}

crate::define_id_enum! {
    CommitStyle {
        Conventional => "conventional" : "Conventional Commits",
        Angular => "angular" : "Angular",
        Gitmoji => "gitmoji" : "Gitmoji",
        Jira => "jira" : "Jira",
        None => "none" : "None",
    }
}

crate::define_id_enum! {
    MonorepoTool {
        Turborepo => "turborepo" : "Turborepo" | "turbo",
        Nx => "nx" : "Nx",
        Lerna => "lerna" : "Lerna",
        Rush => "rush" : "Rush",
        PnpmWorkspaces => "pnpm-workspaces" : "pnpm workspaces",
        YarnWorkspaces => "yarn-workspaces" : "Yarn workspaces",
        NpmWorkspaces => "npm-workspaces" : "npm workspaces",
        CargoWorkspace => "cargo-workspace" : "Cargo workspace",
        GoWorkspace => "go-workspace" : "Go workspace",
    }
}

/// Complete picture of one repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub project_name: String,
    pub root_path: PathBuf,
    pub tech_stack: Arc<TechStack>,
    pub structure: Arc<ProjectStructure>,
    pub key_files: Vec<KeyFile>,
    pub conventions: Vec<Convention>,
    pub dependencies: Vec<Dependency>,
    pub commands: Vec<ProjectCommand>,
    pub endpoints: Vec<Endpoint>,
    pub code_patterns: Arc<CodePatterns>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_conventions: Option<Arc<GitConventions>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub architecture_info: Option<Arc<ArchitectureInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub development_info: Option<Arc<DevelopmentInfo>>,
    pub config_files: Vec<ConfigFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cli_info: Option<Arc<CliInfo>>,
    pub project_tools: Vec<ProjectTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monorepo_info: Option<Arc<MonorepoInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readme_content: Option<Arc<ReadmeContent>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_enrichment: Option<Arc<AiEnrichment>>,
}

impl Analysis {
    /// Empty record for `root`, named after the root's basename
    pub fn new(root: &Path) -> Self {
        let project_name = root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "project".to_string());

        Self {
            project_name,
            root_path: root.to_path_buf(),
            tech_stack: Arc::default(),
            structure: Arc::default(),
            key_files: Vec::new(),
            conventions: Vec::new(),
            dependencies: Vec::new(),
            commands: Vec::new(),
            endpoints: Vec::new(),
            code_patterns: Arc::default(),
            git_conventions: None,
            architecture_info: None,
            development_info: None,
            config_files: Vec::new(),
            cli_info: None,
            project_tools: Vec::new(),
            monorepo_info: None,
            readme_content: None,
            ai_enrichment: None,
        }
    }

    pub fn primary_language(&self) -> Option<&Language> {
        self.tech_stack.languages.first()
    }

    pub fn has_language(&self, name: &str) -> bool {
        self.tech_stack.languages.iter().any(|l| l.name == name)
    }

    pub fn has_framework(&self, name: &str) -> bool {
        self.tech_stack.frameworks.iter().any(|f| f.name == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechStack {
    pub languages: Vec<Language>,
    pub frameworks: Vec<Framework>,
    pub databases: Vec<String>,
    pub tools: Vec<String>,
}

impl TechStack {
    pub fn total_percentage(&self) -> f64 {
        self.languages.iter().map(|l| l.percentage).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Language {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Share of counted source files, 0-100
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Framework {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub category: FrameworkCategory,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStructure {
    pub directories: Vec<Directory>,
    pub root_files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Directory {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    pub file_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyFile {
    pub path: String,
    pub purpose: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Convention {
    pub category: ConventionCategory,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
}

impl Convention {
    pub fn new(category: ConventionCategory, description: impl Into<String>) -> Self {
        Self {
            category,
            description: description.into(),
            example: None,
        }
    }

    pub fn with_example(mut self, example: impl Into<String>) -> Self {
        self.example = Some(example.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    pub name: String,
    pub version: String,
    #[serde(rename = "type")]
    pub dep_type: DependencyType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectCommand {
    pub name: String,
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ProjectCommand {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            description: None,
        }
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub method: HttpMethod,
    /// Always starts with `/`
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodePatterns {
    pub testing: Vec<PatternInfo>,
    pub data_fetching: Vec<PatternInfo>,
    pub routing: Vec<PatternInfo>,
    pub forms: Vec<PatternInfo>,
    pub styling: Vec<PatternInfo>,
    pub auth: Vec<PatternInfo>,
    pub api_patterns: Vec<PatternInfo>,
    pub db_orm: Vec<PatternInfo>,
    pub utilities: Vec<PatternInfo>,
    pub state_mgmt: Vec<PatternInfo>,
    pub go_patterns: Vec<PatternInfo>,
    pub rust_patterns: Vec<PatternInfo>,
    pub python_patterns: Vec<PatternInfo>,
    pub ml_patterns: Vec<PatternInfo>,
}

impl CodePatterns {
    pub fn is_empty(&self) -> bool {
        self.all().all(|(_, group)| group.is_empty())
    }

    /// Every category in declaration order, paired with its key
    pub fn all(&self) -> impl Iterator<Item = (&'static str, &Vec<PatternInfo>)> {
        [
            ("testing", &self.testing),
            ("dataFetching", &self.data_fetching),
            ("routing", &self.routing),
            ("forms", &self.forms),
            ("styling", &self.styling),
            ("auth", &self.auth),
            ("apiPatterns", &self.api_patterns),
            ("dbOrm", &self.db_orm),
            ("utilities", &self.utilities),
            ("stateMgmt", &self.state_mgmt),
            ("goPatterns", &self.go_patterns),
            ("rustPatterns", &self.rust_patterns),
            ("pythonPatterns", &self.python_patterns),
            ("mlPatterns", &self.ml_patterns),
        ]
        .into_iter()
    }

    pub fn group_mut(&mut self, key: &str) -> Option<&mut Vec<PatternInfo>> {
        let group = match key {
            "testing" => &mut self.testing,
            "dataFetching" => &mut self.data_fetching,
            "routing" => &mut self.routing,
            "forms" => &mut self.forms,
            "styling" => &mut self.styling,
            "auth" => &mut self.auth,
            "apiPatterns" => &mut self.api_patterns,
            "dbOrm" => &mut self.db_orm,
            "utilities" => &mut self.utilities,
            "stateMgmt" => &mut self.state_mgmt,
            "goPatterns" => &mut self.go_patterns,
            "rustPatterns" => &mut self.rust_patterns,
            "pythonPatterns" => &mut self.python_patterns,
            "mlPatterns" => &mut self.ml_patterns,
            _ => return None,
        };
        Some(group)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternInfo {
    pub name: String,
    pub category: String,
    pub description: String,
    pub file_count: usize,
    pub examples: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitConventions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    pub commit_convention: CommitConvention,
    pub branch_convention: BranchConvention,
    pub recent_commits: Vec<CommitInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitConvention {
    pub style: CommitStyle,
    pub format: String,
    pub types: Vec<String>,
    pub scopes: Vec<String>,
    pub example: String,
}

impl Default for CommitConvention {
    fn default() -> Self {
        Self {
            style: CommitStyle::None,
            format: String::new(),
            types: Vec::new(),
            scopes: Vec::new(),
            example: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchConvention {
    pub prefixes: Vec<String>,
    pub format: String,
    pub examples: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitInfo {
    pub hash: String,
    pub subject: String,
    pub author: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchitectureInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    pub layers: Vec<Layer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_point: Option<String>,
    /// Only present when there is more than one layer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagram: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    pub packages: Vec<String>,
    pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevelopmentInfo {
    pub prerequisites: Vec<Prerequisite>,
    pub setup_steps: Vec<SetupStep>,
    pub git_hooks: Vec<GitHook>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prerequisite {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupStep {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitHook {
    pub name: String,
    pub tool: String,
    pub path: String,
    pub commands: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    pub path: String,
    pub tool: String,
    pub purpose: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CliInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binary_name: Option<String>,
    pub framework: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_point: Option<String>,
    pub commands: Vec<String>,
    pub flag_conventions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectTool {
    pub name: String,
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Where the tool was declared
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonorepoInfo {
    pub tool: MonorepoTool,
    /// Workspace glob patterns as declared
    pub workspaces: Vec<String>,
    pub packages: Vec<WorkspacePackage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspacePackage {
    pub name: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Nested package directories, relative to `path`
    pub sub_packages: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadmeContent {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub features: Vec<String>,
    pub prerequisites: Vec<String>,
    pub commands: Vec<String>,
    pub model_specs: Vec<ModelSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSpec {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiEnrichment {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conventions_insights: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub architecture_insights: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_practices: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patterns_insights: Option<String>,
}

impl AiEnrichment {
    pub fn insight_count(&self) -> usize {
        [
            &self.project_summary,
            &self.conventions_insights,
            &self.architecture_insights,
            &self.best_practices,
            &self.patterns_insights,
        ]
        .iter()
        .filter(|i| i.is_some())
        .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_root_basename() {
        let analysis = Analysis::new(Path::new("/work/my-service"));
        assert_eq!(analysis.project_name, "my-service");
        assert!(analysis.tech_stack.languages.is_empty());
        assert!(analysis.conventions.is_empty());
        assert!(analysis.code_patterns.is_empty());
    }

    #[test]
    fn test_clone_shares_subrecords_and_copies_vectors() {
        let mut original = Analysis::new(Path::new("/repo"));
        original.commands.push(ProjectCommand::new("build", "go build ./..."));

        let mut copy = original.clone();
        copy.commands.clear();

        assert_eq!(original.commands.len(), 1);
        assert!(Arc::ptr_eq(&original.tech_stack, &copy.tech_stack));
        assert!(Arc::ptr_eq(&original.structure, &copy.structure));
    }

    #[test]
    fn test_dependency_serializes_type_field() {
        let dep = Dependency {
            name: "react".to_string(),
            version: "^18.2.0".to_string(),
            dep_type: DependencyType::Runtime,
        };
        let json = serde_json::to_value(&dep).unwrap();
        assert_eq!(json["type"], "runtime");
    }

    #[test]
    fn test_http_method_aliases() {
        assert_eq!(HttpMethod::from_name("get"), Some(HttpMethod::Get));
        assert_eq!(HttpMethod::from_name("use"), Some(HttpMethod::All));
        assert_eq!(HttpMethod::Delete.as_str(), "DELETE");
    }

    #[test]
    fn test_insight_count() {
        let enrichment = AiEnrichment {
            project_summary: Some("summary".to_string()),
            best_practices: Some("practices".to_string()),
            ..Default::default()
        };
        assert_eq!(enrichment.insight_count(), 2);
    }
}
