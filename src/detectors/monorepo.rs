use super::{DetectContext, Detector, DetectorError, DetectorId};
use crate::analysis::{Analysis, Facet, MonorepoInfo, MonorepoTool, WorkspacePackage};
use crate::stack::manifest::{CargoManifest, GoMod, PackageJson, PyProject};
use glob::{MatchOptions, Pattern};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Workspace layout of Turborepo, Nx, Lerna, Rush, package-manager,
/// Cargo and Go workspaces
pub struct MonorepoDetector;

/// Manifests that mark a directory as a package
const PACKAGE_MANIFESTS: &[&str] = &["package.json", "Cargo.toml", "go.mod", "pyproject.toml"];

/// Nesting depth below a package searched for sub-packages
const SUB_PACKAGE_DEPTH: usize = 2;

#[derive(Debug, Default, Deserialize)]
struct PnpmWorkspace {
    #[serde(default)]
    packages: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LernaConfig {
    #[serde(default)]
    packages: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RushConfig {
    #[serde(default)]
    projects: Vec<RushProject>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RushProject {
    project_folder: String,
}

impl Detector for MonorepoDetector {
    fn id(&self) -> DetectorId {
        DetectorId::Monorepo
    }

    fn detect(&self, ctx: &DetectContext, _analysis: &Analysis) -> Result<Facet, DetectorError> {
        let inv = &ctx.inventory;
        let mut tools: Vec<MonorepoTool> = Vec::new();
        let mut patterns: Vec<String> = Vec::new();

        if inv.has_file("turbo.json") {
            tools.push(MonorepoTool::Turborepo);
        }
        if inv.has_file("nx.json") {
            tools.push(MonorepoTool::Nx);
        }
        if let Some(content) = ctx.read_if_present("lerna.json")? {
            tools.push(MonorepoTool::Lerna);
            match serde_json::from_str::<LernaConfig>(&content) {
                Ok(lerna) => patterns.extend(lerna.packages),
                Err(e) => debug!(error = %e, "Ignoring unparseable lerna.json"),
            }
        }
        if let Some(content) = ctx.read_if_present("rush.json")? {
            tools.push(MonorepoTool::Rush);
            match serde_json::from_str::<RushConfig>(&strip_json_comments(&content)) {
                Ok(rush) => patterns.extend(rush.projects.into_iter().map(|p| p.project_folder)),
                Err(e) => debug!(error = %e, "Ignoring unparseable rush.json"),
            }
        }
        if let Some(content) = ctx.read_if_present("pnpm-workspace.yaml")? {
            tools.push(MonorepoTool::PnpmWorkspaces);
            match serde_yaml::from_str::<PnpmWorkspace>(&content) {
                Ok(ws) => patterns.extend(ws.packages),
                Err(e) => debug!(error = %e, "Ignoring unparseable pnpm-workspace.yaml"),
            }
        }
        if let Some(content) = ctx.read_if_present("package.json")? {
            if let Ok(Some(workspaces)) = PackageJson::parse(&content).map(|p| p.workspaces) {
                tools.push(if inv.has_file("yarn.lock") {
                    MonorepoTool::YarnWorkspaces
                } else {
                    MonorepoTool::NpmWorkspaces
                });
                patterns.extend(workspaces.patterns().iter().cloned());
            }
        }
        if let Some(content) = ctx.read_if_present("Cargo.toml")? {
            if let Ok(cargo) = CargoManifest::parse(&content) {
                if !cargo.workspace_members.is_empty() {
                    tools.push(MonorepoTool::CargoWorkspace);
                    patterns.extend(cargo.workspace_members);
                }
            }
        }
        if let Some(content) = ctx.read_if_present("go.work")? {
            tools.push(MonorepoTool::GoWorkspace);
            patterns.extend(parse_go_work(&content));
        }

        let Some(tool) = tools.into_iter().min() else {
            return Ok(Facet::Monorepo(None));
        };

        let mut workspaces: Vec<String> = Vec::new();
        for pattern in patterns {
            let pattern = normalize_pattern(&pattern);
            if !pattern.is_empty() && !pattern.starts_with('!') && !workspaces.contains(&pattern) {
                workspaces.push(pattern);
            }
        }

        let packages = declared_packages(ctx, &workspaces)?;

        Ok(Facet::Monorepo(Some(Arc::new(MonorepoInfo {
            tool,
            workspaces,
            packages,
        }))))
    }
}

fn normalize_pattern(pattern: &str) -> String {
    pattern
        .trim()
        .trim_start_matches("./")
        .trim_end_matches('/')
        .to_string()
}

/// `use` directives of a go.work file
fn parse_go_work(content: &str) -> Vec<String> {
    let mut dirs = Vec::new();
    let mut in_block = false;
    for line in content.lines() {
        let line = line.split("//").next().unwrap_or_default().trim();
        if in_block {
            if line == ")" {
                in_block = false;
            } else if !line.is_empty() {
                dirs.push(line.to_string());
            }
        } else if line == "use (" {
            in_block = true;
        } else if let Some(dir) = line.strip_prefix("use ") {
            dirs.push(dir.trim().to_string());
        }
    }
    dirs
}

/// Drops whole-line `//` comments, which rush.json allows
fn strip_json_comments(content: &str) -> String {
    content
        .lines()
        .filter(|l| !l.trim_start().starts_with("//"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn match_options() -> MatchOptions {
    MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    }
}

fn has_manifest(ctx: &DetectContext, dir: &str) -> bool {
    PACKAGE_MANIFESTS
        .iter()
        .any(|m| ctx.inventory.has_file(&format!("{}/{}", dir, m)))
}

/// Directories matched by the workspace patterns that contain a manifest
fn declared_packages(ctx: &DetectContext, workspaces: &[String]) -> Result<Vec<WorkspacePackage>, DetectorError> {
    let compiled: Vec<Pattern> = workspaces
        .iter()
        .filter_map(|p| match Pattern::new(p) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                debug!(pattern = %p, error = %e, "Skipping invalid workspace pattern");
                None
            }
        })
        .collect();

    let mut packages = Vec::new();
    for dir in ctx.inventory.dirs() {
        if !compiled.iter().any(|p| p.matches_with(&dir.path, match_options())) {
            continue;
        }
        if !has_manifest(ctx, &dir.path) {
            continue;
        }
        ctx.check_cancelled()?;

        let abs = ctx.abs(&dir.path);
        let prefix = format!("{}/", dir.path);
        let sub_packages: Vec<String> = ctx
            .inventory
            .dirs()
            .filter_map(|d| d.path.strip_prefix(&prefix))
            .filter(|rel| rel.split('/').count() <= SUB_PACKAGE_DEPTH)
            .filter(|rel| !rel.split('/').any(|s| s == "node_modules"))
            .filter(|rel| has_manifest(ctx, &format!("{}{}", prefix, rel)))
            .map(String::from)
            .collect();

        packages.push(WorkspacePackage {
            name: workspace_name(&abs),
            path: dir.path.clone(),
            description: workspace_description(&abs),
            sub_packages,
        });
    }
    Ok(packages)
}

/// Display name of a workspace directory
///
/// Taken from the first manifest that declares one: `package.json` name,
/// `Cargo.toml` package name, `pyproject.toml` project name, or the last
/// segment of the `go.mod` module path. Falls back to the directory name.
pub fn workspace_name(dir: &Path) -> String {
    let read = |file: &str| std::fs::read_to_string(dir.join(file)).ok();

    let from_manifest = read("package.json")
        .and_then(|c| PackageJson::parse(&c).ok())
        .and_then(|p| p.name)
        .or_else(|| {
            read("Cargo.toml")
                .and_then(|c| CargoManifest::parse(&c).ok())
                .and_then(|c| c.name)
        })
        .or_else(|| {
            read("pyproject.toml")
                .and_then(|c| PyProject::parse(&c).ok())
                .and_then(|p| p.name)
        })
        .or_else(|| {
            read("go.mod").and_then(|c| GoMod::parse(&c).module_basename().map(String::from))
        });

    from_manifest
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| {
            dir.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "workspace".to_string())
        })
}

fn workspace_description(dir: &Path) -> Option<String> {
    let read = |file: &str| std::fs::read_to_string(dir.join(file)).ok();
    read("package.json")
        .and_then(|c| PackageJson::parse(&c).ok())
        .and_then(|p| p.description)
        .or_else(|| {
            read("Cargo.toml")
                .and_then(|c| CargoManifest::parse(&c).ok())
                .and_then(|c| c.description)
        })
        .filter(|d| !d.trim().is_empty())
}
