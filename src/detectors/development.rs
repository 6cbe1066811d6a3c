use super::tech_stack::language_version;
use super::{DetectContext, Detector, DetectorError, DetectorId};
use crate::analysis::{Analysis, DevelopmentInfo, Facet, GitHook, Prerequisite, SetupStep};
use crate::stack::manifest::PackageJson;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

/// Toolchain prerequisites, setup steps and git hooks
pub struct DevelopmentDetector;

/// Toolchain prerequisite, the language its version comes from, and the root
/// files that imply it
const TOOLCHAINS: &[(&str, &str, &[&str])] = &[
    ("Go", "Go", &["go.mod", "go.work"]),
    ("Node.js", "JavaScript", &["package.json"]),
    ("Rust", "Rust", &["Cargo.toml"]),
    ("Python", "Python", &["pyproject.toml", "requirements.txt", "setup.py", "Pipfile"]),
    ("Ruby", "Ruby", &["Gemfile"]),
    ("Java", "Java", &["pom.xml", "build.gradle", "build.gradle.kts"]),
    ("PHP", "PHP", &["composer.json"]),
];

const HOOK_NAMES: &[&str] = &[
    "pre-commit",
    "prepare-commit-msg",
    "commit-msg",
    "post-commit",
    "pre-push",
    "post-checkout",
    "post-merge",
    "pre-rebase",
];

#[derive(Debug, Deserialize)]
struct PreCommitConfig {
    #[serde(default)]
    repos: Vec<PreCommitRepo>,
}

#[derive(Debug, Deserialize)]
struct PreCommitRepo {
    #[serde(default)]
    hooks: Vec<PreCommitHook>,
}

#[derive(Debug, Deserialize)]
struct PreCommitHook {
    id: String,
}

impl Detector for DevelopmentDetector {
    fn id(&self) -> DetectorId {
        DetectorId::Development
    }

    fn detect(&self, ctx: &DetectContext, _analysis: &Analysis) -> Result<Facet, DetectorError> {
        let package = match ctx.read_if_present("package.json")? {
            Some(content) => PackageJson::parse(&content)
                .map_err(|e| debug!(error = %e, "Ignoring unparseable package.json"))
                .ok(),
            None => None,
        };

        let info = DevelopmentInfo {
            prerequisites: prerequisites(ctx, package.as_ref())?,
            setup_steps: setup_steps(ctx, package.as_ref())?,
            git_hooks: git_hooks(ctx)?,
        };

        if info.prerequisites.is_empty() && info.setup_steps.is_empty() && info.git_hooks.is_empty() {
            return Ok(Facet::Development(None));
        }
        Ok(Facet::Development(Some(Arc::new(info))))
    }
}

fn prerequisites(ctx: &DetectContext, package: Option<&PackageJson>) -> Result<Vec<Prerequisite>, DetectorError> {
    let inv = &ctx.inventory;
    let mut out = Vec::new();

    for (name, language, triggers) in TOOLCHAINS {
        if !triggers.iter().any(|f| inv.has_file(f)) {
            continue;
        }
        out.push(Prerequisite {
            name: name.to_string(),
            version: language_version(ctx, language)?,
        });
    }

    if let Some(pkg) = package {
        if let Some(manager) = pkg.package_manager.as_deref() {
            let (name, version) = match manager.split_once('@') {
                Some((name, version)) => (name, Some(version.split('+').next().unwrap_or(version).to_string())),
                None => (manager, None),
            };
            if name != "npm" {
                out.push(Prerequisite {
                    name: name.to_string(),
                    version,
                });
            }
        } else if inv.has_file("pnpm-lock.yaml") {
            out.push(Prerequisite { name: "pnpm".into(), version: None });
        } else if inv.has_file("yarn.lock") {
            out.push(Prerequisite { name: "Yarn".into(), version: None });
        } else if inv.has_file("bun.lockb") || inv.has_file("bun.lock") {
            out.push(Prerequisite { name: "Bun".into(), version: None });
        }
    }

    if inv.has_file("poetry.lock") {
        out.push(Prerequisite { name: "Poetry".into(), version: None });
    } else if inv.has_file("uv.lock") {
        out.push(Prerequisite { name: "uv".into(), version: None });
    }

    let compose = compose_file(ctx);
    if inv.has_file("Dockerfile") || compose.is_some() {
        out.push(Prerequisite { name: "Docker".into(), version: None });
    }
    if inv.has_file("Makefile") {
        out.push(Prerequisite { name: "make".into(), version: None });
    }
    Ok(out)
}

fn compose_file(ctx: &DetectContext) -> Option<&'static str> {
    ["docker-compose.yml", "docker-compose.yaml", "compose.yml", "compose.yaml"]
        .into_iter()
        .find(|f| ctx.inventory.has_file(f))
}

fn step(description: &str, command: &str) -> SetupStep {
    SetupStep {
        description: description.to_string(),
        command: Some(command.to_string()),
    }
}

fn setup_steps(ctx: &DetectContext, package: Option<&PackageJson>) -> Result<Vec<SetupStep>, DetectorError> {
    let inv = &ctx.inventory;
    let mut out = Vec::new();

    for template in [".env.example", ".env.sample", ".env.template"] {
        if inv.has_file(template) {
            out.push(step("Create a local environment file", &format!("cp {} .env", template)));
            break;
        }
    }

    if let Some(pkg) = package {
        let install = match pkg.manager_name() {
            Some("pnpm") => "pnpm install",
            Some("yarn") => "yarn install",
            Some("bun") => "bun install",
            _ if inv.has_file("pnpm-lock.yaml") => "pnpm install",
            _ if inv.has_file("yarn.lock") => "yarn install",
            _ if inv.has_file("bun.lockb") || inv.has_file("bun.lock") => "bun install",
            _ if inv.has_file("package-lock.json") => "npm ci",
            _ => "npm install",
        };
        out.push(step("Install JavaScript dependencies", install));
    }
    if inv.has_file("go.mod") {
        out.push(step("Download Go modules", "go mod download"));
    }
    if inv.has_file("Cargo.toml") {
        out.push(step("Build the Rust workspace", "cargo build"));
    }
    if inv.has_file("poetry.lock") {
        out.push(step("Install Python dependencies", "poetry install"));
    } else if inv.has_file("uv.lock") {
        out.push(step("Install Python dependencies", "uv sync"));
    } else if inv.has_file("requirements.txt") {
        out.push(step("Install Python dependencies", "pip install -r requirements.txt"));
    } else if inv.has_file("pyproject.toml") {
        out.push(step("Install the package in editable mode", "pip install -e ."));
    }
    if inv.has_file("Gemfile") {
        out.push(step("Install Ruby gems", "bundle install"));
    }
    if inv.has_file("composer.json") {
        out.push(step("Install PHP dependencies", "composer install"));
    }
    if inv.has_file("pom.xml") {
        out.push(step("Build with Maven", "mvn install"));
    }

    if let Some(compose) = compose_file(ctx) {
        let command = if compose.starts_with("docker-compose") {
            format!("docker compose -f {} up -d", compose)
        } else {
            "docker compose up -d".to_string()
        };
        out.push(step("Start local services", &command));
    }

    if let Some(makefile) = ctx.read_if_present("Makefile")? {
        let setup_target = ["setup", "bootstrap", "install", "init"]
            .into_iter()
            .find(|t| makefile.lines().any(|l| l.starts_with(&format!("{}:", t))));
        if let Some(target) = setup_target {
            out.push(step("Run the project setup target", &format!("make {}", target)));
        }
    }

    if inv.has_file(".pre-commit-config.yaml") {
        out.push(step("Install pre-commit hooks", "pre-commit install"));
    }
    if inv.has_file("lefthook.yml") {
        out.push(step("Install lefthook hooks", "lefthook install"));
    }
    if inv.has_dir(".githooks") {
        out.push(step("Use the repository hooks", "git config core.hooksPath .githooks"));
    }
    Ok(out)
}

fn git_hooks(ctx: &DetectContext) -> Result<Vec<GitHook>, DetectorError> {
    let mut hooks = Vec::new();

    for (dir, tool) in [(".husky", "husky"), (".githooks", "git")] {
        let prefix = format!("{}/", dir);
        let scripts: Vec<String> = ctx
            .inventory
            .files()
            .filter(|f| f.parent() == dir && HOOK_NAMES.contains(&f.name.as_str()))
            .map(|f| f.path.clone())
            .collect();
        for path in scripts {
            let content = ctx.read_to_string(&path)?;
            hooks.push(GitHook {
                name: path.trim_start_matches(&prefix).to_string(),
                tool: tool.to_string(),
                path,
                commands: script_commands(&content),
            });
        }
    }

    if let Some(content) = ctx.read_if_present("lefthook.yml")? {
        match serde_yaml::from_str::<serde_yaml::Value>(&content) {
            Ok(doc) => hooks.extend(lefthook_hooks(&doc)),
            Err(e) => debug!(error = %e, "Ignoring unparseable lefthook.yml"),
        }
    }

    if let Some(content) = ctx.read_if_present(".pre-commit-config.yaml")? {
        match serde_yaml::from_str::<PreCommitConfig>(&content) {
            Ok(config) => hooks.push(GitHook {
                name: "pre-commit".to_string(),
                tool: "pre-commit".to_string(),
                path: ".pre-commit-config.yaml".to_string(),
                commands: config
                    .repos
                    .into_iter()
                    .flat_map(|r| r.hooks.into_iter().map(|h| h.id))
                    .collect(),
            }),
            Err(e) => debug!(error = %e, "Ignoring unparseable .pre-commit-config.yaml"),
        }
    }

    Ok(hooks)
}

/// Meaningful lines of a hook script
fn script_commands(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter(|l| !l.starts_with(". \"$(dirname") && !l.contains("husky.sh"))
        .map(String::from)
        .collect()
}

fn lefthook_hooks(doc: &serde_yaml::Value) -> Vec<GitHook> {
    HOOK_NAMES
        .iter()
        .filter_map(|hook| {
            let section = doc.get(*hook)?;
            let commands: Vec<String> = section
                .get("commands")
                .and_then(|c| c.as_mapping())
                .map(|map| {
                    map.iter()
                        .filter_map(|(_, cmd)| cmd.get("run").and_then(|r| r.as_str()))
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default();
            Some(GitHook {
                name: hook.to_string(),
                tool: "lefthook".to_string(),
                path: "lefthook.yml".to_string(),
                commands,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::test_support::{context_with, empty_analysis};

    fn detect(files: &[(&str, &str)]) -> Option<Arc<DevelopmentInfo>> {
        let (_dir, ctx) = context_with(files);
        match DevelopmentDetector.detect(&ctx, &empty_analysis(&ctx)).unwrap() {
            Facet::Development(info) => info,
            other => panic!("unexpected facet {:?}", other),
        }
    }

    #[test]
    fn test_node_project_with_pnpm() {
        let info = detect(&[
            (
                "package.json",
                r#"{"packageManager": "pnpm@8.15.1+sha256.abc", "engines": {"node": ">=20"}}"#,
            ),
            (".env.example", "PORT=3000"),
            ("docker-compose.yml", "services: {}"),
        ])
        .unwrap();

        assert_eq!(
            info.prerequisites,
            vec![
                Prerequisite { name: "Node.js".into(), version: Some(">=20".into()) },
                Prerequisite { name: "pnpm".into(), version: Some("8.15.1".into()) },
                Prerequisite { name: "Docker".into(), version: None },
            ]
        );
        let commands: Vec<_> = info.setup_steps.iter().filter_map(|s| s.command.as_deref()).collect();
        assert_eq!(
            commands,
            vec![
                "cp .env.example .env",
                "pnpm install",
                "docker compose -f docker-compose.yml up -d"
            ]
        );
    }

    #[test]
    fn test_go_version_prerequisite() {
        let info = detect(&[("go.mod", "module test\n\ngo 1.21")]).unwrap();
        assert_eq!(info.prerequisites[0].version.as_deref(), Some("1.21"));
        assert_eq!(info.setup_steps[0].command.as_deref(), Some("go mod download"));
    }

    #[test]
    fn test_git_hooks() {
        let info = detect(&[
            (".husky/pre-commit", "#!/usr/bin/env sh\n. \"$(dirname -- \"$0\")/_/husky.sh\"\n\nnpx lint-staged\n"),
            (".husky/_/husky.sh", "# internal"),
            ("lefthook.yml", "pre-push:\n  commands:\n    test:\n      run: go test ./...\n"),
            (
                ".pre-commit-config.yaml",
                "repos:\n  - repo: https://github.com/psf/black\n    rev: 24.1.0\n    hooks:\n      - id: black\n",
            ),
        ])
        .unwrap();

        assert_eq!(info.git_hooks.len(), 3);
        assert_eq!(info.git_hooks[0].name, "pre-commit");
        assert_eq!(info.git_hooks[0].tool, "husky");
        assert_eq!(info.git_hooks[0].commands, vec!["npx lint-staged"]);
        assert_eq!(info.git_hooks[1].tool, "lefthook");
        assert_eq!(info.git_hooks[1].commands, vec!["go test ./..."]);
        assert_eq!(info.git_hooks[2].commands, vec!["black"]);
    }

    #[test]
    fn test_empty_repository() {
        assert!(detect(&[]).is_none());
    }
}
