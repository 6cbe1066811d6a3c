use super::{DetectContext, Detector, DetectorError, DetectorId};
use crate::analysis::{Analysis, Facet, ProjectTool};
use crate::stack::manifest::{CargoManifest, PackageJson, PyProject};

/// Binaries and scripts the project ships for its own development
///
/// Collects binaries declared by manifests, Go `cmd/` programs, and scripts
/// the README tells contributors to run.
pub struct ProjectToolsDetector;

/// Directories whose executables are treated as project tools
const SCRIPT_DIRS: &[&str] = &["bin/", "scripts/", "tools/", "hack/"];

impl Detector for ProjectToolsDetector {
    fn id(&self) -> DetectorId {
        DetectorId::ProjectTools
    }

    fn detect(&self, ctx: &DetectContext, analysis: &Analysis) -> Result<Facet, DetectorError> {
        let mut tools: Vec<ProjectTool> = Vec::new();

        if let Some(content) = ctx.read_if_present("package.json")? {
            if let Ok(pkg) = PackageJson::parse(&content) {
                for name in pkg.bin_names() {
                    tools.push(ProjectTool {
                        command: format!("npx {}", name),
                        name,
                        description: pkg.description.clone(),
                        source: "package.json".to_string(),
                    });
                }
            }
        }

        if let Some(content) = ctx.read_if_present("Cargo.toml")? {
            if let Ok(cargo) = CargoManifest::parse(&content) {
                for name in cargo.bins {
                    tools.push(ProjectTool {
                        command: format!("cargo run --bin {} --", name),
                        name,
                        description: None,
                        source: "Cargo.toml".to_string(),
                    });
                }
            }
        }

        if let Some(content) = ctx.read_if_present("pyproject.toml")? {
            if let Ok(project) = PyProject::parse(&content) {
                for (name, target) in project.scripts {
                    tools.push(ProjectTool {
                        command: name.clone(),
                        name,
                        description: Some(format!("Entry point {}", target)),
                        source: "pyproject.toml".to_string(),
                    });
                }
            }
        }

        for entry in ctx.inventory.files() {
            if entry.name != "main.go" || entry.depth() != 2 || !entry.path.starts_with("cmd/") {
                continue;
            }
            let dir = entry.parent();
            tools.push(ProjectTool {
                name: dir.trim_start_matches("cmd/").to_string(),
                command: format!("go run ./{}", dir),
                description: None,
                source: entry.path.clone(),
            });
        }

        if let Some(readme) = &analysis.readme_content {
            for command in &readme.commands {
                let Some(first) = command.split_whitespace().next() else {
                    continue;
                };
                let script = first.trim_start_matches("./");
                if !SCRIPT_DIRS.iter().any(|d| script.starts_with(d)) || !ctx.inventory.has_file(script) {
                    continue;
                }
                let name = script
                    .rsplit('/')
                    .next()
                    .unwrap_or(script)
                    .split('.')
                    .next()
                    .unwrap_or(script)
                    .to_string();
                tools.push(ProjectTool {
                    name,
                    command: command.clone(),
                    description: None,
                    source: readme.path.clone(),
                });
            }
        }

        let mut seen = std::collections::BTreeSet::new();
        tools.retain(|t| seen.insert(t.name.clone()));

        Ok(Facet::ProjectTools(tools))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ReadmeContent;
    use crate::detectors::test_support::{context_with, empty_analysis};
    use std::sync::Arc;

    #[test]
    fn test_tools_from_manifests_cmd_and_readme() {
        let (_dir, ctx) = context_with(&[
            (
                "package.json",
                r#"{"name": "acme", "description": "Acme CLI", "bin": {"acme": "bin/acme.js"}}"#,
            ),
            ("cmd/migrate/main.go", "package main"),
            ("scripts/seed.sh", "#!/bin/sh"),
            ("bin/acme.js", ""),
        ]);
        let mut analysis = empty_analysis(&ctx);
        analysis.readme_content = Some(Arc::new(ReadmeContent {
            path: "README.md".into(),
            commands: vec![
                "./scripts/seed.sh --demo".into(),
                "npm install".into(),
                "./scripts/missing.sh".into(),
            ],
            ..ReadmeContent::default()
        }));

        let tools = match ProjectToolsDetector.detect(&ctx, &analysis).unwrap() {
            Facet::ProjectTools(t) => t,
            other => panic!("unexpected facet {:?}", other),
        };

        let summary: Vec<_> = tools.iter().map(|t| (t.name.as_str(), t.command.as_str())).collect();
        assert_eq!(
            summary,
            vec![
                ("acme", "npx acme"),
                ("migrate", "go run ./cmd/migrate"),
                ("seed", "./scripts/seed.sh --demo"),
            ]
        );
        assert_eq!(tools[0].description.as_deref(), Some("Acme CLI"));
        assert_eq!(tools[2].source, "README.md");
    }

    #[test]
    fn test_no_tools() {
        let (_dir, ctx) = context_with(&[("main.go", "package main")]);
        assert_eq!(
            ProjectToolsDetector.detect(&ctx, &empty_analysis(&ctx)).unwrap(),
            Facet::ProjectTools(Vec::new())
        );
    }
}
