use super::markdown::{self, RenderOptions};
use super::{GeneratedFile, Generator, GeneratorError, GeneratorId};
use crate::analysis::{Analysis, ProjectCommand};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Toggles for the optional files under `.claude/`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaudeCodeOptions {
    /// One slash command per detected project command
    pub commands: bool,
    /// A separate architecture note with the layer diagram
    pub architecture: bool,
}

impl Default for ClaudeCodeOptions {
    fn default() -> Self {
        Self {
            commands: true,
            architecture: true,
        }
    }
}

/// `.claude/CLAUDE.md` plus optional commands and notes
pub struct ClaudeCodeGenerator {
    options: ClaudeCodeOptions,
}

impl ClaudeCodeGenerator {
    pub fn new(options: ClaudeCodeOptions) -> Self {
        Self { options }
    }
}

/// File stem for a slash command, e.g. `test:unit` becomes `test-unit`
fn command_slug(name: &str) -> String {
    let slug: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    slug.split('-').filter(|s| !s.is_empty()).collect::<Vec<_>>().join("-")
}

fn render_command(command: &ProjectCommand) -> String {
    let mut out = String::new();
    let description = command.description.as_deref().unwrap_or(&command.name);
    let _ = writeln!(out, "---\ndescription: {}\n---\n", description);
    let _ = writeln!(out, "Run `{}` from the repository root.", command.command);
    out.push_str("\nIf it fails, read the output, fix the cause and run it again. Summarise what changed.\n");
    out
}

impl Generator for ClaudeCodeGenerator {
    fn id(&self) -> GeneratorId {
        GeneratorId::ClaudeCode
    }

    fn generate(&self, analysis: &Analysis) -> Result<Vec<GeneratedFile>, GeneratorError> {
        let mut files = vec![GeneratedFile::new(
            ".claude/CLAUDE.md",
            markdown::render(analysis, &RenderOptions::default()),
        )];

        if self.options.commands {
            let mut seen = Vec::new();
            for command in &analysis.commands {
                let slug = command_slug(&command.name);
                if slug.is_empty() || seen.contains(&slug) {
                    continue;
                }
                files.push(GeneratedFile::new(
                    format!(".claude/commands/{}.md", slug),
                    render_command(command),
                ));
                seen.push(slug);
            }
        }

        if self.options.architecture {
            if let Some(arch) = analysis.architecture_info.as_deref() {
                if let Some(diagram) = &arch.diagram {
                    let mut note = String::from("# Architecture\n\n");
                    if let Some(style) = &arch.style {
                        let _ = writeln!(note, "Style: {}\n", style);
                    }
                    for layer in &arch.layers {
                        if layer.depends_on.is_empty() {
                            let _ = writeln!(note, "- **{}**", layer.name);
                        } else {
                            let _ = writeln!(note, "- **{}** depends on {}", layer.name, layer.depends_on.join(", "));
                        }
                    }
                    let _ = writeln!(note, "\n```mermaid\n{}\n```", diagram.trim_end());
                    files.push(GeneratedFile::new(".claude/architecture.md", note));
                }
            }
        }

        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ArchitectureInfo, Layer};
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    fn sample() -> Analysis {
        let mut analysis = Analysis::new(Path::new("/work/svc"));
        analysis.commands = vec![
            ProjectCommand::new("test:unit", "npm run test:unit").described("Run unit tests"),
            ProjectCommand::new("build", "npm run build"),
            ProjectCommand::new("Test Unit", "npm test"),
        ];
        analysis.architecture_info = Some(Arc::new(ArchitectureInfo {
            style: None,
            layers: vec![
                Layer {
                    name: "api".to_string(),
                    purpose: None,
                    packages: vec!["src/api".to_string()],
                    depends_on: vec!["services".to_string()],
                },
                Layer {
                    name: "services".to_string(),
                    purpose: None,
                    packages: vec!["src/services".to_string()],
                    depends_on: Vec::new(),
                },
            ],
            entry_point: None,
            diagram: Some("graph TD\n  api --> services".to_string()),
        }));
        analysis
    }

    #[test]
    fn test_all_artifacts() {
        let files = ClaudeCodeGenerator::new(ClaudeCodeOptions::default())
            .generate(&sample())
            .unwrap();
        let paths: Vec<PathBuf> = files.iter().map(|f| f.path.clone()).collect();

        assert_eq!(
            paths,
            vec![
                PathBuf::from(".claude/CLAUDE.md"),
                PathBuf::from(".claude/commands/test-unit.md"),
                PathBuf::from(".claude/commands/build.md"),
                PathBuf::from(".claude/architecture.md"),
            ]
        );
        assert!(files[1].content.contains("description: Run unit tests"));
        assert!(files[1].content.contains("`npm run test:unit`"));
        assert!(files[3].content.contains("- **api** depends on services"));
    }

    #[test]
    fn test_toggles_off() {
        let options = ClaudeCodeOptions {
            commands: false,
            architecture: false,
        };
        let files = ClaudeCodeGenerator::new(options).generate(&sample()).unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_command_slug() {
        assert_eq!(command_slug("test:unit"), "test-unit");
        assert_eq!(command_slug("  Lint & Fix "), "lint-fix");
    }
}
