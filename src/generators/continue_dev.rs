use super::markdown::{self, dedup_conventions, RenderOptions};
use super::{GeneratedFile, Generator, GeneratorError, GeneratorId};
use crate::analysis::Analysis;
use serde_json::json;

/// `.continue/config.json` for the Continue extension
pub struct ContinueGenerator;

impl Generator for ContinueGenerator {
    fn id(&self) -> GeneratorId {
        GeneratorId::Continue
    }

    fn generate(&self, analysis: &Analysis) -> Result<Vec<GeneratedFile>, GeneratorError> {
        let system_message = markdown::render(
            analysis,
            &RenderOptions {
                include_endpoints: false,
                include_git: false,
                ..RenderOptions::default()
            },
        );

        let rules: Vec<String> = dedup_conventions(&analysis.conventions)
            .into_iter()
            .flat_map(|(_, items)| items.into_iter().map(|c| c.description.clone()))
            .collect();

        let commands: Vec<_> = analysis
            .commands
            .iter()
            .map(|c| {
                json!({
                    "name": c.name,
                    "description": c.description.clone().unwrap_or_else(|| c.command.clone()),
                    "prompt": format!("Run `{}` and report the result.", c.command),
                })
            })
            .collect();

        let config = json!({
            "name": analysis.project_name,
            "systemMessage": system_message,
            "rules": rules,
            "customCommands": commands,
            "contextProviders": [
                { "name": "code" },
                { "name": "docs" },
                { "name": "diff" },
                { "name": "terminal" },
            ],
        });

        let mut content = serde_json::to_string_pretty(&config)?;
        content.push('\n');
        Ok(vec![GeneratedFile::new(".continue/config.json", content)])
    }
}
