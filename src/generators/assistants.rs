use super::markdown::{self, RenderOptions};
use super::{GeneratedFile, Generator, GeneratorError, GeneratorId};
use crate::analysis::Analysis;

/// `CLAUDE.md` at the repository root
pub struct ClaudeGenerator;

impl Generator for ClaudeGenerator {
    fn id(&self) -> GeneratorId {
        GeneratorId::Claude
    }

    fn generate(&self, analysis: &Analysis) -> Result<Vec<GeneratedFile>, GeneratorError> {
        let content = markdown::render(analysis, &RenderOptions::default());
        Ok(vec![GeneratedFile::new("CLAUDE.md", content)])
    }
}

/// `.cursorrules`
pub struct CursorGenerator;

impl Generator for CursorGenerator {
    fn id(&self) -> GeneratorId {
        GeneratorId::Cursor
    }

    fn generate(&self, analysis: &Analysis) -> Result<Vec<GeneratedFile>, GeneratorError> {
        let mut content = format!(
            "You are working in the {} repository. Follow the project conventions below and prefer the listed commands.\n\n",
            analysis.project_name
        );
        content.push_str(&markdown::render(
            analysis,
            &RenderOptions {
                include_git: false,
                ..RenderOptions::default()
            },
        ));
        Ok(vec![GeneratedFile::new(".cursorrules", content)])
    }
}

/// `.github/copilot-instructions.md`
pub struct CopilotGenerator;

impl Generator for CopilotGenerator {
    fn id(&self) -> GeneratorId {
        GeneratorId::Copilot
    }

    fn generate(&self, analysis: &Analysis) -> Result<Vec<GeneratedFile>, GeneratorError> {
        let content = markdown::render(
            analysis,
            &RenderOptions {
                include_endpoints: false,
                ..RenderOptions::default()
            },
        );
        Ok(vec![GeneratedFile::new(".github/copilot-instructions.md", content)])
    }
}

/// Raw `analysis.json` dump
pub struct JsonGenerator;

impl Generator for JsonGenerator {
    fn id(&self) -> GeneratorId {
        GeneratorId::Json
    }

    fn generate(&self, analysis: &Analysis) -> Result<Vec<GeneratedFile>, GeneratorError> {
        let mut content = serde_json::to_string_pretty(analysis)?;
        content.push('\n');
        Ok(vec![GeneratedFile::new("analysis.json", content)])
    }
}
