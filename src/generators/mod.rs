//! Context file generators for AI coding assistants
//!
//! Every generator renders from the same frozen `Analysis`. Rendering is pure;
//! [`write_files`] is the only place that touches the disk.

mod assistants;
mod claude_code;
mod continue_dev;
pub mod markdown;

pub use assistants::{ClaudeGenerator, CopilotGenerator, CursorGenerator, JsonGenerator};
pub use claude_code::{ClaudeCodeGenerator, ClaudeCodeOptions};
pub use continue_dev::ContinueGenerator;

use crate::analysis::Analysis;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

crate::define_id_enum! {
    /// Output format selectable from the CLI and the config file
    GeneratorId {
        Claude => "claude" : "Claude",
        ClaudeCode => "claude-code" : "Claude Code",
        Cursor => "cursor" : "Cursor",
        Copilot => "copilot" : "GitHub Copilot",
        Continue => "continue" : "Continue",
        Json => "json" : "JSON",
    }
}

/// Pseudo-id that expands to every assistant format
pub const ALL_FORMATS: &str = "all";

impl GeneratorId {
    /// Formats `all` expands to; the raw JSON dump is opt-in
    pub fn assistants() -> &'static [GeneratorId] {
        &[
            GeneratorId::Claude,
            GeneratorId::ClaudeCode,
            GeneratorId::Cursor,
            GeneratorId::Copilot,
            GeneratorId::Continue,
        ]
    }
}

#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("Unknown output format '{0}'. Valid formats: claude, claude-code, cursor, copilot, continue, json, all")]
    UnknownFormat(String),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize analysis: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Expands format names, resolving `all` and dropping repeats
pub fn parse_formats<S: AsRef<str>>(names: &[S]) -> Result<Vec<GeneratorId>, GeneratorError> {
    let mut formats = Vec::new();
    for name in names {
        let name = name.as_ref().trim();
        let expanded: Vec<GeneratorId> = if name == ALL_FORMATS {
            GeneratorId::assistants().to_vec()
        } else {
            let id = GeneratorId::from_name(name).ok_or_else(|| GeneratorError::UnknownFormat(name.to_string()))?;
            vec![id]
        };
        for id in expanded {
            if !formats.contains(&id) {
                formats.push(id);
            }
        }
    }
    Ok(formats)
}

/// One rendered file, relative to the output directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub content: String,
}

impl GeneratedFile {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

pub trait Generator: Send + Sync {
    fn id(&self) -> GeneratorId;

    fn generate(&self, analysis: &Analysis) -> Result<Vec<GeneratedFile>, GeneratorError>;
}

/// Generator for `id`
pub fn generator_for(id: GeneratorId, claude_code: ClaudeCodeOptions) -> Box<dyn Generator> {
    match id {
        GeneratorId::Claude => Box::new(ClaudeGenerator),
        GeneratorId::ClaudeCode => Box::new(ClaudeCodeGenerator::new(claude_code)),
        GeneratorId::Cursor => Box::new(CursorGenerator),
        GeneratorId::Copilot => Box::new(CopilotGenerator),
        GeneratorId::Continue => Box::new(ContinueGenerator),
        GeneratorId::Json => Box::new(JsonGenerator),
    }
}

/// Writes `files` under `out_dir`, creating parent directories
///
/// Returns the absolute paths written.
pub fn write_files(out_dir: &Path, files: &[GeneratedFile]) -> Result<Vec<PathBuf>, GeneratorError> {
    let mut written = Vec::with_capacity(files.len());
    for file in files {
        let path = out_dir.join(&file.path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| GeneratorError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&path, &file.content).map_err(|source| GeneratorError::Write {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), bytes = file.content.len(), "Wrote output file");
        written.push(path);
    }
    info!(count = written.len(), dir = %out_dir.display(), "Output files written");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_formats_expands_all() {
        let formats = parse_formats(&["cursor", "all", "json"]).unwrap();
        assert_eq!(
            formats,
            vec![
                GeneratorId::Cursor,
                GeneratorId::Claude,
                GeneratorId::ClaudeCode,
                GeneratorId::Copilot,
                GeneratorId::Continue,
                GeneratorId::Json,
            ]
        );
    }

    #[test]
    fn test_parse_formats_rejects_unknown() {
        let err = parse_formats(&["windsurf"]).unwrap_err();
        assert!(err.to_string().contains("windsurf"));
    }

    #[test]
    fn test_write_files_creates_parents() {
        let dir = TempDir::new().unwrap();
        let files = vec![GeneratedFile::new(".github/copilot-instructions.md", "# x\n")];

        let written = write_files(dir.path(), &files).unwrap();

        assert_eq!(written.len(), 1);
        assert_eq!(fs::read_to_string(&written[0]).unwrap(), "# x\n");
    }
}
