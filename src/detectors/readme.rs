use super::{DetectContext, Detector, DetectorError, DetectorId};
use crate::analysis::{Analysis, Facet, ModelSpec, ReadmeContent};
use crate::fs::FileEntry;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

/// Title, description, features, prerequisites and commands from the README
pub struct ReadmeDetector;

const MAX_COMMANDS: usize = 20;

static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#{1,6})\s+(.+?)\s*#*\s*$").expect("valid regex"));

static BULLET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:[-*+]|\d+[.)])\s+(.+)$").expect("valid regex"));

static SPEC_PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:[-*+]\s+)?\**([^:*|]+?)\**\s*:\s*\**(.+?)\**\s*$").expect("valid regex")
});

static TABLE_ROW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\|\s*([^|]+?)\s*\|\s*([^|]+?)\s*\|").expect("valid regex"));

const SHELL_LANGS: &[&str] = &["bash", "sh", "shell", "console", "zsh", "shell-session"];

impl Detector for ReadmeDetector {
    fn id(&self) -> DetectorId {
        DetectorId::Readme
    }

    fn detect(&self, ctx: &DetectContext, _analysis: &Analysis) -> Result<Facet, DetectorError> {
        let Some(entry) = find_readme(ctx) else {
            return Ok(Facet::Readme(None));
        };
        let content = ctx.read_to_string(&entry.path)?;
        let mut readme = parse_readme(&content);
        readme.path = entry.path.clone();
        Ok(Facet::Readme(Some(Arc::new(readme))))
    }
}

/// Root-level README, preferring Markdown
fn find_readme(ctx: &DetectContext) -> Option<&FileEntry> {
    let mut candidates: Vec<&FileEntry> = ctx
        .inventory
        .files()
        .filter(|f| f.is_root_level() && f.name.to_ascii_lowercase().starts_with("readme"))
        .collect();
    candidates.sort_by_key(|f| (f.ext != "md", f.name.len(), f.name.clone()));
    candidates.into_iter().next()
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    Other,
    Description,
    Features,
    Prerequisites,
    Specs,
}

impl Section {
    fn from_heading(text: &str) -> Self {
        let lower = text.to_ascii_lowercase();
        if lower.contains("feature") {
            Self::Features
        } else if lower.contains("prerequisite") || lower.contains("requirement") {
            Self::Prerequisites
        } else if lower.contains("spec") {
            Self::Specs
        } else if lower == "description" || lower == "about" || lower == "overview" {
            Self::Description
        } else {
            Self::Other
        }
    }
}

pub(crate) fn parse_readme(content: &str) -> ReadmeContent {
    let mut readme = ReadmeContent::default();
    let mut section = Section::Other;
    let mut seen_heading = false;
    let mut fence: Option<String> = None;

    let mut lead_paragraph: Vec<&str> = Vec::new();
    let mut lead_done = false;
    let mut section_paragraph: Vec<&str> = Vec::new();
    let mut section_done = false;

    for line in content.lines() {
        let trimmed = line.trim();

        if let Some(rest) = trimmed.strip_prefix("```").or_else(|| trimmed.strip_prefix("~~~")) {
            fence = match fence {
                Some(_) => None,
                None => Some(rest.trim().to_ascii_lowercase()),
            };
            continue;
        }
        if let Some(lang) = &fence {
            if SHELL_LANGS.contains(&lang.as_str()) {
                push_command(&mut readme.commands, trimmed);
            }
            continue;
        }

        if let Some(caps) = HEADING.captures(trimmed) {
            let level = caps[1].len();
            let text = strip_inline(&caps[2]);
            if level == 1 && readme.title.is_none() {
                readme.title = Some(text);
                section = Section::Other;
            } else {
                section = Section::from_heading(&text);
                seen_heading = true;
            }
            if !lead_paragraph.is_empty() {
                lead_done = true;
            }
            continue;
        }

        if trimmed.is_empty() {
            if !lead_paragraph.is_empty() {
                lead_done = true;
            }
            if section == Section::Description && !section_paragraph.is_empty() {
                section_done = true;
            }
            continue;
        }

        match section {
            Section::Features | Section::Prerequisites => {
                if let Some(caps) = BULLET.captures(line) {
                    let item = strip_inline(&caps[1]);
                    if section == Section::Features {
                        readme.features.push(item);
                    } else {
                        readme.prerequisites.push(item);
                    }
                }
            }
            Section::Specs => {
                if let Some(spec) = parse_spec_line(trimmed) {
                    readme.model_specs.push(spec);
                }
            }
            Section::Description if !section_done => section_paragraph.push(trimmed),
            _ => {}
        }

        if !seen_heading && !lead_done && is_prose(trimmed) {
            lead_paragraph.push(trimmed);
        }
    }

    let description = if section_paragraph.is_empty() {
        lead_paragraph
    } else {
        section_paragraph
    };
    if !description.is_empty() {
        readme.description = Some(strip_inline(&description.join(" ")));
    }

    readme
}

/// Paragraph text, excluding badges, images and raw HTML
fn is_prose(line: &str) -> bool {
    !(line.starts_with('!') || line.starts_with("[!") || line.starts_with('<') || line.starts_with('|'))
}

fn strip_inline(text: &str) -> String {
    text.replace("**", "").replace('`', "").trim().to_string()
}

fn push_command(commands: &mut Vec<String>, line: &str) {
    let command = line.strip_prefix("$ ").unwrap_or(line).trim();
    if command.is_empty() || command.starts_with('#') || commands.len() >= MAX_COMMANDS {
        return;
    }
    if !commands.iter().any(|c| c == command) {
        commands.push(command.to_string());
    }
}

/// `name: value` or a two-column table row whose value is numeric
fn parse_spec_line(line: &str) -> Option<ModelSpec> {
    let (name, value) = if let Some(caps) = TABLE_ROW.captures(line) {
        (caps[1].to_string(), caps[2].to_string())
    } else if let Some(caps) = SPEC_PAIR.captures(line) {
        (caps[1].to_string(), caps[2].to_string())
    } else {
        return None;
    };

    let name = strip_inline(&name);
    let value = strip_inline(&value);
    if name.chars().all(|c| c == '-' || c == ':' || c.is_whitespace()) {
        return None;
    }
    if !value.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(ModelSpec { name, value })
}
