//! Deterministic prompts built from an `Analysis`

use crate::analysis::Analysis;
use std::fmt::Write;

crate::define_id_enum! {
    /// One enrichment request
    InsightKind {
        ProjectSummary => "project-summary" : "project summary",
        Conventions => "conventions" : "conventions insights",
        Architecture => "architecture" : "architecture insights",
        BestPractices => "best-practices" : "best practices",
        Patterns => "patterns" : "patterns insights",
    }
}

const MAX_LISTED: usize = 15;

/// Prompt for `kind`; identical analyses always yield identical prompts
pub fn build_prompt(kind: InsightKind, analysis: &Analysis) -> String {
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "You are reviewing the repository \"{}\" to help an AI coding assistant work in it.",
        analysis.project_name
    );
    let _ = writeln!(prompt, "Task: {}", kind.name());
    prompt.push('\n');
    write_context(&mut prompt, analysis);
    prompt.push('\n');
    prompt.push_str(instructions(kind));
    prompt
}

fn instructions(kind: InsightKind) -> &'static str {
    match kind {
        InsightKind::ProjectSummary => {
            "Write two or three sentences describing what this project does and who uses it. Plain prose, no headings."
        }
        InsightKind::Conventions => {
            "List the coding conventions a contributor must follow, as short bullet points. Only include conventions supported by the facts above."
        }
        InsightKind::Architecture => {
            "Explain how the code is organised and how requests or data flow between the layers, in at most one short paragraph."
        }
        InsightKind::BestPractices => {
            "List up to five concrete best practices for changing this codebase safely, as bullet points."
        }
        InsightKind::Patterns => {
            "Summarise the recurring code patterns and libraries, and when a contributor should reach for each, as bullet points."
        }
    }
}

fn write_context(out: &mut String, analysis: &Analysis) {
    let stack = &analysis.tech_stack;
    if !stack.languages.is_empty() {
        let languages: Vec<String> = stack
            .languages
            .iter()
            .map(|l| match &l.version {
                Some(v) => format!("{} {} ({:.0}%)", l.name, v, l.percentage),
                None => format!("{} ({:.0}%)", l.name, l.percentage),
            })
            .collect();
        let _ = writeln!(out, "Languages: {}", languages.join(", "));
    }
    if !stack.frameworks.is_empty() {
        let frameworks: Vec<&str> = stack.frameworks.iter().map(|f| f.name.as_str()).collect();
        let _ = writeln!(out, "Frameworks: {}", frameworks.join(", "));
    }
    if !stack.databases.is_empty() {
        let _ = writeln!(out, "Databases: {}", stack.databases.join(", "));
    }

    if let Some(description) = analysis.readme_content.as_ref().and_then(|r| r.description.as_ref()) {
        let _ = writeln!(out, "README description: {}", description);
    }

    if let Some(arch) = &analysis.architecture_info {
        if let Some(style) = &arch.style {
            let _ = writeln!(out, "Architecture style: {}", style);
        }
        for layer in &arch.layers {
            let _ = writeln!(out, "Layer {}: {}", layer.name, layer.packages.join(", "));
        }
    }

    if !analysis.structure.directories.is_empty() {
        out.push_str("Directories:\n");
        for dir in analysis.structure.directories.iter().take(MAX_LISTED) {
            let _ = writeln!(out, "- {}", dir.path);
        }
    }

    if !analysis.conventions.is_empty() {
        out.push_str("Detected conventions:\n");
        for convention in analysis.conventions.iter().take(MAX_LISTED) {
            let _ = writeln!(out, "- [{}] {}", convention.category, convention.description);
        }
    }

    let patterns: Vec<String> = analysis
        .code_patterns
        .all()
        .flat_map(|(_, group)| group.iter())
        .map(|p| format!("{} ({} files)", p.name, p.file_count))
        .take(MAX_LISTED)
        .collect();
    if !patterns.is_empty() {
        let _ = writeln!(out, "Code patterns: {}", patterns.join(", "));
    }

    if !analysis.commands.is_empty() {
        out.push_str("Commands:\n");
        for command in analysis.commands.iter().take(MAX_LISTED) {
            let _ = writeln!(out, "- {}: {}", command.name, command.command);
        }
    }

    if !analysis.endpoints.is_empty() {
        let _ = writeln!(out, "HTTP endpoints: {}", analysis.endpoints.len());
    }
}
