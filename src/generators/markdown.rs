//! Markdown rendering shared by every context file generator

use crate::analysis::{Analysis, Convention, ConventionCategory};
use std::collections::BTreeSet;
use std::fmt::Write;

/// Endpoints listed before the table is truncated
const MAX_ENDPOINTS: usize = 40;

/// Which sections a generator wants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Level of the top title; sections use one level below
    pub title_level: usize,
    pub include_endpoints: bool,
    pub include_git: bool,
    pub include_ai: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            title_level: 1,
            include_endpoints: true,
            include_git: true,
            include_ai: true,
        }
    }
}

/// Conventions with duplicate descriptions removed, grouped by category in
/// order of first appearance
pub fn dedup_conventions(conventions: &[Convention]) -> Vec<(ConventionCategory, Vec<&Convention>)> {
    let mut seen = BTreeSet::new();
    let mut groups: Vec<(ConventionCategory, Vec<&Convention>)> = Vec::new();

    for convention in conventions {
        let key = convention.description.trim().to_lowercase();
        if key.is_empty() || !seen.insert(key) {
            continue;
        }
        match groups.iter_mut().find(|(category, _)| *category == convention.category) {
            Some((_, items)) => items.push(convention),
            None => groups.push((convention.category, vec![convention])),
        }
    }
    groups
}

fn heading(out: &mut String, level: usize, text: &str) {
    let _ = writeln!(out, "{} {}\n", "#".repeat(level.clamp(1, 6)), text);
}

/// Renders the full context document
pub fn render(analysis: &Analysis, options: &RenderOptions) -> String {
    let mut out = String::new();
    let h2 = options.title_level + 1;
    let h3 = options.title_level + 2;

    heading(&mut out, options.title_level, &analysis.project_name);

    let description = analysis
        .readme_content
        .as_ref()
        .and_then(|r| r.description.as_deref());
    if let Some(description) = description {
        let _ = writeln!(out, "{}\n", description);
    }
    if options.include_ai {
        if let Some(summary) = analysis.ai_enrichment.as_ref().and_then(|ai| ai.project_summary.as_deref()) {
            let _ = writeln!(out, "{}\n", summary);
        }
    }

    render_tech_stack(&mut out, analysis, h2);
    render_commands(&mut out, analysis, h2);
    render_structure(&mut out, analysis, h2, h3);
    render_conventions(&mut out, analysis, h2, h3);
    render_patterns(&mut out, analysis, h2);
    if options.include_endpoints {
        render_endpoints(&mut out, analysis, h2);
    }
    render_development(&mut out, analysis, h2, h3);
    if options.include_git {
        render_git(&mut out, analysis, h2);
    }
    render_tools(&mut out, analysis, h2);
    if options.include_ai {
        render_ai(&mut out, analysis, h2, h3);
    }

    let trimmed = out.trim_end().len();
    out.truncate(trimmed);
    out.push('\n');
    out
}

fn render_tech_stack(out: &mut String, analysis: &Analysis, level: usize) {
    let stack = &analysis.tech_stack;
    if stack.languages.is_empty() && stack.frameworks.is_empty() {
        return;
    }
    heading(out, level, "Tech Stack");
    for language in &stack.languages {
        match &language.version {
            Some(version) => {
                let _ = writeln!(out, "- **{}** {} ({:.1}%)", language.name, version, language.percentage);
            }
            None => {
                let _ = writeln!(out, "- **{}** ({:.1}%)", language.name, language.percentage);
            }
        }
    }
    for framework in &stack.frameworks {
        let version = framework.version.as_deref().map(|v| format!(" {}", v)).unwrap_or_default();
        let _ = writeln!(out, "- {}{} ({})", framework.name, version, framework.category.name());
    }
    if !stack.databases.is_empty() {
        let _ = writeln!(out, "- Databases: {}", stack.databases.join(", "));
    }
    if !stack.tools.is_empty() {
        let _ = writeln!(out, "- Tools: {}", stack.tools.join(", "));
    }
    out.push('\n');
}

fn render_commands(out: &mut String, analysis: &Analysis, level: usize) {
    if analysis.commands.is_empty() {
        return;
    }
    heading(out, level, "Commands");
    out.push_str("```bash\n");
    for command in &analysis.commands {
        match &command.description {
            Some(description) => {
                let _ = writeln!(out, "{}  # {}", command.command, description);
            }
            None => {
                let _ = writeln!(out, "{}  # {}", command.command, command.name);
            }
        }
    }
    out.push_str("```\n\n");
}

fn render_structure(out: &mut String, analysis: &Analysis, h2: usize, h3: usize) {
    let described: Vec<_> = analysis
        .structure
        .directories
        .iter()
        .filter(|d| d.purpose.is_some())
        .collect();
    let arch = analysis.architecture_info.as_deref();
    if described.is_empty() && analysis.key_files.is_empty() && arch.is_none() && analysis.monorepo_info.is_none() {
        return;
    }
    heading(out, h2, "Project Structure");

    for dir in &described {
        let _ = writeln!(
            out,
            "- `{}/` {} ({} files)",
            dir.path,
            dir.purpose.as_deref().unwrap_or_default(),
            dir.file_count
        );
    }
    if !described.is_empty() {
        out.push('\n');
    }

    if !analysis.key_files.is_empty() {
        heading(out, h3, "Key Files");
        for file in &analysis.key_files {
            let _ = writeln!(out, "- `{}`: {}", file.path, file.purpose);
        }
        out.push('\n');
    }

    if let Some(monorepo) = analysis.monorepo_info.as_deref() {
        heading(out, h3, "Workspaces");
        let _ = writeln!(out, "Managed with {}.\n", monorepo.tool.name());
        for package in &monorepo.packages {
            match &package.description {
                Some(description) => {
                    let _ = writeln!(out, "- `{}` ({}): {}", package.path, package.name, description);
                }
                None => {
                    let _ = writeln!(out, "- `{}` ({})", package.path, package.name);
                }
            }
        }
        out.push('\n');
    }

    if let Some(arch) = arch {
        heading(out, h3, "Architecture");
        if let Some(style) = &arch.style {
            let _ = writeln!(out, "Style: {}\n", style);
        }
        if let Some(entry) = &arch.entry_point {
            let _ = writeln!(out, "Entry point: `{}`\n", entry);
        }
        for layer in &arch.layers {
            let purpose = layer.purpose.as_deref().map(|p| format!(": {}", p)).unwrap_or_default();
            let _ = writeln!(out, "- **{}**{} ({})", layer.name, purpose, layer.packages.join(", "));
        }
        if !arch.layers.is_empty() {
            out.push('\n');
        }
        if let Some(diagram) = &arch.diagram {
            let _ = writeln!(out, "```mermaid\n{}\n```\n", diagram.trim_end());
        }
    }
}

fn render_conventions(out: &mut String, analysis: &Analysis, h2: usize, h3: usize) {
    let groups = dedup_conventions(&analysis.conventions);
    if groups.is_empty() {
        return;
    }
    heading(out, h2, "Conventions");
    for (category, items) in groups {
        heading(out, h3, category.name());
        for convention in items {
            match &convention.example {
                Some(example) => {
                    let _ = writeln!(out, "- {} (e.g. `{}`)", convention.description, example);
                }
                None => {
                    let _ = writeln!(out, "- {}", convention.description);
                }
            }
        }
        out.push('\n');
    }
}

fn render_patterns(out: &mut String, analysis: &Analysis, level: usize) {
    if analysis.code_patterns.is_empty() {
        return;
    }
    heading(out, level, "Code Patterns");
    for (_, group) in analysis.code_patterns.all() {
        for pattern in group {
            let _ = write!(out, "- **{}** ({}): {}", pattern.name, pattern.category, pattern.description);
            if let Some(example) = pattern.examples.first() {
                let _ = write!(out, ", see `{}`", example);
            }
            out.push('\n');
        }
    }
    out.push('\n');
}

fn render_endpoints(out: &mut String, analysis: &Analysis, level: usize) {
    if analysis.endpoints.is_empty() {
        return;
    }
    heading(out, level, "API Endpoints");
    out.push_str("| Method | Path | Location | Auth |\n|---|---|---|---|\n");
    for endpoint in analysis.endpoints.iter().take(MAX_ENDPOINTS) {
        let location = match endpoint.line {
            Some(line) => format!("{}:{}", endpoint.file, line),
            None => endpoint.file.clone(),
        };
        let _ = writeln!(
            out,
            "| {} | `{}` | `{}` | {} |",
            endpoint.method,
            endpoint.path,
            location,
            endpoint.auth.as_deref().unwrap_or("")
        );
    }
    if analysis.endpoints.len() > MAX_ENDPOINTS {
        let _ = writeln!(out, "\n{} more endpoints not shown.", analysis.endpoints.len() - MAX_ENDPOINTS);
    }
    out.push('\n');
}

fn render_development(out: &mut String, analysis: &Analysis, h2: usize, h3: usize) {
    let dev = analysis.development_info.as_deref();
    if dev.is_none() && analysis.config_files.is_empty() {
        return;
    }
    heading(out, h2, "Development");

    if let Some(dev) = dev {
        if !dev.prerequisites.is_empty() {
            heading(out, h3, "Prerequisites");
            for prerequisite in &dev.prerequisites {
                match &prerequisite.version {
                    Some(version) => {
                        let _ = writeln!(out, "- {} {}", prerequisite.name, version);
                    }
                    None => {
                        let _ = writeln!(out, "- {}", prerequisite.name);
                    }
                }
            }
            out.push('\n');
        }
        if !dev.setup_steps.is_empty() {
            heading(out, h3, "Setup");
            for (idx, step) in dev.setup_steps.iter().enumerate() {
                match &step.command {
                    Some(command) => {
                        let _ = writeln!(out, "{}. {}: `{}`", idx + 1, step.description, command);
                    }
                    None => {
                        let _ = writeln!(out, "{}. {}", idx + 1, step.description);
                    }
                }
            }
            out.push('\n');
        }
        if !dev.git_hooks.is_empty() {
            heading(out, h3, "Git Hooks");
            for hook in &dev.git_hooks {
                let _ = writeln!(out, "- `{}` ({}): {}", hook.name, hook.tool, hook.commands.join("; "));
            }
            out.push('\n');
        }
    }

    if !analysis.config_files.is_empty() {
        heading(out, h3, "Tooling Configuration");
        for file in &analysis.config_files {
            let _ = writeln!(out, "- `{}`: {} ({})", file.path, file.tool, file.purpose);
        }
        out.push('\n');
    }
}

fn render_git(out: &mut String, analysis: &Analysis, level: usize) {
    let Some(git) = analysis.git_conventions.as_deref() else {
        return;
    };
    let commit = &git.commit_convention;
    let branch = &git.branch_convention;
    if commit.format.is_empty() && branch.prefixes.is_empty() {
        return;
    }
    heading(out, level, "Git Workflow");
    if !commit.format.is_empty() {
        let _ = writeln!(out, "- Commit style: {} (`{}`)", commit.style.name(), commit.format);
        if !commit.types.is_empty() {
            let _ = writeln!(out, "- Commit types: {}", commit.types.join(", "));
        }
        if !commit.example.is_empty() {
            let _ = writeln!(out, "- Example: `{}`", commit.example);
        }
    }
    if !branch.prefixes.is_empty() {
        let _ = writeln!(out, "- Branch naming: `{}`", branch.format);
    }
    out.push('\n');
}

fn render_tools(out: &mut String, analysis: &Analysis, level: usize) {
    let cli = analysis.cli_info.as_deref();
    if cli.is_none() && analysis.project_tools.is_empty() {
        return;
    }
    heading(out, level, "CLI and Tools");
    if let Some(cli) = cli {
        let binary = cli.binary_name.as_deref().unwrap_or("the CLI");
        let _ = writeln!(out, "- `{}` is built with {}", binary, cli.framework);
        if !cli.commands.is_empty() {
            let _ = writeln!(out, "- Subcommands: {}", cli.commands.join(", "));
        }
        for convention in &cli.flag_conventions {
            let _ = writeln!(out, "- {}", convention);
        }
    }
    for tool in &analysis.project_tools {
        let _ = writeln!(out, "- `{}`: `{}` (from {})", tool.name, tool.command, tool.source);
    }
    out.push('\n');
}

fn render_ai(out: &mut String, analysis: &Analysis, h2: usize, h3: usize) {
    let Some(ai) = analysis.ai_enrichment.as_deref() else {
        return;
    };
    let sections = [
        ("Conventions", &ai.conventions_insights),
        ("Architecture", &ai.architecture_insights),
        ("Best Practices", &ai.best_practices),
        ("Patterns", &ai.patterns_insights),
    ];
    if sections.iter().all(|(_, text)| text.is_none()) {
        return;
    }
    heading(out, h2, "Insights");
    for (title, text) in sections {
        if let Some(text) = text {
            heading(out, h3, title);
            let _ = writeln!(out, "{}\n", text.trim());
        }
    }
}
