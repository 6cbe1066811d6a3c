use super::{DetectContext, Detector, DetectorError, DetectorId};
use crate::analysis::{Analysis, Facet, ProjectCommand};
use crate::stack::manifest::{CargoManifest, PackageJson, PyProject};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Build, test and run commands from Makefiles and manifests
pub struct CommandsDetector;

static MAKE_TARGET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z0-9][A-Za-z0-9_.\-/]*)\s*:(?:[^=]|$)(?:.*##\s*(.+))?").expect("valid regex")
});

impl Detector for CommandsDetector {
    fn id(&self) -> DetectorId {
        DetectorId::Commands
    }

    fn detect(&self, ctx: &DetectContext, _analysis: &Analysis) -> Result<Facet, DetectorError> {
        let mut commands = Vec::new();

        for makefile in ["Makefile", "makefile", "GNUmakefile"] {
            if let Some(content) = ctx.read_if_present(makefile)? {
                commands.extend(make_targets(&content));
                break;
            }
        }

        if let Some(content) = ctx.read_if_present("package.json")? {
            match PackageJson::parse(&content) {
                Ok(pkg) => commands.extend(npm_scripts(&pkg)),
                Err(e) => debug!(error = %e, "Ignoring unparseable package.json"),
            }
        }

        if let Some(content) = ctx.read_if_present("pyproject.toml")? {
            match PyProject::parse(&content) {
                Ok(project) => commands.extend(project.scripts.keys().map(|name| {
                    ProjectCommand::new(name, name.as_str())
                        .described("Console script declared in pyproject.toml")
                })),
                Err(e) => debug!(error = %e, "Ignoring unparseable pyproject.toml"),
            }
        }

        let mut generic = generic_commands(ctx);

        if let Some(content) = ctx.read_if_present("Cargo.toml")? {
            match CargoManifest::parse(&content) {
                Ok(cargo) => apply_cargo_enrichment(&mut generic, &cargo, ctx),
                Err(e) => debug!(error = %e, "Ignoring unparseable Cargo.toml"),
            }
        }

        commands.extend(generic);
        dedup_commands(&mut commands);

        Ok(Facet::Commands(commands))
    }
}

fn make_targets(content: &str) -> Vec<ProjectCommand> {
    let mut targets = Vec::new();
    let mut pending_comment: Option<String> = None;

    for line in content.lines() {
        if let Some(comment) = line.strip_prefix("##") {
            pending_comment = Some(comment.trim().to_string());
            continue;
        }
        if line.starts_with('\t') || line.trim().is_empty() {
            continue;
        }

        if let Some(caps) = MAKE_TARGET.captures(line) {
            let name = &caps[1];
            if !name.starts_with('.') && !name.contains('%') {
                let description = caps
                    .get(2)
                    .map(|m| m.as_str().trim().to_string())
                    .or_else(|| pending_comment.take());
                let mut command = ProjectCommand::new(name, format!("make {}", name));
                command.description = description;
                targets.push(command);
            }
        }
        pending_comment = None;
    }

    targets
}

fn npm_scripts(pkg: &PackageJson) -> Vec<ProjectCommand> {
    let manager = pkg.manager_name().unwrap_or("npm");
    pkg.scripts
        .iter()
        .map(|(name, body)| {
            let command = match (manager, name.as_str()) {
                ("npm", "test" | "start") => format!("npm {}", name),
                ("npm", _) => format!("npm run {}", name),
                ("bun", _) => format!("bun run {}", name),
                (other, _) => format!("{} {}", other, name),
            };
            ProjectCommand::new(name, command).described(body.as_str())
        })
        .collect()
}

/// Commands implied by the language toolchain alone
fn generic_commands(ctx: &DetectContext) -> Vec<ProjectCommand> {
    let inv = &ctx.inventory;
    let mut commands = Vec::new();

    if inv.has_file("go.mod") {
        commands.push(ProjectCommand::new("build", "go build ./...").described("Build all packages"));
        commands.push(ProjectCommand::new("test", "go test ./...").described("Run all tests"));
        commands.push(ProjectCommand::new("fmt", "gofmt -w .").described("Format Go sources"));
        commands.push(ProjectCommand::new("vet", "go vet ./...").described("Report suspicious constructs"));
    }

    if inv.has_file("Cargo.toml") {
        commands.push(ProjectCommand::new("build", "cargo build"));
        commands.push(ProjectCommand::new("test", "cargo test"));
    }

    let python = inv.has_file("pyproject.toml") || inv.has_file("requirements.txt");
    if python {
        if inv.has_file("requirements.txt") {
            commands.push(
                ProjectCommand::new("install", "pip install -r requirements.txt")
                    .described("Install dependencies"),
            );
        }
        if inv.files().any(|f| f.name.starts_with("test_") && f.ext == "py") || inv.has_dir("tests") {
            commands.push(ProjectCommand::new("test", "pytest").described("Run the test suite"));
        }
    }

    if inv.has_file("Gemfile") {
        commands.push(ProjectCommand::new("install", "bundle install").described("Install gems"));
        if inv.has_dir("spec") {
            commands.push(ProjectCommand::new("test", "bundle exec rspec").described("Run specs"));
        }
    }

    commands
}

/// Replaces the generic cargo commands with the enriched set, then appends
/// cargo-only commands
fn apply_cargo_enrichment(
    commands: &mut Vec<ProjectCommand>,
    cargo: &CargoManifest,
    ctx: &DetectContext,
) {
    let workspace = !cargo.workspace_members.is_empty();
    let scope = if workspace { " --workspace" } else { "" };

    for command in commands.iter_mut() {
        match command.command.as_str() {
            "cargo build" => {
                *command = ProjectCommand::new("build", format!("cargo build{}", scope))
                    .described("Build in debug mode");
            }
            "cargo test" => {
                *command = ProjectCommand::new("test", format!("cargo test{}", scope))
                    .described("Run unit and integration tests");
            }
            _ => {}
        }
    }

    let mut enrichment = vec![
        ProjectCommand::new("lint", format!("cargo clippy{} --all-targets -- -D warnings", scope))
            .described("Lint with clippy"),
        ProjectCommand::new("fmt", "cargo fmt --all").described("Format Rust sources"),
    ];
    if ctx.inventory.has_file("src/main.rs") || !cargo.bins.is_empty() {
        enrichment.push(ProjectCommand::new("run", "cargo run").described("Run the binary"));
    }
    enrichment.push(
        ProjectCommand::new("release", format!("cargo build{} --release", scope))
            .described("Optimized build"),
    );

    commands.extend(enrichment);
}

/// Drops later commands whose command line repeats an earlier one
fn dedup_commands(commands: &mut Vec<ProjectCommand>) {
    let mut seen = std::collections::HashSet::new();
    commands.retain(|c| seen.insert(c.command.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::test_support::{context_with, empty_analysis};

    fn commands(files: &[(&str, &str)]) -> Vec<ProjectCommand> {
        let (_dir, ctx) = context_with(files);
        match CommandsDetector.detect(&ctx, &empty_analysis(&ctx)).unwrap() {
            Facet::Commands(c) => c,
            other => panic!("unexpected facet {:?}", other),
        }
    }

    fn lines(commands: &[ProjectCommand]) -> Vec<&str> {
        commands.iter().map(|c| c.command.as_str()).collect()
    }

    #[test]
    fn test_go_project_hints() {
        let found = commands(&[("go.mod", "module test\n\ngo 1.21"), ("main.go", "")]);
        let found = lines(&found);
        assert!(found.contains(&"go build ./..."));
        assert!(found.contains(&"gofmt -w ."));
    }

    #[test]
    fn test_makefile_targets() {
        let makefile = ".PHONY: build test\n\n## Compile everything\nbuild:\n\tgo build\n\ntest: build ## Run tests\n\tgo test\n\nVERSION := 1.0\n%.o: %.c\n";
        let found = commands(&[("Makefile", makefile)]);

        assert_eq!(lines(&found), vec!["make build", "make test"]);
        assert_eq!(found[0].description.as_deref(), Some("Compile everything"));
        assert_eq!(found[1].description.as_deref(), Some("Run tests"));
    }

    #[test]
    fn test_package_scripts_use_manager() {
        let found = commands(&[(
            "package.json",
            r#"{"packageManager": "pnpm@8.0.0", "scripts": {"dev": "vite", "test": "vitest"}}"#,
        )]);
        assert_eq!(lines(&found), vec!["pnpm dev", "pnpm test"]);

        let found = commands(&[(
            "package.json",
            r#"{"scripts": {"build": "tsc", "test": "jest"}}"#,
        )]);
        assert_eq!(lines(&found), vec!["npm run build", "npm test"]);
        assert_eq!(found[1].description.as_deref(), Some("jest"));
    }

    #[test]
    fn test_cargo_replaces_generic_then_appends() {
        let found = commands(&[
            (
                "Cargo.toml",
                "[package]\nname = \"x\"\n\n[workspace]\nmembers = [\"crates/*\"]\n",
            ),
            ("src/main.rs", "fn main() {}"),
        ]);

        assert_eq!(
            lines(&found),
            vec![
                "cargo build --workspace",
                "cargo test --workspace",
                "cargo clippy --workspace --all-targets -- -D warnings",
                "cargo fmt --all",
                "cargo run",
                "cargo build --workspace --release",
            ]
        );
    }

    #[test]
    fn test_invalid_package_json_is_soft() {
        let found = commands(&[("package.json", "{oops")]);
        assert!(found.is_empty());
    }
}
