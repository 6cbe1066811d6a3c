use super::{DetectContext, Detector, DetectorError, DetectorId};
use crate::analysis::{Analysis, ConfigFile, Facet};
use std::path::Path;

/// Lint, format, build, container and CI configuration files
pub struct ConfigFilesDetector;

struct ConfigRule {
    tool: &'static str,
    purpose: &'static str,
    /// Exact file names
    names: &'static [&'static str],
    /// File name prefixes, e.g. `.eslintrc` for `.eslintrc.json`
    prefixes: &'static [&'static str],
}

const RULES: &[ConfigRule] = &[
    ConfigRule { tool: "ESLint", purpose: "JavaScript/TypeScript linting", names: &[], prefixes: &[".eslintrc", "eslint.config."] },
    ConfigRule { tool: "Prettier", purpose: "Code formatting", names: &[".prettierignore"], prefixes: &[".prettierrc", "prettier.config."] },
    ConfigRule { tool: "Biome", purpose: "Linting and formatting", names: &["biome.json", "biome.jsonc"], prefixes: &[] },
    ConfigRule { tool: "TypeScript", purpose: "TypeScript compiler options", names: &[], prefixes: &["tsconfig"] },
    ConfigRule { tool: "EditorConfig", purpose: "Editor whitespace settings", names: &[".editorconfig"], prefixes: &[] },
    ConfigRule { tool: "Stylelint", purpose: "CSS linting", names: &[], prefixes: &[".stylelintrc", "stylelint.config."] },
    ConfigRule { tool: "Babel", purpose: "JavaScript transpilation", names: &[".babelrc"], prefixes: &["babel.config."] },
    ConfigRule { tool: "Jest", purpose: "Test runner configuration", names: &[], prefixes: &["jest.config."] },
    ConfigRule { tool: "Vitest", purpose: "Test runner configuration", names: &[], prefixes: &["vitest.config."] },
    ConfigRule { tool: "Vite", purpose: "Bundler configuration", names: &[], prefixes: &["vite.config."] },
    ConfigRule { tool: "Webpack", purpose: "Bundler configuration", names: &[], prefixes: &["webpack.config."] },
    ConfigRule { tool: "Tailwind CSS", purpose: "Design tokens and content paths", names: &[], prefixes: &["tailwind.config."] },
    ConfigRule { tool: "PostCSS", purpose: "CSS processing", names: &[], prefixes: &["postcss.config."] },
    ConfigRule { tool: "golangci-lint", purpose: "Go linting", names: &[".golangci.yml", ".golangci.yaml", ".golangci.toml"], prefixes: &[] },
    ConfigRule { tool: "rustfmt", purpose: "Rust formatting", names: &["rustfmt.toml", ".rustfmt.toml"], prefixes: &[] },
    ConfigRule { tool: "Clippy", purpose: "Rust linting", names: &["clippy.toml", ".clippy.toml"], prefixes: &[] },
    ConfigRule { tool: "Ruff", purpose: "Python linting and formatting", names: &["ruff.toml", ".ruff.toml"], prefixes: &[] },
    ConfigRule { tool: "Flake8", purpose: "Python linting", names: &[".flake8"], prefixes: &[] },
    ConfigRule { tool: "mypy", purpose: "Python type checking", names: &["mypy.ini", ".mypy.ini"], prefixes: &[] },
    ConfigRule { tool: "tox", purpose: "Python test environments", names: &["tox.ini"], prefixes: &[] },
    ConfigRule { tool: "RuboCop", purpose: "Ruby linting", names: &[".rubocop.yml"], prefixes: &[] },
    ConfigRule { tool: "Docker", purpose: "Container image build", names: &["Dockerfile", ".dockerignore"], prefixes: &["Dockerfile."] },
    ConfigRule { tool: "Docker Compose", purpose: "Local service orchestration", names: &["docker-compose.yml", "docker-compose.yaml", "compose.yml", "compose.yaml"], prefixes: &[] },
    ConfigRule { tool: "GitLab CI", purpose: "Continuous integration", names: &[".gitlab-ci.yml"], prefixes: &[] },
    ConfigRule { tool: "Travis CI", purpose: "Continuous integration", names: &[".travis.yml"], prefixes: &[] },
    ConfigRule { tool: "Jenkins", purpose: "Continuous integration", names: &["Jenkinsfile"], prefixes: &[] },
    ConfigRule { tool: "Azure Pipelines", purpose: "Continuous integration", names: &["azure-pipelines.yml"], prefixes: &[] },
    ConfigRule { tool: "markdownlint", purpose: "Markdown linting", names: &[], prefixes: &[".markdownlint"] },
    ConfigRule { tool: "commitlint", purpose: "Commit message linting", names: &[], prefixes: &["commitlint.config.", ".commitlintrc"] },
    ConfigRule { tool: "lint-staged", purpose: "Pre-commit linting of staged files", names: &[], prefixes: &[".lintstagedrc", "lint-staged.config."] },
];

fn rule_for_name(name: &str) -> Option<&'static ConfigRule> {
    RULES.iter().find(|r| {
        r.names.contains(&name) || r.prefixes.iter().any(|p| name.starts_with(p))
    })
}

/// Rule for a root-relative path, covering CI directories as well as names
fn rule_for_path(path: &str) -> Option<(&'static str, &'static str)> {
    if path.starts_with(".github/workflows/") && (path.ends_with(".yml") || path.ends_with(".yaml")) {
        return Some(("GitHub Actions", "Continuous integration workflow"));
    }
    if path == ".github/dependabot.yml" || path == ".github/dependabot.yaml" {
        return Some(("Dependabot", "Dependency update automation"));
    }
    if path == ".circleci/config.yml" {
        return Some(("CircleCI", "Continuous integration"));
    }
    let name = path.rsplit('/').next().unwrap_or(path);
    rule_for_name(name).map(|r| (r.tool, r.purpose))
}

/// Whether `path` names a recognised lint, format, editor, build or CI
/// configuration file
///
/// Looks at the path text only; the file is never touched.
pub fn is_tool_config(path: &str) -> bool {
    let normalized = path.replace('\\', "/");
    let normalized = normalized.trim_start_matches("./");
    if rule_for_path(normalized).is_some() {
        return true;
    }
    Path::new(normalized)
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| rule_for_name(n).is_some())
}

impl Detector for ConfigFilesDetector {
    fn id(&self) -> DetectorId {
        DetectorId::ConfigFiles
    }

    fn detect(&self, ctx: &DetectContext, _analysis: &Analysis) -> Result<Facet, DetectorError> {
        ctx.check_cancelled()?;

        let files = ctx
            .inventory
            .files()
            .filter(|f| f.is_root_level() || f.path.starts_with(".github/") || f.path.starts_with(".circleci/"))
            .filter_map(|f| {
                rule_for_path(&f.path).map(|(tool, purpose)| ConfigFile {
                    path: f.path.clone(),
                    tool: tool.to_string(),
                    purpose: purpose.to_string(),
                })
            })
            .collect();

        Ok(Facet::ConfigFiles(files))
    }
}
