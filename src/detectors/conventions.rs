use super::{DetectContext, Detector, DetectorError, DetectorId};
use crate::analysis::{Analysis, Convention, ConventionCategory, ConventionSource, Facet};
use once_cell::sync::Lazy;
use regex::Regex;

/// Language and tooling conventions that hold regardless of framework
pub struct ConventionsDetector;

static TS_STRICT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""strict"\s*:\s*true"#).expect("valid regex"));

impl Detector for ConventionsDetector {
    fn id(&self) -> DetectorId {
        DetectorId::Conventions
    }

    fn detect(&self, ctx: &DetectContext, _analysis: &Analysis) -> Result<Facet, DetectorError> {
        use ConventionCategory::*;

        let inv = &ctx.inventory;
        let mut items = Vec::new();

        let ts_files = inv.with_ext(&["ts", "tsx"]).count();
        let js_files = inv
            .with_ext(&["js", "jsx", "mjs", "cjs"])
            .filter(|f| !f.name.contains(".config."))
            .count();

        if ts_files > 0 && js_files == 0 {
            items.push(
                Convention::new(Style, "TypeScript-only codebase: write new modules as .ts/.tsx, not .js")
                    .with_example("src/utils/format.ts"),
            );
        } else if ts_files > 0 && js_files > 0 && ts_files >= js_files {
            items.push(Convention::new(
                Style,
                "Mixed JavaScript/TypeScript codebase: prefer TypeScript for new files",
            ));
        }

        if let Some(tsconfig) = ctx.read_if_present("tsconfig.json")? {
            if TS_STRICT.is_match(&tsconfig) {
                items.push(Convention::new(
                    Style,
                    "TypeScript strict mode is enabled; avoid `any` and implicit nulls",
                ));
            }
        }

        if inv.any_with_ext(&["jsx", "tsx"]) {
            items.push(Convention::new(
                Components,
                "UI is built from React components in .jsx/.tsx files",
            ));
        }

        if inv.any_with_ext(&["go"]) {
            items.push(Convention::new(
                Style,
                "Go project: format with gofmt and follow Effective Go naming (MixedCaps, short package names)",
            ));
            items.push(Convention::new(
                ErrorHandling,
                "Return errors as the last value and wrap them with context (fmt.Errorf(\"...: %w\", err))",
            ));
        }

        if inv.any_with_ext(&["rs"]) {
            items.push(Convention::new(
                Style,
                "Rust project: format with rustfmt and keep clippy clean",
            ));
        }

        if inv.any_with_ext(&["py"]) {
            items.push(Convention::new(
                Naming,
                "Python code follows PEP 8: snake_case functions and modules, PascalCase classes",
            ));
        }

        if inv.any_with_ext(&["rb"]) {
            items.push(Convention::new(
                Naming,
                "Ruby code uses snake_case methods and files, CamelCase classes",
            ));
        }

        if inv.has_file(".editorconfig") {
            items.push(Convention::new(
                Style,
                "Respect the indentation and whitespace rules in .editorconfig",
            ));
        }

        let prettier = inv
            .files()
            .any(|f| f.is_root_level() && f.name.starts_with(".prettierrc"))
            || inv.has_file("prettier.config.js");
        if prettier {
            items.push(Convention::new(Tooling, "Format with Prettier before committing"));
        }

        let eslint = inv.files().any(|f| {
            f.is_root_level() && (f.name.starts_with(".eslintrc") || f.name.starts_with("eslint.config"))
        });
        if eslint {
            items.push(Convention::new(Tooling, "Code must pass ESLint"));
        }

        if inv.has_file(".golangci.yml") || inv.has_file(".golangci.yaml") {
            items.push(Convention::new(Tooling, "Code must pass golangci-lint"));
        }

        if inv.has_file("ruff.toml") || inv.has_file(".flake8") {
            items.push(Convention::new(Tooling, "Python code must pass the configured linter"));
        }

        if inv.has_file(".env.example") {
            items.push(Convention::new(
                Security,
                "Never commit secrets; document new environment variables in .env.example",
            ));
        }

        Ok(Facet::Conventions {
            source: ConventionSource::Base,
            items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::test_support::{context_with, empty_analysis};

    fn conventions(files: &[(&str, &str)]) -> Vec<Convention> {
        let (_dir, ctx) = context_with(files);
        match ConventionsDetector.detect(&ctx, &empty_analysis(&ctx)).unwrap() {
            Facet::Conventions { source, items } => {
                assert_eq!(source, ConventionSource::Base);
                items
            }
            other => panic!("unexpected facet {:?}", other),
        }
    }

    #[test]
    fn test_go_project_hint() {
        let items = conventions(&[("go.mod", "module test\n\ngo 1.21"), ("main.go", "")]);
        assert!(items
            .iter()
            .any(|c| c.description.starts_with("Go project") && c.description.contains("gofmt")));
    }

    #[test]
    fn test_typescript_only_recommends_ts() {
        let items = conventions(&[
            ("src/index.ts", ""),
            ("src/App.tsx", ""),
            ("vite.config.js", ""),
            ("tsconfig.json", "{\"compilerOptions\": {\"strict\": true}}"),
        ]);

        assert!(items.iter().any(|c| c.description.contains(".ts/.tsx")));
        assert!(items.iter().any(|c| c.description.contains("strict mode")));
        assert!(items.iter().any(|c| c.category == ConventionCategory::Components));
    }

    #[test]
    fn test_empty_repository_has_no_conventions() {
        assert!(conventions(&[]).is_empty());
    }
}
