use super::{DetectContext, Detector, DetectorError, DetectorId};
use crate::analysis::{Analysis, Convention, ConventionCategory, ConventionSource, Facet};
use crate::fs::FileEntry;
use std::collections::BTreeMap;

/// Conventions inferred from file naming and layout
pub struct PatternsDetector;

/// Share of files that must agree before a naming style is reported
const NAMING_MAJORITY: f64 = 0.7;

/// Minimum sample for naming style inference
const MIN_NAMING_SAMPLE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum CaseStyle {
    Kebab,
    Snake,
    Pascal,
    Camel,
}

impl CaseStyle {
    fn label(self) -> &'static str {
        match self {
            Self::Kebab => "kebab-case",
            Self::Snake => "snake_case",
            Self::Pascal => "PascalCase",
            Self::Camel => "camelCase",
        }
    }

    fn classify(stem: &str) -> Option<Self> {
        let has_upper = stem.chars().any(|c| c.is_ascii_uppercase());
        let first_upper = stem.chars().next().is_some_and(|c| c.is_ascii_uppercase());

        if stem.contains('-') && !has_upper {
            Some(Self::Kebab)
        } else if stem.contains('_') && !has_upper {
            Some(Self::Snake)
        } else if first_upper && !stem.contains('-') && !stem.contains('_') {
            Some(Self::Pascal)
        } else if has_upper && !stem.contains('-') && !stem.contains('_') {
            Some(Self::Camel)
        } else {
            None
        }
    }
}

fn stem(entry: &FileEntry) -> &str {
    entry.name.split('.').next().unwrap_or(&entry.name)
}

impl Detector for PatternsDetector {
    fn id(&self) -> DetectorId {
        DetectorId::Patterns
    }

    fn detect(&self, ctx: &DetectContext, _analysis: &Analysis) -> Result<Facet, DetectorError> {
        ctx.check_cancelled()?;

        let inv = &ctx.inventory;
        let mut items = Vec::new();
        let max = ctx.options.max_examples;

        // Testing layout
        let go_tests: Vec<&FileEntry> = inv.files().filter(|f| f.name.ends_with("_test.go")).collect();
        if !go_tests.is_empty() {
            items.push(
                Convention::new(
                    ConventionCategory::Testing,
                    "Go tests sit next to the code they cover in *_test.go files",
                )
                .with_example(go_tests[0].path.clone()),
            );
        }

        let js_tests: Vec<&FileEntry> = inv
            .files()
            .filter(|f| f.name.contains(".test.") || f.name.contains(".spec."))
            .filter(|f| matches!(f.ext.as_str(), "js" | "jsx" | "ts" | "tsx" | "mjs"))
            .collect();
        if !js_tests.is_empty() {
            let colocated = js_tests
                .iter()
                .filter(|f| !f.segments().any(|s| s == "__tests__" || s == "tests" || s == "test"))
                .count();
            let suffix = if js_tests.iter().filter(|f| f.name.contains(".spec.")).count() * 2
                > js_tests.len()
            {
                ".spec"
            } else {
                ".test"
            };
            let placement = if colocated * 2 >= js_tests.len() {
                "colocated with the module under test"
            } else {
                "kept in dedicated test directories"
            };
            items.push(
                Convention::new(
                    ConventionCategory::Testing,
                    format!("Test files use the `{}` suffix and are {}", suffix, placement),
                )
                .with_example(js_tests[0].path.clone()),
            );
        }

        let py_tests: Vec<&FileEntry> = inv
            .files()
            .filter(|f| f.ext == "py" && (f.name.starts_with("test_") || f.name.ends_with("_test.py")))
            .collect();
        if !py_tests.is_empty() {
            items.push(
                Convention::new(
                    ConventionCategory::Testing,
                    "Python tests are named test_*.py and collected by pytest",
                )
                .with_example(py_tests[0].path.clone()),
            );
        }

        if inv.has_dir("tests") && inv.any_with_ext(&["rs"]) {
            items.push(Convention::new(
                ConventionCategory::Testing,
                "Rust integration tests live in tests/, unit tests in #[cfg(test)] modules",
            ));
        }

        // Naming
        if let Some(convention) = naming_convention(
            inv.with_ext(&["ts", "js"]).filter(|f| !f.name.contains(".config.")),
            "TypeScript/JavaScript module files",
            max,
        ) {
            items.push(convention);
        }
        if let Some(convention) = naming_convention(
            inv.with_ext(&["tsx", "jsx", "vue", "svelte"]),
            "Component files",
            max,
        ) {
            items.push(convention);
        }

        // Layout
        let barrels: Vec<&FileEntry> = inv
            .files()
            .filter(|f| !f.is_root_level() && matches!(f.name.as_str(), "index.ts" | "index.js"))
            .collect();
        if barrels.len() >= 2 {
            items.push(
                Convention::new(
                    ConventionCategory::Imports,
                    "Directories expose their public API through index barrel files",
                )
                .with_example(barrels[0].path.clone()),
            );
        }

        if inv.has_dir("internal") && inv.any_with_ext(&["go"]) {
            items.push(Convention::new(
                ConventionCategory::Structure,
                "Private Go packages live under internal/ and must not be imported from outside the module",
            ));
        }

        if inv.has_dir("src/features") || inv.has_dir("src/modules") {
            items.push(Convention::new(
                ConventionCategory::Structure,
                "Code is organized by feature: each feature folder owns its components, state and tests",
            ));
        }

        let init_files = inv.files().filter(|f| f.name == "__init__.py").count();
        if init_files > 0 {
            items.push(Convention::new(
                ConventionCategory::Structure,
                "Python packages are explicit: every package directory has an __init__.py",
            ));
        }

        Ok(Facet::Conventions {
            source: ConventionSource::Patterns,
            items,
        })
    }
}

fn naming_convention<'a>(
    files: impl Iterator<Item = &'a FileEntry>,
    subject: &str,
    max_examples: usize,
) -> Option<Convention> {
    let mut by_style: BTreeMap<CaseStyle, Vec<&FileEntry>> = BTreeMap::new();
    let mut total = 0usize;

    for file in files {
        let stem = stem(file);
        if stem == "index" || stem.len() < 2 {
            continue;
        }
        total += 1;
        if let Some(style) = CaseStyle::classify(stem) {
            by_style.entry(style).or_default().push(file);
        }
    }

    if total < MIN_NAMING_SAMPLE {
        return None;
    }

    let (style, files) = by_style
        .into_iter()
        .max_by(|a, b| a.1.len().cmp(&b.1.len()).then_with(|| b.0.cmp(&a.0)))?;

    if (files.len() as f64) < (total as f64) * NAMING_MAJORITY {
        return None;
    }

    let examples: Vec<&str> = files.iter().take(max_examples.min(2)).map(|f| f.name.as_str()).collect();
    Some(
        Convention::new(
            ConventionCategory::Naming,
            format!("{} are named in {}", subject, style.label()),
        )
        .with_example(examples.join(", ")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::test_support::{context_with, empty_analysis};

    fn conventions(files: &[(&str, &str)]) -> Vec<Convention> {
        let (_dir, ctx) = context_with(files);
        match PatternsDetector.detect(&ctx, &empty_analysis(&ctx)).unwrap() {
            Facet::Conventions { source, items } => {
                assert_eq!(source, ConventionSource::Patterns);
                items
            }
            other => panic!("unexpected facet {:?}", other),
        }
    }

    #[test]
    fn test_case_style_classification() {
        assert_eq!(CaseStyle::classify("user-profile"), Some(CaseStyle::Kebab));
        assert_eq!(CaseStyle::classify("user_profile"), Some(CaseStyle::Snake));
        assert_eq!(CaseStyle::classify("UserProfile"), Some(CaseStyle::Pascal));
        assert_eq!(CaseStyle::classify("userProfile"), Some(CaseStyle::Camel));
        assert_eq!(CaseStyle::classify("user"), None);
    }

    #[test]
    fn test_go_test_convention() {
        let items = conventions(&[("store/db.go", ""), ("store/db_test.go", "")]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].example.as_deref(), Some("store/db_test.go"));
    }

    #[test]
    fn test_component_naming_majority() {
        let items = conventions(&[
            ("src/components/UserCard.tsx", ""),
            ("src/components/NavBar.tsx", ""),
            ("src/components/LoginForm.tsx", ""),
            ("src/components/Button.test.tsx", ""),
        ]);

        let naming = items
            .iter()
            .find(|c| c.category == ConventionCategory::Naming)
            .unwrap();
        assert_eq!(naming.description, "Component files are named in PascalCase");
    }

    #[test]
    fn test_colocated_spec_files() {
        let items = conventions(&[
            ("src/api.ts", ""),
            ("src/api.spec.ts", ""),
            ("src/db.spec.ts", ""),
        ]);
        assert!(items
            .iter()
            .any(|c| c.description == "Test files use the `.spec` suffix and are colocated with the module under test"));
    }
}
