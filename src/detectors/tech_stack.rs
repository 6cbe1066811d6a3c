use super::{DetectContext, Detector, DetectorError, DetectorId};
use crate::analysis::{Analysis, Facet, Framework, Language, TechStack};
use crate::stack::framework::{database_matches, DATABASES, FRAMEWORKS, TOOL_FINGERPRINTS};
use crate::stack::language::{all_languages, language_for_ext, LanguageDefinition};
use crate::stack::manifest::{
    parse_gemfile, parse_requirements_txt, CargoManifest, ComposerJson, GoMod, PackageJson,
    PomXml, PyProject,
};
use crate::stack::{DeclaredDependency, DependencyPatternType, ManifestDependency};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Manifests deeper than this are not consulted for framework detection
const MAX_MANIFEST_DEPTH: usize = 2;

/// Languages, frameworks, databases and tools
pub struct TechStackDetector;

impl Detector for TechStackDetector {
    fn id(&self) -> DetectorId {
        DetectorId::TechStack
    }

    fn detect(&self, ctx: &DetectContext, _analysis: &Analysis) -> Result<Facet, DetectorError> {
        let mut languages = language_shares(ctx);
        for language in &mut languages {
            language.version = language_version(ctx, &language.name)?;
        }

        let deps = collect_manifest_dependencies(ctx)?;
        let frameworks = detect_frameworks(ctx, &deps);

        let databases = DATABASES
            .iter()
            .filter(|(_, patterns)| database_matches(patterns, &deps))
            .map(|(name, _)| name.to_string())
            .collect();

        let tools = detect_tools(ctx)?;

        debug!(
            languages = languages.len(),
            frameworks = frameworks.len(),
            "Tech stack detected"
        );

        Ok(Facet::TechStack(Arc::new(TechStack {
            languages,
            frameworks,
            databases,
            tools,
        })))
    }
}

/// Share of source files per language, largest first
///
/// Percentages are floored to one decimal so that they never sum above 100.
fn language_shares(ctx: &DetectContext) -> Vec<Language> {
    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for entry in ctx.inventory.files() {
        if let Some(lang) = language_for_ext(&entry.ext) {
            *counts.entry(lang.name()).or_default() += 1;
        }
    }

    let total: usize = counts.values().sum();
    if total == 0 {
        return Vec::new();
    }

    let mut ranked: Vec<(&'static str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    ranked
        .into_iter()
        .map(|(name, count)| Language {
            name: name.to_string(),
            version: None,
            percentage: ((count * 1000) / total) as f64 / 10.0,
        })
        .collect()
}

/// Version of `language` read from its version files, if any
pub(crate) fn language_version(ctx: &DetectContext, language: &str) -> Result<Option<String>, DetectorError> {
    let Some(definition) = all_languages()
        .iter()
        .find(|l| l.name() == language)
        .copied()
    else {
        return Ok(None);
    };

    for file in definition.version_files() {
        if !ctx.inventory.has_file(file) {
            continue;
        }
        if let Some(content) = ctx.read_manifest(file)? {
            if let Some(version) = definition.detect_version(file, &content) {
                return Ok(Some(version));
            }
        }
    }
    Ok(None)
}

/// Dependencies declared by every manifest near the root
///
/// Unparseable manifests are skipped.
pub fn collect_manifest_dependencies(
    ctx: &DetectContext,
) -> Result<Vec<ManifestDependency>, DetectorError> {
    let mut deps = Vec::new();

    let manifests: Vec<(String, String)> = ctx
        .inventory
        .files()
        .filter(|e| e.depth() <= MAX_MANIFEST_DEPTH)
        .filter(|e| manifest_kind(&e.name).is_some())
        .map(|e| (e.path.clone(), e.name.clone()))
        .collect();

    for (path, name) in manifests {
        let Some(kind) = manifest_kind(&name) else {
            continue;
        };
        let Some(content) = ctx.read_manifest(&path)? else {
            continue;
        };
        match parse_manifest(&name, &content) {
            Ok(declared) => deps.extend(declared.into_iter().map(|dependency| ManifestDependency {
                kind,
                dependency,
                manifest: path.clone(),
            })),
            Err(message) => {
                debug!(manifest = %path, error = %message, "Skipping unparseable manifest");
            }
        }
    }

    Ok(deps)
}

fn manifest_kind(name: &str) -> Option<DependencyPatternType> {
    let kind = match name {
        "package.json" => DependencyPatternType::NpmPackage,
        "go.mod" => DependencyPatternType::GoModule,
        "Cargo.toml" => DependencyPatternType::Crate,
        "pyproject.toml" | "requirements.txt" | "requirements-dev.txt" => {
            DependencyPatternType::PypiPackage
        }
        "Gemfile" => DependencyPatternType::Gem,
        "pom.xml" => DependencyPatternType::MavenGroupArtifact,
        "composer.json" => DependencyPatternType::ComposerPackage,
        _ => return None,
    };
    Some(kind)
}

fn parse_manifest(name: &str, content: &str) -> Result<Vec<DeclaredDependency>, String> {
    let declared = match name {
        "package.json" => PackageJson::parse(content)
            .map_err(|e| e.to_string())?
            .declared(),
        "go.mod" => GoMod::parse(content)
            .requires
            .into_iter()
            .map(|r| DeclaredDependency {
                name: r.path,
                version: r.version,
                dev: false,
            })
            .collect(),
        "Cargo.toml" => CargoManifest::parse(content)
            .map_err(|e| e.to_string())?
            .dependencies,
        "pyproject.toml" => PyProject::parse(content)
            .map_err(|e| e.to_string())?
            .dependencies,
        "requirements.txt" | "requirements-dev.txt" => parse_requirements_txt(content),
        "Gemfile" => parse_gemfile(content),
        "pom.xml" => PomXml::parse(content)
            .map_err(|e| e.to_string())?
            .dependencies,
        "composer.json" => ComposerJson::parse(content)
            .map_err(|e| e.to_string())?
            .declared(),
        _ => Vec::new(),
    };
    Ok(declared)
}

fn detect_frameworks(ctx: &DetectContext, deps: &[ManifestDependency]) -> Vec<Framework> {
    FRAMEWORKS
        .iter()
        .filter_map(|rule| {
            if let Some(dep) = rule.match_dependency(deps) {
                return Some(Framework {
                    name: rule.name.to_string(),
                    version: Some(dep.dependency.version.clone()).filter(|v| v != "*"),
                    category: rule.category,
                });
            }
            rule.matches_fingerprint(&ctx.inventory).then(|| Framework {
                name: rule.name.to_string(),
                version: None,
                category: rule.category,
            })
        })
        .collect()
}

fn detect_tools(ctx: &DetectContext) -> Result<Vec<String>, DetectorError> {
    let mut tools: Vec<String> = Vec::new();
    let mut push = |tool: &str| {
        if !tools.iter().any(|t| t == tool) {
            tools.push(tool.to_string());
        }
    };

    if let Some(content) = ctx.read_if_present("package.json")? {
        let manager = PackageJson::parse(&content)
            .ok()
            .and_then(|pkg| pkg.manager_name().map(String::from));
        let manager = manager.unwrap_or_else(|| {
            if ctx.inventory.has_file("pnpm-workspace.yaml") {
                "pnpm".to_string()
            } else if ctx.inventory.has_file("bunfig.toml") {
                "bun".to_string()
            } else {
                "npm".to_string()
            }
        });
        push(&manager);
    }

    for (path, tool) in TOOL_FINGERPRINTS {
        if ctx.inventory.contains(path) {
            push(tool);
        }
    }

    if ctx.inventory.any_with_ext(&["tf"]) {
        push("Terraform");
    }

    Ok(tools)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::FrameworkCategory;
    use crate::detectors::test_support::{context_with, empty_analysis};

    fn tech_stack(files: &[(&str, &str)]) -> TechStack {
        let (_dir, ctx) = context_with(files);
        match TechStackDetector.detect(&ctx, &empty_analysis(&ctx)).unwrap() {
            Facet::TechStack(ts) => (*ts).clone(),
            other => panic!("unexpected facet {:?}", other),
        }
    }

    #[test]
    fn test_minimal_go_project() {
        let ts = tech_stack(&[
            ("go.mod", "module test\n\ngo 1.21"),
            ("main.go", "package main\n\nfunc main() {}\n"),
        ]);

        assert_eq!(
            ts.languages,
            vec![Language {
                name: "Go".to_string(),
                version: Some("1.21".to_string()),
                percentage: 100.0,
            }]
        );
    }

    #[test]
    fn test_percentages_floor_and_order() {
        let ts = tech_stack(&[
            ("a.py", ""),
            ("b.py", ""),
            ("c.ts", ""),
            ("README.md", "# x"),
        ]);

        let names: Vec<_> = ts.languages.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Python", "TypeScript"]);
        assert_eq!(ts.languages[0].percentage, 66.6);
        assert_eq!(ts.languages[1].percentage, 33.3);
        assert!(ts.total_percentage() <= 100.0);
    }

    #[test]
    fn test_react_framework_from_package_json() {
        let ts = tech_stack(&[(
            "package.json",
            r#"{"dependencies": {"react": "18"}, "devDependencies": {"jest": "29"}}"#,
        )]);

        let react = ts.frameworks.iter().find(|f| f.name == "React").unwrap();
        assert_eq!(react.version.as_deref(), Some("18"));
        assert_eq!(react.category, FrameworkCategory::Frontend);
        assert!(ts
            .frameworks
            .iter()
            .any(|f| f.name == "Jest" && f.category == FrameworkCategory::Testing));
        assert_eq!(ts.tools, vec!["npm"]);
    }

    #[test]
    fn test_go_framework_and_database() {
        let ts = tech_stack(&[
            (
                "go.mod",
                "module api\n\ngo 1.22\n\nrequire (\n\tgithub.com/gin-gonic/gin v1.9.1\n\tgithub.com/jackc/pgx/v5 v5.5.0\n)\n",
            ),
            ("main.go", "package main"),
            ("Dockerfile", "FROM golang"),
        ]);

        assert!(ts.frameworks.iter().any(|f| f.name == "Gin"
            && f.version.as_deref() == Some("v1.9.1")));
        assert_eq!(ts.databases, vec!["PostgreSQL"]);
        assert_eq!(ts.tools, vec!["Docker"]);
    }

    #[test]
    fn test_fingerprint_only_framework() {
        let ts = tech_stack(&[("manage.py", "import django"), ("app/models.py", "")]);
        let django = ts.frameworks.iter().find(|f| f.name == "Django").unwrap();
        assert!(django.version.is_none());
    }

    #[test]
    fn test_malformed_manifest_is_skipped() {
        let ts = tech_stack(&[("package.json", "{ broken"), ("index.js", "")]);
        assert!(ts.frameworks.is_empty());
        assert_eq!(ts.languages[0].name, "JavaScript");
    }

    #[test]
    fn test_non_utf8_manifest_is_skipped() {
        let (dir, ctx) = context_with(&[
            ("main.go", "package main"),
            ("go.mod", "module x\n\ngo 1.21\n"),
            ("App.java", "class App {}"),
        ]);
        std::fs::write(dir.path().join("pom.xml"), b"<project><name>caf\xe9</name></project>").unwrap();
        let inventory = crate::fs::walk(dir.path(), &[]).unwrap();
        let ctx = DetectContext { inventory: Arc::new(inventory), ..ctx };

        let ts = match TechStackDetector.detect(&ctx, &empty_analysis(&ctx)).unwrap() {
            Facet::TechStack(ts) => ts,
            other => panic!("unexpected facet {:?}", other),
        };
        assert_eq!(ts.languages[0].name, "Go");
        assert_eq!(ts.languages[0].version.as_deref(), Some("1.21"));
        let java = ts.languages.iter().find(|l| l.name == "Java").unwrap();
        assert!(java.version.is_none());
    }

    #[test]
    fn test_manifest_removed_after_walk_is_skipped() {
        let (dir, ctx) = context_with(&[("go.mod", "module x\n\ngo 1.21\n"), ("main.go", "package main")]);
        std::fs::remove_file(dir.path().join("go.mod")).unwrap();

        let ts = match TechStackDetector.detect(&ctx, &empty_analysis(&ctx)).unwrap() {
            Facet::TechStack(ts) => ts,
            other => panic!("unexpected facet {:?}", other),
        };
        assert_eq!(ts.languages[0].name, "Go");
        assert!(ts.languages[0].version.is_none());
    }

    #[test]
    fn test_empty_repository() {
        let ts = tech_stack(&[]);
        assert!(ts.languages.is_empty());
        assert!(ts.frameworks.is_empty());
    }
}
