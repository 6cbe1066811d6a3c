use super::{DetectContext, Detector, DetectorError, DetectorId};
use crate::analysis::{Analysis, Directory, Facet, KeyFile, ProjectStructure};
use crate::stack::manifest::MANIFEST_FILES;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Directories deeper than this are folded into their ancestors' counts
const MAX_LISTED_DEPTH: usize = 1;

/// Directory layout, root files and key files
pub struct StructureDetector;

impl Detector for StructureDetector {
    fn id(&self) -> DetectorId {
        DetectorId::Structure
    }

    fn detect(&self, ctx: &DetectContext, _analysis: &Analysis) -> Result<Facet, DetectorError> {
        ctx.check_cancelled()?;

        let mut file_counts: BTreeMap<&str, usize> = BTreeMap::new();
        for file in ctx.inventory.files() {
            let mut parent = file.parent();
            while !parent.is_empty() {
                *file_counts.entry(parent).or_default() += 1;
                parent = match parent.rfind('/') {
                    Some(idx) => &parent[..idx],
                    None => "",
                };
            }
        }

        let directories = ctx
            .inventory
            .dirs()
            .filter(|d| d.depth() <= MAX_LISTED_DEPTH)
            .map(|d| Directory {
                path: d.path.clone(),
                purpose: directory_purpose(&d.name).map(String::from),
                file_count: file_counts.get(d.path.as_str()).copied().unwrap_or(0),
            })
            .collect();

        let root_files = ctx
            .inventory
            .files()
            .filter(|f| f.is_root_level())
            .map(|f| f.name.clone())
            .collect();

        let key_files = ctx
            .inventory
            .files()
            .filter_map(|f| {
                key_file_purpose(&f.path).map(|(purpose, description)| KeyFile {
                    path: f.path.clone(),
                    purpose: purpose.to_string(),
                    description: description.map(String::from),
                })
            })
            .collect();

        Ok(Facet::Structure {
            structure: Arc::new(ProjectStructure {
                directories,
                root_files,
            }),
            key_files,
        })
    }
}

/// Purpose of a well-known directory name
pub fn directory_purpose(name: &str) -> Option<&'static str> {
    let purpose = match name.to_ascii_lowercase().as_str() {
        "cmd" => "command entrypoints",
        "internal" => "private packages",
        "pkg" => "public packages",
        "src" => "source code",
        "app" => "application code",
        "lib" => "library code",
        "packages" => "workspace packages",
        "apps" => "applications",
        "crates" => "workspace crates",
        "tests" | "test" | "__tests__" | "spec" | "e2e" => "tests",
        "docs" | "doc" => "documentation",
        "scripts" | "bin" => "scripts",
        "config" | "configs" => "configuration",
        "migrations" | "db" => "database migrations",
        "api" => "API definitions",
        "components" => "UI components",
        "pages" | "routes" => "routes",
        "public" | "static" | "assets" => "static assets",
        "web" | "frontend" | "client" => "web frontend",
        "server" | "backend" => "server code",
        "deploy" | "deployments" | "infra" | "k8s" | "helm" => "deployment",
        "examples" => "examples",
        "tools" => "tooling",
        "utils" | "helpers" => "utilities",
        "models" => "data models",
        "services" => "services",
        "handlers" | "controllers" => "request handlers",
        "middleware" => "middleware",
        "hooks" => "hooks",
        "store" | "stores" => "state management",
        "types" => "type definitions",
        ".github" => "GitHub configuration",
        _ => return None,
    };
    Some(purpose)
}

const ENTRY_POINTS: &[&str] = &[
    "main.go",
    "src/main.rs",
    "src/lib.rs",
    "main.py",
    "app.py",
    "manage.py",
    "index.js",
    "index.ts",
    "server.js",
    "server.ts",
    "app.js",
    "src/index.js",
    "src/index.ts",
    "src/index.tsx",
    "src/main.ts",
    "src/main.tsx",
    "src/main.js",
    "src/App.tsx",
    "src/App.jsx",
    "src/app.ts",
    "src/server.ts",
    "Program.cs",
    "config.ru",
];

const CONFIG_FILES: &[&str] = &[
    "Makefile",
    "Dockerfile",
    "docker-compose.yml",
    "docker-compose.yaml",
    "tsconfig.json",
    ".env.example",
    "vite.config.ts",
    "vite.config.js",
    "next.config.js",
    "next.config.mjs",
    "turbo.json",
    "nx.json",
    "pnpm-workspace.yaml",
    ".argus.yaml",
];

fn key_file_purpose(path: &str) -> Option<(&'static str, Option<&'static str>)> {
    let name = path.rsplit('/').next().unwrap_or(path);
    let root_level = !path.contains('/');

    if root_level && name.to_ascii_lowercase().starts_with("readme") {
        return Some(("documentation", Some("Project overview")));
    }
    if ENTRY_POINTS.contains(&path) {
        return Some(("entry point", None));
    }
    if is_cmd_main(path) {
        return Some(("entry point", Some("Command binary")));
    }
    if root_level && MANIFEST_FILES.contains(&name) {
        return Some(("manifest", Some("Dependencies and project metadata")));
    }
    if root_level && CONFIG_FILES.contains(&name) {
        return Some(("configuration", None));
    }
    if root_level && matches!(name, "CONTRIBUTING.md" | "ARCHITECTURE.md" | "CLAUDE.md") {
        return Some(("documentation", None));
    }
    None
}

/// `cmd/<name>/main.go`
fn is_cmd_main(path: &str) -> bool {
    let parts: Vec<&str> = path.split('/').collect();
    parts.len() == 3 && parts[0] == "cmd" && parts[2] == "main.go"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::test_support::{context_with, empty_analysis};

    fn detect(files: &[(&str, &str)]) -> (ProjectStructure, Vec<KeyFile>) {
        let (_dir, ctx) = context_with(files);
        match StructureDetector.detect(&ctx, &empty_analysis(&ctx)).unwrap() {
            Facet::Structure {
                structure,
                key_files,
            } => ((*structure).clone(), key_files),
            other => panic!("unexpected facet {:?}", other),
        }
    }

    #[test]
    fn test_directories_with_purposes_and_counts() {
        let (structure, _) = detect(&[
            ("cmd/api/main.go", ""),
            ("internal/store/db.go", ""),
            ("internal/store/db_test.go", ""),
            ("internal/deep/nested/x/y.go", ""),
            ("go.mod", "module x"),
        ]);

        let cmd = structure.directories.iter().find(|d| d.path == "cmd").unwrap();
        assert_eq!(cmd.purpose.as_deref(), Some("command entrypoints"));
        assert_eq!(cmd.file_count, 1);

        let internal = structure
            .directories
            .iter()
            .find(|d| d.path == "internal")
            .unwrap();
        assert_eq!(internal.purpose.as_deref(), Some("private packages"));
        assert_eq!(internal.file_count, 3);

        assert!(structure.directories.iter().any(|d| d.path == "internal/store"));
        assert!(!structure
            .directories
            .iter()
            .any(|d| d.path == "internal/deep/nested"));
        assert_eq!(structure.root_files, vec!["go.mod"]);
    }

    #[test]
    fn test_key_files() {
        let (_, key_files) = detect(&[
            ("README.md", "# x"),
            ("main.go", "package main"),
            ("cmd/worker/main.go", "package main"),
            ("go.mod", "module x"),
            ("Makefile", "build:"),
            ("docs/README.md", "nested"),
        ]);

        let by_path: Vec<(&str, &str)> = key_files
            .iter()
            .map(|k| (k.path.as_str(), k.purpose.as_str()))
            .collect();

        assert_eq!(
            by_path,
            vec![
                ("Makefile", "configuration"),
                ("README.md", "documentation"),
                ("cmd/worker/main.go", "entry point"),
                ("go.mod", "manifest"),
                ("main.go", "entry point"),
            ]
        );
    }

    #[test]
    fn test_empty_repository() {
        let (structure, key_files) = detect(&[]);
        assert!(structure.directories.is_empty());
        assert!(structure.root_files.is_empty());
        assert!(key_files.is_empty());
    }
}
