//! Parsers for the dependency manifests the detectors read
//!
//! Every parser is pure over the file contents. Maps are `BTreeMap` so that
//! iteration order, and therefore detector output, is stable.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Manifest file names that declare dependencies, in detection priority order
pub const MANIFEST_FILES: &[&str] = &[
    "package.json",
    "go.mod",
    "go.work",
    "Cargo.toml",
    "pyproject.toml",
    "requirements.txt",
    "setup.py",
    "setup.cfg",
    "Pipfile",
    "Gemfile",
    "pom.xml",
    "build.gradle",
    "build.gradle.kts",
    "composer.json",
    "mix.exs",
    "pubspec.yaml",
    "Package.swift",
];

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid XML: {0}")]
    Xml(#[from] roxmltree::Error),
}

/// A declared dependency with its version requirement as written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredDependency {
    pub name: String,
    pub version: String,
    pub dev: bool,
}

impl DeclaredDependency {
    fn new(name: impl Into<String>, version: impl Into<String>, dev: bool) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            dev,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageJson {
    pub name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub dev_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub scripts: BTreeMap<String, String>,
    #[serde(default)]
    pub engines: BTreeMap<String, String>,
    pub workspaces: Option<PackageWorkspaces>,
    pub bin: Option<serde_json::Value>,
    pub main: Option<String>,
    pub package_manager: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PackageWorkspaces {
    List(Vec<String>),
    Object {
        #[serde(default)]
        packages: Vec<String>,
    },
}

impl PackageWorkspaces {
    pub fn patterns(&self) -> &[String] {
        match self {
            Self::List(list) => list,
            Self::Object { packages } => packages,
        }
    }
}

impl PackageJson {
    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn has_dependency(&self, name: &str) -> bool {
        self.dependencies.contains_key(name) || self.dev_dependencies.contains_key(name)
    }

    pub fn dependency_version(&self, name: &str) -> Option<&str> {
        self.dependencies
            .get(name)
            .or_else(|| self.dev_dependencies.get(name))
            .map(String::as_str)
    }

    pub fn declared(&self) -> Vec<DeclaredDependency> {
        let runtime = self
            .dependencies
            .iter()
            .map(|(n, v)| DeclaredDependency::new(n, v, false));
        let dev = self
            .dev_dependencies
            .iter()
            .map(|(n, v)| DeclaredDependency::new(n, v, true));
        runtime.chain(dev).collect()
    }

    /// Binary names declared under `bin`, sorted
    pub fn bin_names(&self) -> Vec<String> {
        match &self.bin {
            Some(serde_json::Value::String(_)) => self.name.iter().cloned().collect(),
            Some(serde_json::Value::Object(map)) => map.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// Package manager named by the `packageManager` field, e.g. `pnpm`
    pub fn manager_name(&self) -> Option<&str> {
        self.package_manager
            .as_deref()
            .and_then(|pm| pm.split('@').next())
            .filter(|pm| !pm.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoRequire {
    pub path: String,
    pub version: String,
    pub indirect: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoMod {
    pub module: Option<String>,
    pub go_version: Option<String>,
    pub requires: Vec<GoRequire>,
}

static GO_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^go\s+(\d+\.\d+(?:\.\d+)?)").expect("valid regex"));

impl GoMod {
    pub fn parse(content: &str) -> Self {
        let mut module = None;
        let mut requires = Vec::new();
        let mut in_require_block = false;

        for raw in content.lines() {
            let line = raw.trim();

            if let Some(rest) = line.strip_prefix("module ") {
                module = Some(rest.trim().trim_matches('"').to_string());
                continue;
            }
            if line.starts_with("require (") || line == "require(" {
                in_require_block = true;
                continue;
            }
            if in_require_block && line == ")" {
                in_require_block = false;
                continue;
            }

            let spec = if in_require_block {
                Some(line)
            } else {
                line.strip_prefix("require ").map(str::trim)
            };

            if let Some(spec) = spec {
                if let Some(req) = parse_go_require(spec) {
                    requires.push(req);
                }
            }
        }

        let go_version = GO_VERSION
            .captures(content)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());

        Self {
            module,
            go_version,
            requires,
        }
    }

    /// Last segment of the module path
    pub fn module_basename(&self) -> Option<&str> {
        self.module.as_deref().and_then(|m| m.rsplit('/').next())
    }

    pub fn requires_module(&self, prefix: &str) -> bool {
        self.requires.iter().any(|r| r.path.starts_with(prefix))
    }
}

fn parse_go_require(spec: &str) -> Option<GoRequire> {
    if spec.is_empty() || spec.starts_with("//") {
        return None;
    }
    let indirect = spec.contains("// indirect");
    let code = spec.split("//").next().unwrap_or_default();
    let mut parts = code.split_whitespace();
    let path = parts.next()?;
    let version = parts.next()?;
    Some(GoRequire {
        path: path.to_string(),
        version: version.to_string(),
        indirect,
    })
}

/// Relevant parts of a `Cargo.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CargoManifest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub rust_version: Option<String>,
    pub dependencies: Vec<DeclaredDependency>,
    pub workspace_members: Vec<String>,
    pub bins: Vec<String>,
}

impl CargoManifest {
    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        let value: toml::Value = toml::from_str(content)?;
        let package = value.get("package");
        let str_field = |key: &str| {
            package
                .and_then(|p| p.get(key))
                .and_then(|v| v.as_str())
                .map(String::from)
        };

        let mut dependencies = Vec::new();
        for (section, dev) in [("dependencies", false), ("dev-dependencies", true)] {
            let Some(table) = value.get(section).and_then(|v| v.as_table()) else {
                continue;
            };
            for (name, spec) in table {
                let version = match spec {
                    toml::Value::String(v) => v.clone(),
                    toml::Value::Table(t) => t
                        .get("version")
                        .and_then(|v| v.as_str())
                        .unwrap_or("*")
                        .to_string(),
                    _ => "*".to_string(),
                };
                dependencies.push(DeclaredDependency::new(name, version, dev));
            }
        }

        let workspace_members = value
            .get("workspace")
            .and_then(|w| w.get("members"))
            .and_then(|m| m.as_array())
            .map(|members| {
                members
                    .iter()
                    .filter_map(|m| m.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        let bins = value
            .get("bin")
            .and_then(|b| b.as_array())
            .map(|bins| {
                bins.iter()
                    .filter_map(|b| b.get("name").and_then(|n| n.as_str()).map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            name: str_field("name"),
            description: str_field("description"),
            rust_version: str_field("rust-version"),
            dependencies,
            workspace_members,
            bins,
        })
    }

    pub fn has_dependency(&self, name: &str) -> bool {
        self.dependencies.iter().any(|d| d.name == name)
    }
}

/// Relevant parts of a `pyproject.toml` (PEP 621 and Poetry layouts)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PyProject {
    pub name: Option<String>,
    pub description: Option<String>,
    pub requires_python: Option<String>,
    pub dependencies: Vec<DeclaredDependency>,
    pub scripts: BTreeMap<String, String>,
}

static PEP508_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([A-Za-z0-9][A-Za-z0-9._-]*)\s*(.*)$").expect("valid regex"));

impl PyProject {
    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        let value: toml::Value = toml::from_str(content)?;
        let project = value.get("project");
        let poetry = value.get("tool").and_then(|t| t.get("poetry"));

        let field = |key: &str| {
            project
                .and_then(|p| p.get(key))
                .or_else(|| poetry.and_then(|p| p.get(key)))
                .and_then(|v| v.as_str())
                .map(String::from)
        };

        let mut dependencies = Vec::new();

        if let Some(list) = project
            .and_then(|p| p.get("dependencies"))
            .and_then(|d| d.as_array())
        {
            dependencies.extend(
                list.iter()
                    .filter_map(|d| d.as_str())
                    .filter_map(|d| parse_requirement(d, false)),
            );
        }

        for (section, dev) in [
            ("dependencies", false),
            ("dev-dependencies", true),
        ] {
            if let Some(table) = poetry.and_then(|p| p.get(section)).and_then(|d| d.as_table()) {
                for (name, spec) in table {
                    if name == "python" {
                        continue;
                    }
                    let version = match spec {
                        toml::Value::String(v) => v.clone(),
                        toml::Value::Table(t) => t
                            .get("version")
                            .and_then(|v| v.as_str())
                            .unwrap_or("*")
                            .to_string(),
                        _ => "*".to_string(),
                    };
                    dependencies.push(DeclaredDependency::new(name, version, dev));
                }
            }
        }

        let poetry_python = poetry
            .and_then(|p| p.get("dependencies"))
            .and_then(|d| d.get("python"))
            .and_then(|v| v.as_str())
            .map(String::from);

        let mut scripts = BTreeMap::new();
        for table in [
            project.and_then(|p| p.get("scripts")),
            poetry.and_then(|p| p.get("scripts")),
        ]
        .into_iter()
        .flatten()
        .filter_map(|t| t.as_table())
        {
            for (name, target) in table {
                if let Some(target) = target.as_str() {
                    scripts.insert(name.clone(), target.to_string());
                }
            }
        }

        Ok(Self {
            name: field("name"),
            description: field("description"),
            requires_python: project
                .and_then(|p| p.get("requires-python"))
                .and_then(|v| v.as_str())
                .map(String::from)
                .or(poetry_python),
            dependencies,
            scripts,
        })
    }

    pub fn has_dependency(&self, name: &str) -> bool {
        self.dependencies
            .iter()
            .any(|d| d.name.eq_ignore_ascii_case(name))
    }
}

fn parse_requirement(line: &str, dev: bool) -> Option<DeclaredDependency> {
    let line = line.split('#').next().unwrap_or_default().trim();
    if line.is_empty() || line.starts_with('-') {
        return None;
    }
    let caps = PEP508_NAME.captures(line)?;
    let name = caps.get(1)?.as_str();
    let name = name.split('[').next().unwrap_or(name);
    let version = caps
        .get(2)
        .map(|m| m.as_str().trim())
        .filter(|v| !v.is_empty())
        .unwrap_or("*");
    Some(DeclaredDependency::new(name, version, dev))
}

/// Requirements from a `requirements*.txt` file
pub fn parse_requirements_txt(content: &str) -> Vec<DeclaredDependency> {
    content
        .lines()
        .filter_map(|l| parse_requirement(l, false))
        .collect()
}

static GEM_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^\s*gem\s+['"]([^'"]+)['"](?:\s*,\s*['"]([^'"]+)['"])?"#)
        .expect("valid regex")
});

static RUBY_VERSION_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^\s*ruby\s+['"]([^'"]+)['"]"#).expect("valid regex"));

/// Gems declared in a `Gemfile`
pub fn parse_gemfile(content: &str) -> Vec<DeclaredDependency> {
    GEM_LINE
        .captures_iter(content)
        .filter_map(|c| {
            let name = c.get(1)?.as_str();
            let version = c.get(2).map(|m| m.as_str()).unwrap_or("*");
            Some(DeclaredDependency::new(name, version, false))
        })
        .collect()
}

pub fn gemfile_ruby_version(content: &str) -> Option<String> {
    RUBY_VERSION_LINE
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Relevant parts of a Maven `pom.xml`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PomXml {
    pub artifact_id: Option<String>,
    pub java_version: Option<String>,
    /// `group:artifact` coordinates
    pub dependencies: Vec<DeclaredDependency>,
}

impl PomXml {
    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        let doc = roxmltree::Document::parse(content)?;
        let root = doc.root_element();

        let child_text = |node: roxmltree::Node, name: &str| {
            node.children()
                .find(|c| c.has_tag_name(name))
                .and_then(|c| c.text())
                .map(|t| t.trim().to_string())
        };

        let artifact_id = child_text(root, "artifactId");

        let java_version = root
            .descendants()
            .find(|n| {
                n.has_tag_name("java.version")
                    || n.has_tag_name("maven.compiler.source")
                    || n.has_tag_name("maven.compiler.release")
            })
            .and_then(|n| n.text())
            .map(|t| t.trim().to_string());

        let dependencies = root
            .descendants()
            .filter(|n| n.has_tag_name("dependency"))
            .filter_map(|dep| {
                let group = child_text(dep, "groupId")?;
                let artifact = child_text(dep, "artifactId")?;
                let version = child_text(dep, "version").unwrap_or_else(|| "*".to_string());
                let dev = child_text(dep, "scope").is_some_and(|s| s == "test");
                Some(DeclaredDependency::new(
                    format!("{}:{}", group, artifact),
                    version,
                    dev,
                ))
            })
            .collect();

        Ok(Self {
            artifact_id,
            java_version,
            dependencies,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ComposerJson {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub require: BTreeMap<String, String>,
    #[serde(default)]
    pub require_dev: BTreeMap<String, String>,
    #[serde(default)]
    pub scripts: BTreeMap<String, serde_json::Value>,
}

impl ComposerJson {
    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn declared(&self) -> Vec<DeclaredDependency> {
        let runtime = self
            .require
            .iter()
            .map(|(n, v)| DeclaredDependency::new(n, v, false));
        let dev = self
            .require_dev
            .iter()
            .map(|(n, v)| DeclaredDependency::new(n, v, true));
        runtime.chain(dev).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_json_fields() {
        let pkg = PackageJson::parse(
            r#"{
                "name": "web",
                "dependencies": {"react": "^18.2.0"},
                "devDependencies": {"jest": "^29.0.0"},
                "scripts": {"test": "jest", "build": "vite build"},
                "workspaces": {"packages": ["packages/*"]},
                "bin": {"webctl": "bin/cli.js"},
                "packageManager": "pnpm@8.6.0"
            }"#,
        )
        .unwrap();

        assert_eq!(pkg.dependency_version("react"), Some("^18.2.0"));
        assert!(pkg.has_dependency("jest"));
        assert_eq!(pkg.scripts.keys().collect::<Vec<_>>(), vec!["build", "test"]);
        assert_eq!(pkg.workspaces.as_ref().unwrap().patterns(), &["packages/*".to_string()]);
        assert_eq!(pkg.bin_names(), vec!["webctl"]);
        assert_eq!(pkg.manager_name(), Some("pnpm"));

        let declared = pkg.declared();
        assert_eq!(declared.len(), 2);
        assert!(!declared[0].dev);
        assert!(declared[1].dev);
    }

    #[test]
    fn test_package_json_invalid() {
        assert!(PackageJson::parse("{ not json").is_err());
    }

    #[test]
    fn test_go_mod_parse() {
        let go_mod = GoMod::parse(
            "module github.com/acme/api\n\ngo 1.21\n\nrequire (\n\tgithub.com/gin-gonic/gin v1.9.1\n\tgolang.org/x/sys v0.10.0 // indirect\n)\n\nrequire github.com/google/uuid v1.3.0\n",
        );

        assert_eq!(go_mod.module.as_deref(), Some("github.com/acme/api"));
        assert_eq!(go_mod.module_basename(), Some("api"));
        assert_eq!(go_mod.go_version.as_deref(), Some("1.21"));
        assert_eq!(go_mod.requires.len(), 3);
        assert!(go_mod.requires[1].indirect);
        assert_eq!(go_mod.requires[2].path, "github.com/google/uuid");
        assert!(go_mod.requires_module("github.com/gin-gonic/gin"));
    }

    #[test]
    fn test_cargo_manifest_parse() {
        let cargo = CargoManifest::parse(
            r#"
[package]
name = "tool"
rust-version = "1.75"

[dependencies]
clap = { version = "4.4", features = ["derive"] }
serde = "1.0"

[dev-dependencies]
tempfile = "3"

[[bin]]
name = "toolctl"

[workspace]
members = ["crates/*"]
"#,
        )
        .unwrap();

        assert_eq!(cargo.name.as_deref(), Some("tool"));
        assert_eq!(cargo.rust_version.as_deref(), Some("1.75"));
        assert!(cargo.has_dependency("clap"));
        assert!(cargo.dependencies.iter().any(|d| d.name == "tempfile" && d.dev));
        assert_eq!(cargo.bins, vec!["toolctl"]);
        assert_eq!(cargo.workspace_members, vec!["crates/*"]);
    }

    #[test]
    fn test_pyproject_pep621_and_poetry() {
        let pep = PyProject::parse(
            r#"
[project]
name = "svc"
requires-python = ">=3.11"
dependencies = ["fastapi>=0.100", "uvicorn[standard]"]

[project.scripts]
svc = "svc.cli:main"
"#,
        )
        .unwrap();
        assert_eq!(pep.requires_python.as_deref(), Some(">=3.11"));
        assert!(pep.has_dependency("FastAPI"));
        assert!(pep.has_dependency("uvicorn"));
        assert_eq!(pep.scripts.get("svc").map(String::as_str), Some("svc.cli:main"));

        let poetry = PyProject::parse(
            r#"
[tool.poetry]
name = "app"

[tool.poetry.dependencies]
python = "^3.10"
django = "^4.2"
"#,
        )
        .unwrap();
        assert_eq!(poetry.name.as_deref(), Some("app"));
        assert_eq!(poetry.requires_python.as_deref(), Some("^3.10"));
        assert!(poetry.has_dependency("django"));
        assert!(!poetry.has_dependency("python"));
    }

    #[test]
    fn test_requirements_txt() {
        let deps = parse_requirements_txt("# comment\nflask==2.3.0\n-r base.txt\nrequests\n");
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].name, "flask");
        assert_eq!(deps[0].version, "==2.3.0");
        assert_eq!(deps[1].version, "*");
    }

    #[test]
    fn test_gemfile() {
        let content = "source 'https://rubygems.org'\nruby '3.2.2'\ngem 'rails', '~> 7.0'\ngem \"puma\"\n";
        let gems = parse_gemfile(content);
        assert_eq!(gems.len(), 2);
        assert_eq!(gems[0].version, "~> 7.0");
        assert_eq!(gemfile_ruby_version(content).as_deref(), Some("3.2.2"));
    }

    #[test]
    fn test_pom_xml() {
        let pom = PomXml::parse(
            r#"<project>
  <artifactId>orders</artifactId>
  <properties><java.version>17</java.version></properties>
  <dependencies>
    <dependency>
      <groupId>org.springframework.boot</groupId>
      <artifactId>spring-boot-starter-web</artifactId>
    </dependency>
    <dependency>
      <groupId>org.junit.jupiter</groupId>
      <artifactId>junit-jupiter</artifactId>
      <version>5.10.0</version>
      <scope>test</scope>
    </dependency>
  </dependencies>
</project>"#,
        )
        .unwrap();

        assert_eq!(pom.artifact_id.as_deref(), Some("orders"));
        assert_eq!(pom.java_version.as_deref(), Some("17"));
        assert_eq!(
            pom.dependencies[0].name,
            "org.springframework.boot:spring-boot-starter-web"
        );
        assert!(pom.dependencies[1].dev);
    }
}
