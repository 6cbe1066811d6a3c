//! Language definitions
//!
//! Each language declares the source extensions counted towards its share of
//! the repository and the files its version can be read from.

use super::manifest::{gemfile_ruby_version, CargoManifest, ComposerJson, GoMod, PackageJson, PomXml, PyProject};
use once_cell::sync::Lazy;
use regex::Regex;

pub trait LanguageDefinition: Send + Sync {
    fn name(&self) -> &'static str;

    /// Lowercased extensions without the leading dot
    fn extensions(&self) -> &'static [&'static str];

    /// Root-level files consulted for a version, in priority order
    fn version_files(&self) -> &'static [&'static str] {
        &[]
    }

    fn detect_version(&self, _file_name: &str, _content: &str) -> Option<String> {
        None
    }
}

pub struct GoLanguage;

impl LanguageDefinition for GoLanguage {
    fn name(&self) -> &'static str {
        "Go"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["go"]
    }

    fn version_files(&self) -> &'static [&'static str] {
        &["go.mod", "go.work"]
    }

    fn detect_version(&self, _file_name: &str, content: &str) -> Option<String> {
        GoMod::parse(content).go_version
    }
}

pub struct RustLanguage;

static TOOLCHAIN_CHANNEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"channel\s*=\s*"([^"]+)""#).expect("valid regex"));

impl LanguageDefinition for RustLanguage {
    fn name(&self) -> &'static str {
        "Rust"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["rs"]
    }

    fn version_files(&self) -> &'static [&'static str] {
        &["Cargo.toml", "rust-toolchain.toml", "rust-toolchain"]
    }

    fn detect_version(&self, file_name: &str, content: &str) -> Option<String> {
        match file_name {
            "Cargo.toml" => CargoManifest::parse(content).ok()?.rust_version,
            "rust-toolchain.toml" => TOOLCHAIN_CHANNEL
                .captures(content)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string()),
            _ => first_line(content),
        }
    }
}

pub struct PythonLanguage;

static PYTHON_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+\.\d+(?:\.\d+)?)").expect("valid regex"));

impl LanguageDefinition for PythonLanguage {
    fn name(&self) -> &'static str {
        "Python"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["py", "pyi", "ipynb"]
    }

    fn version_files(&self) -> &'static [&'static str] {
        &[".python-version", "pyproject.toml", "runtime.txt"]
    }

    fn detect_version(&self, file_name: &str, content: &str) -> Option<String> {
        let raw = match file_name {
            "pyproject.toml" => PyProject::parse(content).ok()?.requires_python?,
            _ => first_line(content)?,
        };
        PYTHON_VERSION
            .captures(&raw)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }
}

pub struct JavaScriptLanguage;

impl LanguageDefinition for JavaScriptLanguage {
    fn name(&self) -> &'static str {
        "JavaScript"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["js", "jsx", "mjs", "cjs"]
    }

    fn version_files(&self) -> &'static [&'static str] {
        &[".nvmrc", ".node-version", "package.json"]
    }

    fn detect_version(&self, file_name: &str, content: &str) -> Option<String> {
        match file_name {
            "package.json" => PackageJson::parse(content).ok()?.engines.get("node").cloned(),
            _ => first_line(content).map(|v| v.trim_start_matches('v').to_string()),
        }
    }
}

pub struct TypeScriptLanguage;

impl LanguageDefinition for TypeScriptLanguage {
    fn name(&self) -> &'static str {
        "TypeScript"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["ts", "tsx", "mts", "cts"]
    }

    fn version_files(&self) -> &'static [&'static str] {
        &["package.json"]
    }

    fn detect_version(&self, _file_name: &str, content: &str) -> Option<String> {
        PackageJson::parse(content)
            .ok()?
            .dependency_version("typescript")
            .map(String::from)
    }
}

pub struct JavaLanguage;

impl LanguageDefinition for JavaLanguage {
    fn name(&self) -> &'static str {
        "Java"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["java"]
    }

    fn version_files(&self) -> &'static [&'static str] {
        &["pom.xml"]
    }

    fn detect_version(&self, _file_name: &str, content: &str) -> Option<String> {
        PomXml::parse(content).ok()?.java_version
    }
}

pub struct RubyLanguage;

impl LanguageDefinition for RubyLanguage {
    fn name(&self) -> &'static str {
        "Ruby"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["rb", "rake", "erb"]
    }

    fn version_files(&self) -> &'static [&'static str] {
        &[".ruby-version", "Gemfile"]
    }

    fn detect_version(&self, file_name: &str, content: &str) -> Option<String> {
        match file_name {
            "Gemfile" => gemfile_ruby_version(content),
            _ => first_line(content),
        }
    }
}

pub struct PhpLanguage;

impl LanguageDefinition for PhpLanguage {
    fn name(&self) -> &'static str {
        "PHP"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["php"]
    }

    fn version_files(&self) -> &'static [&'static str] {
        &["composer.json"]
    }

    fn detect_version(&self, _file_name: &str, content: &str) -> Option<String> {
        ComposerJson::parse(content).ok()?.require.get("php").cloned()
    }
}

/// Language counted by extension only
pub struct SimpleLanguage {
    pub name: &'static str,
    pub extensions: &'static [&'static str],
}

impl LanguageDefinition for SimpleLanguage {
    fn name(&self) -> &'static str {
        self.name
    }

    fn extensions(&self) -> &'static [&'static str] {
        self.extensions
    }
}

fn first_line(content: &str) -> Option<String> {
    content
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with('#'))
        .map(String::from)
}

static LANGUAGES: &[&dyn LanguageDefinition] = &[
    &GoLanguage,
    &RustLanguage,
    &PythonLanguage,
    &TypeScriptLanguage,
    &JavaScriptLanguage,
    &JavaLanguage,
    &RubyLanguage,
    &PhpLanguage,
    &SimpleLanguage {
        name: "Kotlin",
        extensions: &["kt", "kts"],
    },
    &SimpleLanguage {
        name: "C#",
        extensions: &["cs"],
    },
    &SimpleLanguage {
        name: "Swift",
        extensions: &["swift"],
    },
    &SimpleLanguage {
        name: "C",
        extensions: &["c", "h"],
    },
    &SimpleLanguage {
        name: "C++",
        extensions: &["cpp", "cc", "cxx", "hpp", "hh"],
    },
    &SimpleLanguage {
        name: "Scala",
        extensions: &["scala"],
    },
    &SimpleLanguage {
        name: "Elixir",
        extensions: &["ex", "exs"],
    },
    &SimpleLanguage {
        name: "Dart",
        extensions: &["dart"],
    },
    &SimpleLanguage {
        name: "Vue",
        extensions: &["vue"],
    },
    &SimpleLanguage {
        name: "Svelte",
        extensions: &["svelte"],
    },
    &SimpleLanguage {
        name: "Lua",
        extensions: &["lua"],
    },
];

pub fn all_languages() -> &'static [&'static dyn LanguageDefinition] {
    LANGUAGES
}

pub fn language_for_ext(ext: &str) -> Option<&'static dyn LanguageDefinition> {
    LANGUAGES
        .iter()
        .copied()
        .find(|lang| lang.extensions().contains(&ext))
}

pub fn language_by_name(name: &str) -> Option<&'static dyn LanguageDefinition> {
    LANGUAGES
        .iter()
        .copied()
        .find(|lang| lang.name().eq_ignore_ascii_case(name))
}

/// Whether `ext` is counted as source code
pub fn is_source_ext(ext: &str) -> bool {
    language_for_ext(ext).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_for_ext() {
        assert_eq!(language_for_ext("go").map(|l| l.name()), Some("Go"));
        assert_eq!(language_for_ext("tsx").map(|l| l.name()), Some("TypeScript"));
        assert_eq!(language_for_ext("hpp").map(|l| l.name()), Some("C++"));
        assert!(language_for_ext("md").is_none());
        assert!(!is_source_ext("json"));
    }

    #[test]
    fn test_extensions_unique_across_languages() {
        let mut seen = std::collections::HashSet::new();
        for lang in all_languages() {
            for ext in lang.extensions() {
                assert!(seen.insert(*ext), "duplicate extension {}", ext);
            }
        }
    }

    #[test]
    fn test_go_version() {
        assert_eq!(
            GoLanguage.detect_version("go.mod", "module test\n\ngo 1.21"),
            Some("1.21".to_string())
        );
    }

    #[test]
    fn test_python_version_sources() {
        assert_eq!(
            PythonLanguage.detect_version(".python-version", "3.11.4\n"),
            Some("3.11.4".to_string())
        );
        assert_eq!(
            PythonLanguage.detect_version("pyproject.toml", "[project]\nrequires-python = \">=3.10\"\n"),
            Some("3.10".to_string())
        );
    }

    #[test]
    fn test_node_version_strips_prefix() {
        assert_eq!(
            JavaScriptLanguage.detect_version(".nvmrc", "v20.11.0\n"),
            Some("20.11.0".to_string())
        );
    }

    #[test]
    fn test_rust_toolchain_channel() {
        assert_eq!(
            RustLanguage.detect_version("rust-toolchain.toml", "[toolchain]\nchannel = \"1.76.0\"\n"),
            Some("1.76.0".to_string())
        );
    }
}
