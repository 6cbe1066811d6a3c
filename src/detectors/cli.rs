//! Command-line interface shape for projects built on a CLI framework
//!
//! Runs after the tech stack is known and only reports when a framework in
//! the `cli` category was detected.

use super::{DetectContext, Detector, DetectorError, DetectorId};
use crate::analysis::{Analysis, CliInfo, Facet, FrameworkCategory};
use crate::stack::manifest::{CargoManifest, GoMod, PackageJson, PyProject};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::Arc;

pub struct CliDetector;

struct CliSyntax {
    exts: &'static [&'static str],
    /// Marks the file that wires up the command tree
    entry: &'static Regex,
    /// Captures one subcommand name in group 1
    command: &'static Regex,
}

static COBRA_ENTRY: Lazy<Regex> = Lazy::new(|| Regex::new(r"cobra\.Command\{").expect("valid regex"));
static COBRA_USE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"Use:\s*"([\w-]+)"#).expect("valid regex"));
static URFAVE_ENTRY: Lazy<Regex> = Lazy::new(|| Regex::new(r"cli\.(App|Command)\{").expect("valid regex"));
static URFAVE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r#"Name:\s*"([\w-]+)""#).expect("valid regex"));
static CLAP_ENTRY: Lazy<Regex> = Lazy::new(|| Regex::new(r"derive\([^)]*Parser").expect("valid regex"));
static CLAP_SUBCOMMAND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)derive\([^)]*Subcommand[^)]*\)\]\s*(?:#\[[^\]]*\]\s*)*(?:pub\s+)?enum\s+\w+\s*\{(.*?)\n\}").expect("valid regex"));
static CLAP_VARIANT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s{4}([A-Z]\w*)\s*[\{\(,]?\s*$").expect("valid regex"));
static CLICK_ENTRY: Lazy<Regex> = Lazy::new(|| Regex::new(r"@click\.(group|command)").expect("valid regex"));
static PY_COMMAND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^@\w+\.command\((?:\s*(?:name\s*=\s*)?['"]([\w-]+)['"])?[^)]*\)\s*\n(?:@.*\n)*def\s+(\w+)"#)
        .expect("valid regex")
});
static TYPER_ENTRY: Lazy<Regex> = Lazy::new(|| Regex::new(r"typer\.Typer\(").expect("valid regex"));
static JS_ENTRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(new Command\(|program\s*\.|yargs\(|from ['"]@oclif/core['"])"#).expect("valid regex"));
static JS_COMMAND: Lazy<Regex> = Lazy::new(|| Regex::new(r#"\.command\(\s*['"]([\w-]+)"#).expect("valid regex"));

static LONG_FLAG: Lazy<Regex> = Lazy::new(|| Regex::new(r#"['"]--([a-z][a-z0-9]*(?:[-_][a-z0-9]+)*)['"]"#).expect("valid regex"));
static GO_FLAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"Flags\(\)\.\w+?(P)?\(\s*(?:&\w+(?:\.\w+)*\s*,\s*)?"([a-z][\w-]*)""#).expect("valid regex"));

/// File names that usually hold the root command
const ENTRY_NAMES: &[&str] = &[
    "main.go", "root.go", "main.rs", "cli.py", "__main__.py", "cli.ts", "cli.js", "index.ts", "index.js",
];

fn syntax_for(framework: &str) -> Option<CliSyntax> {
    let syntax = match framework {
        "Cobra" => CliSyntax { exts: &["go"], entry: &COBRA_ENTRY, command: &COBRA_USE },
        "urfave/cli" => CliSyntax { exts: &["go"], entry: &URFAVE_ENTRY, command: &URFAVE_NAME },
        "Clap" => CliSyntax { exts: &["rs"], entry: &CLAP_ENTRY, command: &CLAP_VARIANT },
        "Click" => CliSyntax { exts: &["py"], entry: &CLICK_ENTRY, command: &PY_COMMAND },
        "Typer" => CliSyntax { exts: &["py"], entry: &TYPER_ENTRY, command: &PY_COMMAND },
        "Commander" | "Yargs" | "oclif" => CliSyntax {
            exts: &["js", "ts", "mjs", "cjs"],
            entry: &JS_ENTRY,
            command: &JS_COMMAND,
        },
        _ => return None,
    };
    Some(syntax)
}

impl Detector for CliDetector {
    fn id(&self) -> DetectorId {
        DetectorId::Cli
    }

    fn detect(&self, ctx: &DetectContext, analysis: &Analysis) -> Result<Facet, DetectorError> {
        let Some(framework) = analysis
            .tech_stack
            .frameworks
            .iter()
            .find(|f| f.category == FrameworkCategory::Cli)
        else {
            return Ok(Facet::Cli(None));
        };
        let Some(syntax) = syntax_for(&framework.name) else {
            return Ok(Facet::Cli(None));
        };

        let binary_name = binary_name(ctx)?;
        let mut entry_point = None;
        let mut entry_preferred = false;
        let mut commands: Vec<String> = Vec::new();
        let mut flags: BTreeSet<String> = BTreeSet::new();
        let mut shorthand = false;
        let mut persistent = false;

        for entry in ctx.inventory.with_ext(syntax.exts) {
            if entry.name.ends_with("_test.go") || entry.path.starts_with("tests/") {
                continue;
            }
            let Some(content) = ctx.read_source(entry)? else {
                continue;
            };
            if !syntax.entry.is_match(&content) && !syntax.command.is_match(&content) {
                continue;
            }
            if syntax.entry.is_match(&content) {
                let preferred = ENTRY_NAMES.contains(&entry.name.as_str());
                if entry_point.is_none() || (preferred && !entry_preferred) {
                    entry_point = Some(entry.path.clone());
                    entry_preferred = preferred;
                }
            }

            for name in command_names(&framework.name, &syntax, &content) {
                if Some(&name) != binary_name.as_ref() && !commands.contains(&name) {
                    commands.push(name);
                }
            }

            for caps in LONG_FLAG.captures_iter(&content) {
                flags.insert(caps[1].to_string());
            }
            for caps in GO_FLAG.captures_iter(&content) {
                flags.insert(caps[2].to_string());
                shorthand |= caps.get(1).is_some();
            }
            persistent |= content.contains("PersistentFlags()");
            shorthand |= content.contains("short") && content.contains("#[arg(");
        }

        let flag_conventions = flag_conventions(&framework.name, &flags, shorthand, persistent);

        Ok(Facet::Cli(Some(Arc::new(CliInfo {
            binary_name,
            framework: framework.name.clone(),
            entry_point,
            commands,
            flag_conventions,
        }))))
    }
}

fn command_names(framework: &str, syntax: &CliSyntax, content: &str) -> Vec<String> {
    match framework {
        "Clap" => CLAP_SUBCOMMAND
            .captures_iter(content)
            .flat_map(|body| {
                CLAP_VARIANT
                    .captures_iter(&body[1])
                    .map(|v| to_kebab(&v[1]))
                    .collect::<Vec<_>>()
            })
            .collect(),
        "Click" | "Typer" => PY_COMMAND
            .captures_iter(content)
            .map(|c| {
                c.get(1)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_else(|| c[2].replace('_', "-"))
            })
            .collect(),
        _ => syntax
            .command
            .captures_iter(content)
            .map(|c| c[1].to_string())
            .collect(),
    }
}

fn to_kebab(name: &str) -> String {
    let mut out = String::new();
    for (i, ch) in name.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                out.push('-');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Name the built binary is invoked as
fn binary_name(ctx: &DetectContext) -> Result<Option<String>, DetectorError> {
    if let Some(content) = ctx.read_if_present("package.json")? {
        if let Ok(pkg) = PackageJson::parse(&content) {
            if let Some(name) = pkg.bin_names().into_iter().next() {
                return Ok(Some(name));
            }
        }
    }
    if let Some(content) = ctx.read_if_present("Cargo.toml")? {
        if let Ok(cargo) = CargoManifest::parse(&content) {
            if let Some(name) = cargo.bins.into_iter().next().or(cargo.name) {
                return Ok(Some(name));
            }
        }
    }
    if let Some(content) = ctx.read_if_present("pyproject.toml")? {
        if let Ok(project) = PyProject::parse(&content) {
            if let Some(name) = project.scripts.into_keys().next() {
                return Ok(Some(name));
            }
        }
    }
    let cmd_binary = ctx
        .inventory
        .files()
        .find(|f| f.name == "main.go" && f.path.starts_with("cmd/") && f.depth() == 2)
        .and_then(|f| f.parent().strip_prefix("cmd/").map(String::from));
    if cmd_binary.is_some() {
        return Ok(cmd_binary);
    }
    if let Some(content) = ctx.read_if_present("go.mod")? {
        return Ok(GoMod::parse(&content).module_basename().map(String::from));
    }
    Ok(None)
}

fn flag_conventions(framework: &str, flags: &BTreeSet<String>, shorthand: bool, persistent: bool) -> Vec<String> {
    let mut out = Vec::new();

    let kebab: Vec<&String> = flags.iter().filter(|f| f.contains('-')).collect();
    let snake = flags.iter().any(|f| f.contains('_'));
    if let Some(example) = kebab.first() {
        if !snake {
            out.push(format!("Long flags use kebab-case (--{})", example));
        }
    } else if snake {
        out.push("Long flags use snake_case".to_string());
    }
    if shorthand {
        out.push("Common flags have single-letter shorthands".to_string());
    }
    if persistent {
        out.push("Global flags are registered as persistent flags on the root command".to_string());
    }
    match framework {
        "Clap" => out.push("Arguments are declared with clap derive attributes on structs and enums".to_string()),
        "Click" | "Typer" => out.push("Options are declared with decorators on the command function".to_string()),
        _ => {}
    }
    out
}
