use super::{DetectContext, Detector, DetectorError, DetectorId};
use crate::analysis::{Analysis, ArchitectureInfo, Facet, Layer};
use crate::fs::FileInventory;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Architectural style, layer graph and entry point
///
/// The style comes from the directory layout alone. Layers are directories
/// with well-known names; an edge A -> B is recorded when a source file in A
/// imports a path naming one of B's directories.
pub struct ArchitectureDetector;

struct LayerKind {
    name: &'static str,
    purpose: &'static str,
    dirs: &'static [&'static str],
}

const LAYER_KINDS: &[LayerKind] = &[
    LayerKind {
        name: "entrypoints",
        purpose: "Binaries and process startup",
        dirs: &["cmd", "bin"],
    },
    LayerKind {
        name: "api",
        purpose: "HTTP handlers, controllers and routes",
        dirs: &["handlers", "handler", "controllers", "controller", "routes", "api", "http"],
    },
    LayerKind {
        name: "ui",
        purpose: "Pages and components",
        dirs: &["pages", "components", "views", "screens"],
    },
    LayerKind {
        name: "services",
        purpose: "Business logic",
        dirs: &["services", "service", "usecases", "usecase", "application"],
    },
    LayerKind {
        name: "domain",
        purpose: "Core models and entities",
        dirs: &["domain", "models", "model", "entities", "entity"],
    },
    LayerKind {
        name: "data",
        purpose: "Persistence and external systems",
        dirs: &["repositories", "repository", "store", "storage", "db", "database", "infrastructure", "persistence"],
    },
    LayerKind {
        name: "shared",
        purpose: "Shared utilities",
        dirs: &["utils", "util", "lib", "common", "shared", "pkg"],
    },
];

/// Deepest directory level considered for layer packages
const MAX_LAYER_DEPTH: usize = 3;

const ENTRY_POINTS: &[&str] = &[
    "main.go",
    "src/main.rs",
    "src/index.ts",
    "src/index.js",
    "src/main.ts",
    "src/main.tsx",
    "src/App.tsx",
    "index.js",
    "index.ts",
    "server.js",
    "app.js",
    "main.py",
    "app.py",
    "manage.py",
    "src/main/java/Application.java",
];

const IMPORT_EXTS: &[&str] = &["go", "js", "jsx", "ts", "tsx", "mjs", "vue", "svelte", "py", "rs"];

static GO_IMPORT: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?m)^\s*(?:import\s+)?(?:\w+\s+)?"([^"]+)"\s*$"#).expect("valid regex"));

static JS_IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?:from\s+|require\(|import\()\s*['"]([^'"]+)['"]"#).expect("valid regex"));

static PY_IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*(?:from\s+([\w.]+)\s+import|import\s+([\w.]+))").expect("valid regex"));

static RS_IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*(?:pub\s+)?use\s+([\w:]+)").expect("valid regex"));

impl Detector for ArchitectureDetector {
    fn id(&self) -> DetectorId {
        DetectorId::Architecture
    }

    fn detect(&self, ctx: &DetectContext, _analysis: &Analysis) -> Result<Facet, DetectorError> {
        let inv = &ctx.inventory;

        let style = infer_style(inv);
        let entry_point = find_entry_point(inv);
        let mut layers = collect_layers(inv);
        link_layers(ctx, &mut layers)?;

        if style.is_none() && entry_point.is_none() && layers.is_empty() {
            return Ok(Facet::Architecture(None));
        }

        let diagram = (layers.len() > 1).then(|| render_diagram(&layers));

        Ok(Facet::Architecture(Some(Arc::new(ArchitectureInfo {
            style,
            layers,
            entry_point,
            diagram,
        }))))
    }
}

fn has_any_dir(inv: &FileInventory, names: &[&str]) -> bool {
    inv.dirs().any(|d| d.depth() <= 2 && names.contains(&d.name.as_str()))
}

fn infer_style(inv: &FileInventory) -> Option<String> {
    let style = if inv.has_dir("cmd") && inv.has_dir("internal") {
        "Modular Go layout (cmd/ entrypoints, internal/ private packages, pkg/ public packages)"
    } else if has_any_dir(inv, &["domain"])
        && has_any_dir(inv, &["application", "usecases"])
        && has_any_dir(inv, &["infrastructure"])
    {
        "Clean architecture (domain, application, infrastructure)"
    } else if has_any_dir(inv, &["controllers"]) && has_any_dir(inv, &["services", "models"]) {
        "Layered MVC (controllers, services, models)"
    } else if inv.has_dir("packages") || inv.has_dir("apps") {
        "Monorepo (packages/ and apps/)"
    } else if inv.has_dir("src/features") || inv.has_dir("src/modules") {
        "Feature-based modules"
    } else {
        return None;
    };
    Some(style.to_string())
}

fn find_entry_point(inv: &FileInventory) -> Option<String> {
    if let Some(found) = ENTRY_POINTS.iter().find(|p| inv.has_file(p)) {
        return Some(found.to_string());
    }
    inv.files()
        .find(|f| f.name == "main.go" && f.path.starts_with("cmd/") && f.depth() == 2)
        .map(|f| f.path.clone())
}

/// Outermost recognised directories, grouped by layer kind
///
/// A recognised directory nested inside another one (e.g. `cmd/api`) belongs
/// to the outer layer.
fn collect_layers(inv: &FileInventory) -> Vec<Layer> {
    let candidates: Vec<(usize, &str)> = inv
        .dirs()
        .filter(|d| d.depth() < MAX_LAYER_DEPTH)
        .filter(|d| !d.segments().any(|s| s == "node_modules" || s == "tests" || s == "test"))
        .filter_map(|d| {
            LAYER_KINDS
                .iter()
                .position(|k| k.dirs.contains(&d.name.as_str()))
                .map(|kind| (kind, d.path.as_str()))
        })
        .collect();

    let outermost: Vec<(usize, &str)> = candidates
        .iter()
        .copied()
        .filter(|(_, path)| {
            !candidates
                .iter()
                .any(|(_, other)| path.starts_with(&format!("{}/", other)))
        })
        .collect();

    LAYER_KINDS
        .iter()
        .enumerate()
        .filter_map(|(idx, kind)| {
            let packages: Vec<String> = outermost
                .iter()
                .filter(|(k, _)| *k == idx)
                .map(|(_, path)| path.to_string())
                .collect();
            (!packages.is_empty()).then(|| Layer {
                name: kind.name.to_string(),
                purpose: Some(kind.purpose.to_string()),
                packages,
                depends_on: Vec::new(),
            })
        })
        .collect()
}

/// Layer owning `path`: the one with the longest matching package prefix
fn owning_layer(layers: &[Layer], path: &str) -> Option<usize> {
    layers
        .iter()
        .enumerate()
        .flat_map(|(idx, layer)| layer.packages.iter().map(move |p| (idx, p)))
        .filter(|(_, p)| path.starts_with(&format!("{}/", p)))
        .max_by_key(|(_, p)| p.len())
        .map(|(idx, _)| idx)
}

fn import_segments(ext: &str, content: &str) -> Vec<Vec<String>> {
    let split = |spec: &str, sep: &str| -> Vec<String> {
        spec.split(sep).filter(|s| !s.is_empty()).map(String::from).collect()
    };
    match ext {
        "go" => GO_IMPORT.captures_iter(content).map(|c| split(&c[1], "/")).collect(),
        "js" | "jsx" | "ts" | "tsx" | "mjs" | "vue" | "svelte" => {
            JS_IMPORT.captures_iter(content).map(|c| split(&c[1], "/")).collect()
        }
        "py" => PY_IMPORT
            .captures_iter(content)
            .filter_map(|c| c.get(1).or_else(|| c.get(2)))
            .map(|m| split(m.as_str(), "."))
            .collect(),
        "rs" => RS_IMPORT.captures_iter(content).map(|c| split(&c[1], "::")).collect(),
        _ => Vec::new(),
    }
}

fn link_layers(ctx: &DetectContext, layers: &mut [Layer]) -> Result<(), DetectorError> {
    if layers.len() < 2 {
        return Ok(());
    }

    let dir_names: Vec<BTreeSet<String>> = layers
        .iter()
        .map(|l| {
            l.packages
                .iter()
                .map(|p| p.rsplit('/').next().unwrap_or(p).to_string())
                .collect()
        })
        .collect();

    let mut edges: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); layers.len()];
    for entry in ctx.inventory.files() {
        let Some(from) = owning_layer(layers, &entry.path) else {
            continue;
        };
        if !IMPORT_EXTS.contains(&entry.ext.as_str()) {
            continue;
        }
        let Some(content) = ctx.read_source(entry)? else {
            continue;
        };
        for segments in import_segments(&entry.ext, &content) {
            for (to, names) in dir_names.iter().enumerate() {
                if to != from && segments.iter().any(|s| names.contains(s)) {
                    edges[from].insert(to);
                }
            }
        }
    }

    let names: Vec<String> = layers.iter().map(|l| l.name.clone()).collect();
    for (layer, targets) in layers.iter_mut().zip(edges) {
        layer.depends_on = targets.into_iter().map(|t| names[t].clone()).collect();
    }
    Ok(())
}

fn render_diagram(layers: &[Layer]) -> String {
    let mut lines = vec!["graph TD".to_string()];
    for layer in layers {
        if layer.depends_on.is_empty() {
            lines.push(format!("    {}", layer.name));
        }
        for dep in &layer.depends_on {
            lines.push(format!("    {} --> {}", layer.name, dep));
        }
    }
    lines.join("\n")
}
