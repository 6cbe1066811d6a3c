use super::{FileEntry, FileInventory};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use ignore::WalkBuilder;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};

/// Patterns excluded from every inventory, in gitignore syntax
pub const DEFAULT_EXCLUDES: &[&str] = &[
    ".git/",
    ".hg/",
    ".svn/",
    "node_modules/",
    "bower_components/",
    "vendor/",
    "dist/",
    "build/",
    "out/",
    "target/",
    ".next/",
    ".nuxt/",
    ".svelte-kit/",
    ".turbo/",
    ".nx/",
    ".gradle/",
    ".idea/",
    "coverage/",
    "htmlcov/",
    "__pycache__/",
    ".pytest_cache/",
    ".mypy_cache/",
    ".venv/",
    "venv/",
    ".DS_Store",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "bun.lockb",
    "Cargo.lock",
    "go.sum",
    "poetry.lock",
    "Pipfile.lock",
    "Gemfile.lock",
    "composer.lock",
    "*.min.js",
    "*.min.css",
    "*.log",
    "*.map",
];

#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("Path does not exist: {0}")]
    PathNotFound(PathBuf),
    #[error("Path is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("Failed to read repository root {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Gitignore-style exclusion rules anchored at the repository root
///
/// Negated patterns (`!pattern`) are dropped: rules only ever add exclusions.
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    root: PathBuf,
    matcher: Arc<Gitignore>,
}

impl IgnoreRules {
    pub fn new<'a>(root: &Path, patterns: impl IntoIterator<Item = &'a str>) -> Self {
        let mut builder = GitignoreBuilder::new(root);

        for line in patterns {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            if let Err(e) = builder.add_line(None, line) {
                debug!(pattern = line, error = %e, "Skipping invalid ignore pattern");
            }
        }

        let matcher = builder.build().unwrap_or_else(|e| {
            debug!(error = %e, "Failed to build ignore rules, falling back to none");
            Gitignore::empty()
        });

        Self {
            root: root.to_path_buf(),
            matcher: Arc::new(matcher),
        }
    }

    /// Default excludes, the root `.gitignore` and any caller supplied patterns
    pub fn for_repository(root: &Path, extra: &[String]) -> Self {
        let gitignore = std::fs::read_to_string(root.join(".gitignore")).unwrap_or_default();

        let patterns = DEFAULT_EXCLUDES
            .iter()
            .copied()
            .chain(gitignore.lines())
            .chain(extra.iter().map(String::as_str));

        Self::new(root, patterns)
    }

    /// Whether an absolute path under the root is excluded. The root itself never is.
    pub fn is_ignored(&self, path: &Path, is_dir: bool) -> bool {
        if path == self.root {
            return false;
        }
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        if relative.as_os_str().is_empty() {
            return false;
        }
        self.matcher.matched(relative, is_dir).is_ignore()
    }
}

/// Enumerates the repository once, honoring default excludes and `.gitignore`
///
/// Symlinks are never followed. Unreadable entries are skipped; only an
/// unusable root is reported as an error.
pub fn walk(root: &Path, extra_ignores: &[String]) -> Result<FileInventory, InventoryError> {
    let start = Instant::now();

    if !root.exists() {
        return Err(InventoryError::PathNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(InventoryError::NotADirectory(root.to_path_buf()));
    }
    std::fs::read_dir(root).map_err(|source| InventoryError::Unreadable {
        path: root.to_path_buf(),
        source,
    })?;

    let rules = IgnoreRules::for_repository(root, extra_ignores);
    let filter_rules = rules.clone();

    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .hidden(false)
        .follow_links(false)
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            !filter_rules.is_ignored(entry.path(), is_dir)
        })
        .build();

    let mut entries = Vec::new();

    for result in walker {
        let entry = match result {
            Ok(e) => e,
            Err(err) => {
                debug!(error = %err, "Skipping unreadable entry");
                continue;
            }
        };

        if entry.depth() == 0 {
            continue;
        }

        let Some(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_symlink() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let relative = relative.to_string_lossy().replace('\\', "/");

        if file_type.is_dir() {
            entries.push(FileEntry::dir(relative));
        } else {
            let size = match entry.metadata() {
                Ok(meta) => meta.len(),
                Err(err) => {
                    debug!(path = %relative, error = %err, "Skipping entry without metadata");
                    continue;
                }
            };
            entries.push(FileEntry::file(relative, size));
        }
    }

    let inventory = FileInventory::new(entries);

    info!(
        root = %root.display(),
        entries = inventory.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "File inventory complete"
    );

    Ok(inventory)
}
