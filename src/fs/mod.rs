//! File inventory shared by every detector
//!
//! The inventory is taken once per run by [`walk`] and handed to detectors
//! behind an `Arc`. Entries are immutable after construction and sorted by
//! path so that every detector iterates them in the same order.

mod walker;

pub use walker::{walk, IgnoreRules, InventoryError, DEFAULT_EXCLUDES};

use serde::{Deserialize, Serialize};

/// A single file or directory, relative to the repository root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    /// Root-relative path using `/` separators
    pub path: String,
    pub name: String,
    /// Lowercased extension without the leading dot (empty when absent)
    pub ext: String,
    pub size: u64,
    pub is_dir: bool,
}

impl FileEntry {
    pub fn new(path: impl Into<String>, size: u64, is_dir: bool) -> Self {
        let path = path.into().replace('\\', "/");
        let name = path.rsplit('/').next().unwrap_or_default().to_string();
        let ext = if is_dir {
            String::new()
        } else {
            extension_of(&name)
        };

        Self {
            path,
            name,
            ext,
            size,
            is_dir,
        }
    }

    pub fn file(path: impl Into<String>, size: u64) -> Self {
        Self::new(path, size, false)
    }

    pub fn dir(path: impl Into<String>) -> Self {
        Self::new(path, 0, true)
    }

    /// Parent directory path, empty for root-level entries
    pub fn parent(&self) -> &str {
        match self.path.rfind('/') {
            Some(idx) => &self.path[..idx],
            None => "",
        }
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('/')
    }

    /// Number of directories between the root and this entry
    pub fn depth(&self) -> usize {
        self.path.matches('/').count()
    }

    pub fn is_root_level(&self) -> bool {
        !self.path.contains('/')
    }

    /// First path segment, i.e. the top-level directory this entry lives under
    pub fn top_level(&self) -> &str {
        self.path.split('/').next().unwrap_or_default()
    }
}

fn extension_of(name: &str) -> String {
    match name.rfind('.') {
        Some(0) | None => String::new(),
        Some(idx) => name[idx + 1..].to_ascii_lowercase(),
    }
}

/// Read-only list of repository entries produced by the walker
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileInventory {
    entries: Vec<FileEntry>,
}

impl FileInventory {
    pub fn new(mut entries: Vec<FileEntry>) -> Self {
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        entries.dedup_by(|a, b| a.path == b.path);
        Self { entries }
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn files(&self) -> impl Iterator<Item = &FileEntry> {
        self.entries.iter().filter(|e| !e.is_dir)
    }

    pub fn dirs(&self) -> impl Iterator<Item = &FileEntry> {
        self.entries.iter().filter(|e| e.is_dir)
    }

    pub fn get(&self, path: &str) -> Option<&FileEntry> {
        self.entries
            .binary_search_by(|e| e.path.as_str().cmp(path))
            .ok()
            .map(|idx| &self.entries[idx])
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    pub fn has_file(&self, path: &str) -> bool {
        self.get(path).is_some_and(|e| !e.is_dir)
    }

    pub fn has_dir(&self, path: &str) -> bool {
        self.get(path).is_some_and(|e| e.is_dir)
    }

    /// Files with the given basename anywhere in the tree
    pub fn find_by_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FileEntry> + 'a {
        self.files().filter(move |e| e.name == name)
    }

    /// Files whose extension is one of `exts`
    pub fn with_ext<'a>(&'a self, exts: &'a [&str]) -> impl Iterator<Item = &'a FileEntry> + 'a {
        self.files().filter(move |e| exts.contains(&e.ext.as_str()))
    }

    /// Root-level file whose name matches case-insensitively
    pub fn root_file_ci(&self, name: &str) -> Option<&FileEntry> {
        self.files()
            .find(|e| e.is_root_level() && e.name.eq_ignore_ascii_case(name))
    }

    pub fn any_with_ext(&self, exts: &[&str]) -> bool {
        self.files().any(|e| exts.contains(&e.ext.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_entry_fields() {
        let entry = FileEntry::file("src/components/Button.TSX", 120);
        assert_eq!(entry.name, "Button.TSX");
        assert_eq!(entry.ext, "tsx");
        assert_eq!(entry.parent(), "src/components");
        assert_eq!(entry.depth(), 2);
        assert_eq!(entry.top_level(), "src");
        assert!(!entry.is_root_level());
    }

    #[test]
    fn test_dotfile_has_no_extension() {
        assert_eq!(FileEntry::file(".gitignore", 1).ext, "");
        assert_eq!(FileEntry::file("Makefile", 1).ext, "");
        assert_eq!(FileEntry::file(".eslintrc.json", 1).ext, "json");
    }

    #[test]
    fn test_directory_has_no_extension() {
        let entry = FileEntry::dir("lib.v2");
        assert!(entry.is_dir);
        assert_eq!(entry.ext, "");
    }

    #[test]
    fn test_inventory_sorted_lookup() {
        let inventory = FileInventory::new(vec![
            FileEntry::file("src/main.go", 10),
            FileEntry::dir("src"),
            FileEntry::file("go.mod", 5),
        ]);

        assert_eq!(inventory.entries()[0].path, "go.mod");
        assert!(inventory.has_file("src/main.go"));
        assert!(inventory.has_dir("src"));
        assert!(!inventory.has_file("src"));
        assert_eq!(inventory.files().count(), 2);
        assert_eq!(inventory.find_by_name("main.go").count(), 1);
    }

    #[test]
    fn test_root_file_case_insensitive() {
        let inventory = FileInventory::new(vec![
            FileEntry::file("docs/readme.md", 10),
            FileEntry::file("ReadMe.md", 10),
        ]);
        let found = inventory.root_file_ci("README.md").unwrap();
        assert_eq!(found.path, "ReadMe.md");
    }
}
