//! Technology knowledge shared by the detectors
//!
//! - [`language`]: source extensions and version sources per language
//! - [`framework`]: dependency and file fingerprints for frameworks,
//!   databases and tools
//! - [`manifest`]: parsers for dependency manifests

#[macro_use]
pub mod id_enum_macro;

pub mod framework;
pub mod language;
pub mod manifest;

pub use framework::{DependencyPattern, DependencyPatternType, FrameworkRule, ManifestDependency};
pub use language::{is_source_ext, language_for_ext, LanguageDefinition};
pub use manifest::{DeclaredDependency, ManifestError, PackageJson};
