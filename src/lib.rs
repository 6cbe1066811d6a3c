//! argus - repository analysis for AI coding assistants
//!
//! argus scans a source repository and produces context files (`CLAUDE.md`,
//! `.cursorrules`, Copilot instructions, Continue config) describing its tech
//! stack, commands, conventions, endpoints and architecture.
//!
//! # Core Concepts
//!
//! - **Detectors**: independent analysers that each extract one facet of the
//!   repository from a shared file inventory
//! - **Pipeline**: a staged scheduler that runs detectors in parallel and
//!   merges their facets into one immutable [`Analysis`]
//! - **Incremental mode**: maps a changed file to impact tags and re-runs
//!   only the affected detectors against a cached analysis
//! - **Monorepo mode**: runs the pipeline once per workspace with bounded
//!   concurrency
//!
//! # Example Usage
//!
//! ```ignore
//! use argus::{Engine, EngineOptions};
//! use tokio_util::sync::CancellationToken;
//!
//! async fn describe(root: &std::path::Path) -> anyhow::Result<()> {
//!     let engine = Engine::new(EngineOptions::default());
//!     let analysis = engine.analyze(root, CancellationToken::new()).await?;
//!     println!("{} uses {:?}", analysis.project_name, analysis.primary_language());
//!     Ok(())
//! }
//! ```
//!
//! # Project Structure
//!
//! - [`fs`]: file inventory walker
//! - [`stack`]: language, framework and manifest knowledge
//! - [`detectors`]: the detector implementations and registry
//! - [`pipeline`]: scheduler, engine, incremental and monorepo drivers
//! - [`ai`]: optional AI enrichment post-pass
//! - [`generators`]: output file renderers

pub mod ai;
pub mod analysis;
pub mod cli;
pub mod config;
pub mod detectors;
pub mod fs;
pub mod generators;
pub mod pipeline;
pub mod progress;
pub mod stack;
pub mod util;

pub use analysis::Analysis;
pub use config::{ArgusConfig, ConfigError};
pub use detectors::{Detector, DetectorError, DetectorId, DetectorRegistry};
pub use generators::{Generator, GeneratorId};
pub use pipeline::{Engine, EngineError, EngineOptions, Impact, IncrementalEngine, WorkspaceOrchestrator};
pub use progress::{LoggingHandler, ProgressEvent, ProgressHandler};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
