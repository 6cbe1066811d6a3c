//! Analysis pipeline: full runs, incremental runs and monorepo fan-out

mod engine;
mod incremental;
mod orchestrator;
mod scheduler;

pub use engine::{AnalysisOverrides, Engine, EngineError, EngineOptions};
pub use incremental::{classify_impact, detectors_for, Impact, ImpactSet, IncrementalEngine};
pub use orchestrator::{resolve_workspaces, WorkspaceOrchestrator, WorkspaceResult};
pub use scheduler::{ScheduleMode, Scheduler};
