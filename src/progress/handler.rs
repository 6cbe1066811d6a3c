//! Progress handler trait and events

use crate::detectors::DetectorId;
use std::time::Duration;

/// Events emitted while an analysis runs
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Analysis started for a repository
    Started { repo_path: String },

    /// A scheduler stage is about to fan out
    StageStarted {
        stage: usize,
        detectors: Vec<DetectorId>,
    },

    /// Every detector of a stage has returned
    StageComplete { stage: usize, duration: Duration },

    /// A detector returned an error
    DetectorFailed {
        detector: DetectorId,
        error: String,
        fatal: bool,
    },

    /// Monorepo workspace analysis started
    WorkspaceStarted {
        workspace: String,
        index: usize,
        total: usize,
    },

    /// Monorepo workspace analysis finished
    WorkspaceComplete {
        workspace: String,
        index: usize,
        total: usize,
        duration: Duration,
    },

    /// Analysis completed successfully
    Completed { total_time: Duration },

    /// Analysis failed
    Failed { error: String },
}

/// Trait for handling progress events during analysis
pub trait ProgressHandler: Send + Sync {
    /// Called when a progress event occurs
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}
