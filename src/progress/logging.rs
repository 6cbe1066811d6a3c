//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use tracing::{debug, error, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Started { repo_path } => {
                info!(repo = %repo_path, "Starting analysis");
            }
            ProgressEvent::StageStarted { stage, detectors } => {
                let names: Vec<&str> = detectors.iter().map(|d| d.as_str()).collect();
                debug!(stage, detectors = ?names, "Starting stage");
            }
            ProgressEvent::StageComplete { stage, duration } => {
                info!(
                    stage,
                    duration_ms = duration.as_millis() as u64,
                    "Stage complete"
                );
            }
            ProgressEvent::DetectorFailed {
                detector,
                error,
                fatal,
            } => {
                if *fatal {
                    error!(detector = %detector, error = %error, "Detector failed");
                } else {
                    debug!(detector = %detector, error = %error, "Detector failed softly");
                }
            }
            ProgressEvent::WorkspaceStarted {
                workspace,
                index,
                total,
            } => {
                info!(
                    workspace = %workspace,
                    progress = format!("{}/{}", index + 1, total),
                    "Analyzing workspace"
                );
            }
            ProgressEvent::WorkspaceComplete {
                workspace,
                index,
                total,
                duration,
            } => {
                info!(
                    workspace = %workspace,
                    progress = format!("{}/{}", index + 1, total),
                    duration_ms = duration.as_millis() as u64,
                    "Workspace analysis complete"
                );
            }
            ProgressEvent::Completed { total_time } => {
                info!(
                    total_time_ms = total_time.as_millis() as u64,
                    "Analysis complete"
                );
            }
            ProgressEvent::Failed { error } => {
                warn!(error = %error, "Analysis failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::DetectorId;
    use std::time::Duration;

    #[test]
    fn test_logging_handler_accepts_every_event() {
        let handler = LoggingHandler;
        let events = vec![
            ProgressEvent::Started {
                repo_path: "/repo".to_string(),
            },
            ProgressEvent::StageStarted {
                stage: 1,
                detectors: vec![DetectorId::TechStack],
            },
            ProgressEvent::DetectorFailed {
                detector: DetectorId::Git,
                error: "not a repository".to_string(),
                fatal: false,
            },
            ProgressEvent::Failed {
                error: "cancelled".to_string(),
            },
        ];
        for event in &events {
            handler.on_progress(event);
        }
    }

    #[test]
    fn test_default() {
        let _handler = LoggingHandler;
        let _handler2 = LoggingHandler;
    }
}
