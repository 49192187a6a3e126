//! Application telemetry events and sinks.
//!
//! bbexport is a local tool, but bulk runs benefit from lightweight
//! telemetry to support debugging and to capture operational signals such
//! as per-repository import counts and image batch flushes.

use std::io;

use serde::{Deserialize, Serialize};

/// A structured telemetry event emitted by bbexport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TelemetryEvent {
    /// Records the outcome of one repository import.
    RepositoryImported {
        /// Canonical `project/slug` of the repository.
        repository: String,
        /// Pull request records written.
        pull_requests: usize,
    },
    /// Records a completed diff backfill.
    DiffsBackfilled {
        /// Canonical `project/slug` of the repository.
        repository: String,
        /// Diffs fetched during the run.
        fetched: usize,
    },
    /// Records an image dump run.
    ImagesDumped {
        /// URLs selected for download.
        requested: usize,
        /// Images present in the final dump.
        downloaded: usize,
    },
}

/// A sink that can record telemetry events.
pub trait TelemetrySink: Send + Sync {
    /// Records a telemetry event.
    fn record(&self, event: TelemetryEvent);
}

/// Records telemetry events to stderr as JSON lines (JSONL).
///
/// This is intended for local debugging and is not transmitted anywhere.
#[derive(Debug, Default)]
pub struct StderrJsonlTelemetrySink;

impl TelemetrySink for StderrJsonlTelemetrySink {
    fn record(&self, event: TelemetryEvent) {
        let Ok(serialised) = serde_json::to_string(&event) else {
            return;
        };

        let _ignored = writeln_stderr(&serialised);
    }
}

fn writeln_stderr(message: &str) -> io::Result<()> {
    use io::Write;

    let mut stderr = io::stderr().lock();
    writeln!(stderr, "{message}")
}
