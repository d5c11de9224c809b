use std::path::Path;

use crate::outcome::{ProcessingOutcome, StatsSnapshot};

/// Trait for reporting sorting progress.
///
/// The CLI implements it with colored lines and indicatif bars. All methods
/// have default no-op implementations and may be called from worker threads.
pub trait ProgressReporter: Send + Sync {
    fn on_file_detected(&self, _path: &Path) {}
    fn on_outcome(&self, _path: &Path, _outcome: &ProcessingOutcome, _stats: &StatsSnapshot) {}
    fn on_sweep_start(&self, _total_files: usize) {}
    fn on_sweep_complete(&self, _stats: &StatsSnapshot) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
