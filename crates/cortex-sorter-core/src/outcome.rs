use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

/// Terminal classification of one processed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingOutcome {
    Sorted {
        rule: String,
        destination: PathBuf,
    },
    Duplicate {
        original_path: String,
        moved_to: PathBuf,
    },
    /// No rule matched; the file stays in the source folder.
    Unmatched,
    Skipped(SkipReason),
    Failed(FailureReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Removed before it could be fingerprinted.
    Vanished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Kept changing for every stability attempt.
    UnstableTimeout { attempts: u32 },
    /// Could not be read for a reason retrying will not fix.
    Unreadable(String),
    Hash(String),
    Store(String),
    Relocation(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Vanished => write!(f, "file vanished"),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::UnstableTimeout { attempts } => {
                write!(f, "unstable_timeout after {} attempts", attempts)
            }
            FailureReason::Unreadable(e) => write!(f, "unreadable: {}", e),
            FailureReason::Hash(e) => write!(f, "cannot compute hash: {}", e),
            FailureReason::Store(e) => write!(f, "fingerprint store: {}", e),
            FailureReason::Relocation(e) => write!(f, "move failed: {}", e),
        }
    }
}

impl fmt::Display for ProcessingOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingOutcome::Sorted { rule, destination } => {
                write!(f, "sorted by [{}] to {}", rule, destination.display())
            }
            ProcessingOutcome::Duplicate {
                original_path,
                moved_to,
            } => write!(
                f,
                "duplicate of {}, moved to {}",
                original_path,
                moved_to.display()
            ),
            ProcessingOutcome::Unmatched => write!(f, "no matching rule"),
            ProcessingOutcome::Skipped(reason) => write!(f, "skipped: {}", reason),
            ProcessingOutcome::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Outcome counters, bumped once per terminal transition.
#[derive(Debug, Default)]
pub struct SortStats {
    sorted: AtomicU64,
    duplicate: AtomicU64,
    unmatched: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub sorted: u64,
    pub duplicate: u64,
    pub unmatched: u64,
    pub failed: u64,
    pub skipped: u64,
}

impl SortStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, outcome: &ProcessingOutcome) {
        let counter = match outcome {
            ProcessingOutcome::Sorted { .. } => &self.sorted,
            ProcessingOutcome::Duplicate { .. } => &self.duplicate,
            ProcessingOutcome::Unmatched => &self.unmatched,
            ProcessingOutcome::Skipped(_) => &self.skipped,
            ProcessingOutcome::Failed(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            sorted: self.sorted.load(Ordering::Relaxed),
            duplicate: self.duplicate.load(Ordering::Relaxed),
            unmatched: self.unmatched.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }
}

impl StatsSnapshot {
    pub fn total(&self) -> u64 {
        self.sorted + self.duplicate + self.unmatched + self.failed + self.skipped
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sorted={} duplicate={} unmatched={} failed={} skipped={}",
            self.sorted, self.duplicate, self.unmatched, self.failed, self.skipped
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_count_each_outcome() {
        let stats = SortStats::new();
        stats.record(&ProcessingOutcome::Unmatched);
        stats.record(&ProcessingOutcome::Unmatched);
        stats.record(&ProcessingOutcome::Skipped(SkipReason::Vanished));
        stats.record(&ProcessingOutcome::Failed(FailureReason::UnstableTimeout {
            attempts: 5,
        }));
        stats.record(&ProcessingOutcome::Sorted {
            rule: "Docs".to_string(),
            destination: PathBuf::from("/docs/a.pdf"),
        });

        let snap = stats.snapshot();
        assert_eq!(
            snap,
            StatsSnapshot {
                sorted: 1,
                duplicate: 0,
                unmatched: 2,
                failed: 1,
                skipped: 1,
            }
        );
        assert_eq!(snap.total(), 5);
    }

    #[test]
    fn test_failure_reason_display() {
        let reason = FailureReason::UnstableTimeout { attempts: 3 };
        assert_eq!(reason.to_string(), "unstable_timeout after 3 attempts");
    }
}
