use std::fs::File;
use std::io;
use std::path::Path;
use std::thread;
use std::time::Duration;
use tracing::{debug, trace};

use crate::config::StabilitySettings;
use crate::error::is_transient;
use crate::scanner::FileCandidate;

/// Result of one sample, wait, re-sample round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settle {
    /// Unchanged across the interval and openable for reading.
    Stable(FileCandidate),
    /// Still being written, or momentarily unreadable.
    Unsettled,
    /// Gone. Not an error: another process took it, or it was a temp file.
    Vanished,
    /// Cannot be read and waiting will not change that.
    Unreadable(String),
}

/// Final verdict after the bounded number of rounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateResult {
    Stable(FileCandidate),
    Vanished,
    TimedOut { attempts: u32 },
    Unreadable { reason: String },
}

/// Decides when a file has finished being written and is safe to hash.
#[derive(Debug, Clone)]
pub struct StabilityGate {
    interval: Duration,
    max_attempts: u32,
}

impl StabilityGate {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn from_settings(settings: &StabilitySettings) -> Self {
        Self::new(settings.interval(), settings.max_attempts)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_stable(&self, path: &Path) -> bool {
        matches!(self.settle_once(path), Settle::Stable(_))
    }

    pub fn settle_once(&self, path: &Path) -> Settle {
        let first = match sample(path) {
            Ok(c) => c,
            Err(settle) => return settle,
        };

        thread::sleep(self.interval);

        let second = match sample(path) {
            Ok(c) => c,
            Err(settle) => return settle,
        };

        if !second.is_unchanged_from(&first) {
            trace!(
                "'{}' changed during stability window ({} -> {} bytes)",
                second.file_name,
                first.size,
                second.size
            );
            return Settle::Unsettled;
        }

        match File::open(path) {
            Ok(_) => Settle::Stable(second),
            Err(e) => {
                trace!("'{}' not readable: {}", second.file_name, e);
                classify(&e)
            }
        }
    }

    /// Repeat `settle_once` until the file settles, vanishes, turns out to
    /// be unreadable, or the attempt budget runs out.
    pub fn wait(&self, path: &Path) -> GateResult {
        for attempt in 1..=self.max_attempts {
            match self.settle_once(path) {
                Settle::Stable(candidate) => return GateResult::Stable(candidate),
                Settle::Vanished => return GateResult::Vanished,
                Settle::Unreadable(reason) => return GateResult::Unreadable { reason },
                Settle::Unsettled => {
                    debug!(
                        "'{}' not stable after attempt {}/{}",
                        path.display(),
                        attempt,
                        self.max_attempts
                    );
                }
            }
        }
        GateResult::TimedOut {
            attempts: self.max_attempts,
        }
    }
}

fn sample(path: &Path) -> Result<FileCandidate, Settle> {
    FileCandidate::from_path(path).map_err(|e| classify(&e))
}

/// Missing, worth another round, or a terminal failure.
fn classify(err: &io::Error) -> Settle {
    if err.kind() == io::ErrorKind::NotFound {
        Settle::Vanished
    } else if is_transient(err) {
        Settle::Unsettled
    } else {
        Settle::Unreadable(err.to_string())
    }
}
