use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::{AppConfig, HashSettings, RelocationSettings, StabilitySettings};
use crate::error::Error;
use crate::extract::{ContentExtractor, DocumentExtractor};
use crate::hasher;
use crate::outcome::{FailureReason, ProcessingOutcome, SkipReason, SortStats, StatsSnapshot};
use crate::relocate::{move_file_with_retry, unique_destination};
use crate::rules::RuleSet;
use crate::scanner::FileCandidate;
use crate::stability::{GateResult, StabilityGate};
use crate::storage::FingerprintStore;

/// The per-file decision pipeline: stabilize, fingerprint, route as a
/// duplicate or through the rules, move, count.
///
/// Side effects are ordered so that the store is never behind the disk:
/// the fingerprint is claimed before the file moves, and the statistics are
/// updated only after the outcome is final.
pub struct SortEngine {
    rules: RuleSet,
    store: FingerprintStore,
    gate: StabilityGate,
    extractor: Box<dyn ContentExtractor>,
    duplicate_folder: PathBuf,
    hashing: HashSettings,
    relocation: RelocationSettings,
    stats: SortStats,
}

impl SortEngine {
    pub fn new(rules: RuleSet, store: FingerprintStore, duplicate_folder: PathBuf) -> Self {
        Self {
            rules,
            store,
            gate: StabilityGate::from_settings(&StabilitySettings::default()),
            extractor: Box::new(DocumentExtractor),
            duplicate_folder,
            hashing: HashSettings::default(),
            relocation: RelocationSettings::default(),
            stats: SortStats::new(),
        }
    }

    /// Validate the rules, open the fingerprint store and make sure the
    /// duplicate folder exists. Any failure here is fatal to startup.
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let rules = RuleSet::from_configs(&config.rules)?;
        info!("Loaded {} rules", rules.len());

        let store = FingerprintStore::open(&config.database_path)?;
        info!(
            "Fingerprint store '{}' ready ({} records)",
            config.database_path.display(),
            store.count()?
        );

        fs::create_dir_all(&config.duplicate_folder)?;

        Ok(Self::new(rules, store, config.duplicate_folder.clone())
            .with_stability(StabilityGate::from_settings(&config.stability))
            .with_hashing(config.hashing.clone())
            .with_relocation(config.relocation.clone()))
    }

    pub fn with_stability(mut self, gate: StabilityGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_extractor(mut self, extractor: Box<dyn ContentExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_hashing(mut self, hashing: HashSettings) -> Self {
        self.hashing = hashing;
        self
    }

    pub fn with_relocation(mut self, relocation: RelocationSettings) -> Self {
        self.relocation = relocation;
        self
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn store(&self) -> &FingerprintStore {
        &self.store
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Run one file to a terminal outcome. Never panics on I/O trouble and
    /// never returns an error: per-file problems become `Failed`.
    pub fn process(&self, path: &Path) -> ProcessingOutcome {
        let outcome = self.run(path);
        self.stats.record(&outcome);
        log_outcome(path, &outcome);
        outcome
    }

    fn run(&self, path: &Path) -> ProcessingOutcome {
        let candidate = match self.gate.wait(path) {
            GateResult::Stable(candidate) => candidate,
            GateResult::Vanished => return ProcessingOutcome::Skipped(SkipReason::Vanished),
            GateResult::TimedOut { attempts } => {
                return ProcessingOutcome::Failed(FailureReason::UnstableTimeout { attempts })
            }
            GateResult::Unreadable { reason } => {
                return ProcessingOutcome::Failed(FailureReason::Unreadable(reason))
            }
        };

        let hash = match hasher::hash_file_with_retry(
            &candidate.path,
            self.hashing.max_attempts,
            Duration::from_millis(self.hashing.backoff_ms),
        ) {
            Ok(hash) => hash,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return ProcessingOutcome::Skipped(SkipReason::Vanished)
            }
            Err(e) => return ProcessingOutcome::Failed(FailureReason::Hash(e.to_string())),
        };

        match self.store.lookup(&hash) {
            Ok(Some(record)) if Path::new(&record.original_path) == candidate.path.as_path() => {
                // Already fingerprinted and left here as unmatched.
                debug!("'{}' was seen before at this path", candidate.file_name);
                return ProcessingOutcome::Unmatched;
            }
            Ok(Some(record)) => return self.route_duplicate(&candidate, record.original_path),
            Ok(None) => {}
            Err(e) => return ProcessingOutcome::Failed(FailureReason::Store(e.to_string())),
        }

        let rule = self.rules.evaluate(&candidate, self.extractor.as_ref());
        let planned = match rule {
            Some(rule) => match unique_destination(&rule.dest.join(&candidate.file_name)) {
                Ok(dest) => Some((rule, dest)),
                Err(e) => {
                    return ProcessingOutcome::Failed(FailureReason::Relocation(e.to_string()))
                }
            },
            None => None,
        };

        let recorded_path = planned
            .as_ref()
            .map(|(_, dest)| dest.as_path())
            .unwrap_or(candidate.path.as_path());
        match self
            .store
            .record(&hash, recorded_path, candidate.size, &candidate.file_name)
        {
            Ok(()) => {}
            Err(Error::DuplicateKey { .. }) => {
                // Identical content won the race between our lookup and claim.
                let original = self
                    .store
                    .lookup(&hash)
                    .ok()
                    .flatten()
                    .map(|r| r.original_path)
                    .unwrap_or_else(|| "unknown".to_string());
                return self.route_duplicate(&candidate, original);
            }
            Err(e) => return ProcessingOutcome::Failed(FailureReason::Store(e.to_string())),
        }

        let Some((rule, dest)) = planned else {
            return ProcessingOutcome::Unmatched;
        };

        match self.relocate(&candidate.path, &dest) {
            Ok(()) => ProcessingOutcome::Sorted {
                rule: rule.name.clone(),
                destination: dest,
            },
            Err(e) => relocation_failure(e),
        }
    }

    /// Duplicates are moved aside, never deleted.
    fn route_duplicate(&self, candidate: &FileCandidate, original_path: String) -> ProcessingOutcome {
        let dest = match unique_destination(&self.duplicate_folder.join(&candidate.file_name)) {
            Ok(dest) => dest,
            Err(e) => return ProcessingOutcome::Failed(FailureReason::Relocation(e.to_string())),
        };

        match self.relocate(&candidate.path, &dest) {
            Ok(()) => ProcessingOutcome::Duplicate {
                original_path,
                moved_to: dest,
            },
            Err(e) => relocation_failure(e),
        }
    }

    fn relocate(&self, source: &Path, dest: &Path) -> io::Result<()> {
        move_file_with_retry(
            source,
            dest,
            self.relocation.max_attempts,
            Duration::from_millis(self.relocation.backoff_ms),
        )
    }
}

fn relocation_failure(e: io::Error) -> ProcessingOutcome {
    if e.kind() == io::ErrorKind::NotFound {
        ProcessingOutcome::Skipped(SkipReason::Vanished)
    } else {
        ProcessingOutcome::Failed(FailureReason::Relocation(e.to_string()))
    }
}

fn log_outcome(path: &Path, outcome: &ProcessingOutcome) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    match outcome {
        ProcessingOutcome::Sorted { rule, destination } => {
            info!("[{}] '{}' -> {}", rule, name, destination.display())
        }
        ProcessingOutcome::Duplicate {
            original_path,
            moved_to,
        } => info!(
            "Duplicate detected: '{}' (original: {}) -> {}",
            name,
            original_path,
            moved_to.display()
        ),
        ProcessingOutcome::Unmatched => info!("No matching rule for '{}'", path.display()),
        ProcessingOutcome::Skipped(reason) => warn!("Skipped '{}': {}", path.display(), reason),
        ProcessingOutcome::Failed(reason @ FailureReason::UnstableTimeout { .. }) => {
            warn!("Gave up on '{}': {}", path.display(), reason)
        }
        ProcessingOutcome::Failed(reason) => {
            error!("Error processing '{}': {}", path.display(), reason)
        }
    }
}
