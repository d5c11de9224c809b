use dashmap::DashSet;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use tracing::{debug, info};

use super::event::FsEvent;
use crate::config::AppConfig;
use crate::engine::SortEngine;
use crate::error::Error;
use crate::outcome::{ProcessingOutcome, StatsSnapshot};
use crate::progress::{ProgressReporter, SilentReporter};
use crate::scanner::{list_source_files, IgnoreFilter};

/// Drains filesystem events and runs each new file through the engine on a
/// worker pool. Many files may be in flight at once; a path already in
/// flight absorbs further events for it instead of being queued again.
pub struct Orchestrator {
    engine: SortEngine,
    source_folder: PathBuf,
    filter: IgnoreFilter,
    in_flight: DashSet<PathBuf>,
    pool: ThreadPool,
    reporter: Box<dyn ProgressReporter>,
}

impl Orchestrator {
    pub fn new(
        engine: SortEngine,
        source_folder: PathBuf,
        filter: IgnoreFilter,
        workers: usize,
    ) -> Result<Self, Error> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("sorter-worker-{}", i))
            .build()
            .map_err(|e| Error::Other(format!("Failed to build worker pool: {}", e)))?;

        Ok(Self {
            engine,
            source_folder,
            filter,
            in_flight: DashSet::new(),
            pool,
            reporter: Box::new(SilentReporter),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        if !config.source_folder.is_dir() {
            return Err(Error::Other(format!(
                "Source folder does not exist: '{}'",
                config.source_folder.display()
            )));
        }

        let filter = IgnoreFilter::new(&config.ignore_patterns)?;
        let engine = SortEngine::from_config(config)?;
        Self::new(
            engine,
            config.source_folder.clone(),
            filter,
            config.watch.workers,
        )
    }

    pub fn with_reporter(mut self, reporter: Box<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn engine(&self) -> &SortEngine {
        &self.engine
    }

    pub fn source_folder(&self) -> &Path {
        &self.source_folder
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.engine.stats()
    }

    /// Consume events until every sender is dropped, then wait for the
    /// files still in flight.
    pub fn run(&self, events: Receiver<FsEvent>) -> StatsSnapshot {
        self.pool.in_place_scope(|scope| {
            for event in events.iter() {
                if !self.accepts(&event.path) {
                    continue;
                }
                if !self.in_flight.insert(event.path.clone()) {
                    debug!("Coalesced {:?} event for '{}'", event.kind, event.path.display());
                    continue;
                }
                self.reporter.on_file_detected(&event.path);
                scope.spawn(move |_| {
                    self.complete(&event.path);
                });
            }
        });
        info!("Event stream closed; {}", self.stats());
        self.stats()
    }

    /// Process the files already sitting in the source folder.
    pub fn sweep(&self) -> Result<StatsSnapshot, Error> {
        let files = list_source_files(&self.source_folder, &self.filter)?;
        info!("Sweeping {} existing files in '{}'", files.len(), self.source_folder.display());
        self.reporter.on_sweep_start(files.len());

        self.pool.install(|| {
            files.par_iter().for_each(|path| {
                if self.in_flight.insert(path.clone()) {
                    self.reporter.on_file_detected(path);
                    self.complete(path);
                }
            })
        });

        let stats = self.stats();
        self.reporter.on_sweep_complete(&stats);
        Ok(stats)
    }

    fn accepts(&self, path: &Path) -> bool {
        if self.filter.is_ignored(path) {
            debug!("Ignored: '{}'", path.display());
            return false;
        }
        if !path.is_file() {
            debug!("Not a file (or already gone): '{}'", path.display());
            return false;
        }
        true
    }

    fn complete(&self, path: &Path) -> ProcessingOutcome {
        let outcome = self.engine.process(path);
        self.in_flight.remove(path);
        self.reporter.on_outcome(path, &outcome, &self.stats());
        outcome
    }
}
