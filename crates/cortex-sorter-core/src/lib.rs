pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod hasher;
pub mod outcome;
pub mod platform;
pub mod progress;
pub mod relocate;
pub mod rules;
pub mod scanner;
pub mod stability;
pub mod storage;
pub mod watch;

pub use config::AppConfig;
pub use engine::SortEngine;
pub use error::Error;
pub use outcome::{FailureReason, ProcessingOutcome, SkipReason, StatsSnapshot};
pub use progress::{ProgressReporter, SilentReporter};
pub use rules::{RuleSet, SortingRule};
pub use watch::{FsEvent, Orchestrator};
