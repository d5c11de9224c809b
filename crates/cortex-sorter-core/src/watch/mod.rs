pub mod event;
pub mod notify_source;
pub mod orchestrator;

pub use event::{FsEvent, FsEventKind};
pub use notify_source::{spawn_watcher, SourceWatcher};
pub use orchestrator::Orchestrator;
