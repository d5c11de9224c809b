pub mod candidate;
pub mod filter;
pub mod walk;

pub use candidate::{normalized_extension, FileCandidate};
pub use filter::IgnoreFilter;
pub use walk::list_source_files;
