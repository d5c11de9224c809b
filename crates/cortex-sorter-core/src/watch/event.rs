use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsEventKind {
    Created,
    Modified,
}

/// A raw filesystem notification. Both kinds are handled identically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    pub kind: FsEventKind,
    pub path: PathBuf,
}

impl FsEvent {
    pub fn created(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: FsEventKind::Created,
            path: path.into(),
        }
    }

    pub fn modified(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: FsEventKind::Modified,
            path: path.into(),
        }
    }
}
