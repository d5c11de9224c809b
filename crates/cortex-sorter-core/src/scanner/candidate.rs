use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Snapshot of a file taken by the stability gate. Never mutated; a fresh
/// one is sampled whenever the gate re-checks the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub path: PathBuf,
    pub file_name: String,
    /// Lowercase with a leading dot, empty when the name has no extension.
    pub extension: String,
    pub size: u64,
    pub mtime: SystemTime,
}

impl FileCandidate {
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let metadata = fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            path: path.to_path_buf(),
            extension: normalized_extension(path),
            file_name,
            size: metadata.len(),
            mtime: metadata.modified()?,
        })
    }

    /// Size and modification time both match `other`.
    pub fn is_unchanged_from(&self, other: &FileCandidate) -> bool {
        self.size == other.size && self.mtime == other.mtime
    }
}

pub fn normalized_extension(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_candidate_from_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Report.PDF");
        fs::write(&path, b"12345").unwrap();

        let candidate = FileCandidate::from_path(&path).unwrap();
        assert_eq!(candidate.file_name, "Report.PDF");
        assert_eq!(candidate.extension, ".pdf");
        assert_eq!(candidate.size, 5);
        assert!(candidate.is_unchanged_from(&FileCandidate::from_path(&path).unwrap()));
    }

    #[test]
    fn test_extensionless_file() {
        assert_eq!(normalized_extension(Path::new("/tmp/Makefile")), "");
        assert_eq!(normalized_extension(Path::new("/tmp/a.tar.GZ")), ".gz");
    }

    #[test]
    fn test_directory_is_rejected() {
        let dir = tempdir().unwrap();
        let err = FileCandidate::from_path(dir.path()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
