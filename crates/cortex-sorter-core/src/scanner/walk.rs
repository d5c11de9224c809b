use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

use super::IgnoreFilter;

/// Regular files directly inside `dir` (no recursion), minus ignored names.
/// Symlinks are skipped. Entries that vanish mid-listing are dropped.
pub fn list_source_files(dir: &Path, filter: &IgnoreFilter) -> io::Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|err| {
        io::Error::new(
            err.kind(),
            format!("Error reading directory {}: {}", dir.display(), err),
        )
    })?;

    let mut files = Vec::new();
    for entry_result in entries {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(err) => {
                error!("Error reading entry in directory {}: {}", dir.display(), err);
                continue;
            }
        };

        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(t) => t,
            Err(err) => {
                debug!("Skipping {}: {}", path.display(), err);
                continue;
            }
        };

        if !file_type.is_file() {
            continue;
        }
        if filter.is_ignored(&path) {
            debug!("Ignored: '{}'", path.display());
            continue;
        }
        files.push(path);
    }

    files.sort();
    Ok(files)
}
