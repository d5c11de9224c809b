use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::retry_transient;
use crate::platform;

const MAX_NAME_ATTEMPTS: u32 = 1000;

/// `dest` itself if free, else the first free `<stem>_<n><ext>` beside it.
pub fn unique_destination(dest: &Path) -> io::Result<PathBuf> {
    if !dest.exists() {
        return Ok(dest.to_path_buf());
    }

    let stem = dest
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let suffix = dest
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    for counter in 1..MAX_NAME_ATTEMPTS {
        let candidate = dest.with_file_name(format!("{}_{}{}", stem, counter, suffix));
        if !candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!(
            "Could not generate unique path for {} after {} attempts",
            dest.display(),
            MAX_NAME_ATTEMPTS
        ),
    ))
}

/// Move `source` to `dest`, creating parent directories. Never replaces an
/// existing `dest`: that is reported as `AlreadyExists` and both files stay.
///
/// Within one volume the file is hard-linked into place and then unlinked
/// from the source. Across volumes it is copied into a newly created file,
/// verified, and only then removed from the source. On failure the source
/// is left where it was.
pub fn move_file(source: &Path, dest: &Path) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    match fs::hard_link(source, dest) {
        Ok(()) => unlink_source(source, dest),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(e),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(e),
        Err(e) if platform::is_cross_device(&e) => {
            debug!(
                "Cross-volume move of '{}', falling back to copy",
                source.display()
            );
            copy_then_remove(source, dest)
        }
        Err(e) => {
            // Filesystem without hard links.
            debug!("Hard link to '{}' failed ({}), renaming", dest.display(), e);
            rename_no_clobber(source, dest)
        }
    }
}

/// `move_file`, retried with linear backoff while it fails transiently
/// (source or destination briefly locked).
pub fn move_file_with_retry(
    source: &Path,
    dest: &Path,
    max_attempts: u32,
    backoff: Duration,
) -> io::Result<()> {
    let what = format!("Move of '{}'", source.display());
    retry_transient(&what, max_attempts, backoff, || move_file(source, dest))
}

fn unlink_source(source: &Path, dest: &Path) -> io::Result<()> {
    if let Err(e) = fs::remove_file(source) {
        // Leave exactly one name: the original.
        discard(dest);
        return Err(e);
    }
    Ok(())
}

fn rename_no_clobber(source: &Path, dest: &Path) -> io::Result<()> {
    if dest.exists() {
        return Err(already_exists(dest));
    }
    match fs::rename(source, dest) {
        Ok(()) => Ok(()),
        Err(e) if platform::is_cross_device(&e) => copy_then_remove(source, dest),
        Err(e) => Err(e),
    }
}

pub(crate) fn copy_then_remove(source: &Path, dest: &Path) -> io::Result<()> {
    let expected = fs::metadata(source)?.len();

    let copied = match copy_into_new(source, dest) {
        Ok(n) => n,
        // Someone else's file; not ours to remove.
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Err(e),
        Err(e) => {
            discard(dest);
            return Err(e);
        }
    };

    let written = fs::metadata(dest).map(|m| m.len()).unwrap_or(u64::MAX);
    if copied != expected || written != expected {
        discard(dest);
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "Copy of {} is {} bytes, expected {}",
                source.display(),
                written,
                expected
            ),
        ));
    }

    unlink_source(source, dest)
}

fn copy_into_new(source: &Path, dest: &Path) -> io::Result<u64> {
    let mut from = File::open(source)?;
    let mut to = OpenOptions::new().write(true).create_new(true).open(dest)?;
    let copied = io::copy(&mut from, &mut to)?;
    to.sync_all()?;
    Ok(copied)
}

fn already_exists(dest: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("Destination {} already exists", dest.display()),
    )
}

fn discard(dest: &Path) {
    if let Err(e) = fs::remove_file(dest) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!("Could not remove '{}': {}", dest.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_unique_destination_free_path() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("report.pdf");
        assert_eq!(unique_destination(&dest).unwrap(), dest);
    }

    #[test]
    fn test_unique_destination_counts_up() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("report.pdf"), "1").unwrap();
        fs::write(dir.path().join("report_1.pdf"), "2").unwrap();
        assert_eq!(
            unique_destination(&dir.path().join("report.pdf")).unwrap(),
            dir.path().join("report_2.pdf")
        );
    }

    #[test]
    fn test_unique_destination_without_extension() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("LICENSE"), "1").unwrap();
        assert_eq!(
            unique_destination(&dir.path().join("LICENSE")).unwrap(),
            dir.path().join("LICENSE_1")
        );
    }

    #[test]
    fn test_move_creates_destination_dirs() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("a.txt");
        fs::write(&src, "hello").unwrap();
        let dest = dir.path().join("sorted").join("text").join("a.txt");

        move_file(&src, &dest).unwrap();
        assert!(!src.exists());
        assert_eq!(fs::read_to_string(&dest).unwrap(), "hello");
    }

    #[test]
    fn test_copy_then_remove() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("a.bin");
        fs::write(&src, vec![7u8; 20_000]).unwrap();
        let dest = dir.path().join("b.bin");

        copy_then_remove(&src, &dest).unwrap();
        assert!(!src.exists());
        assert_eq!(fs::read(&dest).unwrap().len(), 20_000);
    }

    #[test]
    fn test_failed_copy_leaves_source() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("a.bin");
        fs::write(&src, "keep me").unwrap();
        let dest = dir.path().join("missing_dir").join("b.bin");

        assert!(copy_then_remove(&src, &dest).is_err());
        assert_eq!(fs::read_to_string(&src).unwrap(), "keep me");
        assert!(!dest.exists());
    }

    #[test]
    fn test_move_missing_source_errors() {
        let dir = tempdir().unwrap();
        let err = move_file(&dir.path().join("gone"), &dir.path().join("x")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_move_never_replaces_existing_destination() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("new.txt");
        let dest = dir.path().join("taken.txt");
        fs::write(&src, "incoming").unwrap();
        fs::write(&dest, "already here").unwrap();

        let err = move_file(&src, &dest).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read_to_string(&src).unwrap(), "incoming");
        assert_eq!(fs::read_to_string(&dest).unwrap(), "already here");
    }

    #[test]
    fn test_copy_never_replaces_existing_destination() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("new.bin");
        let dest = dir.path().join("taken.bin");
        fs::write(&src, "incoming").unwrap();
        fs::write(&dest, "already here").unwrap();

        let err = copy_then_remove(&src, &dest).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read_to_string(&src).unwrap(), "incoming");
        assert_eq!(fs::read_to_string(&dest).unwrap(), "already here");
    }

    #[test]
    fn test_rename_fallback_never_replaces_existing_destination() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("new.txt");
        let dest = dir.path().join("taken.txt");
        fs::write(&src, "incoming").unwrap();
        fs::write(&dest, "already here").unwrap();

        let err = rename_no_clobber(&src, &dest).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read_to_string(&dest).unwrap(), "already here");
    }

    #[test]
    fn test_move_with_retry_succeeds_and_reports_missing_source() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("a.txt");
        let dest = dir.path().join("out").join("a.txt");
        fs::write(&src, "hello").unwrap();

        move_file_with_retry(&src, &dest, 3, Duration::from_millis(1)).unwrap();
        assert_eq!(fs::read_to_string(&dest).unwrap(), "hello");

        let again = dir.path().join("out").join("again.txt");
        let err = move_file_with_retry(&src, &again, 3, Duration::from_millis(1)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
