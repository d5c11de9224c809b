use std::io;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::platform;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid rule '{rule}': {reason}")]
    InvalidRule { rule: String, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Another file with the same content claimed the fingerprint first.
    #[error("Fingerprint {hash} is already recorded")]
    DuplicateKey { hash: String },

    #[error("Fingerprint store lock poisoned")]
    StorePoisoned,

    #[error("Watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("{0}")]
    Other(String),
}

/// True for I/O failures worth retrying: the file is briefly absent,
/// locked by its writer, or the call was interrupted.
pub fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
    ) || platform::is_sharing_violation(err)
}

/// Run `op` up to `max_attempts` times, sleeping `backoff * attempt`
/// between tries while it fails transiently. `NotFound` is returned at once:
/// waiting does not bring a file back.
pub fn retry_transient<T>(
    what: &str,
    max_attempts: u32,
    backoff: Duration,
    mut op: impl FnMut() -> io::Result<T>,
) -> io::Result<T> {
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(e),
            Err(e) if is_transient(&e) && attempt < max_attempts => {
                debug!("{} attempt {} failed: {}, retrying", what, attempt, e);
                thread::sleep(backoff * attempt);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_transient_classification() {
        assert!(is_transient(&io::Error::from(io::ErrorKind::NotFound)));
        assert!(is_transient(&io::Error::from(io::ErrorKind::Interrupted)));
        assert!(!is_transient(&io::Error::from(
            io::ErrorKind::PermissionDenied
        )));
        assert!(!is_transient(&io::Error::from(io::ErrorKind::InvalidData)));
    }

    #[test]
    fn test_invalid_rule_message() {
        let err = Error::InvalidRule {
            rule: "Invoices".to_string(),
            reason: "missing destination".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid rule 'Invoices': missing destination"
        );
    }

    #[test]
    fn test_retry_recovers_from_transient_failures() {
        let calls = Cell::new(0);
        let result = retry_transient("op", 3, Duration::from_millis(1), || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(io::Error::from(io::ErrorKind::WouldBlock))
            } else {
                Ok(7)
            }
        });
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_retry_gives_up_after_budget() {
        let calls = Cell::new(0);
        let err = retry_transient::<()>("op", 2, Duration::from_millis(1), || {
            calls.set(calls.get() + 1);
            Err(io::Error::from(io::ErrorKind::TimedOut))
        })
        .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_retry_does_not_repeat_persistent_or_missing() {
        for kind in [io::ErrorKind::PermissionDenied, io::ErrorKind::NotFound] {
            let calls = Cell::new(0);
            let err = retry_transient::<()>("op", 5, Duration::from_millis(1), || {
                calls.set(calls.get() + 1);
                Err(io::Error::from(kind))
            })
            .unwrap_err();
            assert_eq!(err.kind(), kind);
            assert_eq!(calls.get(), 1);
        }
    }
}
