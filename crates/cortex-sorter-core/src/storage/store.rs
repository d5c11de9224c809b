use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::models::FingerprintRecord;
use super::sqlite::Database;
use crate::error::Error;

/// Shared, durable map from content hash to first sighting.
///
/// A single connection behind a mutex makes this the only writer in the
/// process. Claims are one conditional insert, so two identical files
/// racing for the same hash yield exactly one record.
pub struct FingerprintStore {
    db: Mutex<Database>,
}

impl FingerprintStore {
    pub fn open(path: &Path) -> Result<Self, Error> {
        Ok(Self::from_database(Database::open(path)?))
    }

    pub fn open_in_memory() -> Result<Self, Error> {
        Ok(Self::from_database(Database::open_in_memory()?))
    }

    pub fn from_database(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    fn db(&self) -> Result<MutexGuard<'_, Database>, Error> {
        self.db.lock().map_err(|_| Error::StorePoisoned)
    }

    pub fn lookup(&self, hash: &str) -> Result<Option<FingerprintRecord>, Error> {
        Ok(self.db()?.find_fingerprint(hash)?)
    }

    /// Claim `hash` for a newly seen file. Fails with `Error::DuplicateKey`
    /// when another file already holds it; callers treat that exactly like
    /// a lookup hit.
    pub fn record(
        &self,
        hash: &str,
        path: &Path,
        size: u64,
        name: &str,
    ) -> Result<(), Error> {
        let inserted = self.db()?.insert_fingerprint(
            hash,
            &path.to_string_lossy(),
            size as i64,
            name,
        )?;
        if inserted {
            Ok(())
        } else {
            Err(Error::DuplicateKey {
                hash: hash.to_string(),
            })
        }
    }

    pub fn find_by_name(&self, file_name: &str) -> Result<Vec<FingerprintRecord>, Error> {
        Ok(self.db()?.find_fingerprints_by_name(file_name)?)
    }

    pub fn count(&self) -> Result<u64, Error> {
        Ok(self.db()?.count_fingerprints()?)
    }

    /// Remove one record. Maintenance only.
    pub fn forget(&self, hash: &str) -> Result<bool, Error> {
        Ok(self.db()?.delete_fingerprint(hash)?)
    }
}
