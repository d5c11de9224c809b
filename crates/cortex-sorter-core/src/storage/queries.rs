use super::models::FingerprintRecord;
use super::sqlite::Database;
use rusqlite::{params, OptionalExtension, Result, Row};
use tracing::debug;

const RECORD_COLUMNS: &str = "id, hash, original_path, first_seen, file_size, file_name";

fn record_from_row(row: &Row<'_>) -> Result<FingerprintRecord> {
    Ok(FingerprintRecord {
        id: row.get(0)?,
        hash: row.get(1)?,
        original_path: row.get(2)?,
        first_seen: row.get(3)?,
        file_size: row.get(4)?,
        file_name: row.get(5)?,
    })
}

impl Database {
    // ── Fingerprints ─────────────────────────────────────────────

    pub fn find_fingerprint(&self, hash: &str) -> Result<Option<FingerprintRecord>> {
        self.connection()
            .query_row(
                &format!("SELECT {} FROM fingerprint WHERE hash = ?1", RECORD_COLUMNS),
                params![hash],
                record_from_row,
            )
            .optional()
    }

    /// Insert a fingerprint unless the hash is already present, as a single
    /// conditional statement. Returns false when the hash was taken.
    pub fn insert_fingerprint(
        &self,
        hash: &str,
        original_path: &str,
        file_size: i64,
        file_name: &str,
    ) -> Result<bool> {
        let now = chrono::Utc::now().to_rfc3339();
        let inserted = self.connection().execute(
            "INSERT INTO fingerprint (hash, original_path, first_seen, file_size, file_name) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT(hash) DO NOTHING",
            params![hash, original_path, now, file_size, file_name],
        )?;
        if inserted == 0 {
            debug!("Hash {}... already exists", &hash[..hash.len().min(12)]);
        }
        Ok(inserted == 1)
    }

    pub fn find_fingerprints_by_name(&self, file_name: &str) -> Result<Vec<FingerprintRecord>> {
        let mut stmt = self.connection().prepare(&format!(
            "SELECT {} FROM fingerprint WHERE file_name = ?1 ORDER BY id",
            RECORD_COLUMNS
        ))?;
        let rows = stmt.query_map(params![file_name], record_from_row)?;
        rows.collect()
    }

    pub fn count_fingerprints(&self) -> Result<u64> {
        let count: i64 =
            self.connection()
                .query_row("SELECT COUNT(*) FROM fingerprint", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Out-of-band maintenance only; the sorting pipeline never deletes.
    pub fn delete_fingerprint(&self, hash: &str) -> Result<bool> {
        let deleted = self
            .connection()
            .execute("DELETE FROM fingerprint WHERE hash = ?1", params![hash])?;
        Ok(deleted > 0)
    }
}
