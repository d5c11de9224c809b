use serde::Serialize;

/// First sighting of a piece of content. At most one exists per hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FingerprintRecord {
    pub id: i64,
    /// SHA-256, 64 lowercase hex characters.
    pub hash: String,
    pub original_path: String,
    /// RFC 3339, UTC.
    pub first_seen: String,
    pub file_size: i64,
    pub file_name: String,
}
