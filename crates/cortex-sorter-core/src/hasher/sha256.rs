use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::time::Duration;

use crate::error::retry_transient;

const CHUNK_SIZE: usize = 8192;

/// SHA-256 of a file's content as 64 lowercase hex characters. The file is
/// streamed in fixed-size chunks so memory use does not grow with file size.
pub fn hash_file(file: &Path) -> io::Result<String> {
    let mut f = File::open(file)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; CHUNK_SIZE];
    loop {
        let bytes_read = match f.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// `hash_file`, retrying transient failures (file briefly locked) with a
/// linearly growing delay. A missing file is returned immediately since
/// waiting will not bring it back.
pub fn hash_file_with_retry(
    file: &Path,
    max_attempts: u32,
    backoff: Duration,
) -> io::Result<String> {
    let what = format!("Hash of '{}'", file.display());
    retry_transient(&what, max_attempts, backoff, || hash_file(file))
}
