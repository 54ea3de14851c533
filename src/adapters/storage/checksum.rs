//! SHA-256 checksums of published objects

use crate::domain::{Result, ShelfportError};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::path::Path;

/// Hex-encoded SHA-256 of a byte slice
///
/// # Examples
///
/// ```
/// use shelfport::adapters::storage::sha256_bytes;
///
/// assert_eq!(sha256_bytes(b"").len(), 64);
/// ```
pub fn sha256_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Size and hex-encoded SHA-256 of a file, read in a streaming fashion
pub fn sha256_file(path: &Path) -> Result<(u64, String)> {
    let mut file = File::open(path).map_err(|e| {
        ShelfportError::Io(format!("Failed to open {} for hashing: {e}", path.display()))
    })?;
    let mut hasher = Sha256::new();
    let size = std::io::copy(&mut file, &mut hasher).map_err(|e| {
        ShelfportError::Io(format!("Failed to hash {}: {e}", path.display()))
    })?;
    Ok((size, format!("{:x}", hasher.finalize())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_known_digest() {
        assert_eq!(
            sha256_bytes(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_file_digest_matches_bytes() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"Barcode\n111\n").unwrap();
        file.flush().unwrap();

        let (size, digest) = sha256_file(file.path()).unwrap();
        assert_eq!(size, 12);
        assert_eq!(digest, sha256_bytes(b"Barcode\n111\n"));
    }
}
