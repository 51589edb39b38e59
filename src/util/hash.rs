//! Checksums of package descriptors.

use std::io::Read;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

/// Compute SHA256 hash of a byte slice.
pub fn sha256_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute SHA256 hash of a string.
pub fn sha256_str(s: &str) -> String {
    sha256_bytes(s.as_bytes())
}

/// Compute SHA256 hash of everything a reader yields.
pub fn sha256_reader(reader: &mut dyn Read) -> Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .context("failed to read content for hashing")?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const HELLO: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn test_sha256_str() {
        assert_eq!(sha256_str("hello"), HELLO);
    }

    #[test]
    fn test_sha256_reader() {
        let mut reader = Cursor::new(b"hello".to_vec());
        assert_eq!(sha256_reader(&mut reader).unwrap(), HELLO);
    }
}
