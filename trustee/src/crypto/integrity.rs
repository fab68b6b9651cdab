//! SHA-256 fingerprints for files the session hands to the organizer.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IntegrityError {
    #[error("unable to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Streams a file through SHA-256 and returns the hex digest.
pub fn sha256_file(path: &Path) -> Result<String, IntegrityError> {
    let io_err = |source| IntegrityError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(io_err)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let read = reader.read(&mut buffer).map_err(io_err)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(to_hex(&hasher.finalize()))
}

fn to_hex(digest: &[u8]) -> String {
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::sha256_file;
    use hex::ToHex;
    use sha2::{Digest, Sha256};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn hashes_known_content_to_hex() {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(b"abc").expect("write payload");
        file.flush().expect("flush");
        assert_eq!(
            sha256_file(file.path()).expect("readable"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn file_digest_matches_in_memory_digest() {
        let mut file = NamedTempFile::new().expect("temp file");
        let payload = vec![0x5au8; 20_000];
        file.write_all(&payload).expect("write payload");
        file.flush().expect("flush");

        let expected: String = Sha256::digest(&payload).encode_hex();
        assert_eq!(sha256_file(file.path()).expect("readable"), expected);
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("absent.zip");
        let err = sha256_file(&missing).unwrap_err();
        assert!(err.to_string().contains("absent.zip"));
    }
}
