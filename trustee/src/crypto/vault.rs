//! Authenticated session vault built on ChaCha20-Poly1305.
//! Anything the session writes to the temp directory is sealed as
//! nonce + ciphertext + auth tag under a key that only lives in memory.

use std::fmt;

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine};
use chacha20poly1305::aead::{Aead, AeadCore, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroize;

const TAG_SIZE: usize = 16;
const NONCE_SIZE: usize = 12;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("sealing failed: {0}")]
    SealFailed(String),
    #[error("opening failed: {0}")]
    OpenFailed(String),
    #[error("base64 decoding failed: {0}")]
    Base64DecodeFailed(String),
}

/// Serializable sealed payload. Fields are base64 so the envelope can sit
/// inside a JSON document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SealedBlob {
    pub nonce: String,
    pub ciphertext: String,
    pub tag: String,
}

/// Holds the symmetric key for one session.
pub struct SecretVault {
    key: Key,
}

impl SecretVault {
    /// Fresh random key from the OS. Nothing sealed with it survives the process.
    pub fn ephemeral() -> Self {
        Self {
            key: ChaCha20Poly1305::generate_key(&mut OsRng),
        }
    }

    pub fn seal(&self, plaintext: &[u8]) -> Result<SealedBlob, VaultError> {
        let cipher = ChaCha20Poly1305::new(&self.key);
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);

        let mut ciphertext_and_tag = cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| VaultError::SealFailed(format!("{e}")))?;
        if ciphertext_and_tag.len() < TAG_SIZE {
            return Err(VaultError::SealFailed(
                "ciphertext shorter than authentication tag".to_string(),
            ));
        }
        let tag_start = ciphertext_and_tag.len() - TAG_SIZE;
        let tag_bytes = ciphertext_and_tag.split_off(tag_start);

        Ok(SealedBlob {
            nonce: STANDARD_NO_PAD.encode(nonce),
            ciphertext: STANDARD_NO_PAD.encode(ciphertext_and_tag),
            tag: STANDARD_NO_PAD.encode(tag_bytes),
        })
    }

    pub fn open(&self, blob: &SealedBlob) -> Result<Vec<u8>, VaultError> {
        let decode = |field: &str| {
            STANDARD_NO_PAD
                .decode(field.as_bytes())
                .map_err(|e| VaultError::Base64DecodeFailed(format!("{e}")))
        };
        let nonce_bytes = decode(&blob.nonce)?;
        let ciphertext = decode(&blob.ciphertext)?;
        let tag = decode(&blob.tag)?;

        if nonce_bytes.len() != NONCE_SIZE {
            return Err(VaultError::OpenFailed("nonce length mismatch".to_string()));
        }

        let mut combined = Vec::with_capacity(ciphertext.len() + tag.len());
        combined.extend_from_slice(&ciphertext);
        combined.extend_from_slice(&tag);

        let cipher = ChaCha20Poly1305::new(&self.key);
        cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), combined.as_ref())
            .map_err(|e| VaultError::OpenFailed(format!("{e}")))
    }
}

impl fmt::Debug for SecretVault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretVault(<redacted>)")
    }
}

impl Drop for SecretVault {
    fn drop(&mut self) {
        self.key.as_mut_slice().zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::{SealedBlob, SecretVault, NONCE_SIZE};
    use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine};

    #[test]
    fn seals_and_opens_with_the_same_key() {
        let vault = SecretVault::ephemeral();
        let sealed = vault.seal(b"alice->bob").expect("sealing should succeed");
        assert_ne!(sealed.ciphertext, STANDARD_NO_PAD.encode(b"alice->bob"));
        let nonce = STANDARD_NO_PAD.decode(sealed.nonce.as_bytes()).unwrap();
        assert_eq!(nonce.len(), NONCE_SIZE);
        let opened = vault.open(&sealed).expect("opening should succeed");
        assert_eq!(opened, b"alice->bob");
    }

    #[test]
    fn ephemeral_vaults_do_not_share_keys() {
        let first = SecretVault::ephemeral();
        let second = SecretVault::ephemeral();
        let sealed = first.seal(b"payload").expect("sealing should work");
        assert!(second.open(&sealed).is_err());
        assert_eq!(first.open(&sealed).expect("same vault opens"), b"payload");
    }

    #[test]
    fn rejects_short_nonces() {
        let vault = SecretVault::ephemeral();
        let mut sealed = vault.seal(b"payload").expect("sealing should work");
        sealed.nonce = STANDARD_NO_PAD.encode([0u8; 8]);
        let err = vault.open(&sealed).unwrap_err();
        assert!(format!("{err}").contains("nonce length mismatch"));
    }

    #[test]
    fn rejects_tampered_blobs() {
        let vault = SecretVault::ephemeral();
        let bogus = SealedBlob {
            nonce: STANDARD_NO_PAD.encode([0u8; 12]),
            ciphertext: STANDARD_NO_PAD.encode([0u8; 5]),
            tag: STANDARD_NO_PAD.encode([0u8; 16]),
        };
        let err = vault.open(&bogus).unwrap_err();
        assert!(format!("{err}").contains("opening failed"));
    }

    #[test]
    fn debug_output_hides_the_key() {
        let rendered = format!("{:?}", SecretVault::ephemeral());
        assert_eq!(rendered, "SecretVault(<redacted>)");
    }
}
