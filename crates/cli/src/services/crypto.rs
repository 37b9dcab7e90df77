// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Encryption of queued mutations at rest.
//!
//! Ciphertext is `base64(nonce || ChaCha20-Poly1305(plaintext))` with a fresh
//! 12-byte nonce per call.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use sha2::{Digest, Sha256};

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

/// Error type for cipher operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    /// No key is configured.
    #[error("encryption is unavailable: no queue key configured")]
    Unavailable,

    #[error("encryption failed")]
    Encrypt,

    /// Input is not base64 or is shorter than a nonce.
    #[error("ciphertext is malformed")]
    Malformed,

    /// Wrong key or tampered data.
    #[error("ciphertext failed authentication")]
    Authentication,

    #[error("invalid key: {0}")]
    InvalidKey(String),
}

/// Symmetric string cipher.
pub trait Cipher: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError>;
    fn decrypt(&self, ciphertext: &str) -> Result<String, CryptoError>;
}

/// ChaCha20-Poly1305 cipher over a 256-bit key.
pub struct ChaChaCipher {
    cipher: ChaCha20Poly1305,
    fingerprint: String,
}

impl ChaChaCipher {
    pub fn from_key(key: &[u8; KEY_LEN]) -> Self {
        let digest = Sha256::digest(key);
        ChaChaCipher {
            cipher: ChaCha20Poly1305::new(Key::from_slice(key)),
            fingerprint: hex::encode(&digest[..4]),
        }
    }

    /// Parses a 64-character hex key, ignoring surrounding whitespace.
    pub fn from_hex(key: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(key.trim()).map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let key: [u8; KEY_LEN] = bytes.try_into().map_err(|b: Vec<u8>| {
            CryptoError::InvalidKey(format!("expected {KEY_LEN} bytes, got {}", b.len()))
        })?;
        Ok(Self::from_key(&key))
    }

    /// Generates a fresh random key, hex-encoded.
    pub fn generate_key_hex() -> String {
        hex::encode(ChaCha20Poly1305::generate_key(&mut OsRng))
    }

    /// Short non-secret identifier of the key (first 4 bytes of its SHA-256).
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

impl Cipher for ChaChaCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::Encrypt)?;

        let mut blob = nonce.to_vec();
        blob.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(blob))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, CryptoError> {
        let blob = STANDARD
            .decode(ciphertext.trim())
            .map_err(|_| CryptoError::Malformed)?;
        if blob.len() < NONCE_LEN {
            return Err(CryptoError::Malformed);
        }

        let (nonce, sealed) = blob.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| CryptoError::Authentication)?;
        String::from_utf8(plaintext).map_err(|_| CryptoError::Malformed)
    }
}

/// Cipher used when no key is configured. Every call fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledCipher;

impl Cipher for DisabledCipher {
    fn encrypt(&self, _plaintext: &str) -> Result<String, CryptoError> {
        Err(CryptoError::Unavailable)
    }

    fn decrypt(&self, _ciphertext: &str) -> Result<String, CryptoError> {
        Err(CryptoError::Unavailable)
    }
}

#[cfg(test)]
#[path = "crypto_tests.rs"]
mod tests;
