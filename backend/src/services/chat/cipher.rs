//! Encryption at rest for chat transcripts
//!
//! Messages, replies and turn summaries are sealed with AES-256-GCM.
//! The stored form is `base64(nonce || ciphertext || tag)`.

use base64::{engine::general_purpose::STANDARD, Engine};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CipherError {
    #[error("Encryption key must be base64 encoded")]
    KeyEncoding,

    #[error("Encryption key must be 32 bytes, got {0}")]
    KeyLength(usize),

    #[error("Failed to generate nonce")]
    Nonce,

    #[error("Ciphertext is malformed")]
    Malformed,

    #[error("Ciphertext failed authentication")]
    Authentication,
}

/// AES-256-GCM sealer shared across handlers
#[derive(Clone)]
pub struct MessageCipher {
    key: Arc<LessSafeKey>,
    rng: SystemRandom,
}

impl std::fmt::Debug for MessageCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageCipher").finish_non_exhaustive()
    }
}

impl MessageCipher {
    /// Build from a base64-encoded 256-bit key
    pub fn from_base64_key(encoded: &str) -> Result<Self, CipherError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|_| CipherError::KeyEncoding)?;
        if bytes.len() != AES_256_GCM.key_len() {
            return Err(CipherError::KeyLength(bytes.len()));
        }
        let unbound =
            UnboundKey::new(&AES_256_GCM, &bytes).map_err(|_| CipherError::KeyLength(bytes.len()))?;

        Ok(Self {
            key: Arc::new(LessSafeKey::new(unbound)),
            rng: SystemRandom::new(),
        })
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| CipherError::Nonce)?;
        let nonce = Nonce::assume_unique_for_key(nonce_bytes);

        let mut in_out = plaintext.as_bytes().to_vec();
        self.key
            .seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| CipherError::Authentication)?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + in_out.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&in_out);
        Ok(STANDARD.encode(sealed))
    }

    pub fn decrypt(&self, encoded: &str) -> Result<String, CipherError> {
        let sealed = STANDARD.decode(encoded).map_err(|_| CipherError::Malformed)?;
        if sealed.len() < NONCE_LEN + AES_256_GCM.tag_len() {
            return Err(CipherError::Malformed);
        }

        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        let nonce =
            Nonce::try_assume_unique_for_key(nonce_bytes).map_err(|_| CipherError::Malformed)?;

        let mut in_out = ciphertext.to_vec();
        let plaintext = self
            .key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| CipherError::Authentication)?;

        String::from_utf8(plaintext.to_vec()).map_err(|_| CipherError::Malformed)
    }

    /// Encrypt, mapping an empty string to itself (pending replies stay empty)
    pub fn encrypt_optional(&self, plaintext: &str) -> Result<String, CipherError> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }
        self.encrypt(plaintext)
    }

    /// Decrypt, mapping an empty string to itself
    pub fn decrypt_optional(&self, encoded: &str) -> Result<String, CipherError> {
        if encoded.is_empty() {
            return Ok(String::new());
        }
        self.decrypt(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEVELOPMENT_ENCRYPTION_KEY;

    fn cipher() -> MessageCipher {
        MessageCipher::from_base64_key(DEVELOPMENT_ENCRYPTION_KEY).unwrap()
    }

    #[test]
    fn test_seal_and_open() {
        let c = cipher();
        let sealed = c.encrypt("Is 37.8 a fever?").unwrap();
        assert_ne!(sealed, "Is 37.8 a fever?");
        assert_eq!(c.decrypt(&sealed).unwrap(), "Is 37.8 a fever?");
    }

    #[test]
    fn test_nonce_differs_per_message() {
        let c = cipher();
        assert_ne!(c.encrypt("same").unwrap(), c.encrypt("same").unwrap());
    }

    #[test]
    fn test_tampered_ciphertext_rejected() {
        let c = cipher();
        let mut raw = STANDARD.decode(c.encrypt("hello").unwrap()).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        let err = c.decrypt(&STANDARD.encode(raw)).unwrap_err();
        assert!(matches!(err, CipherError::Authentication));
    }

    #[test]
    fn test_short_key_rejected() {
        let err = MessageCipher::from_base64_key(&STANDARD.encode([0u8; 16])).unwrap_err();
        assert!(matches!(err, CipherError::KeyLength(16)));
    }

    #[test]
    fn test_empty_reply_stays_empty() {
        let c = cipher();
        assert_eq!(c.encrypt_optional("").unwrap(), "");
        assert_eq!(c.decrypt_optional("").unwrap(), "");
    }
}
