//! AES-256-GCM keyring.
//!
//! Ciphertext layout is `nonce (12 bytes) || ciphertext || tag (16 bytes)`
//! with a fresh random nonce per encryption.

use std::collections::HashMap;
use std::fmt;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use parking_lot::RwLock;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::{EncryptionAlgorithm, Result, SecretsError};

pub const AES_GCM_ALGORITHM: &str = "aes-256-gcm";

const NONCE_SIZE: usize = 12;
const KEY_SIZE: usize = 32;
const TAG_SIZE: usize = 16;

/// 256-bit key material.
#[derive(Clone)]
pub struct AesGcmKey([u8; KEY_SIZE]);

impl AesGcmKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let key: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| {
            SecretsError::InvalidKey(format!("expected {} bytes, got {}", KEY_SIZE, bytes.len()))
        })?;
        Ok(Self(key))
    }

    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| SecretsError::InvalidKey(format!("base64 decode failed: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    /// Derive a key from a passphrase with SHA-256. Intended for local development.
    pub fn from_passphrase(passphrase: &str) -> Self {
        let digest = Sha256::digest(passphrase.as_bytes());
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(&digest);
        Self(key)
    }

    fn cipher(&self) -> Result<Aes256Gcm> {
        Aes256Gcm::new_from_slice(&self.0)
            .map_err(|e| SecretsError::InvalidKey(format!("key init failed: {}", e)))
    }
}

impl fmt::Debug for AesGcmKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AesGcmKey(..)")
    }
}

struct Keyring {
    active: String,
    ciphers: HashMap<String, Aes256Gcm>,
}

/// AES-256-GCM over a set of keys, one of which is active.
///
/// Keys are only ever added; an id once registered always maps to the same
/// key material.
pub struct AesGcmAlgorithm {
    keyring: RwLock<Keyring>,
}

impl AesGcmAlgorithm {
    pub fn new(key_id: impl Into<String>, key: AesGcmKey) -> Result<Self> {
        let key_id = key_id.into();
        Self::with_keys(vec![(key_id.clone(), key)], &key_id)
    }

    pub fn with_keys(keys: Vec<(String, AesGcmKey)>, active: &str) -> Result<Self> {
        let mut ciphers = HashMap::with_capacity(keys.len());
        for (id, key) in keys {
            if ciphers.contains_key(&id) {
                return Err(SecretsError::DuplicateKey(id));
            }
            ciphers.insert(id, key.cipher()?);
        }
        if !ciphers.contains_key(active) {
            return Err(SecretsError::KeyNotFound(active.to_string()));
        }
        Ok(Self {
            keyring: RwLock::new(Keyring {
                active: active.to_string(),
                ciphers,
            }),
        })
    }

    /// Register an additional key without activating it.
    pub fn add_key(&self, key_id: impl Into<String>, key: AesGcmKey) -> Result<()> {
        let key_id = key_id.into();
        let cipher = key.cipher()?;
        let mut keyring = self.keyring.write();
        if keyring.ciphers.contains_key(&key_id) {
            return Err(SecretsError::DuplicateKey(key_id));
        }
        keyring.ciphers.insert(key_id, cipher);
        Ok(())
    }

    /// Make a registered key the one used for new ciphertexts.
    pub fn activate(&self, key_id: &str) -> Result<()> {
        let mut keyring = self.keyring.write();
        if !keyring.ciphers.contains_key(key_id) {
            return Err(SecretsError::KeyNotFound(key_id.to_string()));
        }
        keyring.active = key_id.to_string();
        Ok(())
    }
}

impl EncryptionAlgorithm for AesGcmAlgorithm {
    fn algorithm(&self) -> &'static str {
        AES_GCM_ALGORITHM
    }

    fn encryption_key_id(&self) -> String {
        self.keyring.read().active.clone()
    }

    fn decryption_key_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.keyring.read().ciphers.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let keyring = self.keyring.read();
        let cipher = keyring
            .ciphers
            .get(&keyring.active)
            .ok_or_else(|| SecretsError::KeyNotFound(keyring.active.clone()))?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|e| SecretsError::EncryptionError(format!("encryption failed: {}", e)))?;

        let mut combined = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&ciphertext);
        Ok(combined)
    }

    fn decrypt(&self, ciphertext: &[u8], key_id: &str) -> Result<Vec<u8>> {
        if ciphertext.len() < NONCE_SIZE + TAG_SIZE {
            return Err(SecretsError::DecryptionFailed);
        }
        let keyring = self.keyring.read();
        let cipher = keyring
            .ciphers
            .get(key_id)
            .ok_or_else(|| SecretsError::KeyNotFound(key_id.to_string()))?;

        let (nonce, body) = ciphertext.split_at(NONCE_SIZE);
        cipher
            .decrypt(Nonce::from_slice(nonce), body)
            .map_err(|_| SecretsError::DecryptionFailed)
    }
}
