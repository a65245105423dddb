//! Identity Kernel Secrets
//!
//! Key-addressed symmetric encryption used for every secret the kernel persists:
//! - IDP client secrets and LDAP bind passwords
//! - Federation access tokens returned by providers
//! - Intent tokens handed to the initiating party
//!
//! Ciphertexts are wrapped in a [`CryptoValue`] that records the algorithm and
//! the key id, so data written under an older key stays readable after rotation.

use std::sync::Arc;
use thiserror::Error;
use tracing::info;

mod aes;
mod crypto_value;

pub use aes::{AesGcmAlgorithm, AesGcmKey, AES_GCM_ALGORITHM};
pub use crypto_value::{decrypt, decrypt_string, encrypt, encrypt_string, CryptoValue};

#[derive(Error, Debug)]
pub enum SecretsError {
    #[error("Encryption key not found: {0}")]
    KeyNotFound(String),
    #[error("Encryption key already registered: {0}")]
    DuplicateKey(String),
    #[error("Invalid key format: {0}")]
    InvalidKey(String),
    #[error("Unsupported algorithm: expected {expected}, found {found}")]
    UnsupportedAlgorithm { expected: String, found: String },
    #[error("Encryption error: {0}")]
    EncryptionError(String),
    #[error("Decryption failed: ciphertext is malformed or was tampered with")]
    DecryptionFailed,
    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, SecretsError>;

/// A symmetric cipher addressed by key id.
///
/// Implementations are pure and in-memory; encrypting and decrypting never
/// block on I/O.
pub trait EncryptionAlgorithm: Send + Sync {
    /// Algorithm identifier recorded in every [`CryptoValue`].
    fn algorithm(&self) -> &'static str;

    /// Id of the key new ciphertexts are produced with.
    fn encryption_key_id(&self) -> String;

    /// Ids of every key that can still decrypt.
    fn decryption_key_ids(&self) -> Vec<String>;

    /// Encrypt with the active key.
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Decrypt with the key registered under `key_id`.
    fn decrypt(&self, ciphertext: &[u8], key_id: &str) -> Result<Vec<u8>>;
}

/// One configured key.
#[derive(Debug, Clone)]
pub struct KeyConfig {
    pub id: String,
    /// Standard base64 encoding of exactly 32 key bytes
    pub value: String,
}

/// Configuration for the encryption service
#[derive(Debug, Clone, Default)]
pub struct SecretsConfig {
    pub keys: Vec<KeyConfig>,
    /// Key used for new ciphertexts; defaults to the last configured key
    pub active_key_id: Option<String>,
}

impl SecretsConfig {
    /// Load from `IAM_ENCRYPTION_KEYS` (`id=base64,id=base64`) and
    /// `IAM_ENCRYPTION_KEY_ID`.
    pub fn from_env() -> Result<Self> {
        let raw = std::env::var("IAM_ENCRYPTION_KEYS").unwrap_or_default();
        let keys = Self::parse_keys(&raw)?;
        let active_key_id = std::env::var("IAM_ENCRYPTION_KEY_ID")
            .ok()
            .filter(|s| !s.trim().is_empty());
        Ok(Self { keys, active_key_id })
    }

    pub fn parse_keys(raw: &str) -> Result<Vec<KeyConfig>> {
        raw.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                let (id, value) = entry.split_once('=').ok_or_else(|| {
                    SecretsError::Configuration(
                        "key entries must have the form id=base64".to_string(),
                    )
                })?;
                if id.trim().is_empty() {
                    return Err(SecretsError::Configuration("key id must not be empty".to_string()));
                }
                Ok(KeyConfig {
                    id: id.trim().to_string(),
                    value: value.trim().to_string(),
                })
            })
            .collect()
    }

    pub fn with_key(mut self, id: impl Into<String>, value: impl Into<String>) -> Self {
        self.keys.push(KeyConfig {
            id: id.into(),
            value: value.into(),
        });
        self
    }

    pub fn with_active_key(mut self, id: impl Into<String>) -> Self {
        self.active_key_id = Some(id.into());
        self
    }
}

/// Build the encryption service from configuration.
pub fn create_algorithm(config: &SecretsConfig) -> Result<Arc<dyn EncryptionAlgorithm>> {
    let active = config
        .active_key_id
        .clone()
        .or_else(|| config.keys.last().map(|k| k.id.clone()))
        .ok_or_else(|| SecretsError::Configuration("at least one encryption key is required".to_string()))?;

    let mut keys = Vec::with_capacity(config.keys.len());
    for key in &config.keys {
        keys.push((key.id.clone(), AesGcmKey::from_base64(&key.value)?));
    }

    let algorithm = AesGcmAlgorithm::with_keys(keys, &active)?;
    info!(
        algorithm = AES_GCM_ALGORITHM,
        active_key_id = %active,
        key_count = config.keys.len(),
        "Encryption service initialised"
    );
    Ok(Arc::new(algorithm))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD, Engine as _};

    fn key_b64(byte: u8) -> String {
        STANDARD.encode([byte; 32])
    }

    #[test]
    fn test_parse_keys() {
        let raw = format!(" k1={} , k2={} ,", key_b64(1), key_b64(2));
        let keys = SecretsConfig::parse_keys(&raw).unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].id, "k1");
        assert_eq!(keys[1].id, "k2");
    }

    #[test]
    fn test_parse_keys_rejects_missing_separator() {
        assert!(SecretsConfig::parse_keys("just-a-key").is_err());
        assert!(SecretsConfig::parse_keys("=abc").is_err());
    }

    #[test]
    fn test_create_algorithm_defaults_to_last_key() {
        let config = SecretsConfig::default()
            .with_key("k1", key_b64(1))
            .with_key("k2", key_b64(2));
        let alg = create_algorithm(&config).unwrap();
        assert_eq!(alg.encryption_key_id(), "k2");
        assert_eq!(alg.decryption_key_ids().len(), 2);
    }

    #[test]
    fn test_create_algorithm_explicit_active_key() {
        let config = SecretsConfig::default()
            .with_key("k1", key_b64(1))
            .with_key("k2", key_b64(2))
            .with_active_key("k1");
        let alg = create_algorithm(&config).unwrap();
        assert_eq!(alg.encryption_key_id(), "k1");
    }

    #[test]
    fn test_create_algorithm_requires_keys() {
        let err = create_algorithm(&SecretsConfig::default()).err().unwrap();
        assert!(matches!(err, SecretsError::Configuration(_)));
    }

    #[test]
    fn test_create_algorithm_unknown_active_key() {
        let config = SecretsConfig::default()
            .with_key("k1", key_b64(1))
            .with_active_key("missing");
        let err = create_algorithm(&config).err().unwrap();
        assert!(matches!(err, SecretsError::KeyNotFound(_)));
    }
}
