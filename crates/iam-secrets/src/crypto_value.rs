//! Algorithm-tagged, key-addressed ciphertext.

use serde::{Deserialize, Serialize};

use crate::{EncryptionAlgorithm, Result, SecretsError};

/// Persisted form of any secret: `{algorithm, keyID, ciphertext}`.
///
/// Never carries plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoValue {
    pub algorithm: String,
    #[serde(rename = "keyID")]
    pub key_id: String,
    #[serde(with = "base64_bytes")]
    pub ciphertext: Vec<u8>,
}

/// Encrypt bytes with the algorithm's active key.
pub fn encrypt(value: &[u8], alg: &dyn EncryptionAlgorithm) -> Result<CryptoValue> {
    let key_id = alg.encryption_key_id();
    let ciphertext = alg.encrypt(value)?;
    Ok(CryptoValue {
        algorithm: alg.algorithm().to_string(),
        key_id,
        ciphertext,
    })
}

pub fn encrypt_string(value: &str, alg: &dyn EncryptionAlgorithm) -> Result<CryptoValue> {
    encrypt(value.as_bytes(), alg)
}

/// Decrypt a [`CryptoValue`] with the key it names.
pub fn decrypt(value: &CryptoValue, alg: &dyn EncryptionAlgorithm) -> Result<Vec<u8>> {
    if value.algorithm != alg.algorithm() {
        return Err(SecretsError::UnsupportedAlgorithm {
            expected: alg.algorithm().to_string(),
            found: value.algorithm.clone(),
        });
    }
    alg.decrypt(&value.ciphertext, &value.key_id)
}

pub fn decrypt_string(value: &CryptoValue, alg: &dyn EncryptionAlgorithm) -> Result<String> {
    let bytes = decrypt(value, alg)?;
    String::from_utf8(bytes)
        .map_err(|_| SecretsError::EncryptionError("decrypted value is not valid UTF-8".to_string()))
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
