//! Intent tokens.
//!
//! The token handed to the party that started an intent is the intent id
//! encrypted with the active key and rendered as URL-safe base64 without
//! padding. Presenting it proves the holder started the flow.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use iam_secrets::EncryptionAlgorithm;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::error::{PlatformError, Result};

const INVALID_TOKEN: &str = "Errors.Intent.InvalidToken";

pub fn issue_intent_token(intent_id: &str, alg: &dyn EncryptionAlgorithm) -> Result<String> {
    let ciphertext = alg.encrypt(intent_id.as_bytes())?;
    Ok(URL_SAFE_NO_PAD.encode(ciphertext))
}

/// Check that `token` was issued for `intent_id` under the current key.
///
/// Every failure is reported as the same `PermissionDenied`.
pub fn check_intent_token(token: &str, intent_id: &str, alg: &dyn EncryptionAlgorithm) -> Result<()> {
    let denied = || PlatformError::permission_denied(INVALID_TOKEN);

    if token.is_empty() {
        return Err(denied());
    }
    let ciphertext = URL_SAFE_NO_PAD.decode(token).map_err(|_| denied())?;
    let plaintext = alg
        .decrypt(&ciphertext, &alg.encryption_key_id())
        .map_err(|e| {
            debug!(error = %e, "Intent token did not decrypt");
            denied()
        })?;

    if bool::from(plaintext.as_slice().ct_eq(intent_id.as_bytes())) {
        Ok(())
    } else {
        Err(denied())
    }
}
