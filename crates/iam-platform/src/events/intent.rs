//! Federation intent events on the `idpintent` aggregate.

use iam_secrets::{encrypt_string, CryptoValue, EncryptionAlgorithm};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::PlatformEvent;
use crate::error::Result;

pub const INTENT_STARTED: &str = "user.idp.intent.started";
pub const INTENT_SUCCEEDED: &str = "user.idp.intent.succeeded";
pub const INTENT_FAILED: &str = "user.idp.intent.failed";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentStarted {
    #[serde(rename = "idpID")]
    pub idp_id: String,
    #[serde(rename = "successURL")]
    pub success_url: String,
    #[serde(rename = "failureURL")]
    pub failure_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentSucceeded {
    #[serde(rename = "idpUserID", default, skip_serializing_if = "Option::is_none")]
    pub idp_user_id: Option<String>,
    #[serde(rename = "idpUser")]
    pub user_payload: Value,
    #[serde(rename = "idpAccessToken")]
    pub access_token: CryptoValue,
    #[serde(rename = "idpIdToken", default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentFailed {
    pub reason: String,
}

pub fn intent_started(idp_id: &str, success_url: &str, failure_url: &str) -> PlatformEvent {
    PlatformEvent::IntentStarted(IntentStarted {
        idp_id: idp_id.to_string(),
        success_url: success_url.to_string(),
        failure_url: failure_url.to_string(),
    })
}

/// Build the success event, encrypting the access token and extracting the
/// provider's user id from `user_payload[id_attribute]`.
pub fn intent_succeeded(
    user_payload: &Value,
    id_attribute: &str,
    access_token: &SecretString,
    id_token: Option<&str>,
    alg: &dyn EncryptionAlgorithm,
) -> Result<PlatformEvent> {
    Ok(PlatformEvent::IntentSucceeded(IntentSucceeded {
        idp_user_id: extract_user_id(user_payload, id_attribute),
        user_payload: user_payload.clone(),
        access_token: encrypt_string(access_token.expose_secret(), alg)?,
        id_token: id_token.filter(|t| !t.is_empty()).map(str::to_string),
    }))
}

pub fn intent_failed(reason: &str) -> PlatformEvent {
    PlatformEvent::IntentFailed(IntentFailed {
        reason: reason.to_string(),
    })
}

fn extract_user_id(payload: &Value, id_attribute: &str) -> Option<String> {
    match payload.get(id_attribute)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
