//! Federation intent commands.
//!
//! An intent is started against an active provider of the resource owner and
//! completed exactly once, by success or failure, when the provider calls
//! back.

use std::sync::OnceLock;

use regex::Regex;
use secrecy::SecretString;
use serde_json::Value;
use tracing::info;

use super::{require, Commands};
use crate::domain::{ExecutionContext, IntentState, ObjectDetails, DEFAULT_ID_ATTRIBUTE};
use crate::error::{PlatformError, Result};
use crate::events::{intent_aggregate, intent_failed, intent_started, intent_succeeded};
use crate::write_model::IntentWriteModel;

/// Result delivered by the provider callback.
#[derive(Debug)]
pub struct SucceedIntent {
    pub access_token: SecretString,
    pub id_token: Option<String>,
    pub user_payload: Value,
}

const ABSOLUTE_URL: &str = r"^https?://[^\s/?#]+(?:[/?#]\S*)?$";

pub(crate) fn validate_redirect_url(url: &str, field: &'static str) -> Result<()> {
    static PATTERN: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| Regex::new(ABSOLUTE_URL))
        .as_ref()
        .map_err(|e| PlatformError::internal(format!("url pattern: {}", e)))?;
    if pattern.is_match(url) {
        Ok(())
    } else {
        Err(PlatformError::invalid_argument(
            "Errors.Intent.InvalidURL",
            format!("{} must be an absolute http(s) URL", field),
        ))
    }
}

/// Require the intent to exist and still be `Started`.
fn require_started(model: &IntentWriteModel, intent_id: &str) -> Result<()> {
    match model.state.state {
        IntentState::Unspecified => Err(PlatformError::not_found("Errors.Intent.NotFound", "intent", intent_id)),
        IntentState::Started => Ok(()),
        IntentState::Succeeded | IntentState::Failed => Err(PlatformError::precondition_failed(
            "Errors.Intent.NotStarted",
            format!("intent {} is already completed", intent_id),
        )),
    }
}

impl Commands {
    /// Start a federation attempt against `idp_id`, returning the new intent id.
    pub async fn create_intent(
        &self,
        ctx: &ExecutionContext,
        resource_owner: &str,
        idp_id: &str,
        success_url: &str,
        failure_url: &str,
    ) -> Result<(String, ObjectDetails)> {
        require(resource_owner, "resource owner")?;
        require(idp_id, "idp id")?;
        validate_redirect_url(success_url, "success url")?;
        validate_redirect_url(failure_url, "failure url")?;

        let (intent_id, details) = self
            .with_retry("create_intent", || async move {
                let idps = self.org_idps(resource_owner).await?;
                if idps.state.active(idp_id).is_none() {
                    return Err(PlatformError::not_found(
                        "Errors.IDP.NotFound",
                        "identity provider",
                        idp_id,
                    ));
                }
                let intent_id = self.next_id();
                let aggregate = intent_aggregate(&intent_id, resource_owner);
                let details = self
                    .push(ctx, &aggregate, 0, &[intent_started(idp_id, success_url, failure_url)])
                    .await?;
                Ok((intent_id, details))
            })
            .await?;

        info!(
            intent_id = %intent_id,
            idp_id,
            resource_owner,
            correlation_id = %ctx.correlation_id,
            "Intent started"
        );
        Ok((intent_id, details))
    }

    /// Record the provider's successful answer for a started intent.
    pub async fn succeed_intent(
        &self,
        ctx: &ExecutionContext,
        resource_owner: &str,
        intent_id: &str,
        result: &SucceedIntent,
    ) -> Result<ObjectDetails> {
        require(resource_owner, "resource owner")?;
        require(intent_id, "intent id")?;

        let details = self
            .with_retry("succeed_intent", || async move {
                let intent = self.intent(resource_owner, intent_id).await?;
                require_started(&intent, intent_id)?;

                let idps = self.org_idps(resource_owner).await?;
                let id_attribute = idps
                    .state
                    .get(&intent.state.idp_id)
                    .map(|e| e.provider.id_attribute())
                    .unwrap_or(DEFAULT_ID_ATTRIBUTE);

                let event = intent_succeeded(
                    &result.user_payload,
                    id_attribute,
                    &result.access_token,
                    result.id_token.as_deref(),
                    self.encryption(),
                )?;
                self.push(ctx, &intent.aggregate, intent.processed_sequence, &[event])
                    .await
            })
            .await?;

        info!(
            intent_id,
            resource_owner,
            sequence = details.sequence,
            correlation_id = %ctx.correlation_id,
            "Intent succeeded"
        );
        Ok(details)
    }

    /// Record that the provider flow failed.
    pub async fn fail_intent(
        &self,
        ctx: &ExecutionContext,
        resource_owner: &str,
        intent_id: &str,
        reason: &str,
    ) -> Result<ObjectDetails> {
        require(resource_owner, "resource owner")?;
        require(intent_id, "intent id")?;

        let details = self
            .with_retry("fail_intent", || async move {
                let intent = self.intent(resource_owner, intent_id).await?;
                require_started(&intent, intent_id)?;
                self.push(ctx, &intent.aggregate, intent.processed_sequence, &[intent_failed(reason)])
                    .await
            })
            .await?;

        info!(
            intent_id,
            resource_owner,
            sequence = details.sequence,
            correlation_id = %ctx.correlation_id,
            "Intent failed"
        );
        Ok(details)
    }
}
