//! Federation flow facade.
//!
//! Ties intent creation, authorization URL construction and the token check
//! together for the layer that talks to browsers and identity providers.

use std::sync::Arc;

use iam_secrets::decrypt_string;
use secrecy::SecretString;
use serde_json::Value;
use tracing::info;

use super::intent_token::{check_intent_token, issue_intent_token};
use crate::domain::{ExecutionContext, IntentState, ObjectDetails};
use crate::error::{PlatformError, Result};
use crate::operations::intent::validate_redirect_url;
use crate::operations::{require, Commands};

/// Outcome of [`FederationService::start_identity_provider_flow`].
#[derive(Debug, Clone)]
pub struct StartedFlow {
    pub intent_id: String,
    /// Where to send the browser
    pub auth_url: String,
    pub details: ObjectDetails,
}

/// What the provider reported for a succeeded intent.
#[derive(Debug)]
pub struct IdpInformation {
    pub access_token: SecretString,
    pub id_token: Option<String>,
    pub user_payload: Value,
    pub idp_user_id: Option<String>,
    pub details: ObjectDetails,
}

#[derive(Clone)]
pub struct FederationService {
    commands: Arc<Commands>,
}

impl FederationService {
    pub fn new(commands: Arc<Commands>) -> Self {
        Self { commands }
    }

    pub fn commands(&self) -> &Commands {
        &self.commands
    }

    /// Token the initiating party presents to read the intent's result.
    pub fn issue_token(&self, intent_id: &str) -> Result<String> {
        issue_intent_token(intent_id, self.commands.encryption())
    }

    /// Create an intent and build the URL that starts the provider's flow.
    pub async fn start_identity_provider_flow(
        &self,
        ctx: &ExecutionContext,
        resource_owner: &str,
        idp_id: &str,
        success_url: &str,
        failure_url: &str,
        callback_url: &str,
    ) -> Result<StartedFlow> {
        validate_redirect_url(callback_url, "callback url")?;
        let (intent_id, details) = self
            .commands
            .create_intent(ctx, resource_owner, idp_id, success_url, failure_url)
            .await?;
        let auth_url = self
            .commands
            .auth_url_from_provider(resource_owner, idp_id, &intent_id, callback_url)
            .await?;

        info!(
            intent_id = %intent_id,
            idp_id,
            resource_owner,
            correlation_id = %ctx.correlation_id,
            "Identity provider flow started"
        );
        Ok(StartedFlow {
            intent_id,
            auth_url,
            details,
        })
    }

    /// Disclose the result of a succeeded intent to the holder of its token.
    ///
    /// Can be called any number of times.
    pub async fn retrieve_information(
        &self,
        resource_owner: &str,
        intent_id: &str,
        token: &str,
    ) -> Result<IdpInformation> {
        require(resource_owner, "resource owner")?;
        require(intent_id, "intent id")?;
        check_intent_token(token, intent_id, self.commands.encryption())?;

        let intent = self.commands.intent(resource_owner, intent_id).await?;
        match intent.state.state {
            IntentState::Succeeded => {}
            IntentState::Unspecified => {
                return Err(PlatformError::not_found("Errors.Intent.NotFound", "intent", intent_id))
            }
            IntentState::Started | IntentState::Failed => {
                return Err(PlatformError::precondition_failed(
                    "Errors.Intent.NotSucceeded",
                    format!("intent {} has not succeeded", intent_id),
                ))
            }
        }

        let details = ObjectDetails::from_write_model(&intent)
            .ok_or_else(|| PlatformError::internal("succeeded intent without events"))?;
        let sealed = intent
            .state
            .access_token
            .as_ref()
            .ok_or_else(|| PlatformError::internal("succeeded intent without access token"))?;
        let access_token = SecretString::new(decrypt_string(sealed, self.commands.encryption())?);

        info!(intent_id, resource_owner, "Intent information retrieved");
        Ok(IdpInformation {
            access_token,
            id_token: intent.state.id_token.clone(),
            user_payload: intent.state.user_payload.clone().unwrap_or(Value::Null),
            idp_user_id: intent.state.idp_user_id.clone(),
            details,
        })
    }
}
