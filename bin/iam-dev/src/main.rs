//! Identity Kernel Development Runner
//!
//! Runs one complete federation round trip against the in-memory event store:
//! - registers a Google provider for the organisation
//! - starts an identity provider flow and prints the authorization URL
//! - completes the intent with a simulated provider answer
//! - retrieves the result with the intent token
//! - creates a human user linked to the provider account

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::{info, warn};

use iam_common::{init_tracing, TsidGenerator};
use iam_eventstore::MemoryEventStore;
use iam_platform::domain::{GoogleConfig, IdpLink, IdpOptions, ProviderConfig};
use iam_platform::operations::{AddIdp, SucceedIntent};
use iam_platform::service::{AddUserRequest, EmailVerification, ProfileRequest};
use iam_platform::{registry, Commands, ExecutionContext, FederationService, PlatformConfig, UserService};
use iam_secrets::{create_algorithm, AesGcmAlgorithm, AesGcmKey, EncryptionAlgorithm, SecretsConfig};

/// Identity Kernel Development Runner
#[derive(Parser, Debug)]
#[command(name = "iam-dev")]
#[command(about = "Federation walkthrough on the in-memory event store")]
struct Args {
    /// Organisation owning every aggregate created by the walkthrough
    #[arg(long, env = "IAM_DEV_ORG", default_value = "org-1")]
    org: String,

    /// Principal recorded as editor of every event
    #[arg(long, env = "IAM_DEV_PRINCIPAL", default_value = "dev-admin")]
    principal: String,

    /// Callback URL handed to the provider
    #[arg(long, env = "IAM_DEV_CALLBACK_URL", default_value = "http://localhost:8080/idps/callback")]
    callback_url: String,

    /// Google OAuth client id
    #[arg(long, env = "IAM_DEV_GOOGLE_CLIENT_ID", default_value = "dev-client.apps.googleusercontent.com")]
    google_client_id: String,

    /// Google OAuth client secret
    #[arg(long, env = "IAM_DEV_GOOGLE_CLIENT_SECRET", default_value = "dev-client-secret", hide_env_values = true)]
    google_client_secret: String,

    /// Passphrase for the development key, used when IAM_ENCRYPTION_KEYS is unset
    #[arg(long, env = "IAM_DEV_PASSPHRASE", default_value = "iam-dev", hide_env_values = true)]
    passphrase: String,

    /// Overrides IAM_MAX_RETRIES
    #[arg(long)]
    max_retries: Option<u32>,

    /// Overrides IAM_STORE_TIMEOUT_MS
    #[arg(long)]
    store_timeout_ms: Option<u64>,
}

fn encryption(args: &Args) -> Result<Arc<dyn EncryptionAlgorithm>> {
    let config = SecretsConfig::from_env().context("reading encryption key configuration")?;
    if !config.keys.is_empty() {
        return create_algorithm(&config).context("building encryption service");
    }
    warn!("IAM_ENCRYPTION_KEYS not set, deriving a development key from the passphrase");
    let algorithm = AesGcmAlgorithm::new("dev", AesGcmKey::from_passphrase(&args.passphrase))?;
    Ok(Arc::new(algorithm))
}

fn platform_config(args: &Args) -> Result<PlatformConfig> {
    let mut config = PlatformConfig::from_env()?;
    if let Some(max_retries) = args.max_retries {
        config = config.with_max_retries(max_retries);
    }
    if let Some(millis) = args.store_timeout_ms {
        config = config.with_store_timeout(Duration::from_millis(millis));
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    info!(org = %args.org, "Starting Identity Kernel dev runner");

    let store = MemoryEventStore::new();
    let commands = Arc::new(Commands::new(
        Arc::new(store.clone()),
        Arc::new(registry()),
        encryption(&args)?,
        Arc::new(TsidGenerator),
        platform_config(&args)?,
    ));
    let federation = FederationService::new(commands.clone());
    let users = UserService::new(commands.clone());

    let ctx = ExecutionContext::new(args.principal.as_str()).with_correlation_id(uuid::Uuid::new_v4().to_string());
    let org = args.org.as_str();

    // 1. Provider
    let idp_id = commands
        .add_idp(
            &ctx,
            org,
            &AddIdp {
                idp_id: None,
                name: "Google".to_string(),
                options: IdpOptions {
                    is_creation_allowed: true,
                    is_linking_allowed: true,
                    ..Default::default()
                },
                provider: ProviderConfig::Google(GoogleConfig {
                    client_id: args.google_client_id.clone(),
                    client_secret: SecretString::new(args.google_client_secret.clone()),
                    scopes: Vec::new(),
                }),
            },
        )
        .await?;

    // 2. Flow start
    let flow = federation
        .start_identity_provider_flow(
            &ctx,
            org,
            &idp_id,
            "http://localhost:3000/login/success",
            "http://localhost:3000/login/failure",
            &args.callback_url,
        )
        .await?;
    let token = federation.issue_token(&flow.intent_id)?;
    info!(intent_id = %flow.intent_id, auth_url = %flow.auth_url, "Redirect the browser to the authorization URL");

    // 3. Simulated provider callback
    commands
        .succeed_intent(
            &ctx,
            org,
            &flow.intent_id,
            &SucceedIntent {
                access_token: SecretString::new("ya29.dev-access-token".to_string()),
                id_token: None,
                user_payload: json!({
                    "sub": "108234567890",
                    "email": "ada@example.com",
                    "email_verified": true,
                    "given_name": "Ada",
                    "family_name": "Lovelace",
                }),
            },
        )
        .await?;

    // 4. Result retrieval
    let information = federation
        .retrieve_information(org, &flow.intent_id, &token)
        .await?;
    let external_id = information
        .idp_user_id
        .clone()
        .context("provider answer carried no user id")?;
    info!(
        intent_id = %flow.intent_id,
        idp_user_id = %external_id,
        access_token_len = information.access_token.expose_secret().len(),
        sequence = information.details.sequence,
        "Provider information retrieved"
    );

    // 5. Linked user
    let (user_id, details) = users
        .add_human_user(
            &ctx,
            org,
            &AddUserRequest {
                profile: ProfileRequest {
                    first_name: "Ada".to_string(),
                    last_name: "Lovelace".to_string(),
                    ..Default::default()
                },
                email: "ada@example.com".to_string(),
                email_verification: EmailVerification::IsVerified,
                idp_links: vec![IdpLink {
                    idp_id: idp_id.clone(),
                    external_user_id: external_id,
                    display_name: "ada@example.com".to_string(),
                }],
                ..Default::default()
            },
        )
        .await?;

    info!(
        user_id = %user_id,
        sequence = details.sequence,
        streams = store.stream_count(),
        "Walkthrough complete"
    );
    Ok(())
}
