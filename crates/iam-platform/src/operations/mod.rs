//! Operations Module
//!
//! Commands validate input against a freshly loaded write model, turn it into
//! events and append them with the model's sequence as the expected sequence.
//!
//! # Architecture
//!
//! - Every store call is bounded by [`PlatformConfig::store_timeout`]
//! - A sequence conflict re-runs the whole command, at most
//!   [`PlatformConfig::max_retries`] extra times
//! - The resource owner is always an explicit argument
//!
//! # Example
//!
//! ```ignore
//! let commands = Commands::new(store, Arc::new(registry()), encryption, ids, PlatformConfig::default());
//! let ctx = ExecutionContext::new("admin");
//! let idp_id = commands.add_idp(&ctx, "org-1", &add_google).await?;
//! let (intent_id, _) = commands
//!     .create_intent(&ctx, "org-1", &idp_id, "https://app/ok", "https://app/fail")
//!     .await?;
//! ```

pub mod auth_url;
pub mod idp;
pub mod intent;
pub mod user;

pub use auth_url::build_auth_url;
pub use idp::{AddIdp, IdpChanges};
pub use intent::SucceedIntent;
pub use user::{AddHuman, AddLink};

use std::future::Future;
use std::sync::Arc;

use iam_common::IdGenerator;
use iam_eventstore::{Aggregate, EventRegistry, EventStore, Reducer, StoredEvent, WriteModel};
use iam_secrets::EncryptionAlgorithm;
use tracing::{debug, warn};

use crate::config::PlatformConfig;
use crate::domain::{ExecutionContext, ObjectDetails};
use crate::error::{PlatformError, Result};
use crate::events::PlatformEvent;
use crate::write_model::{IntentReducer, IntentWriteModel, OrgIdpsReducer, OrgIdpsWriteModel};

/// Entry point for every state-changing operation of the kernel.
pub struct Commands {
    store: Arc<dyn EventStore>,
    registry: Arc<EventRegistry<PlatformEvent>>,
    encryption: Arc<dyn EncryptionAlgorithm>,
    ids: Arc<dyn IdGenerator>,
    config: PlatformConfig,
}

impl Commands {
    pub fn new(
        store: Arc<dyn EventStore>,
        registry: Arc<EventRegistry<PlatformEvent>>,
        encryption: Arc<dyn EncryptionAlgorithm>,
        ids: Arc<dyn IdGenerator>,
        config: PlatformConfig,
    ) -> Self {
        Self {
            store,
            registry,
            encryption,
            ids,
            config,
        }
    }

    pub fn encryption(&self) -> &dyn EncryptionAlgorithm {
        self.encryption.as_ref()
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    pub(crate) fn next_id(&self) -> String {
        self.ids.next_id()
    }

    /// Fold all events committed after the model's processed sequence.
    pub async fn load<R>(&self, model: WriteModel<R>) -> Result<WriteModel<R>>
    where
        R: Reducer<Event = PlatformEvent>,
    {
        let timeout = self.config.store_timeout;
        tokio::time::timeout(timeout, model.load(self.store.as_ref(), &self.registry))
            .await
            .map_err(|_| PlatformError::deadline_exceeded("load", timeout))?
            .map_err(PlatformError::from)
    }

    pub async fn org_idps(&self, resource_owner: &str) -> Result<OrgIdpsWriteModel> {
        self.load(OrgIdpsReducer::write_model(resource_owner)).await
    }

    pub async fn intent(&self, resource_owner: &str, intent_id: &str) -> Result<IntentWriteModel> {
        self.load(IntentReducer::write_model(intent_id, resource_owner)).await
    }

    /// Append `events` at `expected_sequence`, returning details of the last
    /// committed event.
    pub(crate) async fn push(
        &self,
        ctx: &ExecutionContext,
        aggregate: &Aggregate,
        expected_sequence: u64,
        events: &[PlatformEvent],
    ) -> Result<ObjectDetails> {
        let pending = events
            .iter()
            .map(|e| e.to_pending(&ctx.principal_id))
            .collect::<Result<Vec<_>>>()?;

        let timeout = self.config.store_timeout;
        let committed: Vec<StoredEvent> =
            tokio::time::timeout(timeout, self.store.push(aggregate, expected_sequence, pending))
                .await
                .map_err(|_| PlatformError::deadline_exceeded("push", timeout))??;

        debug!(
            aggregate = %aggregate,
            correlation_id = %ctx.correlation_id,
            count = committed.len(),
            "Events committed"
        );
        committed
            .last()
            .map(ObjectDetails::from_event)
            .ok_or_else(|| PlatformError::internal("push committed no events"))
    }

    /// Run `attempt` until it succeeds, fails with anything other than a
    /// sequence conflict, or the retry budget is spent.
    pub(crate) async fn with_retry<T, F, Fut>(&self, operation: &'static str, mut attempt: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut retries = 0;
        loop {
            match attempt().await {
                Err(err) if err.is_conflict() && retries < self.config.max_retries => {
                    retries += 1;
                    warn!(operation, retry = retries, error = %err, "Sequence conflict, retrying");
                }
                Err(err) if err.is_conflict() => {
                    warn!(operation, retries, "Sequence conflict, retries exhausted");
                    return Err(err);
                }
                other => return other,
            }
        }
    }
}

pub(crate) fn require(value: &str, field: &'static str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(PlatformError::invalid_argument(
            "Errors.InvalidArgument",
            format!("{} must not be empty", field),
        ));
    }
    Ok(())
}

pub(crate) fn require_opt(value: &Option<String>, field: &'static str) -> Result<()> {
    match value {
        Some(v) => require(v, field),
        None => Ok(()),
    }
}
