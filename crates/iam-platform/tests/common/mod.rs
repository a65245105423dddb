//! Shared fixtures for the platform integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use iam_common::IdGenerator;
use iam_eventstore::{
    Aggregate, EventStore, EventStoreError, EventStream, MemoryEventStore, PendingEvent, StoredEvent,
};
use iam_platform::domain::{GoogleConfig, IdpOptions, JwtConfig, ProviderConfig};
use iam_platform::operations::AddIdp;
use iam_platform::{registry, Commands, ExecutionContext, FederationService, PlatformConfig, UserService};
use iam_secrets::{AesGcmAlgorithm, AesGcmKey, EncryptionAlgorithm};
use secrecy::SecretString;

pub const ORG: &str = "org-1";

/// Hands out `<prefix>1`, `<prefix>2`, ...
pub struct SequentialIds {
    prefix: &'static str,
    next: AtomicUsize,
}

impl SequentialIds {
    pub fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            next: AtomicUsize::new(1),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> String {
        format!("{}{}", self.prefix, self.next.fetch_add(1, Ordering::SeqCst))
    }
}

/// Store whose pushes always lose the race.
#[derive(Clone, Default)]
pub struct ConflictingStore {
    pub inner: MemoryEventStore,
    pub push_attempts: Arc<AtomicUsize>,
}

#[async_trait]
impl EventStore for ConflictingStore {
    async fn push(
        &self,
        aggregate: &Aggregate,
        expected_sequence: u64,
        _events: Vec<PendingEvent>,
    ) -> iam_eventstore::Result<Vec<StoredEvent>> {
        self.push_attempts.fetch_add(1, Ordering::SeqCst);
        Err(EventStoreError::SequenceConflict {
            aggregate_type: aggregate.aggregate_type.clone(),
            aggregate_id: aggregate.id.clone(),
            expected: expected_sequence,
            actual: expected_sequence + 1,
        })
    }

    async fn query(&self, aggregate: &Aggregate, after_sequence: u64) -> iam_eventstore::Result<EventStream> {
        self.inner.query(aggregate, after_sequence).await
    }

    async fn latest_sequence(&self, aggregate: &Aggregate) -> iam_eventstore::Result<u64> {
        self.inner.latest_sequence(aggregate).await
    }
}

/// Store that stalls every push.
#[derive(Clone, Default)]
pub struct StallingStore {
    pub inner: MemoryEventStore,
}

#[async_trait]
impl EventStore for StallingStore {
    async fn push(
        &self,
        aggregate: &Aggregate,
        expected_sequence: u64,
        events: Vec<PendingEvent>,
    ) -> iam_eventstore::Result<Vec<StoredEvent>> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        self.inner.push(aggregate, expected_sequence, events).await
    }

    async fn query(&self, aggregate: &Aggregate, after_sequence: u64) -> iam_eventstore::Result<EventStream> {
        self.inner.query(aggregate, after_sequence).await
    }

    async fn latest_sequence(&self, aggregate: &Aggregate) -> iam_eventstore::Result<u64> {
        self.inner.latest_sequence(aggregate).await
    }
}

pub struct Harness {
    pub store: MemoryEventStore,
    pub encryption: Arc<AesGcmAlgorithm>,
    pub commands: Arc<Commands>,
    pub federation: FederationService,
    pub users: UserService,
}

impl Harness {
    pub fn new() -> Self {
        let store = MemoryEventStore::new();
        Self::with_store(store.clone(), Arc::new(store), PlatformConfig::default())
    }

    pub fn with_store(store: MemoryEventStore, backend: Arc<dyn EventStore>, config: PlatformConfig) -> Self {
        let encryption = Arc::new(
            AesGcmAlgorithm::new("k1", AesGcmKey::from_passphrase("platform-tests")).expect("key"),
        );
        let commands = Arc::new(Commands::new(
            backend,
            Arc::new(registry()),
            encryption.clone() as Arc<dyn EncryptionAlgorithm>,
            Arc::new(SequentialIds::new("i")),
            config,
        ));
        Self {
            store,
            encryption,
            federation: FederationService::new(commands.clone()),
            users: UserService::new(commands.clone()),
            commands,
        }
    }

    pub async fn add_google(&self, idp_id: &str) -> String {
        self.commands
            .add_idp(&ctx(), ORG, &google(idp_id, "Google"))
            .await
            .expect("add google")
    }
}

pub fn ctx() -> ExecutionContext {
    ExecutionContext::new("admin-1")
}

pub fn secret(value: &str) -> SecretString {
    SecretString::new(value.to_string())
}

pub fn google(idp_id: &str, name: &str) -> AddIdp {
    AddIdp {
        idp_id: Some(idp_id.to_string()),
        name: name.to_string(),
        options: IdpOptions {
            is_linking_allowed: true,
            ..Default::default()
        },
        provider: ProviderConfig::Google(GoogleConfig {
            client_id: "google-client".to_string(),
            client_secret: secret("google-client-secret"),
            scopes: Vec::new(),
        }),
    }
}

pub fn jwt(idp_id: &str, name: &str) -> AddIdp {
    AddIdp {
        idp_id: Some(idp_id.to_string()),
        name: name.to_string(),
        options: IdpOptions::default(),
        provider: ProviderConfig::Jwt(JwtConfig {
            issuer: "https://jwt.example.com".to_string(),
            jwt_endpoint: "https://jwt.example.com/login".to_string(),
            keys_endpoint: "https://jwt.example.com/keys".to_string(),
            header_name: "x-auth".to_string(),
        }),
    }
}
