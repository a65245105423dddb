//! Federation flow: intent lifecycle, token binding and disclosure gating.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{ctx, secret, ConflictingStore, Harness, StallingStore, ORG};
use futures::TryStreamExt;
use iam_eventstore::{EventStore, MemoryEventStore};
use iam_platform::events::intent_aggregate;
use iam_platform::operations::SucceedIntent;
use iam_platform::{ErrorKind, PlatformConfig};
use iam_secrets::AesGcmKey;
use secrecy::ExposeSecret;
use serde_json::json;

fn google_result() -> SucceedIntent {
    SucceedIntent {
        access_token: secret("ya29.access-token"),
        id_token: Some("eyJhbGciOi.id-token".to_string()),
        user_payload: json!({ "sub": "108234", "email": "ada@example.com", "email_verified": true }),
    }
}

async fn start(h: &Harness) -> String {
    h.federation
        .start_identity_provider_flow(
            &ctx(),
            ORG,
            "google-1",
            "https://app.example.com/ok",
            "https://app.example.com/fail",
            "https://login.example.com/idps/callback",
        )
        .await
        .unwrap()
        .intent_id
}

mod flow_tests {
    use super::*;

    #[tokio::test]
    async fn test_end_to_end_google_flow() {
        let h = Harness::new();
        h.add_google("google-1").await;

        let flow = h
            .federation
            .start_identity_provider_flow(
                &ctx(),
                ORG,
                "google-1",
                "https://app.example.com/ok",
                "https://app.example.com/fail",
                "https://login.example.com/idps/callback",
            )
            .await
            .unwrap();
        assert_eq!(flow.intent_id, "i1");
        assert_eq!(flow.details.sequence, 1);
        assert_eq!(flow.details.resource_owner, ORG);
        assert!(flow
            .auth_url
            .starts_with("https://accounts.google.com/o/oauth2/v2/auth?client_id=google-client&"));
        assert!(flow.auth_url.contains("scope=openid%20profile%20email"));
        assert!(flow.auth_url.ends_with("state=i1"));

        let token = h.federation.issue_token("i1").unwrap();
        h.commands
            .succeed_intent(&ctx(), ORG, "i1", &google_result())
            .await
            .unwrap();

        for _ in 0..2 {
            let info = h.federation.retrieve_information(ORG, "i1", &token).await.unwrap();
            assert_eq!(info.access_token.expose_secret(), "ya29.access-token");
            assert_eq!(info.id_token.as_deref(), Some("eyJhbGciOi.id-token"));
            assert_eq!(info.idp_user_id.as_deref(), Some("108234"));
            assert_eq!(info.user_payload["email"], "ada@example.com");
            assert_eq!(info.details.sequence, 2);
            assert_eq!(info.details.resource_owner, ORG);
        }

        let err = h
            .commands
            .succeed_intent(&ctx(), ORG, "i1", &google_result())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PreconditionFailed);
    }

    #[tokio::test]
    async fn test_intent_requires_active_provider() {
        let h = Harness::new();
        let err = h
            .commands
            .create_intent(&ctx(), ORG, "google-1", "https://ok", "https://fail")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        h.add_google("google-1").await;
        h.commands.remove_idp(&ctx(), ORG, "google-1").await.unwrap();
        let err = h
            .commands
            .create_intent(&ctx(), ORG, "google-1", "https://ok", "https://fail")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_provider_of_other_owner_is_invisible() {
        let h = Harness::new();
        h.add_google("google-1").await;
        let err = h
            .commands
            .create_intent(&ctx(), "org-2", "google-1", "https://ok", "https://fail")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_relative_urls_are_rejected() {
        let h = Harness::new();
        h.add_google("google-1").await;
        let err = h
            .commands
            .create_intent(&ctx(), ORG, "google-1", "/ok", "https://fail")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(h.store.stream_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_intent_cannot_succeed() {
        let h = Harness::new();
        h.add_google("google-1").await;
        let intent_id = start(&h).await;

        let details = h
            .commands
            .fail_intent(&ctx(), ORG, &intent_id, "user cancelled")
            .await
            .unwrap();
        assert_eq!(details.sequence, 2);

        let err = h
            .commands
            .succeed_intent(&ctx(), ORG, &intent_id, &google_result())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PreconditionFailed);

        let intent = h.commands.intent(ORG, &intent_id).await.unwrap();
        assert_eq!(intent.state.failure_reason.as_deref(), Some("user cancelled"));
    }

    #[tokio::test]
    async fn test_unknown_intent_is_not_found() {
        let h = Harness::new();
        let err = h
            .commands
            .fail_intent(&ctx(), ORG, "missing", "nope")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}

mod disclosure_tests {
    use super::*;

    #[tokio::test]
    async fn test_started_intent_is_not_disclosed() {
        let h = Harness::new();
        h.add_google("google-1").await;
        let intent_id = start(&h).await;
        let token = h.federation.issue_token(&intent_id).unwrap();

        let err = h
            .federation
            .retrieve_information(ORG, &intent_id, &token)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PreconditionFailed);
        assert_eq!(err.message_id(), "Errors.Intent.NotSucceeded");
    }

    #[tokio::test]
    async fn test_failed_intent_is_not_disclosed() {
        let h = Harness::new();
        h.add_google("google-1").await;
        let intent_id = start(&h).await;
        h.commands.fail_intent(&ctx(), ORG, &intent_id, "denied").await.unwrap();
        let token = h.federation.issue_token(&intent_id).unwrap();

        let err = h
            .federation
            .retrieve_information(ORG, &intent_id, &token)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PreconditionFailed);
    }

    #[tokio::test]
    async fn test_token_of_other_intent_is_denied() {
        let h = Harness::new();
        h.add_google("google-1").await;
        let first = start(&h).await;
        let second = start(&h).await;
        h.commands
            .succeed_intent(&ctx(), ORG, &first, &google_result())
            .await
            .unwrap();

        let wrong = h.federation.issue_token(&second).unwrap();
        let err = h
            .federation
            .retrieve_information(ORG, &first, &wrong)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        assert_eq!(err.message_id(), "Errors.Intent.InvalidToken");

        let err = h.federation.retrieve_information(ORG, &first, "").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    }

    #[tokio::test]
    async fn test_valid_token_for_missing_intent_is_not_found() {
        let h = Harness::new();
        let token = h.federation.issue_token("ghost").unwrap();
        let err = h
            .federation
            .retrieve_information(ORG, "ghost", &token)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_token_issued_before_rotation_is_denied() {
        let h = Harness::new();
        h.add_google("google-1").await;
        let intent_id = start(&h).await;
        h.commands
            .succeed_intent(&ctx(), ORG, &intent_id, &google_result())
            .await
            .unwrap();
        let old_token = h.federation.issue_token(&intent_id).unwrap();

        h.encryption.add_key("k2", AesGcmKey::from_passphrase("rotated")).unwrap();
        h.encryption.activate("k2").unwrap();

        let err = h
            .federation
            .retrieve_information(ORG, &intent_id, &old_token)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);

        // The access token sealed under k1 still decrypts.
        let new_token = h.federation.issue_token(&intent_id).unwrap();
        let info = h
            .federation
            .retrieve_information(ORG, &intent_id, &new_token)
            .await
            .unwrap();
        assert_eq!(info.access_token.expose_secret(), "ya29.access-token");
    }

    #[tokio::test]
    async fn test_stored_events_never_hold_plaintext_secrets() {
        let h = Harness::new();
        h.add_google("google-1").await;
        let intent_id = start(&h).await;
        h.commands
            .succeed_intent(&ctx(), ORG, &intent_id, &google_result())
            .await
            .unwrap();

        let mut raw = String::new();
        for aggregate in [
            iam_platform::events::org_aggregate(ORG),
            intent_aggregate(&intent_id, ORG),
        ] {
            let events: Vec<_> = h.store.query(&aggregate, 0).await.unwrap().try_collect().await.unwrap();
            raw.push_str(&serde_json::to_string(&events).unwrap());
        }
        assert!(raw.contains("keyID"));
        assert!(!raw.contains("google-client-secret"));
        assert!(!raw.contains("ya29.access-token"));
    }
}

mod resilience_tests {
    use super::*;

    #[tokio::test]
    async fn test_retries_exhausted_surface_conflict() {
        let backend = ConflictingStore::default();
        let attempts = backend.push_attempts.clone();
        let h = Harness::with_store(
            backend.inner.clone(),
            Arc::new(backend),
            PlatformConfig::default().with_max_retries(2),
        );

        let err = h
            .commands
            .add_idp(&ctx(), ORG, &common::google("google-1", "Google"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SequenceConflict);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(h.store.stream_count(), 0);
    }

    #[tokio::test]
    async fn test_stalled_store_exceeds_deadline() {
        let backend = StallingStore::default();
        let h = Harness::with_store(
            backend.inner.clone(),
            Arc::new(backend),
            PlatformConfig::default().with_store_timeout(Duration::from_millis(50)),
        );

        let err = h
            .commands
            .add_idp(&ctx(), ORG, &common::google("google-1", "Google"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeadlineExceeded);
    }

    #[tokio::test]
    async fn test_concurrent_intents_on_one_provider() {
        let h = Arc::new(Harness::new());
        h.add_google("google-1").await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let h = h.clone();
            handles.push(tokio::spawn(async move { start(&h).await }));
        }
        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 8);

        let store: &MemoryEventStore = &h.store;
        for id in &ids {
            assert_eq!(store.latest_sequence(&intent_aggregate(id, ORG)).await.unwrap(), 1);
        }
    }
}
