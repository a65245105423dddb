//! Folding the same IDP event sequence always yields the same write model.

use chrono::{TimeZone, Utc};
use iam_eventstore::{PendingEvent, StoredEvent};
use iam_platform::domain::{
    GoogleConfig, IdpOptions, JwtChanges, JwtConfig, ProviderChanges, ProviderConfig,
};
use iam_platform::events::{idp_added, idp_changed, idp_removed, registry, PlatformEvent};
use iam_platform::write_model::{OrgIdpsReducer, OrgIdpsWriteModel};
use iam_secrets::{AesGcmAlgorithm, AesGcmKey};
use proptest::prelude::*;
use secrecy::SecretString;
use serde_json::json;

const ORG: &str = "org-1";

#[derive(Debug, Clone)]
enum Op {
    AddJwt(u8, u8),
    AddGoogle(u8, u8),
    Rename(u8, u8),
    ChangeJwt(u8),
    Remove(u8),
    Foreign,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..4u8, 0..3u8).prop_map(|(id, name)| Op::AddJwt(id, name)),
        (0..4u8, 0..3u8).prop_map(|(id, name)| Op::AddGoogle(id, name)),
        (0..4u8, 0..3u8).prop_map(|(id, name)| Op::Rename(id, name)),
        (0..4u8).prop_map(Op::ChangeJwt),
        (0..4u8).prop_map(Op::Remove),
        Just(Op::Foreign),
    ]
}

fn jwt_config(n: u8) -> JwtConfig {
    JwtConfig {
        issuer: format!("https://issuer-{}.example.com", n),
        jwt_endpoint: format!("https://issuer-{}.example.com/login", n),
        keys_endpoint: format!("https://issuer-{}.example.com/keys", n),
        header_name: "authorization".to_string(),
    }
}

fn pending(op: &Op, alg: &AesGcmAlgorithm) -> PendingEvent {
    let id = |n: &u8| format!("idp-{}", n);
    let name = |n: &u8| format!("name-{}", n);
    let event: PlatformEvent = match op {
        Op::AddJwt(i, n) => idp_added(
            &id(i),
            &name(n),
            &ProviderConfig::Jwt(jwt_config(*i)),
            &IdpOptions::default(),
            alg,
        )
        .unwrap(),
        Op::AddGoogle(i, n) => idp_added(
            &id(i),
            &name(n),
            &ProviderConfig::Google(GoogleConfig {
                client_id: format!("client-{}", i),
                client_secret: SecretString::new("secret".to_string()),
                scopes: Vec::new(),
            }),
            &IdpOptions::default(),
            alg,
        )
        .unwrap(),
        Op::Rename(i, n) => idp_changed(
            &id(i),
            Some(&name(n)),
            &ProviderChanges::Jwt(JwtChanges::default()),
            None,
            alg,
        )
        .unwrap(),
        Op::ChangeJwt(i) => idp_changed(
            &id(i),
            None,
            &ProviderChanges::Jwt(JwtChanges {
                header_name: Some(format!("x-header-{}", i)),
                ..Default::default()
            }),
            None,
            alg,
        )
        .unwrap(),
        Op::Remove(i) => idp_removed(&id(i)),
        Op::Foreign => return PendingEvent::new("org.member.added", "admin-1", json!({ "userID": "u1" })),
    };
    event.to_pending("admin-1").unwrap()
}

fn stored(ops: &[Op]) -> Vec<StoredEvent> {
    let alg = AesGcmAlgorithm::new("k1", AesGcmKey::from_passphrase("determinism")).unwrap();
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    ops.iter()
        .enumerate()
        .map(|(i, op)| {
            let p = pending(op, &alg);
            StoredEvent {
                aggregate_type: "org".to_string(),
                aggregate_id: ORG.to_string(),
                resource_owner: ORG.to_string(),
                sequence: i as u64 + 1,
                creation_time: base + chrono::Duration::seconds(i as i64),
                editor_id: p.editor_id,
                event_type: p.event_type,
                payload: p.payload,
            }
        })
        .collect()
}

fn fold(events: &[StoredEvent]) -> OrgIdpsWriteModel {
    OrgIdpsReducer::write_model(ORG).reduce(&registry(), events).unwrap()
}

proptest! {
    #[test]
    fn prop_reduction_is_deterministic(ops in prop::collection::vec(op(), 0..40)) {
        let events = stored(&ops);
        let first = fold(&events);
        let second = fold(&events);

        prop_assert_eq!(&first.state, &second.state);
        prop_assert_eq!(first.processed_sequence, events.len() as u64);
        prop_assert_eq!(first.processed_sequence, second.processed_sequence);
        prop_assert_eq!(first.change_date, second.change_date);
    }

    #[test]
    fn prop_reload_matches_full_fold(ops in prop::collection::vec(op(), 1..40), split in 0usize..40) {
        let events = stored(&ops);
        let split = split.min(events.len());
        let registry = registry();

        let partial = OrgIdpsReducer::write_model(ORG).reduce(&registry, &events[..split]).unwrap();
        // Replaying everything again must not double-apply the prefix.
        let reloaded = partial.reduce(&registry, &events).unwrap();
        let full = fold(&events);

        prop_assert_eq!(&reloaded.state, &full.state);
        prop_assert_eq!(reloaded.processed_sequence, full.processed_sequence);
    }
}
