//! Identity provider commands against the in-memory store.

mod common;

use common::{ctx, google, jwt, secret, Harness, ORG};
use iam_platform::domain::{GoogleChanges, IdpOptionChanges, IdpType, JwtChanges, ProviderChanges, ProviderConfig};
use iam_platform::operations::IdpChanges;
use iam_platform::ErrorKind;
use iam_secrets::decrypt_string;

fn rename(name: &str) -> IdpChanges {
    IdpChanges {
        name: Some(name.to_string()),
        options: None,
        provider: ProviderChanges::Google(GoogleChanges::default()),
    }
}

#[tokio::test]
async fn test_add_idp_seals_secret() {
    let h = Harness::new();
    let id = h.add_google("google-1").await;
    assert_eq!(id, "google-1");

    let model = h.commands.org_idps(ORG).await.unwrap();
    assert_eq!(model.processed_sequence, 1);
    let entry = model.state.active("google-1").unwrap();
    assert_eq!(entry.name, "Google");
    assert!(entry.options.is_linking_allowed);
    match &entry.provider {
        ProviderConfig::Google(c) => {
            assert_eq!(c.client_secret.key_id, "k1");
            assert_eq!(
                decrypt_string(&c.client_secret, h.encryption.as_ref()).unwrap(),
                "google-client-secret"
            );
        }
        other => panic!("unexpected provider {:?}", other.idp_type()),
    }
}

#[tokio::test]
async fn test_generated_id_when_absent() {
    let h = Harness::new();
    let mut add = jwt("ignored", "JWT");
    add.idp_id = None;
    let id = h.commands.add_idp(&ctx(), ORG, &add).await.unwrap();
    assert_eq!(id, "i1");
    assert_eq!(
        h.commands.org_idps(ORG).await.unwrap().state.active(&id).unwrap().provider.idp_type(),
        IdpType::Jwt
    );
}

#[tokio::test]
async fn test_duplicate_id_and_name_are_rejected() {
    let h = Harness::new();
    h.add_google("google-1").await;

    let err = h
        .commands
        .add_idp(&ctx(), ORG, &google("google-1", "Other"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    assert_eq!(err.message_id(), "Errors.IDP.AlreadyExists");

    let err = h
        .commands
        .add_idp(&ctx(), ORG, &jwt("jwt-1", "Google"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    assert_eq!(err.message_id(), "Errors.IDP.NameAlreadyExists");

    // Same name in another organisation is fine.
    h.commands
        .add_idp(&ctx(), "org-2", &google("google-1", "Google"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_required_fields() {
    let h = Harness::new();
    let mut add = google("google-1", "Google");
    add.name = " ".to_string();
    let err = h.commands.add_idp(&ctx(), ORG, &add).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let mut add = google("google-1", "Google");
    if let ProviderConfig::Google(c) = &mut add.provider {
        c.client_secret = secret("");
    }
    let err = h.commands.add_idp(&ctx(), ORG, &add).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(h.store.stream_count(), 0);
}

#[tokio::test]
async fn test_change_idp_applies_deltas() {
    let h = Harness::new();
    h.add_google("google-1").await;

    let changes = IdpChanges {
        name: Some("Google Workspace".to_string()),
        options: Some(IdpOptionChanges {
            is_auto_creation: Some(true),
            ..Default::default()
        }),
        provider: ProviderChanges::Google(GoogleChanges {
            client_secret: Some(secret("rotated-secret")),
            scopes: Some(vec!["openid".to_string()]),
            ..Default::default()
        }),
    };
    let details = h.commands.change_idp(&ctx(), ORG, "google-1", &changes).await.unwrap();
    assert_eq!(details.sequence, 2);

    let model = h.commands.org_idps(ORG).await.unwrap();
    let entry = model.state.active("google-1").unwrap();
    assert_eq!(entry.name, "Google Workspace");
    assert!(entry.options.is_auto_creation);
    assert!(entry.options.is_linking_allowed);
    match &entry.provider {
        ProviderConfig::Google(c) => {
            assert_eq!(c.client_id, "google-client");
            assert_eq!(c.scopes, vec!["openid".to_string()]);
            assert_eq!(
                decrypt_string(&c.client_secret, h.encryption.as_ref()).unwrap(),
                "rotated-secret"
            );
        }
        other => panic!("unexpected provider {:?}", other.idp_type()),
    }
}

#[tokio::test]
async fn test_change_without_deltas_is_rejected() {
    let h = Harness::new();
    h.add_google("google-1").await;
    let changes = IdpChanges {
        name: None,
        options: None,
        provider: ProviderChanges::Google(GoogleChanges::default()),
    };
    let err = h.commands.change_idp(&ctx(), ORG, "google-1", &changes).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(err.message_id(), "Errors.IDP.NoChanges");
}

#[tokio::test]
async fn test_change_with_other_provider_type_is_rejected() {
    let h = Harness::new();
    h.add_google("google-1").await;
    let changes = IdpChanges {
        name: None,
        options: None,
        provider: ProviderChanges::Jwt(JwtChanges {
            header_name: Some("x-other".to_string()),
            ..Default::default()
        }),
    };
    let err = h.commands.change_idp(&ctx(), ORG, "google-1", &changes).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(err.message_id(), "Errors.IDP.TypeMismatch");
}

#[tokio::test]
async fn test_rename_onto_taken_name() {
    let h = Harness::new();
    h.add_google("google-1").await;
    h.commands.add_idp(&ctx(), ORG, &jwt("jwt-1", "JWT")).await.unwrap();

    let err = h
        .commands
        .change_idp(&ctx(), ORG, "google-1", &rename("JWT"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);

    // Keeping its own name is not a clash.
    h.commands
        .change_idp(&ctx(), ORG, "google-1", &rename("Google"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_removed_provider_lifecycle() {
    let h = Harness::new();
    h.add_google("google-1").await;
    h.commands.remove_idp(&ctx(), ORG, "google-1").await.unwrap();

    let err = h
        .commands
        .change_idp(&ctx(), ORG, "google-1", &rename("Renamed"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = h.commands.remove_idp(&ctx(), ORG, "google-1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    // The id stays taken, the name is free again.
    let err = h
        .commands
        .add_idp(&ctx(), ORG, &google("google-1", "Google"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    h.commands
        .add_idp(&ctx(), ORG, &google("google-2", "Google"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_auth_urls_per_provider_type() {
    let h = Harness::new();
    h.add_google("google-1").await;
    h.commands.add_idp(&ctx(), ORG, &jwt("jwt-1", "JWT")).await.unwrap();

    let url = h
        .commands
        .auth_url_from_provider(ORG, "jwt-1", "i9", "https://cb.example.com")
        .await
        .unwrap();
    assert_eq!(
        url,
        "https://jwt.example.com/login?redirect_uri=https%3A%2F%2Fcb.example.com&state=i9"
    );

    let err = h
        .commands
        .auth_url_from_provider(ORG, "missing", "i9", "https://cb.example.com")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
