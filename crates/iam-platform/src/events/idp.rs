//! Identity provider events on the `org` aggregate.
//!
//! One Added and one Changed event per provider type plus a shared Removed
//! event. Constructors encrypt every secret before the event exists, so a
//! [`PlatformEvent`] never holds plaintext.

use iam_secrets::{encrypt_string, CryptoValue, EncryptionAlgorithm};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::PlatformEvent;
use crate::domain::{
    GoogleChanges, GoogleConfig, IdpOptionChanges, IdpOptions, LdapChanges, LdapConfig, OAuthChanges,
    OAuthConfig, OidcChanges, OidcConfig, ProviderChanges, ProviderConfig,
};
use crate::error::{PlatformError, Result};

pub const OAUTH_IDP_ADDED: &str = "org.idp.oauth.added";
pub const OAUTH_IDP_CHANGED: &str = "org.idp.oauth.changed";
pub const OIDC_IDP_ADDED: &str = "org.idp.oidc.added";
pub const OIDC_IDP_CHANGED: &str = "org.idp.oidc.changed";
pub const JWT_IDP_ADDED: &str = "org.idp.jwt.added";
pub const JWT_IDP_CHANGED: &str = "org.idp.jwt.changed";
pub const GOOGLE_IDP_ADDED: &str = "org.idp.google.added";
pub const GOOGLE_IDP_CHANGED: &str = "org.idp.google.changed";
pub const LDAP_IDP_ADDED: &str = "org.idp.ldap.added";
pub const LDAP_IDP_CHANGED: &str = "org.idp.ldap.changed";
pub const IDP_REMOVED: &str = "org.idp.removed";

/// Prefix shared by every provider event tag.
pub const IDP_EVENT_PREFIX: &str = "org.idp.";

/// Full configuration of a newly added provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdpAdded<C> {
    #[serde(rename = "id")]
    pub idp_id: String,
    pub name: String,
    #[serde(flatten)]
    pub config: C,
    #[serde(default)]
    pub options: IdpOptions,
}

/// Sparse deltas; absent fields are unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdpChanged<C> {
    #[serde(rename = "id")]
    pub idp_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub changes: C,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<IdpOptionChanges>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdpRemoved {
    #[serde(rename = "id")]
    pub idp_id: String,
}

fn seal(secret: &SecretString, alg: &dyn EncryptionAlgorithm) -> iam_secrets::Result<CryptoValue> {
    encrypt_string(secret.expose_secret(), alg)
}

fn seal_opt(
    secret: &Option<SecretString>,
    alg: &dyn EncryptionAlgorithm,
) -> iam_secrets::Result<Option<CryptoValue>> {
    secret.as_ref().map(|s| seal(s, alg)).transpose()
}

impl ProviderConfig<SecretString> {
    /// Encrypt the plaintext secrets of a config received from a caller.
    pub fn seal(&self, alg: &dyn EncryptionAlgorithm) -> iam_secrets::Result<ProviderConfig> {
        Ok(match self {
            Self::OAuth(c) => ProviderConfig::OAuth(OAuthConfig {
                client_id: c.client_id.clone(),
                client_secret: seal(&c.client_secret, alg)?,
                authorization_endpoint: c.authorization_endpoint.clone(),
                token_endpoint: c.token_endpoint.clone(),
                user_endpoint: c.user_endpoint.clone(),
                id_attribute: c.id_attribute.clone(),
                scopes: c.scopes.clone(),
            }),
            Self::Oidc(c) => ProviderConfig::Oidc(OidcConfig {
                issuer: c.issuer.clone(),
                client_id: c.client_id.clone(),
                client_secret: seal(&c.client_secret, alg)?,
                scopes: c.scopes.clone(),
            }),
            Self::Jwt(c) => ProviderConfig::Jwt(c.clone()),
            Self::Google(c) => ProviderConfig::Google(GoogleConfig {
                client_id: c.client_id.clone(),
                client_secret: seal(&c.client_secret, alg)?,
                scopes: c.scopes.clone(),
            }),
            Self::Ldap(c) => ProviderConfig::Ldap(LdapConfig {
                host: c.host.clone(),
                port: c.port,
                tls: c.tls,
                base_dn: c.base_dn.clone(),
                user_object_class: c.user_object_class.clone(),
                user_unique_attribute: c.user_unique_attribute.clone(),
                admin: c.admin.clone(),
                password: seal(&c.password, alg)?,
                attributes: c.attributes.clone(),
            }),
        })
    }
}

impl ProviderChanges<SecretString> {
    /// Encrypt any plaintext secret present in the deltas.
    pub fn seal(&self, alg: &dyn EncryptionAlgorithm) -> iam_secrets::Result<ProviderChanges> {
        Ok(match self {
            Self::OAuth(c) => ProviderChanges::OAuth(OAuthChanges {
                client_id: c.client_id.clone(),
                client_secret: seal_opt(&c.client_secret, alg)?,
                authorization_endpoint: c.authorization_endpoint.clone(),
                token_endpoint: c.token_endpoint.clone(),
                user_endpoint: c.user_endpoint.clone(),
                id_attribute: c.id_attribute.clone(),
                scopes: c.scopes.clone(),
            }),
            Self::Oidc(c) => ProviderChanges::Oidc(OidcChanges {
                issuer: c.issuer.clone(),
                client_id: c.client_id.clone(),
                client_secret: seal_opt(&c.client_secret, alg)?,
                scopes: c.scopes.clone(),
            }),
            Self::Jwt(c) => ProviderChanges::Jwt(c.clone()),
            Self::Google(c) => ProviderChanges::Google(GoogleChanges {
                client_id: c.client_id.clone(),
                client_secret: seal_opt(&c.client_secret, alg)?,
                scopes: c.scopes.clone(),
            }),
            Self::Ldap(c) => ProviderChanges::Ldap(LdapChanges {
                host: c.host.clone(),
                port: c.port,
                tls: c.tls,
                base_dn: c.base_dn.clone(),
                user_object_class: c.user_object_class.clone(),
                user_unique_attribute: c.user_unique_attribute.clone(),
                admin: c.admin.clone(),
                password: seal_opt(&c.password, alg)?,
                attributes: c.attributes.clone(),
            }),
        })
    }
}

/// Build the Added event for a provider, encrypting its secrets.
pub fn idp_added(
    idp_id: &str,
    name: &str,
    provider: &ProviderConfig<SecretString>,
    options: &IdpOptions,
    alg: &dyn EncryptionAlgorithm,
) -> Result<PlatformEvent> {
    let idp_id = idp_id.to_string();
    let name = name.to_string();
    let options = options.clone();
    Ok(match provider.seal(alg)? {
        ProviderConfig::OAuth(config) => PlatformEvent::OAuthIdpAdded(IdpAdded { idp_id, name, config, options }),
        ProviderConfig::Oidc(config) => PlatformEvent::OidcIdpAdded(IdpAdded { idp_id, name, config, options }),
        ProviderConfig::Jwt(config) => PlatformEvent::JwtIdpAdded(IdpAdded { idp_id, name, config, options }),
        ProviderConfig::Google(config) => PlatformEvent::GoogleIdpAdded(IdpAdded { idp_id, name, config, options }),
        ProviderConfig::Ldap(config) => PlatformEvent::LdapIdpAdded(IdpAdded { idp_id, name, config, options }),
    })
}

/// Build the Changed event for a provider.
///
/// Fails with `InvalidArgument` when nothing would change.
pub fn idp_changed(
    idp_id: &str,
    name: Option<&str>,
    changes: &ProviderChanges<SecretString>,
    options: Option<&IdpOptionChanges>,
    alg: &dyn EncryptionAlgorithm,
) -> Result<PlatformEvent> {
    let options = options.filter(|o| !o.is_empty()).cloned();
    if name.is_none() && options.is_none() && changes.is_empty() {
        return Err(PlatformError::invalid_argument(
            "Errors.IDP.NoChanges",
            format!("no changes for identity provider {}", idp_id),
        ));
    }

    let idp_id = idp_id.to_string();
    let name = name.map(str::to_string);
    Ok(match changes.seal(alg)? {
        ProviderChanges::OAuth(changes) => {
            PlatformEvent::OAuthIdpChanged(IdpChanged { idp_id, name, changes, options })
        }
        ProviderChanges::Oidc(changes) => {
            PlatformEvent::OidcIdpChanged(IdpChanged { idp_id, name, changes, options })
        }
        ProviderChanges::Jwt(changes) => PlatformEvent::JwtIdpChanged(IdpChanged { idp_id, name, changes, options }),
        ProviderChanges::Google(changes) => {
            PlatformEvent::GoogleIdpChanged(IdpChanged { idp_id, name, changes, options })
        }
        ProviderChanges::Ldap(changes) => {
            PlatformEvent::LdapIdpChanged(IdpChanged { idp_id, name, changes, options })
        }
    })
}

pub fn idp_removed(idp_id: &str) -> PlatformEvent {
    PlatformEvent::IdpRemoved(IdpRemoved {
        idp_id: idp_id.to_string(),
    })
}
