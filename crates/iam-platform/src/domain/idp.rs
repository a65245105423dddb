//! Identity Provider Configuration
//!
//! Provider configs are generic over the secret representation: commands
//! receive `SecretString` plaintext, events and write models hold
//! [`CryptoValue`] ciphertext.

use iam_secrets::CryptoValue;
use serde::{Deserialize, Serialize};

/// Claim used as the provider user id when none is configured.
pub const DEFAULT_ID_ATTRIBUTE: &str = "sub";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdpType {
    OAuth,
    Oidc,
    Jwt,
    Google,
    Ldap,
}

impl IdpType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OAuth => "oauth",
            Self::Oidc => "oidc",
            Self::Jwt => "jwt",
            Self::Google => "google",
            Self::Ldap => "ldap",
        }
    }
}

impl std::fmt::Display for IdpType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdpState {
    Active,
    Removed,
}

/// Account handling shared by every provider type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdpOptions {
    pub is_creation_allowed: bool,
    pub is_linking_allowed: bool,
    pub is_auto_creation: bool,
    pub is_auto_update: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdpOptionChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_creation_allowed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_linking_allowed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_auto_creation: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_auto_update: Option<bool>,
}

impl IdpOptionChanges {
    pub fn is_empty(&self) -> bool {
        self.is_creation_allowed.is_none()
            && self.is_linking_allowed.is_none()
            && self.is_auto_creation.is_none()
            && self.is_auto_update.is_none()
    }
}

impl IdpOptions {
    pub fn apply(&mut self, changes: &IdpOptionChanges) {
        set(&mut self.is_creation_allowed, &changes.is_creation_allowed);
        set(&mut self.is_linking_allowed, &changes.is_linking_allowed);
        set(&mut self.is_auto_creation, &changes.is_auto_creation);
        set(&mut self.is_auto_update, &changes.is_auto_update);
    }
}

fn set<T: Clone>(target: &mut T, change: &Option<T>) {
    if let Some(value) = change {
        *target = value.clone();
    }
}

// ============================================================================
// Provider configs
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthConfig<S = CryptoValue> {
    #[serde(rename = "clientID")]
    pub client_id: String,
    pub client_secret: S,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub user_endpoint: String,
    pub id_attribute: String,
    #[serde(default)]
    pub scopes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OidcConfig<S = CryptoValue> {
    pub issuer: String,
    #[serde(rename = "clientID")]
    pub client_id: String,
    pub client_secret: S,
    #[serde(default)]
    pub scopes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JwtConfig {
    pub issuer: String,
    pub jwt_endpoint: String,
    pub keys_endpoint: String,
    pub header_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleConfig<S = CryptoValue> {
    #[serde(rename = "clientID")]
    pub client_id: String,
    pub client_secret: S,
    #[serde(default)]
    pub scopes: Vec<String>,
}

/// Mapping from LDAP attributes to user fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LdapAttributes {
    pub id_attribute: String,
    pub first_name_attribute: String,
    pub last_name_attribute: String,
    pub display_name_attribute: String,
    pub nick_name_attribute: String,
    pub preferred_username_attribute: String,
    pub email_attribute: String,
    pub email_verified_attribute: String,
    pub phone_attribute: String,
    pub phone_verified_attribute: String,
    pub preferred_language_attribute: String,
    pub avatar_url_attribute: String,
    pub profile_attribute: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LdapConfig<S = CryptoValue> {
    pub host: String,
    pub port: u16,
    pub tls: bool,
    #[serde(rename = "baseDN")]
    pub base_dn: String,
    pub user_object_class: String,
    pub user_unique_attribute: String,
    pub admin: String,
    pub password: S,
    #[serde(default)]
    pub attributes: LdapAttributes,
}

/// Type-specific part of a provider configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderConfig<S = CryptoValue> {
    OAuth(OAuthConfig<S>),
    Oidc(OidcConfig<S>),
    Jwt(JwtConfig),
    Google(GoogleConfig<S>),
    Ldap(LdapConfig<S>),
}

impl<S> ProviderConfig<S> {
    pub fn idp_type(&self) -> IdpType {
        match self {
            Self::OAuth(_) => IdpType::OAuth,
            Self::Oidc(_) => IdpType::Oidc,
            Self::Jwt(_) => IdpType::Jwt,
            Self::Google(_) => IdpType::Google,
            Self::Ldap(_) => IdpType::Ldap,
        }
    }

    /// Payload attribute holding the provider's user id.
    pub fn id_attribute(&self) -> &str {
        let configured = match self {
            Self::OAuth(c) => c.id_attribute.as_str(),
            Self::Ldap(c) => c.attributes.id_attribute.as_str(),
            _ => "",
        };
        if configured.is_empty() {
            DEFAULT_ID_ATTRIBUTE
        } else {
            configured
        }
    }
}

// ============================================================================
// Provider changes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "S: Deserialize<'de>"))]
pub struct OAuthChanges<S = CryptoValue> {
    #[serde(rename = "clientID", default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<S>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_attribute: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,
}

impl<S> Default for OAuthChanges<S> {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            authorization_endpoint: None,
            token_endpoint: None,
            user_endpoint: None,
            id_attribute: None,
            scopes: None,
        }
    }
}

impl<S> OAuthChanges<S> {
    pub fn is_empty(&self) -> bool {
        self.client_id.is_none()
            && self.client_secret.is_none()
            && self.authorization_endpoint.is_none()
            && self.token_endpoint.is_none()
            && self.user_endpoint.is_none()
            && self.id_attribute.is_none()
            && self.scopes.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "S: Deserialize<'de>"))]
pub struct OidcChanges<S = CryptoValue> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(rename = "clientID", default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<S>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,
}

impl<S> Default for OidcChanges<S> {
    fn default() -> Self {
        Self {
            issuer: None,
            client_id: None,
            client_secret: None,
            scopes: None,
        }
    }
}

impl<S> OidcChanges<S> {
    pub fn is_empty(&self) -> bool {
        self.issuer.is_none() && self.client_id.is_none() && self.client_secret.is_none() && self.scopes.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JwtChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_name: Option<String>,
}

impl JwtChanges {
    pub fn is_empty(&self) -> bool {
        self.issuer.is_none()
            && self.jwt_endpoint.is_none()
            && self.keys_endpoint.is_none()
            && self.header_name.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "S: Deserialize<'de>"))]
pub struct GoogleChanges<S = CryptoValue> {
    #[serde(rename = "clientID", default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<S>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,
}

impl<S> Default for GoogleChanges<S> {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            scopes: None,
        }
    }
}

impl<S> GoogleChanges<S> {
    pub fn is_empty(&self) -> bool {
        self.client_id.is_none() && self.client_secret.is_none() && self.scopes.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "S: Deserialize<'de>"))]
pub struct LdapChanges<S = CryptoValue> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<bool>,
    #[serde(rename = "baseDN", default, skip_serializing_if = "Option::is_none")]
    pub base_dn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_object_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_unique_attribute: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<S>,
    /// Replaces the whole attribute mapping when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<LdapAttributes>,
}

impl<S> Default for LdapChanges<S> {
    fn default() -> Self {
        Self {
            host: None,
            port: None,
            tls: None,
            base_dn: None,
            user_object_class: None,
            user_unique_attribute: None,
            admin: None,
            password: None,
            attributes: None,
        }
    }
}

impl<S> LdapChanges<S> {
    pub fn is_empty(&self) -> bool {
        self.host.is_none()
            && self.port.is_none()
            && self.tls.is_none()
            && self.base_dn.is_none()
            && self.user_object_class.is_none()
            && self.user_unique_attribute.is_none()
            && self.admin.is_none()
            && self.password.is_none()
            && self.attributes.is_none()
    }
}

/// Type-specific deltas; the variant selects the Changed event emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderChanges<S = CryptoValue> {
    OAuth(OAuthChanges<S>),
    Oidc(OidcChanges<S>),
    Jwt(JwtChanges),
    Google(GoogleChanges<S>),
    Ldap(LdapChanges<S>),
}

impl<S> ProviderChanges<S> {
    pub fn idp_type(&self) -> IdpType {
        match self {
            Self::OAuth(_) => IdpType::OAuth,
            Self::Oidc(_) => IdpType::Oidc,
            Self::Jwt(_) => IdpType::Jwt,
            Self::Google(_) => IdpType::Google,
            Self::Ldap(_) => IdpType::Ldap,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::OAuth(c) => c.is_empty(),
            Self::Oidc(c) => c.is_empty(),
            Self::Jwt(c) => c.is_empty(),
            Self::Google(c) => c.is_empty(),
            Self::Ldap(c) => c.is_empty(),
        }
    }
}

// ============================================================================
// Applying deltas
// ============================================================================

impl ProviderConfig {
    /// Overwrite the fields present in `changes`.
    ///
    /// Returns `false` and leaves the config untouched when the change is
    /// for a different provider type.
    pub fn apply(&mut self, changes: &ProviderChanges) -> bool {
        match (self, changes) {
            (Self::OAuth(c), ProviderChanges::OAuth(d)) => {
                set(&mut c.client_id, &d.client_id);
                set(&mut c.client_secret, &d.client_secret);
                set(&mut c.authorization_endpoint, &d.authorization_endpoint);
                set(&mut c.token_endpoint, &d.token_endpoint);
                set(&mut c.user_endpoint, &d.user_endpoint);
                set(&mut c.id_attribute, &d.id_attribute);
                set(&mut c.scopes, &d.scopes);
            }
            (Self::Oidc(c), ProviderChanges::Oidc(d)) => {
                set(&mut c.issuer, &d.issuer);
                set(&mut c.client_id, &d.client_id);
                set(&mut c.client_secret, &d.client_secret);
                set(&mut c.scopes, &d.scopes);
            }
            (Self::Jwt(c), ProviderChanges::Jwt(d)) => {
                set(&mut c.issuer, &d.issuer);
                set(&mut c.jwt_endpoint, &d.jwt_endpoint);
                set(&mut c.keys_endpoint, &d.keys_endpoint);
                set(&mut c.header_name, &d.header_name);
            }
            (Self::Google(c), ProviderChanges::Google(d)) => {
                set(&mut c.client_id, &d.client_id);
                set(&mut c.client_secret, &d.client_secret);
                set(&mut c.scopes, &d.scopes);
            }
            (Self::Ldap(c), ProviderChanges::Ldap(d)) => {
                set(&mut c.host, &d.host);
                set(&mut c.port, &d.port);
                set(&mut c.tls, &d.tls);
                set(&mut c.base_dn, &d.base_dn);
                set(&mut c.user_object_class, &d.user_object_class);
                set(&mut c.user_unique_attribute, &d.user_unique_attribute);
                set(&mut c.admin, &d.admin);
                set(&mut c.password, &d.password);
                set(&mut c.attributes, &d.attributes);
            }
            _ => return false,
        }
        true
    }
}
