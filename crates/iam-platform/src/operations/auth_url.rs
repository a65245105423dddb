//! Authorization request URLs.
//!
//! Building a URL never touches state; the intent id travels as `state` so
//! the provider callback can name the intent it completes.

use super::intent::validate_redirect_url;
use super::{require, Commands};
use crate::domain::ProviderConfig;
use crate::error::{PlatformError, Result};

pub const GOOGLE_AUTHORIZATION_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";

const GOOGLE_DEFAULT_SCOPES: &[&str] = &["openid", "profile", "email"];
const OIDC_DEFAULT_SCOPES: &[&str] = &["openid"];
const MICROSOFT_LOGIN_HOST: &str = "login.microsoftonline.com";

/// Authorization URL for `provider`, carrying `intent_id` as `state`.
///
/// LDAP has no redirect flow and fails with `InvalidArgument`.
pub fn build_auth_url(provider: &ProviderConfig, intent_id: &str, callback_url: &str) -> Result<String> {
    match provider {
        ProviderConfig::OAuth(c) => Ok(authorization_request(
            &c.authorization_endpoint,
            &c.client_id,
            callback_url,
            &scope(&c.scopes, &[]),
            intent_id,
        )),
        ProviderConfig::Oidc(c) => Ok(authorization_request(
            &oidc_authorization_endpoint(&c.issuer),
            &c.client_id,
            callback_url,
            &scope(&c.scopes, OIDC_DEFAULT_SCOPES),
            intent_id,
        )),
        ProviderConfig::Google(c) => Ok(authorization_request(
            GOOGLE_AUTHORIZATION_ENDPOINT,
            &c.client_id,
            callback_url,
            &scope(&c.scopes, GOOGLE_DEFAULT_SCOPES),
            intent_id,
        )),
        ProviderConfig::Jwt(c) => Ok(with_query(
            &c.jwt_endpoint,
            &[("redirect_uri", callback_url), ("state", intent_id)],
        )),
        ProviderConfig::Ldap(_) => Err(PlatformError::invalid_argument(
            "Errors.IDP.NoRedirectFlow",
            "LDAP providers have no authorization redirect",
        )),
    }
}

fn oidc_authorization_endpoint(issuer: &str) -> String {
    let issuer = issuer.trim_end_matches('/');
    if issuer.contains(MICROSOFT_LOGIN_HOST) {
        let tenant = issuer.strip_suffix("/v2.0").unwrap_or(issuer);
        format!("{}/oauth2/v2.0/authorize", tenant)
    } else {
        format!("{}/authorize", issuer)
    }
}

fn scope(configured: &[String], defaults: &[&str]) -> String {
    if configured.is_empty() {
        defaults.join(" ")
    } else {
        configured.join(" ")
    }
}

fn authorization_request(endpoint: &str, client_id: &str, redirect_uri: &str, scope: &str, state: &str) -> String {
    with_query(
        endpoint,
        &[
            ("client_id", client_id),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("scope", scope),
            ("state", state),
        ],
    )
}

fn with_query(endpoint: &str, params: &[(&str, &str)]) -> String {
    let query = params
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&");
    let separator = if endpoint.contains('?') { '&' } else { '?' };
    format!("{}{}{}", endpoint, separator, query)
}

impl Commands {
    /// Authorization URL of an active provider for `intent_id`.
    pub async fn auth_url_from_provider(
        &self,
        resource_owner: &str,
        idp_id: &str,
        intent_id: &str,
        callback_url: &str,
    ) -> Result<String> {
        require(intent_id, "intent id")?;
        validate_redirect_url(callback_url, "callback url")?;

        let idps = self.org_idps(resource_owner).await?;
        let entry = idps
            .state
            .active(idp_id)
            .ok_or_else(|| PlatformError::not_found("Errors.IDP.NotFound", "identity provider", idp_id))?;
        build_auth_url(&entry.provider, intent_id, callback_url)
    }
}
