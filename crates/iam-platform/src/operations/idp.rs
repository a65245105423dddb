//! Identity provider commands.

use secrecy::{ExposeSecret, SecretString};
use tracing::info;

use super::{require, require_opt, Commands};
use crate::domain::{
    ExecutionContext, IdpOptionChanges, IdpOptions, ObjectDetails, ProviderChanges, ProviderConfig,
};
use crate::error::{PlatformError, Result};
use crate::events::{idp_added, idp_changed, idp_removed};

/// Command to add a provider to an organisation.
#[derive(Debug)]
pub struct AddIdp {
    /// Generated when absent
    pub idp_id: Option<String>,
    pub name: String,
    pub options: IdpOptions,
    pub provider: ProviderConfig<SecretString>,
}

/// Command to change a provider. The provider variant must match the
/// provider's type.
#[derive(Debug)]
pub struct IdpChanges {
    pub name: Option<String>,
    pub options: Option<IdpOptionChanges>,
    pub provider: ProviderChanges<SecretString>,
}

fn require_secret(value: &SecretString, field: &'static str) -> Result<()> {
    require(value.expose_secret(), field)
}

fn require_secret_opt(value: &Option<SecretString>, field: &'static str) -> Result<()> {
    match value {
        Some(v) => require_secret(v, field),
        None => Ok(()),
    }
}

fn validate_provider(provider: &ProviderConfig<SecretString>) -> Result<()> {
    match provider {
        ProviderConfig::OAuth(c) => {
            require(&c.client_id, "client id")?;
            require_secret(&c.client_secret, "client secret")?;
            require(&c.authorization_endpoint, "authorization endpoint")?;
            require(&c.token_endpoint, "token endpoint")?;
            require(&c.user_endpoint, "user endpoint")?;
            require(&c.id_attribute, "id attribute")
        }
        ProviderConfig::Oidc(c) => {
            require(&c.issuer, "issuer")?;
            require(&c.client_id, "client id")?;
            require_secret(&c.client_secret, "client secret")
        }
        ProviderConfig::Jwt(c) => {
            require(&c.issuer, "issuer")?;
            require(&c.jwt_endpoint, "jwt endpoint")?;
            require(&c.keys_endpoint, "keys endpoint")?;
            require(&c.header_name, "header name")
        }
        ProviderConfig::Google(c) => {
            require(&c.client_id, "client id")?;
            require_secret(&c.client_secret, "client secret")
        }
        ProviderConfig::Ldap(c) => {
            require(&c.host, "host")?;
            require(&c.base_dn, "base dn")?;
            require(&c.user_object_class, "user object class")?;
            require(&c.user_unique_attribute, "user unique attribute")?;
            require(&c.admin, "admin")?;
            require_secret(&c.password, "password")?;
            if c.port == 0 {
                return Err(PlatformError::invalid_argument(
                    "Errors.InvalidArgument",
                    "port must not be 0",
                ));
            }
            Ok(())
        }
    }
}

fn validate_changes(changes: &ProviderChanges<SecretString>) -> Result<()> {
    match changes {
        ProviderChanges::OAuth(c) => {
            require_opt(&c.client_id, "client id")?;
            require_secret_opt(&c.client_secret, "client secret")?;
            require_opt(&c.authorization_endpoint, "authorization endpoint")?;
            require_opt(&c.token_endpoint, "token endpoint")?;
            require_opt(&c.user_endpoint, "user endpoint")?;
            require_opt(&c.id_attribute, "id attribute")
        }
        ProviderChanges::Oidc(c) => {
            require_opt(&c.issuer, "issuer")?;
            require_opt(&c.client_id, "client id")?;
            require_secret_opt(&c.client_secret, "client secret")
        }
        ProviderChanges::Jwt(c) => {
            require_opt(&c.issuer, "issuer")?;
            require_opt(&c.jwt_endpoint, "jwt endpoint")?;
            require_opt(&c.keys_endpoint, "keys endpoint")?;
            require_opt(&c.header_name, "header name")
        }
        ProviderChanges::Google(c) => {
            require_opt(&c.client_id, "client id")?;
            require_secret_opt(&c.client_secret, "client secret")
        }
        ProviderChanges::Ldap(c) => {
            require_opt(&c.host, "host")?;
            require_opt(&c.base_dn, "base dn")?;
            require_opt(&c.user_object_class, "user object class")?;
            require_opt(&c.user_unique_attribute, "user unique attribute")?;
            require_opt(&c.admin, "admin")?;
            require_secret_opt(&c.password, "password")?;
            if c.port == Some(0) {
                return Err(PlatformError::invalid_argument(
                    "Errors.InvalidArgument",
                    "port must not be 0",
                ));
            }
            Ok(())
        }
    }
}

impl Commands {
    /// Add an identity provider to `resource_owner`, returning its id.
    pub async fn add_idp(&self, ctx: &ExecutionContext, resource_owner: &str, idp: &AddIdp) -> Result<String> {
        require(resource_owner, "resource owner")?;
        require(&idp.name, "name")?;
        validate_provider(&idp.provider)?;

        let idp_id = match &idp.idp_id {
            Some(id) => {
                require(id, "idp id")?;
                id.clone()
            }
            None => self.next_id(),
        };
        let id = idp_id.as_str();

        let details = self
            .with_retry("add_idp", || async move {
                let model = self.org_idps(resource_owner).await?;
                if model.state.get(id).is_some() {
                    return Err(PlatformError::already_exists(
                        "Errors.IDP.AlreadyExists",
                        "identity provider",
                        id,
                    ));
                }
                if model.state.is_name_taken(&idp.name, None) {
                    return Err(PlatformError::already_exists(
                        "Errors.IDP.NameAlreadyExists",
                        "identity provider name",
                        idp.name.as_str(),
                    ));
                }
                let event = idp_added(id, &idp.name, &idp.provider, &idp.options, self.encryption())?;
                self.push(ctx, &model.aggregate, model.processed_sequence, &[event]).await
            })
            .await?;

        info!(
            idp_id = %idp_id,
            idp_type = %idp.provider.idp_type(),
            resource_owner,
            sequence = details.sequence,
            correlation_id = %ctx.correlation_id,
            "Identity provider added"
        );
        Ok(idp_id)
    }

    /// Apply deltas to an active provider.
    pub async fn change_idp(
        &self,
        ctx: &ExecutionContext,
        resource_owner: &str,
        idp_id: &str,
        changes: &IdpChanges,
    ) -> Result<ObjectDetails> {
        require(resource_owner, "resource owner")?;
        require(idp_id, "idp id")?;
        require_opt(&changes.name, "name")?;
        validate_changes(&changes.provider)?;

        let details = self
            .with_retry("change_idp", || async move {
                let model = self.org_idps(resource_owner).await?;
                let entry = model.state.active(idp_id).ok_or_else(|| {
                    PlatformError::not_found("Errors.IDP.NotFound", "identity provider", idp_id)
                })?;
                if entry.provider.idp_type() != changes.provider.idp_type() {
                    return Err(PlatformError::invalid_argument(
                        "Errors.IDP.TypeMismatch",
                        format!(
                            "identity provider {} is {}, not {}",
                            idp_id,
                            entry.provider.idp_type(),
                            changes.provider.idp_type()
                        ),
                    ));
                }
                if let Some(name) = &changes.name {
                    if model.state.is_name_taken(name, Some(idp_id)) {
                        return Err(PlatformError::already_exists(
                            "Errors.IDP.NameAlreadyExists",
                            "identity provider name",
                            name.as_str(),
                        ));
                    }
                }
                let event = idp_changed(
                    idp_id,
                    changes.name.as_deref(),
                    &changes.provider,
                    changes.options.as_ref(),
                    self.encryption(),
                )?;
                self.push(ctx, &model.aggregate, model.processed_sequence, &[event]).await
            })
            .await?;

        info!(
            idp_id,
            resource_owner,
            sequence = details.sequence,
            correlation_id = %ctx.correlation_id,
            "Identity provider changed"
        );
        Ok(details)
    }

    /// Tombstone an active provider.
    pub async fn remove_idp(&self, ctx: &ExecutionContext, resource_owner: &str, idp_id: &str) -> Result<ObjectDetails> {
        require(resource_owner, "resource owner")?;
        require(idp_id, "idp id")?;

        let details = self
            .with_retry("remove_idp", || async move {
                let model = self.org_idps(resource_owner).await?;
                if model.state.active(idp_id).is_none() {
                    return Err(PlatformError::not_found(
                        "Errors.IDP.NotFound",
                        "identity provider",
                        idp_id,
                    ));
                }
                self.push(ctx, &model.aggregate, model.processed_sequence, &[idp_removed(idp_id)])
                    .await
            })
            .await?;

        info!(
            idp_id,
            resource_owner,
            sequence = details.sequence,
            correlation_id = %ctx.correlation_id,
            "Identity provider removed"
        );
        Ok(details)
    }
}
