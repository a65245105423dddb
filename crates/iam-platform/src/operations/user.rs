//! Human user commands.

use std::collections::{BTreeMap, HashSet};

use tracing::info;

use super::{require, Commands};
use crate::domain::{render_confirm_url_template, Email, ExecutionContext, IdpLink, ObjectDetails, Phone, Profile};
use crate::error::{PlatformError, Result};
use crate::events::{encode_metadata, user_idp_link_added, HumanAdded, PlatformEvent};
use crate::write_model::{HumanReducer, OrgIdpsWriteModel};

/// Link to create together with a user or on its own.
pub type AddLink = IdpLink;

/// Command to create a human user.
#[derive(Debug, Clone, Default)]
pub struct AddHuman {
    /// Generated when absent
    pub user_id: Option<String>,
    pub user_name: String,
    pub profile: Profile,
    pub email: Email,
    pub phone: Option<Phone>,
    /// Already hashed password, passed through unchanged
    pub encoded_password_hash: Option<String>,
    pub password_change_required: bool,
    pub metadata: BTreeMap<String, Vec<u8>>,
    pub links: Vec<AddLink>,
}

impl AddHuman {
    fn validate(&self) -> Result<()> {
        require(&self.user_name, "user name")?;
        require(&self.profile.first_name, "first name")?;
        require(&self.profile.last_name, "last name")?;
        require(&self.email.address, "email")?;
        if !self.email.address.contains('@') {
            return Err(PlatformError::invalid_argument(
                "Errors.User.Email.Invalid",
                "email address is invalid",
            ));
        }
        if let Some(template) = &self.email.url_template {
            render_confirm_url_template(template, "userID", "code", "orgID")?;
        }
        if let Some(phone) = &self.phone {
            require(&phone.number, "phone")?;
        }
        if self.metadata.keys().any(|k| k.trim().is_empty()) {
            return Err(PlatformError::invalid_argument(
                "Errors.User.Metadata.Invalid",
                "metadata keys must not be empty",
            ));
        }
        let mut seen = HashSet::new();
        for link in &self.links {
            validate_link(link)?;
            if !seen.insert((link.idp_id.as_str(), link.external_user_id.as_str())) {
                return Err(PlatformError::invalid_argument(
                    "Errors.User.IDPLink.Duplicate",
                    format!("link to {} listed twice", link.idp_id),
                ));
            }
        }
        Ok(())
    }

    fn added_event(&self) -> PlatformEvent {
        PlatformEvent::HumanAdded(HumanAdded {
            user_name: self.user_name.clone(),
            profile: self.profile.clone(),
            email: self.email.address.clone(),
            is_email_verified: self.email.verified,
            phone: self.phone.clone(),
            encoded_hash: self.encoded_password_hash.clone(),
            password_change_required: self.password_change_required,
            metadata: encode_metadata(&self.metadata),
        })
    }
}

fn validate_link(link: &IdpLink) -> Result<()> {
    require(&link.idp_id, "idp id")?;
    require(&link.external_user_id, "external user id")
}

fn require_active_idp(idps: &OrgIdpsWriteModel, idp_id: &str) -> Result<()> {
    match idps.state.active(idp_id) {
        Some(_) => Ok(()),
        None => Err(PlatformError::not_found("Errors.IDP.NotFound", "identity provider", idp_id)),
    }
}

impl Commands {
    /// Create a human user together with its provider links in one batch.
    pub async fn add_human(
        &self,
        ctx: &ExecutionContext,
        resource_owner: &str,
        human: &AddHuman,
    ) -> Result<(String, ObjectDetails)> {
        require(resource_owner, "resource owner")?;
        human.validate()?;

        let user_id = match &human.user_id {
            Some(id) => {
                require(id, "user id")?;
                id.clone()
            }
            None => self.next_id(),
        };
        let id = user_id.as_str();

        let details = self
            .with_retry("add_human", || async move {
                let user = self.load(HumanReducer::write_model(id, resource_owner)).await?;
                if user.state.exists() {
                    return Err(PlatformError::already_exists("Errors.User.AlreadyExists", "user", id));
                }
                if !human.links.is_empty() {
                    let idps = self.org_idps(resource_owner).await?;
                    for link in &human.links {
                        require_active_idp(&idps, &link.idp_id)?;
                    }
                }

                let mut events = Vec::with_capacity(1 + human.links.len());
                events.push(human.added_event());
                events.extend(human.links.iter().map(user_idp_link_added));
                self.push(ctx, &user.aggregate, user.processed_sequence, &events).await
            })
            .await?;

        info!(
            user_id = %user_id,
            resource_owner,
            links = human.links.len(),
            correlation_id = %ctx.correlation_id,
            "Human user added"
        );
        Ok((user_id, details))
    }

    /// Link an existing user to an account at an active provider.
    pub async fn add_user_idp_link(
        &self,
        ctx: &ExecutionContext,
        resource_owner: &str,
        user_id: &str,
        link: &AddLink,
    ) -> Result<ObjectDetails> {
        require(resource_owner, "resource owner")?;
        require(user_id, "user id")?;
        validate_link(link)?;

        let details = self
            .with_retry("add_user_idp_link", || async move {
                let user = self.load(HumanReducer::write_model(user_id, resource_owner)).await?;
                if !user.state.exists() {
                    return Err(PlatformError::not_found("Errors.User.NotFound", "user", user_id));
                }
                let idps = self.org_idps(resource_owner).await?;
                require_active_idp(&idps, &link.idp_id)?;
                if user.state.has_link(&link.idp_id, &link.external_user_id) {
                    return Err(PlatformError::already_exists(
                        "Errors.User.IDPLink.AlreadyExists",
                        "user idp link",
                        format!("{}:{}", link.idp_id, link.external_user_id),
                    ));
                }
                self.push(ctx, &user.aggregate, user.processed_sequence, &[user_idp_link_added(link)])
                    .await
            })
            .await?;

        info!(
            user_id,
            idp_id = %link.idp_id,
            resource_owner,
            correlation_id = %ctx.correlation_id,
            "User IDP link added"
        );
        Ok(details)
    }
}
