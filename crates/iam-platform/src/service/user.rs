//! User request mapping.
//!
//! Turns externally shaped user requests into [`AddHuman`] commands before
//! anything is persisted.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use crate::domain::{render_confirm_url_template, Email, ExecutionContext, Gender, ObjectDetails, Phone, Profile};
use crate::error::{PlatformError, Result};
use crate::operations::{AddHuman, AddLink, Commands};

/// The only password hash format accepted for import.
pub const BCRYPT: &str = "bcrypt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashedPassword {
    pub algorithm: String,
    pub hash: String,
    pub change_required: bool,
}

/// How the email address of a new user gets verified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EmailVerification {
    /// Send a code, optionally linking to a custom confirmation page
    #[default]
    SendCode,
    SendCodeWithTemplate { url_template: String },
    /// Hand the code back to the caller
    ReturnCode,
    IsVerified,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileRequest {
    pub first_name: String,
    pub last_name: String,
    pub nick_name: Option<String>,
    pub display_name: Option<String>,
    pub preferred_language: Option<String>,
    /// 0 unspecified, 1 female, 2 male, 3 diverse
    pub gender: i32,
}

#[derive(Debug, Clone, Default)]
pub struct AddUserRequest {
    pub user_id: Option<String>,
    /// Defaults to the email address
    pub username: Option<String>,
    /// Ignored: users are always created in the caller's resource owner.
    pub organisation_id: Option<String>,
    pub profile: ProfileRequest,
    pub email: String,
    pub email_verification: EmailVerification,
    pub phone: Option<Phone>,
    pub hashed_password: Option<HashedPassword>,
    pub metadata: Vec<(String, Vec<u8>)>,
    pub idp_links: Vec<AddLink>,
}

/// Accept a pre-hashed password, passing the hash through unchanged.
pub fn hashed_password_to_command(hashed: Option<&HashedPassword>) -> Result<Option<String>> {
    match hashed {
        None => Ok(None),
        Some(h) if h.algorithm == BCRYPT => Ok(Some(h.hash.clone())),
        Some(h) => Err(PlatformError::invalid_argument(
            "Errors.InvalidArgument",
            format!("unsupported password hash algorithm '{}'", h.algorithm),
        )),
    }
}

pub fn gender_from_code(code: i32) -> Gender {
    match code {
        1 => Gender::Female,
        2 => Gender::Male,
        3 => Gender::Diverse,
        _ => Gender::Unspecified,
    }
}

pub fn add_user_request_to_add_human(request: &AddUserRequest) -> Result<AddHuman> {
    let username = request
        .username
        .as_deref()
        .filter(|u| !u.is_empty())
        .unwrap_or(&request.email)
        .to_string();

    let url_template = match &request.email_verification {
        EmailVerification::SendCodeWithTemplate { url_template } => {
            render_confirm_url_template(
                url_template,
                request.user_id.as_deref().unwrap_or_default(),
                "code",
                "orgID",
            )?;
            Some(url_template.clone())
        }
        _ => None,
    };

    let encoded_password_hash = hashed_password_to_command(request.hashed_password.as_ref())?;
    let password_change_required = request
        .hashed_password
        .as_ref()
        .map(|h| h.change_required)
        .unwrap_or(false);

    let profile = &request.profile;
    Ok(AddHuman {
        user_id: request.user_id.clone().filter(|id| !id.is_empty()),
        user_name: username,
        profile: Profile {
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            nick_name: profile.nick_name.clone(),
            display_name: profile.display_name.clone(),
            preferred_language: profile.preferred_language.clone(),
            gender: gender_from_code(profile.gender),
        },
        email: Email {
            address: request.email.clone(),
            verified: request.email_verification == EmailVerification::IsVerified,
            url_template,
        },
        phone: request.phone.clone(),
        encoded_password_hash,
        password_change_required,
        metadata: request.metadata.iter().cloned().collect::<BTreeMap<_, _>>(),
        links: request.idp_links.clone(),
    })
}

#[derive(Clone)]
pub struct UserService {
    commands: Arc<Commands>,
}

impl UserService {
    pub fn new(commands: Arc<Commands>) -> Self {
        Self { commands }
    }

    pub async fn add_human_user(
        &self,
        ctx: &ExecutionContext,
        resource_owner: &str,
        request: &AddUserRequest,
    ) -> Result<(String, ObjectDetails)> {
        let human = add_user_request_to_add_human(request)?;
        let (user_id, details) = self.commands.add_human(ctx, resource_owner, &human).await?;
        info!(user_id = %user_id, resource_owner = resource_owner, "Human user request handled");
        Ok((user_id, details))
    }

    pub async fn add_idp_link(
        &self,
        ctx: &ExecutionContext,
        resource_owner: &str,
        user_id: &str,
        link: &AddLink,
    ) -> Result<ObjectDetails> {
        self.commands.add_user_idp_link(ctx, resource_owner, user_id, link).await
    }
}
