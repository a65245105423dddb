//! Human user value types.

use serde::{Deserialize, Serialize};

use crate::error::{PlatformError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    #[default]
    Unspecified,
    Female,
    Male,
    Diverse,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserState {
    #[default]
    Unspecified,
    Active,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nick_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_language: Option<String>,
    #[serde(default)]
    pub gender: Gender,
}

/// Email address plus how it gets verified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Email {
    pub address: String,
    pub verified: bool,
    /// Confirmation link template, see [`render_confirm_url_template`]
    pub url_template: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phone {
    pub number: String,
    pub verified: bool,
}

/// Link between a local user and an account at an identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdpLink {
    #[serde(rename = "idpID")]
    pub idp_id: String,
    #[serde(rename = "userID")]
    pub external_user_id: String,
    pub display_name: String,
}

const INVALID_TEMPLATE: &str = "Errors.User.Email.InvalidURLTemplate";

/// Render an email confirmation link template.
///
/// Only the `{{.UserID}}`, `{{.Code}}` and `{{.OrgID}}` placeholders are
/// understood; anything else between braces, or an unbalanced brace pair,
/// rejects the template.
pub fn render_confirm_url_template(template: &str, user_id: &str, code: &str, org_id: &str) -> Result<String> {
    let invalid = |message: String| PlatformError::invalid_argument(INVALID_TEMPLATE, message);

    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        let (literal, tail) = rest.split_at(start);
        if literal.contains("}}") {
            return Err(invalid("unbalanced '}}' in url template".to_string()));
        }
        rendered.push_str(literal);

        let end = tail
            .find("}}")
            .ok_or_else(|| invalid("unterminated '{{' in url template".to_string()))?;
        let value = match tail[2..end].trim() {
            ".UserID" => user_id,
            ".Code" => code,
            ".OrgID" => org_id,
            other => return Err(invalid(format!("unknown placeholder '{}' in url template", other))),
        };
        rendered.push_str(value);
        rest = &tail[end + 2..];
    }
    if rest.contains("}}") {
        return Err(invalid("unbalanced '}}' in url template".to_string()));
    }
    rendered.push_str(rest);
    Ok(rendered)
}
