//! Human user events on the `user` aggregate.

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use super::PlatformEvent;
use crate::domain::{IdpLink, Phone, Profile};

pub const HUMAN_ADDED: &str = "user.human.added";
pub const USER_IDP_LINK_ADDED: &str = "user.idp.link.added";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HumanAdded {
    pub user_name: String,
    #[serde(flatten)]
    pub profile: Profile,
    pub email: String,
    #[serde(default)]
    pub is_email_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<Phone>,
    /// Pass-through bcrypt hash
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoded_hash: Option<String>,
    #[serde(default)]
    pub password_change_required: bool,
    /// Metadata values, standard base64
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl HumanAdded {
    pub fn metadata_value(&self, key: &str) -> Option<Vec<u8>> {
        self.metadata.get(key).and_then(|v| STANDARD.decode(v).ok())
    }
}

pub fn encode_metadata(metadata: &BTreeMap<String, Vec<u8>>) -> BTreeMap<String, String> {
    metadata
        .iter()
        .map(|(key, value)| (key.clone(), STANDARD.encode(value)))
        .collect()
}

pub fn user_idp_link_added(link: &IdpLink) -> PlatformEvent {
    PlatformEvent::UserIdpLinkAdded(link.clone())
}
