//! Platform Events
//!
//! Every event the kernel appends is one variant of [`PlatformEvent`]. The
//! variant list below is the single source for the tag of each variant and
//! for the registry that decodes stored events back into variants.
//!
//! Aggregates:
//! - `org` holds the identity provider configurations of one organisation
//!   (aggregate id == resource owner)
//! - `idpintent` holds one federation attempt
//! - `user` holds one human user and its provider links

pub mod idp;
pub mod intent;
pub mod user;

pub use idp::*;
pub use intent::*;
pub use user::*;

use iam_eventstore::{Aggregate, EventRegistry, PendingEvent};

use crate::domain::{
    GoogleChanges, GoogleConfig, IdpLink, JwtChanges, JwtConfig, LdapChanges, LdapConfig, OAuthChanges,
    OAuthConfig, OidcChanges, OidcConfig,
};
use crate::error::Result;

pub const ORG_AGGREGATE_TYPE: &str = "org";
pub const INTENT_AGGREGATE_TYPE: &str = "idpintent";
pub const USER_AGGREGATE_TYPE: &str = "user";

pub fn org_aggregate(resource_owner: &str) -> Aggregate {
    Aggregate::new(ORG_AGGREGATE_TYPE, resource_owner, resource_owner)
}

pub fn intent_aggregate(intent_id: &str, resource_owner: &str) -> Aggregate {
    Aggregate::new(INTENT_AGGREGATE_TYPE, intent_id, resource_owner)
}

pub fn user_aggregate(user_id: &str, resource_owner: &str) -> Aggregate {
    Aggregate::new(USER_AGGREGATE_TYPE, user_id, resource_owner)
}

macro_rules! platform_events {
    ($($variant:ident($payload:ty) = $tag:expr,)+) => {
        #[derive(Debug, Clone, PartialEq)]
        pub enum PlatformEvent {
            $($variant($payload),)+
        }

        impl PlatformEvent {
            /// Every tag the kernel has ever written.
            pub const EVENT_TYPES: &'static [&'static str] = &[$($tag),+];

            pub fn event_type(&self) -> &'static str {
                match self {
                    $(Self::$variant(_) => $tag,)+
                }
            }

            fn payload(&self) -> serde_json::Result<serde_json::Value> {
                match self {
                    $(Self::$variant(payload) => serde_json::to_value(payload),)+
                }
            }
        }

        /// Registry decoding every [`PlatformEvent`] tag.
        pub fn registry() -> EventRegistry<PlatformEvent> {
            let mut registry = EventRegistry::new();
            $(registry.register_payload($tag, PlatformEvent::$variant);)+
            registry
        }
    };
}

platform_events! {
    OAuthIdpAdded(IdpAdded<OAuthConfig>) = OAUTH_IDP_ADDED,
    OAuthIdpChanged(IdpChanged<OAuthChanges>) = OAUTH_IDP_CHANGED,
    OidcIdpAdded(IdpAdded<OidcConfig>) = OIDC_IDP_ADDED,
    OidcIdpChanged(IdpChanged<OidcChanges>) = OIDC_IDP_CHANGED,
    JwtIdpAdded(IdpAdded<JwtConfig>) = JWT_IDP_ADDED,
    JwtIdpChanged(IdpChanged<JwtChanges>) = JWT_IDP_CHANGED,
    GoogleIdpAdded(IdpAdded<GoogleConfig>) = GOOGLE_IDP_ADDED,
    GoogleIdpChanged(IdpChanged<GoogleChanges>) = GOOGLE_IDP_CHANGED,
    LdapIdpAdded(IdpAdded<LdapConfig>) = LDAP_IDP_ADDED,
    LdapIdpChanged(IdpChanged<LdapChanges>) = LDAP_IDP_CHANGED,
    IdpRemoved(IdpRemoved) = IDP_REMOVED,
    IntentStarted(IntentStarted) = INTENT_STARTED,
    IntentSucceeded(IntentSucceeded) = INTENT_SUCCEEDED,
    IntentFailed(IntentFailed) = INTENT_FAILED,
    HumanAdded(HumanAdded) = HUMAN_ADDED,
    UserIdpLinkAdded(IdpLink) = USER_IDP_LINK_ADDED,
}

impl PlatformEvent {
    /// Serialize for appending, recording `editor_id` as the editor.
    pub fn to_pending(&self, editor_id: &str) -> Result<PendingEvent> {
        Ok(PendingEvent::new(self.event_type(), editor_id, self.payload()?))
    }
}
