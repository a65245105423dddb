//! Human user write model.

use iam_eventstore::{Reducer, StoredEvent, WriteModel};

use crate::domain::{IdpLink, UserState};
use crate::events::{user_aggregate, PlatformEvent, HUMAN_ADDED, USER_IDP_LINK_ADDED};

pub type HumanWriteModel = WriteModel<HumanReducer>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HumanReducer {
    pub state: UserState,
    pub user_name: String,
    pub email: String,
    pub links: Vec<IdpLink>,
}

impl HumanReducer {
    pub fn write_model(user_id: &str, resource_owner: &str) -> HumanWriteModel {
        WriteModel::new(user_aggregate(user_id, resource_owner), Self::default())
    }

    pub fn exists(&self) -> bool {
        self.state != UserState::Unspecified
    }

    pub fn has_link(&self, idp_id: &str, external_user_id: &str) -> bool {
        self.links
            .iter()
            .any(|l| l.idp_id == idp_id && l.external_user_id == external_user_id)
    }
}

impl Reducer for HumanReducer {
    type Event = PlatformEvent;

    fn handles(&self, event_type: &str) -> bool {
        matches!(event_type, HUMAN_ADDED | USER_IDP_LINK_ADDED)
    }

    fn reduce(&mut self, _event: &StoredEvent, data: &PlatformEvent) {
        match data {
            PlatformEvent::HumanAdded(e) => {
                self.state = UserState::Active;
                self.user_name = e.user_name.clone();
                self.email = e.email.clone();
            }
            PlatformEvent::UserIdpLinkAdded(link) => {
                if !self.has_link(&link.idp_id, &link.external_user_id) {
                    self.links.push(link.clone());
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Profile;
    use crate::events::{registry, user_idp_link_added, HumanAdded};
    use chrono::{DateTime, Utc};

    fn stored(events: Vec<PlatformEvent>) -> Vec<StoredEvent> {
        events
            .into_iter()
            .enumerate()
            .map(|(i, event)| {
                let pending = event.to_pending("admin").unwrap();
                StoredEvent {
                    aggregate_type: "user".to_string(),
                    aggregate_id: "u1".to_string(),
                    resource_owner: "org-1".to_string(),
                    sequence: i as u64 + 1,
                    creation_time: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
                    editor_id: pending.editor_id,
                    event_type: pending.event_type,
                    payload: pending.payload,
                }
            })
            .collect()
    }

    fn fold(events: Vec<PlatformEvent>) -> HumanReducer {
        HumanReducer::write_model("u1", "org-1")
            .reduce(&registry(), &stored(events))
            .unwrap()
            .state
    }

    fn added() -> PlatformEvent {
        PlatformEvent::HumanAdded(HumanAdded {
            user_name: "ada".to_string(),
            profile: Profile {
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                ..Default::default()
            },
            email: "ada@example.com".to_string(),
            is_email_verified: false,
            phone: None,
            encoded_hash: None,
            password_change_required: false,
            metadata: Default::default(),
        })
    }

    fn link(idp_id: &str, external: &str) -> PlatformEvent {
        user_idp_link_added(&IdpLink {
            idp_id: idp_id.to_string(),
            external_user_id: external.to_string(),
            display_name: "ada@example.com".to_string(),
        })
    }

    #[test]
    fn test_added_sets_state() {
        let user = fold(vec![added()]);
        assert!(user.exists());
        assert_eq!(user.state, UserState::Active);
        assert_eq!(user.user_name, "ada");
        assert_eq!(user.email, "ada@example.com");
        assert!(user.links.is_empty());
    }

    #[test]
    fn test_duplicate_links_are_kept_once() {
        let user = fold(vec![
            added(),
            link("google-1", "108234"),
            link("google-1", "108234"),
            link("github-1", "108234"),
        ]);
        assert_eq!(user.links.len(), 2);
        assert!(user.has_link("google-1", "108234"));
        assert!(user.has_link("github-1", "108234"));
        assert!(!user.has_link("google-1", "other"));
    }

    #[test]
    fn test_link_before_added_does_not_create_user() {
        let user = fold(vec![link("google-1", "108234")]);
        assert!(!user.exists());
        assert!(user.has_link("google-1", "108234"));

        let user = fold(vec![link("google-1", "108234"), added()]);
        assert!(user.exists());
        assert_eq!(user.links.len(), 1);
    }
}
