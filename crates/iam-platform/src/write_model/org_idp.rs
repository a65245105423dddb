//! Identity providers of one organisation.

use std::collections::BTreeMap;

use iam_eventstore::{Reducer, StoredEvent, WriteModel};
use tracing::debug;

use crate::domain::{IdpOptionChanges, IdpOptions, IdpState, ProviderChanges, ProviderConfig};
use crate::events::{org_aggregate, PlatformEvent, IDP_EVENT_PREFIX};

pub type OrgIdpsWriteModel = WriteModel<OrgIdpsReducer>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdpEntry {
    pub idp_id: String,
    pub name: String,
    pub options: IdpOptions,
    pub provider: ProviderConfig,
    pub state: IdpState,
}

impl IdpEntry {
    pub fn is_active(&self) -> bool {
        self.state == IdpState::Active
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrgIdpsReducer {
    idps: BTreeMap<String, IdpEntry>,
}

impl OrgIdpsReducer {
    pub fn write_model(resource_owner: &str) -> OrgIdpsWriteModel {
        WriteModel::new(org_aggregate(resource_owner), Self::default())
    }

    /// Any provider ever added under this id, removed ones included.
    pub fn get(&self, idp_id: &str) -> Option<&IdpEntry> {
        self.idps.get(idp_id)
    }

    pub fn active(&self, idp_id: &str) -> Option<&IdpEntry> {
        self.idps.get(idp_id).filter(|e| e.is_active())
    }

    pub fn active_idps(&self) -> impl Iterator<Item = &IdpEntry> {
        self.idps.values().filter(|e| e.is_active())
    }

    /// Whether an active provider other than `except` already uses `name`.
    pub fn is_name_taken(&self, name: &str, except: Option<&str>) -> bool {
        self.active_idps()
            .any(|e| e.name == name && Some(e.idp_id.as_str()) != except)
    }

    fn added(&mut self, idp_id: &str, name: &str, options: &IdpOptions, provider: ProviderConfig) {
        self.idps.insert(
            idp_id.to_string(),
            IdpEntry {
                idp_id: idp_id.to_string(),
                name: name.to_string(),
                options: options.clone(),
                provider,
                state: IdpState::Active,
            },
        );
    }

    fn changed(
        &mut self,
        idp_id: &str,
        name: &Option<String>,
        options: &Option<IdpOptionChanges>,
        changes: &ProviderChanges,
    ) {
        let Some(entry) = self.idps.get_mut(idp_id).filter(|e| e.is_active()) else {
            debug!(idp_id, "Change for unknown or removed provider ignored");
            return;
        };
        if !entry.provider.apply(changes) {
            debug!(idp_id, "Change for another provider type ignored");
            return;
        }
        if let Some(name) = name {
            entry.name = name.clone();
        }
        if let Some(options) = options {
            entry.options.apply(options);
        }
    }
}

impl Reducer for OrgIdpsReducer {
    type Event = PlatformEvent;

    fn handles(&self, event_type: &str) -> bool {
        event_type.starts_with(IDP_EVENT_PREFIX)
    }

    fn reduce(&mut self, _event: &StoredEvent, data: &PlatformEvent) {
        match data {
            PlatformEvent::OAuthIdpAdded(e) => {
                self.added(&e.idp_id, &e.name, &e.options, ProviderConfig::OAuth(e.config.clone()))
            }
            PlatformEvent::OidcIdpAdded(e) => {
                self.added(&e.idp_id, &e.name, &e.options, ProviderConfig::Oidc(e.config.clone()))
            }
            PlatformEvent::JwtIdpAdded(e) => {
                self.added(&e.idp_id, &e.name, &e.options, ProviderConfig::Jwt(e.config.clone()))
            }
            PlatformEvent::GoogleIdpAdded(e) => {
                self.added(&e.idp_id, &e.name, &e.options, ProviderConfig::Google(e.config.clone()))
            }
            PlatformEvent::LdapIdpAdded(e) => {
                self.added(&e.idp_id, &e.name, &e.options, ProviderConfig::Ldap(e.config.clone()))
            }
            PlatformEvent::OAuthIdpChanged(e) => {
                self.changed(&e.idp_id, &e.name, &e.options, &ProviderChanges::OAuth(e.changes.clone()))
            }
            PlatformEvent::OidcIdpChanged(e) => {
                self.changed(&e.idp_id, &e.name, &e.options, &ProviderChanges::Oidc(e.changes.clone()))
            }
            PlatformEvent::JwtIdpChanged(e) => {
                self.changed(&e.idp_id, &e.name, &e.options, &ProviderChanges::Jwt(e.changes.clone()))
            }
            PlatformEvent::GoogleIdpChanged(e) => {
                self.changed(&e.idp_id, &e.name, &e.options, &ProviderChanges::Google(e.changes.clone()))
            }
            PlatformEvent::LdapIdpChanged(e) => {
                self.changed(&e.idp_id, &e.name, &e.options, &ProviderChanges::Ldap(e.changes.clone()))
            }
            PlatformEvent::IdpRemoved(e) => {
                if let Some(entry) = self.idps.get_mut(&e.idp_id) {
                    entry.state = IdpState::Removed;
                }
            }
            _ => {}
        }
    }
}
