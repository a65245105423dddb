//! Federation intent write model.

use iam_eventstore::{Reducer, StoredEvent, WriteModel};
use iam_secrets::CryptoValue;
use serde_json::Value;

use crate::domain::IntentState;
use crate::events::{intent_aggregate, PlatformEvent, INTENT_FAILED, INTENT_STARTED, INTENT_SUCCEEDED};

pub type IntentWriteModel = WriteModel<IntentReducer>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntentReducer {
    pub idp_id: String,
    pub success_url: String,
    pub failure_url: String,
    pub state: IntentState,
    pub idp_user_id: Option<String>,
    pub user_payload: Option<Value>,
    pub access_token: Option<CryptoValue>,
    pub id_token: Option<String>,
    pub failure_reason: Option<String>,
}

impl IntentReducer {
    pub fn write_model(intent_id: &str, resource_owner: &str) -> IntentWriteModel {
        WriteModel::new(intent_aggregate(intent_id, resource_owner), Self::default())
    }
}

impl Reducer for IntentReducer {
    type Event = PlatformEvent;

    fn handles(&self, event_type: &str) -> bool {
        matches!(event_type, INTENT_STARTED | INTENT_SUCCEEDED | INTENT_FAILED)
    }

    fn reduce(&mut self, _event: &StoredEvent, data: &PlatformEvent) {
        match data {
            PlatformEvent::IntentStarted(e) if self.state == IntentState::Unspecified => {
                self.idp_id = e.idp_id.clone();
                self.success_url = e.success_url.clone();
                self.failure_url = e.failure_url.clone();
                self.state = IntentState::Started;
            }
            PlatformEvent::IntentSucceeded(e) if self.state == IntentState::Started => {
                self.idp_user_id = e.idp_user_id.clone();
                self.user_payload = Some(e.user_payload.clone());
                self.access_token = Some(e.access_token.clone());
                self.id_token = e.id_token.clone();
                self.state = IntentState::Succeeded;
            }
            PlatformEvent::IntentFailed(e) if self.state == IntentState::Started => {
                self.failure_reason = Some(e.reason.clone());
                self.state = IntentState::Failed;
            }
            _ => {}
        }
    }
}
