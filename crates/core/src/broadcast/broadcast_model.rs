use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::constants::{ADMIN_GROUP_SUFFIX, SYSTEM_GROUP};

/// Which projection of the entity a message carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PayloadView {
    /// Complete post-mutation state.
    Full,
    /// Task summary without scoring-sensitive fields.
    Redacted,
    /// `{"id": ...}` only, used for deletions.
    Identity,
}

/// One send on the realtime channel.
#[derive(Debug, Clone, PartialEq)]
pub struct BroadcastMessage {
    pub groups: Vec<String>,
    pub event_name: &'static str,
    pub view: PayloadView,
    pub payload: Value,
}

/// The global administrative group.
pub fn system_group() -> String {
    SYSTEM_GROUP.to_string()
}

/// Group of clients following one scenario or template.
pub fn resource_group(id: Uuid) -> String {
    id.to_string()
}

/// Administrative view of one resource's children.
pub fn admin_group(id: Uuid) -> String {
    format!("{}{}", id, ADMIN_GROUP_SUFFIX)
}
