//! Realtime group hub.
//!
//! Each connected client owns a bounded queue that its SSE stream drains.
//! Clients join named groups; a send addressed to several groups reaches a
//! client once even when it belongs to more than one of them.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use rangeops_core::broadcast::RealtimeChannel;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

pub type ClientId = Uuid;

/// Envelope delivered to one client.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ServerEvent {
    pub name: String,
    pub payload: Value,
}

#[derive(Error, Debug)]
pub enum HubError {
    #[error("Unknown realtime client {0}")]
    UnknownClient(ClientId),
    #[error("Client {client} may not join group {group}")]
    Forbidden { client: ClientId, group: String },
}

/// Decides whether a client may join a group.
#[async_trait]
pub trait GroupAccessPolicy: Send + Sync {
    async fn can_join(&self, client: ClientId, group: &str) -> bool;
}

/// Lets every client join every group.
pub struct OpenGroupAccess;

#[async_trait]
impl GroupAccessPolicy for OpenGroupAccess {
    async fn can_join(&self, _client: ClientId, _group: &str) -> bool {
        true
    }
}

#[derive(Default)]
struct HubState {
    clients: HashMap<ClientId, mpsc::Sender<ServerEvent>>,
    groups: HashMap<String, HashSet<ClientId>>,
}

impl HubState {
    fn remove_client(&mut self, client: ClientId) -> bool {
        let known = self.clients.remove(&client).is_some();
        self.groups.retain(|_, members| {
            members.remove(&client);
            !members.is_empty()
        });
        known
    }
}

#[derive(Clone)]
pub struct GroupHub {
    state: Arc<Mutex<HubState>>,
    policy: Arc<dyn GroupAccessPolicy>,
    capacity: usize,
}

impl GroupHub {
    pub fn new(capacity: usize, policy: Arc<dyn GroupAccessPolicy>) -> Self {
        Self {
            state: Arc::new(Mutex::new(HubState::default())),
            policy,
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a client and returns the receiving end of its queue.
    pub fn connect(&self) -> (ClientId, mpsc::Receiver<ServerEvent>) {
        let client = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(self.capacity);
        self.lock().clients.insert(client, tx);
        tracing::debug!("Realtime client {} connected", client);
        (client, rx)
    }

    /// Forgets a client and all of its group memberships.
    pub fn disconnect(&self, client: ClientId) {
        if self.lock().remove_client(client) {
            tracing::debug!("Realtime client {} disconnected", client);
        }
    }

    pub async fn join(&self, client: ClientId, group: &str) -> Result<(), HubError> {
        if !self.lock().clients.contains_key(&client) {
            return Err(HubError::UnknownClient(client));
        }
        if !self.policy.can_join(client, group).await {
            return Err(HubError::Forbidden {
                client,
                group: group.to_string(),
            });
        }

        let mut state = self.lock();
        // The client may have gone away while the policy was consulted.
        if !state.clients.contains_key(&client) {
            return Err(HubError::UnknownClient(client));
        }
        state
            .groups
            .entry(group.to_string())
            .or_default()
            .insert(client);
        Ok(())
    }

    /// Returns false when the client was not in the group.
    pub fn leave(&self, client: ClientId, group: &str) -> bool {
        let mut state = self.lock();
        let Some(members) = state.groups.get_mut(group) else {
            return false;
        };
        let removed = members.remove(&client);
        if members.is_empty() {
            state.groups.remove(group);
        }
        removed
    }

    pub fn client_count(&self) -> usize {
        self.lock().clients.len()
    }

    pub fn group_size(&self, group: &str) -> usize {
        self.lock().groups.get(group).map_or(0, HashSet::len)
    }

    /// Queues `event` for every client in any of `groups`. Returns the number
    /// of clients it was queued for.
    pub fn deliver(&self, groups: &[String], event: ServerEvent) -> usize {
        let mut state = self.lock();
        let recipients: HashSet<ClientId> = groups
            .iter()
            .filter_map(|group| state.groups.get(group))
            .flatten()
            .copied()
            .collect();

        let mut delivered = 0;
        let mut closed = Vec::new();
        for client in recipients {
            let Some(tx) = state.clients.get(&client) else {
                continue;
            };
            match tx.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        "Realtime client {} is not keeping up, dropped {}",
                        client,
                        event.name
                    );
                }
                Err(TrySendError::Closed(_)) => closed.push(client),
            }
        }
        for client in closed {
            state.remove_client(client);
        }
        delivered
    }
}

#[async_trait]
impl RealtimeChannel for GroupHub {
    async fn send_to_groups(
        &self,
        groups: &[String],
        event_name: &str,
        payload: Value,
    ) -> rangeops_core::Result<()> {
        let delivered = self.deliver(
            groups,
            ServerEvent {
                name: event_name.to_string(),
                payload,
            },
        );
        tracing::debug!(
            "Sent {} to {} client(s) in {:?}",
            event_name,
            delivered,
            groups
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct DenyAdmin;

    #[async_trait]
    impl GroupAccessPolicy for DenyAdmin {
        async fn can_join(&self, _client: ClientId, group: &str) -> bool {
            !group.ends_with("-System")
        }
    }

    fn hub() -> GroupHub {
        GroupHub::new(4, Arc::new(OpenGroupAccess))
    }

    fn groups(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_client_in_two_groups_receives_once() {
        let hub = hub();
        let (client, mut rx) = hub.connect();
        hub.join(client, "System").await.unwrap();
        hub.join(client, "abc").await.unwrap();

        hub.send_to_groups(&groups(&["System", "abc"]), "TaskCreated", json!({"id": 1}))
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.name, "TaskCreated");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_only_group_members_receive() {
        let hub = hub();
        let (member, mut member_rx) = hub.connect();
        let (_outsider, mut outsider_rx) = hub.connect();
        hub.join(member, "scenario-1").await.unwrap();

        let delivered = hub.deliver(
            &groups(&["scenario-1"]),
            ServerEvent {
                name: "ScenarioUpdated".to_string(),
                payload: Value::Null,
            },
        );

        assert_eq!(delivered, 1);
        assert!(member_rx.try_recv().is_ok());
        assert!(outsider_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_leave_and_disconnect_clean_up_groups() {
        let hub = hub();
        let (client, _rx) = hub.connect();
        hub.join(client, "System").await.unwrap();
        hub.join(client, "abc").await.unwrap();

        assert!(hub.leave(client, "abc"));
        assert!(!hub.leave(client, "abc"));
        assert_eq!(hub.group_size("abc"), 0);

        hub.disconnect(client);
        assert_eq!(hub.group_size("System"), 0);
        assert_eq!(hub.client_count(), 0);
        assert!(matches!(
            hub.join(client, "System").await,
            Err(HubError::UnknownClient(_))
        ));
    }

    #[tokio::test]
    async fn test_policy_gates_join() {
        let hub = GroupHub::new(4, Arc::new(DenyAdmin));
        let (client, _rx) = hub.connect();
        assert!(hub.join(client, "abc").await.is_ok());
        assert!(matches!(
            hub.join(client, "abc-System").await,
            Err(HubError::Forbidden { .. })
        ));
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_blocking() {
        let hub = GroupHub::new(1, Arc::new(OpenGroupAccess));
        let (client, mut rx) = hub.connect();
        hub.join(client, "System").await.unwrap();
        let event = |n: i32| ServerEvent {
            name: format!("Event{}", n),
            payload: Value::Null,
        };

        assert_eq!(hub.deliver(&groups(&["System"]), event(1)), 1);
        assert_eq!(hub.deliver(&groups(&["System"]), event(2)), 0);
        assert_eq!(rx.recv().await.unwrap().name, "Event1");
        assert_eq!(hub.client_count(), 1);
    }

    #[tokio::test]
    async fn test_closed_client_is_pruned_on_send() {
        let hub = hub();
        let (client, rx) = hub.connect();
        hub.join(client, "System").await.unwrap();
        drop(rx);

        hub.deliver(
            &groups(&["System"]),
            ServerEvent {
                name: "ResultCreated".to_string(),
                payload: Value::Null,
            },
        );
        assert_eq!(hub.client_count(), 0);
    }
}
