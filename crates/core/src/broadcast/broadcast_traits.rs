use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::Result;

/// Realtime delivery channel keyed by named groups.
///
/// Clients join and leave groups on their own; the channel delivers a message
/// to every client in any of the addressed groups.
#[async_trait]
pub trait RealtimeChannel: Send + Sync {
    async fn send_to_groups(&self, groups: &[String], event_name: &str, payload: Value)
        -> Result<()>;
}

/// A message captured by [`MockRealtimeChannel`].
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub groups: Vec<String>,
    pub event_name: String,
    pub payload: Value,
}

/// Channel that records every send.
#[derive(Clone, Default)]
pub struct MockRealtimeChannel {
    sent: Arc<Mutex<Vec<SentMessage>>>,
}

impl MockRealtimeChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Messages that addressed `group`, in send order.
    pub fn sent_to(&self, group: &str) -> Vec<SentMessage> {
        self.sent()
            .into_iter()
            .filter(|m| m.groups.iter().any(|g| g == group))
            .collect()
    }
}

#[async_trait]
impl RealtimeChannel for MockRealtimeChannel {
    async fn send_to_groups(
        &self,
        groups: &[String],
        event_name: &str,
        payload: Value,
    ) -> Result<()> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(SentMessage {
                groups: groups.to_vec(),
                event_name: event_name.to_string(),
                payload,
            });
        }
        Ok(())
    }
}
