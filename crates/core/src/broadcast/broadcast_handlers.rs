//! Realtime broadcast of committed domain events.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};

use super::{
    admin_group, full_payload, identity_payload, redacted_task_payload, resource_group,
    system_group, BroadcastMessage, PayloadView, RealtimeChannel,
};
use crate::entities::{Entity, EntityKind, OwnershipScope};
use crate::errors::Result;
use crate::events::{DomainEvent, EventHandler, EventShape, NotificationBusBuilder};

/// Full and redacted audiences for one event.
#[derive(Debug, Default, PartialEq, Eq)]
struct Audience {
    full: Vec<String>,
    redacted: Vec<String>,
}

fn audience(kind: EntityKind, scope: OwnershipScope) -> Audience {
    let mut audience = Audience::default();
    match kind {
        EntityKind::ScenarioTemplate | EntityKind::ScenarioTemplateMembership => {
            audience.full.push(system_group());
            if let Some(template_id) = scope.scenario_template_id {
                audience.full.push(resource_group(template_id));
            }
        }
        EntityKind::Scenario | EntityKind::ScenarioMembership | EntityKind::Result => {
            if let Some(scenario_id) = scope.scenario_id {
                audience.full.push(resource_group(scenario_id));
            }
            audience.full.push(system_group());
        }
        EntityKind::Task => {
            audience.full.push(system_group());
            match (scope.scenario_id, scope.scenario_template_id) {
                (Some(scenario_id), _) => {
                    audience.full.push(admin_group(scenario_id));
                    audience.redacted.push(resource_group(scenario_id));
                }
                (None, Some(template_id)) => audience.full.push(resource_group(template_id)),
                (None, None) => {}
            }
        }
    }
    audience
}

/// Projects `event` into the messages the realtime channel must send.
///
/// Pure: the same event always yields the same messages.
pub fn plan_broadcast(event: &DomainEvent) -> Result<Vec<BroadcastMessage>> {
    let event_name = event.name();
    let Audience { full, redacted } = audience(event.kind(), event.scope());

    let Some(entity) = event.entity() else {
        let mut groups = full;
        groups.extend(redacted);
        return Ok(vec![BroadcastMessage {
            groups,
            event_name,
            view: PayloadView::Identity,
            payload: identity_payload(event.id()),
        }]);
    };

    let mut messages = vec![BroadcastMessage {
        groups: full,
        event_name,
        view: PayloadView::Full,
        payload: full_payload(entity)?,
    }];
    match entity {
        Entity::Task(task) if !redacted.is_empty() => messages.push(BroadcastMessage {
            groups: redacted,
            event_name,
            view: PayloadView::Redacted,
            payload: redacted_task_payload(task)?,
        }),
        _ => {}
    }
    Ok(messages)
}

/// Sends the events of one shape to the realtime channel.
pub struct BroadcastHandler {
    name: String,
    channel: Arc<dyn RealtimeChannel>,
}

impl BroadcastHandler {
    pub fn new(shape: EventShape, channel: Arc<dyn RealtimeChannel>) -> Self {
        Self {
            name: format!("broadcast:{}", shape.name()),
            channel,
        }
    }
}

#[async_trait]
impl EventHandler for BroadcastHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: &DomainEvent) -> Result<()> {
        let mut first_error = None;
        for message in plan_broadcast(event)? {
            debug!(
                "Broadcasting {} ({:?}) to {:?}",
                message.event_name, message.view, message.groups
            );
            if let Err(e) = self
                .channel
                .send_to_groups(&message.groups, message.event_name, message.payload)
                .await
            {
                warn!("Broadcast of {} failed: {}", message.event_name, e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Subscribes one broadcast handler for every event shape.
pub fn register_broadcast_handlers(
    builder: NotificationBusBuilder,
    channel: Arc<dyn RealtimeChannel>,
) -> NotificationBusBuilder {
    EventShape::all().fold(builder, |builder, shape| {
        builder.subscribe(shape, Arc::new(BroadcastHandler::new(shape, channel.clone())))
    })
}
