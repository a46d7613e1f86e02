//! Realtime fan-out of committed domain events.
//!
//! Each event is projected into one or more messages addressed to named
//! groups. Task events under a scenario are split: administrative groups get
//! the full task, the scenario's own group gets a redacted summary.

mod broadcast_handlers;
mod broadcast_model;
mod broadcast_traits;
mod projection;

pub use broadcast_handlers::{plan_broadcast, register_broadcast_handlers, BroadcastHandler};
pub use broadcast_model::{
    admin_group, resource_group, system_group, BroadcastMessage, PayloadView,
};
pub use broadcast_traits::{MockRealtimeChannel, RealtimeChannel, SentMessage};
pub use projection::{
    full_payload, identity_payload, parse_action_parameters, redacted_task_payload, TaskSummary,
};
