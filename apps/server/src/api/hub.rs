use std::{
    convert::Infallible,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};

use crate::{
    error::ApiResult,
    events::{ClientId, GroupHub, ServerEvent},
    AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures_core::Stream;
use serde::Serialize;
use serde_json::json;
use tokio_stream::wrappers::ReceiverStream;

/// Name of the first event on every stream. Its payload carries the id the
/// client uses to join groups.
pub const CONNECTED_EVENT: &str = "Connected";

/// Client event stream that leaves the hub when the connection drops.
struct ClientStream {
    hub: GroupHub,
    client: ClientId,
    greeting: Option<ServerEvent>,
    inner: ReceiverStream<ServerEvent>,
}

impl Stream for ClientStream {
    type Item = ServerEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if let Some(greeting) = this.greeting.take() {
            return Poll::Ready(Some(greeting));
        }
        Pin::new(&mut this.inner).poll_next(cx)
    }
}

impl Drop for ClientStream {
    fn drop(&mut self) {
        self.hub.disconnect(self.client);
    }
}

async fn stream_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let (client, receiver) = state.hub.connect();
    let events = ClientStream {
        hub: state.hub.clone(),
        client,
        greeting: Some(ServerEvent {
            name: CONNECTED_EVENT.to_string(),
            payload: json!({ "clientId": client }),
        }),
        inner: ReceiverStream::new(receiver),
    };

    let stream = tokio_stream::StreamExt::filter_map(events, |evt| {
        match SseEvent::default().event(&evt.name).json_data(&evt.payload) {
            Ok(sse_event) => Some(Ok(sse_event)),
            Err(err) => {
                tracing::error!("Failed to serialize SSE payload for {}: {}", evt.name, err);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GroupMembership {
    client_id: ClientId,
    group: String,
    members: usize,
}

async fn join_group(
    Path((client, group)): Path<(ClientId, String)>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<GroupMembership>> {
    state.hub.join(client, &group).await?;
    Ok(Json(GroupMembership {
        client_id: client,
        members: state.hub.group_size(&group),
        group,
    }))
}

async fn leave_group(
    Path((client, group)): Path<(ClientId, String)>,
    State(state): State<Arc<AppState>>,
) -> StatusCode {
    if state.hub.leave(client, &group) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events/stream", get(stream_events))
        .route(
            "/events/{client}/groups/{group}",
            post(join_group).delete(leave_group),
        )
}
