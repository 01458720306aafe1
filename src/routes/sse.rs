use std::convert::Infallible;

use axum::{Router, extract::State, response::sse::Sse, routing::get};
use futures::Stream;
use tracing::info;

use crate::{services::sse_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/sse",
    tag = "sse",
    responses((
        status = 200,
        description = "Workflow and automation events",
        content_type = "text/event-stream",
        body = String
    ))
)]
/// Stream workflow updates and automation progress to connected clients.
pub async fn event_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>> {
    let receiver = sse_service::subscribe(&state);
    info!(
        subscribers = state.events().subscriber_count(),
        "new SSE connection"
    );
    let handshake = sse_service::handshake(&state).await;
    sse_service::to_sse_stream(receiver, handshake)
}

/// Configure the SSE endpoint.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/sse", get(event_stream))
}
