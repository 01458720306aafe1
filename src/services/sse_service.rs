use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use crate::{
    dto::sse::{Handshake, ServerEvent},
    services::sse_events::EVENT_HANDSHAKE,
    state::SharedState,
};

/// Subscribe to the shared event stream.
pub fn subscribe(state: &SharedState) -> broadcast::Receiver<ServerEvent> {
    state.events().subscribe()
}

/// Handshake sent first on every new connection.
pub async fn handshake(state: &SharedState) -> Option<ServerEvent> {
    let payload = Handshake {
        message: "event stream connected".into(),
        step: state.read_workflow(|wf| wf.step()).await,
        automation_running: state.automation().is_running(),
    };
    match ServerEvent::json(Some(EVENT_HANDSHAKE.to_string()), &payload) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(error = %err, "failed to serialize SSE handshake");
            None
        }
    }
}

/// Convert a broadcast receiver into an SSE response, forwarding events until the
/// client disconnects. `first` is delivered before any broadcast event.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<ServerEvent>,
    first: Option<ServerEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        if let Some(payload) = first {
            if tx.send(Ok(to_event(payload))).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            debug!(skipped, "SSE subscriber lagged; skipping events");
                            continue;
                        }
                    }
                }
            }
        }

        info!("SSE stream disconnected");
    });

    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn to_event(payload: ServerEvent) -> Event {
    let event = Event::default().data(payload.data);
    match payload.event {
        Some(name) => event.event(name),
        None => event,
    }
}
