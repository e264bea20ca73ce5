use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::{
    dto::{session::SessionSnapshot, sse::ServerEvent},
    error::ServiceError,
    services::session_service,
    state::SharedState,
};

/// Subscribe to a session's updates, returning the receiver together with a
/// snapshot taken after subscribing so no update falls in between.
pub async fn subscribe_session(
    state: &SharedState,
    id: Uuid,
) -> Result<(broadcast::Receiver<ServerEvent>, ServerEvent), ServiceError> {
    let handle = session_service::session_handle(state, id)?;
    let receiver = handle.events().subscribe();
    let snapshot = handle.snapshot().await?;
    let initial = snapshot_event(&snapshot).map_err(|err| {
        error!(session = %id, error = %err, "failed to encode snapshot");
        ServiceError::Internal(format!("failed to encode snapshot: {err}"))
    })?;
    Ok((receiver, initial))
}

fn snapshot_event(snapshot: &SessionSnapshot) -> serde_json::Result<ServerEvent> {
    ServerEvent::json(Some("snapshot".to_owned()), snapshot)
}

fn to_event(payload: ServerEvent) -> Event {
    let event = Event::default().data(payload.data);
    match payload.event {
        Some(name) => event.event(name),
        None => event,
    }
}

/// Convert a broadcast receiver into an SSE response, sending `initial` first
/// and forwarding events until the client disconnects or the session stops.
pub fn to_sse_stream(
    session: Uuid,
    mut receiver: broadcast::Receiver<ServerEvent>,
    initial: ServerEvent,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        if tx.send(Ok(to_event(initial))).await.is_err() {
            return;
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
                            // Keep the stream alive; the client resyncs from the next snapshot.
                            debug!(session = %session, skipped, "SSE subscriber lagged");
                            continue;
                        }
                    }
                }
            }
        }
        info!(session = %session, "session SSE stream disconnected");
    });

    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
