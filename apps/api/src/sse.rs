//! Encodes the C2/C7 event hubs as `text/event-stream` responses: one
//! `event: <type>\ndata: <json>\n\n` frame per broadcast (§6.2, §6.3).

use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::response::Sse;
use axum::response::sse::{Event, KeepAlive};
use futures_util::Stream;
use futures_util::StreamExt;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_stream::wrappers::UnboundedReceiverStream;

pub trait EventFrame {
    fn event_name(&self) -> &'static str;
    fn payload(&self) -> serde_json::Value;
}

impl EventFrame for digest_core::JobEvent {
    fn event_name(&self) -> &'static str {
        digest_core::JobEvent::event_name(self)
    }
    fn payload(&self) -> serde_json::Value {
        digest_core::JobEvent::payload(self)
    }
}

impl EventFrame for digest_core::ChatEvent {
    fn event_name(&self) -> &'static str {
        digest_core::ChatEvent::event_name(self)
    }
    fn payload(&self) -> serde_json::Value {
        digest_core::ChatEvent::payload(self)
    }
}

/// Wraps a stream so that dropping it (client disconnect, or the host
/// reaping a dead connection) runs `on_drop` exactly once. Used to invoke
/// the registry's `unsubscribe` path, which is otherwise never reached from
/// the HTTP layer (§3: a room/hub entry is only ever cleaned up by its
/// subscriber leaving).
struct SseSession<St, D> {
    inner: St,
    on_drop: Option<D>,
}

impl<St: Stream + Unpin, D> Stream for SseSession<St, D> {
    type Item = St::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        Pin::new(&mut this.inner).poll_next(cx)
    }
}

impl<St, D: FnOnce()> Drop for SseSession<St, D> {
    fn drop(&mut self) {
        if let Some(on_drop) = self.on_drop.take() {
            on_drop();
        }
    }
}

/// §6.2/§6.3: no heartbeats are specified by the protocol itself, but a
/// keep-alive comment is still needed so idle intermediaries don't close
/// the connection; it carries no `event:`/`data:` frame clients need to act on.
///
/// `on_drop` runs once the SSE body is dropped (client disconnect), so
/// callers use it to unsubscribe from the hub that fed `rx`.
pub fn sse_stream<E, D>(
    rx: UnboundedReceiver<E>,
    on_drop: D,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    E: EventFrame + Send + 'static,
    D: FnOnce() + Send + 'static,
{
    let stream = UnboundedReceiverStream::new(rx)
        .map(|event| Ok(Event::default().event(event.event_name()).data(event.payload().to_string())));
    let session = SseSession {
        inner: stream,
        on_drop: Some(on_drop),
    };
    Sse::new(session).keep_alive(KeepAlive::default())
}
