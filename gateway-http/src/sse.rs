//! Converts the engine's `mpsc::Receiver<StreamEvent>` into an axum SSE
//! response (spec §4.8, §6.1: `data: <JSON>\n\n` frames). Grounded in the
//! `Sse`/`Event`/`stream::iter` construction pattern used for OpenAI-style
//! gateway handlers in the wider corpus; generalized here to a live
//! `mpsc::Receiver` instead of a pre-built `Vec`, matching the engine's own
//! producer-task / consumer-loop shape.

use axum::response::sse::{Event, KeepAlive, Sse};
use protocol::StreamEvent;
use std::convert::Infallible;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

pub fn sse_response(rx: mpsc::Receiver<StreamEvent>) -> Sse<impl futures::Stream<Item = Result<Event, Infallible>>> {
    let stream = ReceiverStream::new(rx).map(|event| {
        let data = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
        Ok(Event::default().data(data))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}
