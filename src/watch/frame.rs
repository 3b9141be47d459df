use tracing::warn;
use warp::sse::Event;

use super::WireEvent;
use crate::constants::SSE_CLOSE_EVENT;
use crate::constants::SSE_MESSAGE_EVENT;
use crate::constants::WATCH_CLOSED_MESSAGE;

/// Unit handed from a session to the transport; one frame becomes one SSE event
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Message(WireEvent),
    /// Upstream feed ended; always the last frame of a stream
    Close,
}

impl Frame {
    pub fn is_close(&self) -> bool {
        matches!(self, Frame::Close)
    }

    /// `data:` payload for this frame
    pub fn data(&self) -> String {
        match self {
            Frame::Message(event) => serde_json::to_string(event).unwrap_or_else(|e| {
                warn!(event_type = %event.event_type, error = %e, "watch event could not be encoded");
                degraded_data(event, e)
            }),
            Frame::Close => serde_json::json!({ "message": WATCH_CLOSED_MESSAGE }).to_string(),
        }
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            Frame::Message(_) => SSE_MESSAGE_EVENT,
            Frame::Close => SSE_CLOSE_EVENT,
        }
    }

    pub fn into_sse_event(self) -> Event {
        Event::default().event(self.event_name()).data(self.data())
    }
}

fn degraded_data(
    event: &WireEvent,
    reason: serde_json::Error,
) -> String {
    let degraded = WireEvent::degraded(&event.event_type, reason);
    // only plain strings left, so this cannot fail again
    serde_json::to_string(&degraded).unwrap_or_default()
}
