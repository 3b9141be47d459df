//! SSE transport for watch streams.
//!
//! The handler establishes the subscription up front (failures are ordinary
//! JSON error responses), then spawns a [`StreamSession`] and turns its frame
//! channel into the response body. Dropping the body, which hyper does when the
//! client goes away, cancels the session through a drop guard.

use std::convert::Infallible;

use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;
use warp::http::header::HeaderName;
use warp::http::header::HeaderValue;
use warp::http::header::ACCESS_CONTROL_ALLOW_ORIGIN;
use warp::http::header::CACHE_CONTROL;
use warp::http::header::CONNECTION;
use warp::reply::Response;
use warp::Reply;

use super::handlers::check_namespace;
use super::handlers::classify;
use super::respond;
use super::ApiState;
use crate::metrics::record_response;
use crate::watch::SessionContext;
use crate::watch::StreamSession;
use crate::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct WatchQuery {
    #[serde(rename = "labelSelector")]
    pub label_selector: Option<String>,
}

/// Path segments arrive percent-encoded, so encoded spaces are trimmed too
pub(crate) fn trim_namespace(raw: &str) -> &str {
    let mut s = raw.trim();
    loop {
        let before = s.len();
        s = s.trim_start_matches("%20").trim_end_matches("%20").trim();
        if s.len() == before {
            return s;
        }
    }
}

pub async fn watch_deployments(
    namespace: String,
    query: WatchQuery,
    state: ApiState,
) -> Result<Response, Infallible> {
    let namespace = trim_namespace(&namespace).to_string();
    if let Err(e) = check_namespace(&namespace) {
        return Ok(respond::<()>("watch", Err(e)));
    }

    let selector = query.label_selector.filter(|s| !s.trim().is_empty());
    debug!(namespace = %namespace, selector = ?selector, "opening watch");

    let subscription = match state.gateway.watch(&namespace, selector).await {
        Ok(s) => s,
        Err(e) => {
            let err: ApiError = classify(
                e,
                "namespace not found",
                "watch conflict",
                "failed to start watching deployments",
            );
            return Ok(respond::<()>("watch", Err(err)));
        }
    };

    let token = state.shutdown.child_token();
    let ctx = SessionContext::new(token.clone(), state.watch.max_stream_duration());
    let (frames_tx, frames_rx) = mpsc::channel(state.watch.frame_buffer_size);

    tokio::spawn(StreamSession::new(namespace, subscription, ctx, frames_tx).run());

    // Cancels the session once the body stream is dropped
    let guard = token.drop_guard();
    let events = ReceiverStream::new(frames_rx).map(move |frame| {
        let _ = &guard;
        Ok::<_, Infallible>(frame.into_sse_event())
    });

    let body = warp::sse::keep_alive()
        .interval(state.watch.keep_alive_interval())
        .stream(events);

    let mut response = warp::sse::reply(body).into_response();
    let headers = response.headers_mut();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(HeaderName::from_static("x-accel-buffering"), HeaderValue::from_static("no"));
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));

    record_response("watch", response.status().as_u16());
    Ok(response)
}
