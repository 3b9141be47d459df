//! Stream Session
//!
//! Drives one Subscription until either side goes away.
//!
//! ```text
//! Open ──change──> Emitting ──change──> Emitting ...
//!   │                  │
//!   ├──feed closed──> UpstreamClosed ── close frame ──> Closed
//!   └──cancel/deadline/transport gone──> ClientGone ──────> Closed
//! ```
//!
//! Cancellation is polled first on every iteration: once a disconnect has been
//! observed nothing else is written.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::trace;

use super::translate;
use super::Frame;
use super::WireEvent;
use crate::gateway::Subscription;
use crate::metrics::ACTIVE_WATCH_SESSIONS;
use crate::metrics::WATCH_EVENTS_SENT;
use crate::metrics::WATCH_SESSIONS_CLOSED;
use crate::metrics::WATCH_SESSION_DURATION_SECONDS;

/// Per-request termination signal: client disconnect, server shutdown or
/// maximum stream duration, whichever comes first
#[derive(Debug, Clone)]
pub struct SessionContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl SessionContext {
    /// A `max_duration` too large to represent as an instant means no deadline
    pub fn new(
        token: CancellationToken,
        max_duration: Option<Duration>,
    ) -> Self {
        Self {
            token,
            deadline: max_duration.and_then(|d| Instant::now().checked_add(d)),
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Resolves once the session must end
    pub async fn done(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }

    pub fn is_done(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Emitting,
    UpstreamClosed,
    ClientGone,
    Closed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Open => "open",
            SessionState::Emitting => "emitting",
            SessionState::UpstreamClosed => "upstream_closed",
            SessionState::ClientGone => "client_gone",
            SessionState::Closed => "closed",
        }
    }
}

/// How a finished session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOutcome {
    /// `UpstreamClosed` or `ClientGone`
    pub reason: SessionState,
    pub emitted: u64,
}

enum Step {
    Change(WireEvent),
    FeedClosed,
    Cancelled,
}

pub struct StreamSession {
    namespace: String,
    subscription: Subscription,
    ctx: SessionContext,
    frames: mpsc::Sender<Frame>,
    state: SessionState,
    emitted: u64,
}

impl StreamSession {
    pub fn new(
        namespace: String,
        subscription: Subscription,
        ctx: SessionContext,
        frames: mpsc::Sender<Frame>,
    ) -> Self {
        Self {
            namespace,
            subscription,
            ctx,
            frames,
            state: SessionState::Open,
            emitted: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub async fn run(mut self) -> SessionOutcome {
        let started = Instant::now();
        ACTIVE_WATCH_SESSIONS.inc();
        info!(namespace = %self.namespace, "watch stream started");

        let reason = loop {
            let step = tokio::select! {
                biased;
                _ = self.ctx.done() => Step::Cancelled,
                next = self.subscription.next() => match next {
                    Some(notification) => Step::Change(translate(notification)),
                    None => Step::FeedClosed,
                },
            };

            match step {
                Step::Change(event) => {
                    let event_type = event.event_type.clone();
                    if !self.deliver(Frame::Message(event)).await {
                        break SessionState::ClientGone;
                    }
                    self.state = SessionState::Emitting;
                    self.emitted += 1;
                    WATCH_EVENTS_SENT.with_label_values(&[&event_type]).inc();
                    trace!(namespace = %self.namespace, event_type = %event_type, emitted = self.emitted, "watch event sent");
                }
                Step::FeedClosed => {
                    self.state = SessionState::UpstreamClosed;
                    debug!(namespace = %self.namespace, "upstream watch feed closed");
                    self.deliver(Frame::Close).await;
                    break SessionState::UpstreamClosed;
                }
                Step::Cancelled => break SessionState::ClientGone,
            }
        };

        self.state = reason;
        self.subscription.stop();
        self.state = SessionState::Closed;

        ACTIVE_WATCH_SESSIONS.dec();
        WATCH_SESSIONS_CLOSED.with_label_values(&[reason.as_str()]).inc();
        WATCH_SESSION_DURATION_SECONDS.observe(started.elapsed().as_secs_f64());
        info!(
            namespace = %self.namespace,
            reason = reason.as_str(),
            emitted = self.emitted,
            "watch stream ended"
        );

        SessionOutcome {
            reason,
            emitted: self.emitted,
        }
    }

    /// Hands one frame to the transport. `false` when the client is gone.
    async fn deliver(
        &self,
        frame: Frame,
    ) -> bool {
        tokio::select! {
            biased;
            _ = self.ctx.done() => false,
            sent = self.frames.send(frame) => sent.is_ok(),
        }
    }
}
