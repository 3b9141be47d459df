//! Resource Gateway
//!
//! The seam between the HTTP surface and whatever actually stores Deployments.
//! Handlers and watch sessions only talk to [`ResourceGateway`]; the binary
//! wires in [`MemoryGateway`], tests wire in `MockResourceGateway`.
//!
//! # Watch contract
//!
//! [`ResourceGateway::watch`] hands out a [`Subscription`]: a bounded queue of
//! [`ChangeNotification`]s in store order plus a stop capability. The
//! subscription ends (`next()` yields `None`) when the store closes the feed.
//! Stopping is idempotent and also happens on drop, so a subscription can never
//! leak a registration in the store.

mod memory;
mod selector;


use std::fmt;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tokio::sync::mpsc;
use tracing::trace;

pub use memory::*;
pub use selector::*;

use crate::models::Deployment;
use crate::models::Pod;
use crate::models::Status;
use crate::GatewayResult;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ResourceGateway: Send + Sync + 'static {
    async fn list(
        &self,
        namespace: &str,
    ) -> GatewayResult<Vec<Deployment>>;

    async fn get(
        &self,
        namespace: &str,
        name: &str,
    ) -> GatewayResult<Deployment>;

    async fn create(
        &self,
        namespace: &str,
        deployment: Deployment,
    ) -> GatewayResult<Deployment>;

    /// Replaces the stored object. A non-empty `resourceVersion` on the
    /// incoming object must match the stored one.
    async fn update(
        &self,
        namespace: &str,
        name: &str,
        deployment: Deployment,
    ) -> GatewayResult<Deployment>;

    async fn delete(
        &self,
        namespace: &str,
        name: &str,
    ) -> GatewayResult<()>;

    async fn scale(
        &self,
        namespace: &str,
        name: &str,
        replicas: i32,
    ) -> GatewayResult<Deployment>;

    /// Opens a change feed for Deployments in `namespace`, optionally
    /// narrowed by a label selector.
    async fn watch(
        &self,
        namespace: &str,
        label_selector: Option<String>,
    ) -> GatewayResult<Subscription>;

    /// At most `limit` pods owned by Deployment `owner`
    async fn pod_list(
        &self,
        namespace: &str,
        owner: &str,
        limit: i64,
    ) -> GatewayResult<Vec<Pod>>;
}

/// Kind of change carried by a [`ChangeNotification`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
    Bookmark,
    Error,
}

impl ChangeKind {
    pub const ALL: [ChangeKind; 5] = [
        ChangeKind::Added,
        ChangeKind::Modified,
        ChangeKind::Deleted,
        ChangeKind::Bookmark,
        ChangeKind::Error,
    ];

    /// Wire spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Added => "ADDED",
            ChangeKind::Modified => "MODIFIED",
            ChangeKind::Deleted => "DELETED",
            ChangeKind::Bookmark => "BOOKMARK",
            ChangeKind::Error => "ERROR",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a change notification carries
#[derive(Debug, Clone, PartialEq)]
pub enum WatchPayload {
    Deployment(Box<Deployment>),
    Status(Status),
    /// Structurally unexpected upstream object, identified by its type name
    Unrecognized { type_name: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChangeNotification {
    pub kind: ChangeKind,
    pub payload: WatchPayload,
}

impl ChangeNotification {
    pub fn deployment(
        kind: ChangeKind,
        deployment: Deployment,
    ) -> Self {
        Self {
            kind,
            payload: WatchPayload::Deployment(Box::new(deployment)),
        }
    }

    pub fn error(status: Status) -> Self {
        Self {
            kind: ChangeKind::Error,
            payload: WatchPayload::Status(status),
        }
    }
}

type Stopper = Box<dyn FnOnce() + Send + Sync>;

/// Exclusive handle on one change feed
pub struct Subscription {
    receiver: mpsc::Receiver<ChangeNotification>,
    stopper: Option<Stopper>,
}

impl Subscription {
    /// `stop` runs exactly once, on the first [`Subscription::stop`] or on drop
    pub fn new(
        receiver: mpsc::Receiver<ChangeNotification>,
        stop: impl FnOnce() + Send + Sync + 'static,
    ) -> Self {
        Self {
            receiver,
            stopper: Some(Box::new(stop)),
        }
    }

    /// Subscription with nothing to release besides the channel itself
    pub fn from_receiver(receiver: mpsc::Receiver<ChangeNotification>) -> Self {
        Self::new(receiver, || {})
    }

    /// Next change in feed order. `None` once the feed is closed or stopped.
    pub async fn next(&mut self) -> Option<ChangeNotification> {
        self.receiver.recv().await
    }

    /// Releases the upstream registration. Returns `false` if it was already released.
    pub fn stop(&mut self) -> bool {
        match self.stopper.take() {
            Some(stop) => {
                self.receiver.close();
                stop();
                trace!("subscription stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopper.is_none()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("stopped", &self.is_stopped())
            .finish_non_exhaustive()
    }
}
