//! In-memory, watch-capable resource store.
//!
//! Reads are lock-free over [`DashMap`]. Mutations are serialized by a write
//! lock so that resourceVersions are handed out, and change notifications are
//! queued to watchers, in one global order.
//!
//! Each watcher owns a bounded queue. A watcher that cannot keep up is closed
//! rather than silently losing events; its session then observes the feed
//! closing.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::Weak;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::ChangeKind;
use super::ChangeNotification;
use super::LabelSelector;
use super::ResourceGateway;
use super::Subscription;
use crate::constants::DEPLOYMENT_KIND;
use crate::constants::MAX_REPLICAS;
use crate::models::ContainerStatus;
use crate::models::Deployment;
use crate::models::DeploymentCondition;
use crate::models::DeploymentStatus;
use crate::models::ObjectMeta;
use crate::models::OwnerReference;
use crate::models::Pod;
use crate::models::PodStatus;
use crate::models::Status;
use crate::GatewayError;
use crate::GatewayResult;

const POD_SUFFIX_ALPHABET: [char; 36] = [
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w',
    'x', 'y', 'z', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
];

const MEMORY_NODE_NAME: &str = "memory-node";

type ObjectKey = (String, String);

fn object_key(
    namespace: &str,
    name: &str,
) -> ObjectKey {
    (namespace.to_string(), name.to_string())
}

struct Watcher {
    namespace: String,
    selector: LabelSelector,
    sender: mpsc::Sender<ChangeNotification>,
}

struct Inner {
    deployments: DashMap<ObjectKey, Deployment>,
    pods: DashMap<ObjectKey, Pod>,
    watchers: DashMap<u64, Watcher>,
    next_watcher_id: AtomicU64,
    resource_version: AtomicU64,
    write_lock: Mutex<()>,
    watch_buffer_size: usize,
}

impl Inner {
    fn lock_writes(&self) -> GatewayResult<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| GatewayError::Upstream("resource store write lock poisoned".to_string()))
    }

    fn next_resource_version(&self) -> String {
        (self.resource_version.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }

    /// Queues `notification` to every watcher interested in `namespace`.
    /// `labels` is `None` for notifications that are not about one object.
    fn broadcast(
        &self,
        namespace: &str,
        labels: Option<&std::collections::BTreeMap<String, String>>,
        notification: ChangeNotification,
    ) {
        self.watchers.retain(|id, w| {
            if w.namespace != namespace {
                return true;
            }
            if let Some(labels) = labels {
                if !w.selector.matches(labels) {
                    return true;
                }
            }
            match w.sender.try_send(notification.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    warn!(watcher_id = id, namespace, "watcher fell behind, closing its feed");
                    false
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(watcher_id = id, "watcher receiver gone");
                    false
                }
            }
        });
    }

    fn owned_pods(
        &self,
        namespace: &str,
        owner: &str,
    ) -> Vec<Pod> {
        let mut pods: Vec<Pod> = self
            .pods
            .iter()
            .filter(|p| p.metadata.namespace == namespace && p.owner_name() == Some(owner))
            .map(|p| p.value().clone())
            .collect();
        pods.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
        pods
    }

    fn remove_owned_pods(
        &self,
        namespace: &str,
        owner: &str,
    ) -> usize {
        let pods = self.owned_pods(namespace, owner);
        for p in &pods {
            self.pods.remove(&object_key(namespace, &p.metadata.name));
        }
        pods.len()
    }

    /// Brings the owned pods of `deployment` to its desired count and
    /// refreshes its status counters
    fn reconcile(
        &self,
        deployment: &mut Deployment,
        roll_pods: bool,
    ) {
        let namespace = deployment.metadata.namespace.clone();
        let name = deployment.metadata.name.clone();

        if roll_pods {
            self.remove_owned_pods(&namespace, &name);
        }

        let desired = deployment.desired_replicas().max(0) as usize;
        let existing = self.owned_pods(&namespace, &name);

        if existing.len() > desired {
            for p in &existing[desired..] {
                self.pods.remove(&object_key(&namespace, &p.metadata.name));
            }
        } else {
            for _ in existing.len()..desired {
                let pod = new_pod(deployment);
                self.pods.insert(object_key(&namespace, &pod.metadata.name), pod);
            }
        }

        let replicas = desired as i32;
        deployment.status = DeploymentStatus {
            observed_generation: deployment.metadata.generation,
            replicas,
            ready_replicas: replicas,
            available_replicas: replicas,
            updated_replicas: replicas,
            unavailable_replicas: 0,
            conditions: vec![DeploymentCondition {
                condition_type: "Available".to_string(),
                status: "True".to_string(),
                reason: "MinimumReplicasAvailable".to_string(),
                message: "Deployment has minimum availability.".to_string(),
            }],
        };
    }
}

fn new_pod(deployment: &Deployment) -> Pod {
    let suffix = nanoid::nanoid!(5, &POD_SUFFIX_ALPHABET);
    let template = &deployment.spec.template;
    let labels = if template.metadata.labels.is_empty() {
        deployment.spec.selector.match_labels.clone()
    } else {
        template.metadata.labels.clone()
    };

    let mut spec = template.spec.clone();
    spec.node_name = Some(MEMORY_NODE_NAME.to_string());

    let now = Utc::now();
    Pod {
        metadata: ObjectMeta {
            name: format!("{}-{}", deployment.metadata.name, suffix),
            namespace: deployment.metadata.namespace.clone(),
            uid: nanoid::nanoid!(),
            labels,
            creation_timestamp: Some(now),
            owner_references: vec![OwnerReference {
                kind: "Deployment".to_string(),
                name: deployment.metadata.name.clone(),
                uid: deployment.metadata.uid.clone(),
            }],
            ..Default::default()
        },
        status: PodStatus {
            phase: "Running".to_string(),
            start_time: Some(now),
            container_statuses: spec
                .containers
                .iter()
                .map(|c| ContainerStatus {
                    name: c.name.clone(),
                    image: c.image.clone(),
                    ready: true,
                    restart_count: 0,
                })
                .collect(),
            ..Default::default()
        },
        spec,
    }
}

/// Pods are materialized eagerly, so the desired count is bounded
fn check_replicas(replicas: Option<i32>) -> GatewayResult<()> {
    match replicas {
        Some(r) if !(0..=MAX_REPLICAS).contains(&r) => Err(GatewayError::Upstream(format!(
            "replicas must be between 0 and {MAX_REPLICAS}, got {r}"
        ))),
        _ => Ok(()),
    }
}

fn not_found(
    namespace: &str,
    name: &str,
) -> GatewayError {
    GatewayError::NotFound {
        kind: DEPLOYMENT_KIND,
        namespace: namespace.to_string(),
        name: name.to_string(),
    }
}

/// Cloneable handle; clones share one store
#[derive(Clone)]
pub struct MemoryGateway {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for MemoryGateway {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("MemoryGateway")
            .field("deployments", &self.inner.deployments.len())
            .field("pods", &self.inner.pods.len())
            .field("watchers", &self.inner.watchers.len())
            .finish()
    }
}

impl MemoryGateway {
    pub fn new(watch_buffer_size: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                deployments: DashMap::new(),
                pods: DashMap::new(),
                watchers: DashMap::new(),
                next_watcher_id: AtomicU64::new(1),
                resource_version: AtomicU64::new(0),
                write_lock: Mutex::new(()),
                watch_buffer_size: watch_buffer_size.max(1),
            }),
        }
    }

    pub fn watcher_count(&self) -> usize {
        self.inner.watchers.len()
    }

    /// Pushes an error status to every watcher of `namespace`
    pub fn notify_error(
        &self,
        namespace: &str,
        status: Status,
    ) {
        self.inner.broadcast(namespace, None, ChangeNotification::error(status));
    }

    /// Closes every open change feed. Subscribers observe the end of their feed.
    pub fn close_watchers(&self) {
        let closed = self.inner.watchers.len();
        self.inner.watchers.clear();
        info!(closed, "closed all watch feeds");
    }
}

#[async_trait]
impl ResourceGateway for MemoryGateway {
    async fn list(
        &self,
        namespace: &str,
    ) -> GatewayResult<Vec<Deployment>> {
        let mut items: Vec<Deployment> = self
            .inner
            .deployments
            .iter()
            .filter(|d| d.metadata.namespace == namespace)
            .map(|d| d.value().clone())
            .collect();
        items.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
        Ok(items)
    }

    async fn get(
        &self,
        namespace: &str,
        name: &str,
    ) -> GatewayResult<Deployment> {
        self.inner
            .deployments
            .get(&object_key(namespace, name))
            .map(|d| d.value().clone())
            .ok_or_else(|| not_found(namespace, name))
    }

    async fn create(
        &self,
        namespace: &str,
        mut deployment: Deployment,
    ) -> GatewayResult<Deployment> {
        if deployment.metadata.name.is_empty() {
            return Err(GatewayError::Upstream("deployment name is required".to_string()));
        }
        check_replicas(deployment.spec.replicas)?;

        let _guard = self.inner.lock_writes()?;
        let key = object_key(namespace, &deployment.metadata.name);
        if self.inner.deployments.contains_key(&key) {
            return Err(GatewayError::AlreadyExists {
                kind: DEPLOYMENT_KIND,
                namespace: namespace.to_string(),
                name: deployment.metadata.name,
            });
        }

        let meta = &mut deployment.metadata;
        meta.namespace = namespace.to_string();
        meta.uid = nanoid::nanoid!();
        meta.resource_version = self.inner.next_resource_version();
        meta.generation = 1;
        meta.creation_timestamp = Some(Utc::now());
        deployment.api_version.get_or_insert_with(|| "apps/v1".to_string());
        deployment.kind.get_or_insert_with(|| "Deployment".to_string());

        self.inner.reconcile(&mut deployment, false);
        self.inner.deployments.insert(key, deployment.clone());

        debug!(namespace, name = %deployment.metadata.name, rv = %deployment.metadata.resource_version, "deployment created");
        self.inner.broadcast(
            namespace,
            Some(&deployment.metadata.labels),
            ChangeNotification::deployment(ChangeKind::Added, deployment.clone()),
        );
        Ok(deployment)
    }

    async fn update(
        &self,
        namespace: &str,
        name: &str,
        mut deployment: Deployment,
    ) -> GatewayResult<Deployment> {
        check_replicas(deployment.spec.replicas)?;
        let _guard = self.inner.lock_writes()?;
        let key = object_key(namespace, name);
        let current = self
            .inner
            .deployments
            .get(&key)
            .map(|d| d.value().clone())
            .ok_or_else(|| not_found(namespace, name))?;

        let expected = &deployment.metadata.resource_version;
        if !expected.is_empty() && *expected != current.metadata.resource_version {
            return Err(GatewayError::Conflict {
                kind: DEPLOYMENT_KIND,
                namespace: namespace.to_string(),
                name: name.to_string(),
                expected: expected.clone(),
                actual: current.metadata.resource_version,
            });
        }

        let template_changed = deployment.spec.template != current.spec.template;
        let meta = &mut deployment.metadata;
        meta.namespace = namespace.to_string();
        meta.name = name.to_string();
        meta.uid = current.metadata.uid.clone();
        meta.creation_timestamp = current.metadata.creation_timestamp;
        meta.generation = current.metadata.generation + 1;
        meta.resource_version = self.inner.next_resource_version();
        deployment.api_version = current.api_version.clone();
        deployment.kind = current.kind.clone();

        self.inner.reconcile(&mut deployment, template_changed);
        self.inner.deployments.insert(key, deployment.clone());

        debug!(namespace, name, rv = %deployment.metadata.resource_version, "deployment updated");
        self.inner.broadcast(
            namespace,
            Some(&deployment.metadata.labels),
            ChangeNotification::deployment(ChangeKind::Modified, deployment.clone()),
        );
        Ok(deployment)
    }

    async fn delete(
        &self,
        namespace: &str,
        name: &str,
    ) -> GatewayResult<()> {
        let _guard = self.inner.lock_writes()?;
        let (_, mut deployment) = self
            .inner
            .deployments
            .remove(&object_key(namespace, name))
            .ok_or_else(|| not_found(namespace, name))?;

        let pods = self.inner.remove_owned_pods(namespace, name);
        deployment.metadata.resource_version = self.inner.next_resource_version();

        debug!(namespace, name, pods, "deployment deleted");
        let labels = deployment.metadata.labels.clone();
        self.inner.broadcast(
            namespace,
            Some(&labels),
            ChangeNotification::deployment(ChangeKind::Deleted, deployment),
        );
        Ok(())
    }

    async fn scale(
        &self,
        namespace: &str,
        name: &str,
        replicas: i32,
    ) -> GatewayResult<Deployment> {
        check_replicas(Some(replicas))?;

        let _guard = self.inner.lock_writes()?;
        let key = object_key(namespace, name);
        let mut deployment = self
            .inner
            .deployments
            .get(&key)
            .map(|d| d.value().clone())
            .ok_or_else(|| not_found(namespace, name))?;

        deployment.spec.replicas = Some(replicas);
        deployment.metadata.generation += 1;
        deployment.metadata.resource_version = self.inner.next_resource_version();

        self.inner.reconcile(&mut deployment, false);
        self.inner.deployments.insert(key, deployment.clone());

        debug!(namespace, name, replicas, "deployment scaled");
        self.inner.broadcast(
            namespace,
            Some(&deployment.metadata.labels),
            ChangeNotification::deployment(ChangeKind::Modified, deployment.clone()),
        );
        Ok(deployment)
    }

    async fn watch(
        &self,
        namespace: &str,
        label_selector: Option<String>,
    ) -> GatewayResult<Subscription> {
        let selector = match label_selector.as_deref() {
            Some(raw) => LabelSelector::parse(raw)?,
            None => LabelSelector::everything(),
        };

        let (tx, rx) = mpsc::channel(self.inner.watch_buffer_size);
        let id = self.inner.next_watcher_id.fetch_add(1, Ordering::Relaxed);

        debug!(watcher_id = id, namespace, selector = %selector, "watcher registered");
        self.inner.watchers.insert(
            id,
            Watcher {
                namespace: namespace.to_string(),
                selector,
                sender: tx,
            },
        );

        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        Ok(Subscription::new(rx, move || {
            if let Some(inner) = inner.upgrade() {
                inner.watchers.remove(&id);
                debug!(watcher_id = id, "watcher unregistered");
            }
        }))
    }

    async fn pod_list(
        &self,
        namespace: &str,
        owner: &str,
        limit: i64,
    ) -> GatewayResult<Vec<Pod>> {
        if !self.inner.deployments.contains_key(&object_key(namespace, owner)) {
            return Err(not_found(namespace, owner));
        }

        let limit = usize::try_from(limit).unwrap_or(0);
        let mut pods = self.inner.owned_pods(namespace, owner);
        pods.truncate(limit);
        Ok(pods)
    }
}
