use std::collections::BTreeMap;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use super::Deployment;
use super::Pod;

/// Client-facing view of a Deployment.
///
/// Used by get/create/update/scale responses, list items and watch events
/// alike, so a client sees one shape regardless of how it learned about the
/// object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentResponse {
    pub name: String,
    pub namespace: String,
    pub uid: String,
    pub resource_version: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub replicas: i32,
    pub ready_replicas: i32,
    pub available_replicas: i32,
    pub updated_replicas: i32,
    pub selector: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    pub paused: bool,
    pub containers: Vec<ContainerInfo>,
    pub conditions: Vec<ConditionInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub name: String,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionInfo {
    #[serde(rename = "type")]
    pub condition_type: String,
    pub status: String,
    pub message: String,
}

impl From<&Deployment> for DeploymentResponse {
    fn from(d: &Deployment) -> Self {
        Self {
            name: d.metadata.name.clone(),
            namespace: d.metadata.namespace.clone(),
            uid: d.metadata.uid.clone(),
            resource_version: d.metadata.resource_version.clone(),
            labels: d.metadata.labels.clone(),
            annotations: d.metadata.annotations.clone(),
            replicas: d.desired_replicas(),
            ready_replicas: d.status.ready_replicas,
            available_replicas: d.status.available_replicas,
            updated_replicas: d.status.updated_replicas,
            selector: d.spec.selector.match_labels.clone(),
            strategy: d.spec.strategy.as_ref().map(|s| s.strategy_type.clone()),
            paused: d.spec.paused,
            containers: d
                .spec
                .template
                .spec
                .containers
                .iter()
                .map(|c| ContainerInfo {
                    name: c.name.clone(),
                    image: c.image.clone(),
                })
                .collect(),
            conditions: d
                .status
                .conditions
                .iter()
                .map(|c| ConditionInfo {
                    condition_type: c.condition_type.clone(),
                    status: c.status.clone(),
                    message: c.message.clone(),
                })
                .collect(),
            created_at: d.metadata.creation_timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentListResponse {
    pub items: Vec<DeploymentResponse>,
    pub total: usize,
}

impl DeploymentListResponse {
    pub fn from_deployments(deployments: &[Deployment]) -> Self {
        let items: Vec<DeploymentResponse> = deployments.iter().map(DeploymentResponse::from).collect();
        Self {
            total: items.len(),
            items,
        }
    }
}

/// Client-facing view of a Pod
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodResponse {
    pub name: String,
    pub namespace: String,
    pub phase: String,
    /// `<ready containers>/<total containers>`
    pub ready: String,
    pub restarts: i32,
    #[serde(rename = "podIP", skip_serializing_if = "Option::is_none")]
    pub pod_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    pub containers: Vec<ContainerInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<&Pod> for PodResponse {
    fn from(p: &Pod) -> Self {
        let statuses = &p.status.container_statuses;
        let ready_count = statuses.iter().filter(|s| s.ready).count();
        let total = p.spec.containers.len().max(statuses.len());

        Self {
            name: p.metadata.name.clone(),
            namespace: p.metadata.namespace.clone(),
            phase: p.status.phase.clone(),
            ready: format!("{ready_count}/{total}"),
            restarts: statuses.iter().map(|s| s.restart_count).sum(),
            pod_ip: p.status.pod_ip.clone(),
            node_name: p.spec.node_name.clone(),
            containers: p
                .spec
                .containers
                .iter()
                .map(|c| ContainerInfo {
                    name: c.name.clone(),
                    image: c.image.clone(),
                })
                .collect(),
            created_at: p.metadata.creation_timestamp,
        }
    }
}

/// Pod list batch; `total` counts the items in this batch only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodListResponse {
    pub items: Vec<PodResponse>,
    pub total: usize,
}

impl PodListResponse {
    pub fn from_pods(pods: &[Pod]) -> Self {
        let items: Vec<PodResponse> = pods.iter().map(PodResponse::from).collect();
        Self {
            total: items.len(),
            items,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleDeploymentRequest {
    pub replicas: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
