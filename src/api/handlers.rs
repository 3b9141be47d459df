//! CRUD handlers
//!
//! Every handler validates its path parameters before touching the gateway,
//! delegates one call, and maps the classified [`GatewayError`] to an
//! [`ApiError`] with an operation-specific message.

use std::convert::Infallible;

use bytes::Bytes;
use serde::Deserialize;
use tracing::debug;
use warp::reply::Response;

use super::respond;
use super::ApiState;
use crate::constants::DEFAULT_POD_LIST_LIMIT;
use crate::constants::MAX_REPLICAS;
use crate::models::parse_deployment;
use crate::models::Deployment;
use crate::models::DeploymentListResponse;
use crate::models::DeploymentResponse;
use crate::models::ManifestFormat;
use crate::models::MessageResponse;
use crate::models::PodListResponse;
use crate::models::ScaleDeploymentRequest;
use crate::validation::validate_namespace;
use crate::validation::validate_resource_name;
use crate::ApiError;
use crate::GatewayError;

#[derive(Debug, Default, Deserialize)]
pub struct PodsQuery {
    /// Kept as text: anything that is not a positive integer falls back to the default
    pub limit: Option<String>,
}

impl PodsQuery {
    pub fn effective_limit(&self) -> i64 {
        self.limit
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_POD_LIST_LIMIT)
    }
}

pub(crate) fn check_namespace(namespace: &str) -> Result<(), ApiError> {
    if validate_namespace(namespace) {
        Ok(())
    } else {
        Err(ApiError::InvalidNamespace)
    }
}

fn check_name(name: &str) -> Result<(), ApiError> {
    if validate_resource_name(name) {
        Ok(())
    } else {
        Err(ApiError::InvalidName)
    }
}

fn check_replicas(replicas: i32) -> Result<(), ApiError> {
    if (0..=MAX_REPLICAS).contains(&replicas) {
        Ok(())
    } else {
        Err(ApiError::InvalidBody(format!(
            "invalid replicas format: must be between 0 and {MAX_REPLICAS}, got {replicas}"
        )))
    }
}

/// Reads a posted manifest and reconciles its identity with the path
fn read_manifest(
    namespace: &str,
    name: Option<&str>,
    content_type: Option<&str>,
    body: &Bytes,
) -> Result<Deployment, ApiError> {
    let format = content_type
        .and_then(ManifestFormat::from_content_type)
        .ok_or(ApiError::UnsupportedMediaType)?;
    let mut deployment = parse_deployment(body, format)?;

    let meta = &mut deployment.metadata;
    if meta.namespace.is_empty() {
        meta.namespace = namespace.to_string();
    } else if meta.namespace != namespace {
        return Err(ApiError::InvalidBody(format!(
            "manifest namespace {} does not match request namespace {}",
            meta.namespace, namespace
        )));
    }

    match name {
        Some(name) if meta.name.is_empty() => meta.name = name.to_string(),
        Some(name) if meta.name != name => {
            return Err(ApiError::InvalidBody(format!(
                "manifest name {} does not match request name {}",
                meta.name, name
            )));
        }
        _ => {}
    }

    check_name(&meta.name)?;
    if let Some(replicas) = deployment.spec.replicas {
        check_replicas(replicas)?;
    }
    Ok(deployment)
}

pub(crate) fn classify(
    err: GatewayError,
    not_found: &str,
    conflict: &str,
    failure: &str,
) -> ApiError {
    match err {
        GatewayError::NotFound { .. } => ApiError::NotFound(not_found.to_string()),
        GatewayError::AlreadyExists { .. } | GatewayError::Conflict { .. } => ApiError::Conflict(conflict.to_string()),
        GatewayError::InvalidSelector(_) => ApiError::InvalidBody(err.to_string()),
        GatewayError::Upstream(_) => ApiError::Upstream(format!("{failure}: {err}")),
    }
}

pub async fn list_deployments(
    namespace: String,
    state: ApiState,
) -> Result<Response, Infallible> {
    let result = async {
        check_namespace(&namespace)?;
        let items = state.gateway.list(&namespace).await.map_err(|e| {
            classify(
                e,
                "deployment not found",
                "deployment conflict",
                "failed to list deployments",
            )
        })?;
        Ok::<_, ApiError>(DeploymentListResponse::from_deployments(&items))
    }
    .await;

    Ok(respond("list", result))
}

pub async fn create_deployment(
    namespace: String,
    content_type: Option<String>,
    body: Bytes,
    state: ApiState,
) -> Result<Response, Infallible> {
    let result = async {
        check_namespace(&namespace)?;
        let deployment = read_manifest(&namespace, None, content_type.as_deref(), &body)?;
        debug!(namespace = %namespace, name = %deployment.metadata.name, "creating deployment");

        let created = state.gateway.create(&namespace, deployment).await.map_err(|e| {
            classify(
                e,
                "deployment not found",
                "deployment already exists",
                "failed to create deployment",
            )
        })?;
        Ok::<_, ApiError>(DeploymentResponse::from(&created))
    }
    .await;

    Ok(respond("create", result))
}

pub async fn get_deployment(
    namespace: String,
    name: String,
    state: ApiState,
) -> Result<Response, Infallible> {
    let result = async {
        check_namespace(&namespace)?;
        check_name(&name)?;
        let deployment = state.gateway.get(&namespace, &name).await.map_err(|e| {
            classify(
                e,
                "deployment not found",
                "deployment conflict",
                "failed to get deployment",
            )
        })?;
        Ok::<_, ApiError>(DeploymentResponse::from(&deployment))
    }
    .await;

    Ok(respond("get", result))
}

pub async fn update_deployment(
    namespace: String,
    name: String,
    content_type: Option<String>,
    body: Bytes,
    state: ApiState,
) -> Result<Response, Infallible> {
    let result = async {
        check_namespace(&namespace)?;
        check_name(&name)?;
        let deployment = read_manifest(&namespace, Some(&name), content_type.as_deref(), &body)?;

        let updated = state.gateway.update(&namespace, &name, deployment).await.map_err(|e| {
            classify(
                e,
                "deployment not found (it may have been deleted during the update)",
                "deployment has been modified, please retry (resourceVersion conflict)",
                "failed to update deployment",
            )
        })?;
        Ok::<_, ApiError>(DeploymentResponse::from(&updated))
    }
    .await;

    Ok(respond("update", result))
}

pub async fn delete_deployment(
    namespace: String,
    name: String,
    state: ApiState,
) -> Result<Response, Infallible> {
    let result = async {
        check_namespace(&namespace)?;
        check_name(&name)?;
        state.gateway.delete(&namespace, &name).await.map_err(|e| {
            classify(
                e,
                "deployment not found",
                "deployment conflict",
                "failed to delete deployment",
            )
        })?;
        Ok::<_, ApiError>(MessageResponse {
            message: "deleted".to_string(),
        })
    }
    .await;

    Ok(respond("delete", result))
}

pub async fn scale_deployment(
    namespace: String,
    name: String,
    body: Bytes,
    state: ApiState,
) -> Result<Response, Infallible> {
    let result = async {
        check_namespace(&namespace)?;
        check_name(&name)?;
        let request: ScaleDeploymentRequest = serde_json::from_slice(&body)
            .map_err(|e| ApiError::InvalidBody(format!("invalid replicas format: {e}")))?;
        check_replicas(request.replicas)?;

        let scaled = state
            .gateway
            .scale(&namespace, &name, request.replicas)
            .await
            .map_err(|e| {
                classify(
                    e,
                    "deployment not found",
                    "deployment has been modified, please retry (resourceVersion conflict)",
                    "failed to scale deployment",
                )
            })?;
        Ok::<_, ApiError>(DeploymentResponse::from(&scaled))
    }
    .await;

    Ok(respond("scale", result))
}

pub async fn list_deployment_pods(
    namespace: String,
    name: String,
    query: PodsQuery,
    state: ApiState,
) -> Result<Response, Infallible> {
    let result = async {
        check_namespace(&namespace)?;
        check_name(&name)?;
        let limit = query.effective_limit();

        let pods = state.gateway.pod_list(&namespace, &name, limit).await.map_err(|e| {
            classify(
                e,
                "deployment not found",
                "deployment conflict",
                "failed to list pods",
            )
        })?;
        Ok::<_, ApiError>(PodListResponse::from_pods(&pods))
    }
    .await;

    Ok(respond("pods", result))
}
