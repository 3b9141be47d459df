//! HTTP surface
//!
//! | Method | Path                                  | Handler                  |
//! |--------|---------------------------------------|--------------------------|
//! | GET    | `/{ns}/deployments`                   | [`list_deployments`]     |
//! | POST   | `/{ns}/deployments`                   | [`create_deployment`]    |
//! | GET    | `/{ns}/deployments/watch`             | [`watch_deployments`]    |
//! | GET    | `/{ns}/deployments/{name}`            | [`get_deployment`]       |
//! | PUT    | `/{ns}/deployments/{name}`            | [`update_deployment`]    |
//! | DELETE | `/{ns}/deployments/{name}`            | [`delete_deployment`]    |
//! | PATCH  | `/{ns}/deployments/{name}/scale`      | [`scale_deployment`]     |
//! | GET    | `/{ns}/deployments/{name}/pods`       | [`list_deployment_pods`] |
//!
//! `watch` is matched before `{name}`, so a Deployment literally named `watch`
//! is only reachable through the list endpoint.

mod handlers;
mod response;
mod watch;

#[cfg(test)]
mod handlers_test;

use std::convert::Infallible;
use std::sync::Arc;

pub use handlers::*;
pub use response::*;
use tokio_util::sync::CancellationToken;
pub use watch::*;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::Filter;
use warp::Rejection;
use warp::Reply;

use crate::gateway::ResourceGateway;
use crate::metrics::record_response;
use crate::WatchConfig;

/// Shared by every request
#[derive(Clone)]
pub struct ApiState {
    pub gateway: Arc<dyn ResourceGateway>,
    pub watch: WatchConfig,
    /// Parent of every watch session token; cancelling it ends all streams
    pub shutdown: CancellationToken,
}

impl ApiState {
    pub fn new(
        gateway: Arc<dyn ResourceGateway>,
        watch: WatchConfig,
    ) -> Self {
        Self {
            gateway,
            watch,
            shutdown: CancellationToken::new(),
        }
    }
}

impl std::fmt::Debug for ApiState {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ApiState")
            .field("watch", &self.watch)
            .field("shutdown", &self.shutdown.is_cancelled())
            .finish_non_exhaustive()
    }
}

fn with_state(state: ApiState) -> impl Filter<Extract = (ApiState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn content_type() -> impl Filter<Extract = (Option<String>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("content-type")
}

/// Full route table with rejection recovery
pub fn routes(
    state: ApiState,
    max_body_size: u64,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let list = warp::path!(String / "deployments")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(list_deployments);

    let create = warp::path!(String / "deployments")
        .and(warp::post())
        .and(content_type())
        .and(warp::body::content_length_limit(max_body_size))
        .and(warp::body::bytes())
        .and(with_state(state.clone()))
        .and_then(create_deployment);

    let watch = warp::path!(String / "deployments" / "watch")
        .and(warp::get())
        .and(warp::query::<WatchQuery>())
        .and(with_state(state.clone()))
        .and_then(watch_deployments);

    let get = warp::path!(String / "deployments" / String)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(get_deployment);

    let update = warp::path!(String / "deployments" / String)
        .and(warp::put())
        .and(content_type())
        .and(warp::body::content_length_limit(max_body_size))
        .and(warp::body::bytes())
        .and(with_state(state.clone()))
        .and_then(update_deployment);

    let delete = warp::path!(String / "deployments" / String)
        .and(warp::delete())
        .and(with_state(state.clone()))
        .and_then(delete_deployment);

    let scale = warp::path!(String / "deployments" / String / "scale")
        .and(warp::patch())
        .and(warp::body::content_length_limit(max_body_size))
        .and(warp::body::bytes())
        .and(with_state(state.clone()))
        .and_then(scale_deployment);

    let pods = warp::path!(String / "deployments" / String / "pods")
        .and(warp::get())
        .and(warp::query::<PodsQuery>())
        .and(with_state(state))
        .and_then(list_deployment_pods);

    list.or(create)
        .unify()
        .or(watch)
        .unify()
        .or(get)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .or(scale)
        .unify()
        .or(pods)
        .unify()
        .recover(handle_rejection)
        .unify()
        .with(warp::trace::request())
}

/// Maps warp rejections onto the error envelope
async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "route not found".to_string())
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "request body too large".to_string())
    } else if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if let Some(e) = err.find::<warp::reject::InvalidHeader>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        (StatusCode::LENGTH_REQUIRED, "content-length required".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "method not allowed".to_string())
    } else {
        tracing::error!(rejection = ?err, "unhandled rejection");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_string())
    };

    record_response("rejected", status.as_u16());
    Ok(respond_error(status, &message))
}
