use serde::Serialize;
use tracing::warn;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::Reply;

use crate::constants::SUCCESS_MESSAGE;
use crate::metrics::record_response;
use crate::ApiError;

#[derive(Debug, Serialize)]
struct SuccessEnvelope<'a, T: Serialize> {
    code: u16,
    message: &'a str,
    data: T,
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope<'a> {
    code: u16,
    message: &'a str,
}

/// `{"code": <status>, "message": "success", "data": <payload>}`
pub fn respond_success<T: Serialize>(
    status: StatusCode,
    data: T,
) -> Response {
    let body = SuccessEnvelope {
        code: status.as_u16(),
        message: SUCCESS_MESSAGE,
        data,
    };
    warp::reply::with_status(warp::reply::json(&body), status).into_response()
}

/// `{"code": <status>, "message": <text>}`
pub fn respond_error(
    status: StatusCode,
    message: &str,
) -> Response {
    let body = ErrorEnvelope {
        code: status.as_u16(),
        message,
    };
    warp::reply::with_status(warp::reply::json(&body), status).into_response()
}

/// Renders a handler result and records it under `operation`
pub(crate) fn respond<T: Serialize>(
    operation: &'static str,
    result: Result<T, ApiError>,
) -> Response {
    let response = match result {
        Ok(data) => respond_success(StatusCode::OK, data),
        Err(e) => {
            let status = e.status_code();
            if status.is_server_error() {
                warn!(operation, error = %e, "request failed");
            }
            respond_error(status, &e.to_string())
        }
    };
    record_response(operation, response.status().as_u16());
    response
}
