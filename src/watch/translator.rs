use serde::Deserialize;
use serde::Serialize;

use crate::constants::UNRECOGNIZED_PAYLOAD_MESSAGE;
use crate::constants::UPSTREAM_SOURCE;
use crate::gateway::ChangeNotification;
use crate::gateway::WatchPayload;
use crate::models::DeploymentResponse;
use crate::models::Status;

/// Event as delivered to watch clients.
///
/// Exactly one of `object` / `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEvent {
    #[serde(rename = "type")]
    pub event_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<DeploymentResponse>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_object: Option<String>,
}

impl WireEvent {
    /// Stand-in for an event that could not be encoded
    pub fn degraded(
        event_type: &str,
        reason: impl std::fmt::Display,
    ) -> Self {
        Self {
            event_type: event_type.to_string(),
            object: None,
            error: Some(format!("failed to encode event: {reason}")),
            status: None,
            raw_object: None,
        }
    }
}

pub fn format_status_error(status: &Status) -> String {
    format!("{UPSTREAM_SOURCE} Error: {} (Code: {})", status.message, status.code)
}

/// Total over every kind and payload
pub fn translate(notification: ChangeNotification) -> WireEvent {
    let event_type = notification.kind.as_str().to_string();

    match notification.payload {
        WatchPayload::Deployment(d) => WireEvent {
            event_type,
            object: Some(DeploymentResponse::from(d.as_ref())),
            error: None,
            status: None,
            raw_object: None,
        },
        WatchPayload::Status(status) => WireEvent {
            event_type,
            object: None,
            error: Some(format_status_error(&status)),
            status: Some(status),
            raw_object: None,
        },
        WatchPayload::Unrecognized { type_name } => WireEvent {
            event_type,
            object: None,
            error: Some(UNRECOGNIZED_PAYLOAD_MESSAGE.to_string()),
            status: None,
            raw_object: Some(type_name),
        },
    }
}
