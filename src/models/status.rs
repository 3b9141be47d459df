use serde::Deserialize;
use serde::Serialize;

/// Status record the upstream feed sends in place of an object when a watch
/// fails (expired resourceVersion, internal error, ...)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    /// `Success` or `Failure`
    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub message: String,

    /// Machine-readable reason, e.g. `Expired`, `InternalError`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,

    /// HTTP-style status code
    #[serde(default)]
    pub code: i32,
}

impl Status {
    pub fn failure(
        code: i32,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status: "Failure".to_string(),
            message: message.into(),
            reason: reason.into(),
            code,
        }
    }
}
