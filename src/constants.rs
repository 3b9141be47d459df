// -
// Resource naming

/// RFC 1123 label length limit (namespaces)
pub(crate) const MAX_NAMESPACE_LEN: usize = 63;

/// RFC 1123 subdomain length limit (resource names)
pub(crate) const MAX_RESOURCE_NAME_LEN: usize = 253;

pub(crate) const DEPLOYMENT_KIND: &str = "deployment";

/// Upper bound on desired replicas accepted from clients
pub(crate) const MAX_REPLICAS: i32 = 1000;

// -
// HTTP surface

/// Pod list batch size when the caller omits `limit` or sends a non-positive one
pub(crate) const DEFAULT_POD_LIST_LIMIT: i64 = 500;

pub(crate) const SUCCESS_MESSAGE: &str = "success";

// -
// Watch stream

/// Source label used when formatting upstream status errors
pub(crate) const UPSTREAM_SOURCE: &str = "K8s API";

pub(crate) const UNRECOGNIZED_PAYLOAD_MESSAGE: &str =
    "event object is neither a Deployment nor a Status";

/// SSE event names
pub(crate) const SSE_MESSAGE_EVENT: &str = "message";
pub(crate) const SSE_CLOSE_EVENT: &str = "close";

pub(crate) const WATCH_CLOSED_MESSAGE: &str = "watch channel closed";
