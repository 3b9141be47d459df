use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use deployment_gateway::routes;
use deployment_gateway::ApiState;
use deployment_gateway::MemoryGateway;
use deployment_gateway::WatchConfig;
use serde_json::Value;
use warp::http::StatusCode;
use warp::Filter;
use warp::Reply;

pub const MAX_BODY_SIZE: u64 = 1024 * 1024;

pub struct TestApp {
    pub store: MemoryGateway,
    pub state: ApiState,
}

impl TestApp {
    pub fn new() -> Self {
        let store = MemoryGateway::new(64);
        let state = ApiState::new(Arc::new(store.clone()), WatchConfig::default());
        Self { store, state }
    }

    pub fn api(&self) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
        routes(self.state.clone(), MAX_BODY_SIZE)
    }

    /// Sends `request` and decodes the JSON envelope
    pub async fn call(
        &self,
        request: warp::test::RequestBuilder,
    ) -> (StatusCode, Value) {
        let res = request.reply(&self.api()).await;
        let body: Value = serde_json::from_slice(res.body()).unwrap_or(Value::Null);
        (res.status(), body)
    }

    /// Waits until exactly `n` watch feeds are registered on the store
    pub async fn wait_for_watchers(
        &self,
        n: usize,
    ) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.store.watcher_count() != n {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("watcher count never settled");
    }
}

pub fn manifest(
    name: &str,
    replicas: i32,
) -> String {
    serde_json::json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": {"name": name, "labels": {"app": name}},
        "spec": {
            "replicas": replicas,
            "selector": {"matchLabels": {"app": name}},
            "template": {
                "metadata": {"labels": {"app": name}},
                "spec": {"containers": [{"name": "main", "image": "nginx:1.25"}]}
            }
        }
    })
    .to_string()
}

pub fn json_request(
    method: &str,
    path: &str,
    body: &str,
) -> warp::test::RequestBuilder {
    warp::test::request()
        .method(method)
        .path(path)
        .header("content-type", "application/json")
        .body(body.to_string())
}

/// `(event name, data)` pairs of an SSE body; keep-alive comments are skipped
pub fn parse_sse(body: &[u8]) -> Vec<(String, Value)> {
    let text = String::from_utf8_lossy(body);
    text.split("\n\n")
        .filter_map(|block| {
            let mut event = None;
            let mut data = None;
            for line in block.lines() {
                if let Some(v) = line.strip_prefix("event:") {
                    event = Some(v.trim().to_string());
                } else if let Some(v) = line.strip_prefix("data:") {
                    data = serde_json::from_str(v.trim()).ok();
                }
            }
            Some((event?, data?))
        })
        .collect()
}
