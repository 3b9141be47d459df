use std::sync::Arc;

use serde_json::json;
use serde_json::Value;
use warp::http::StatusCode;

use super::*;
use crate::gateway::MockResourceGateway;
use crate::models::Deployment;
use crate::models::ObjectMeta;
use crate::models::Pod;
use crate::GatewayError;
use crate::WatchConfig;

const MANIFEST: &str = r#"{
    "apiVersion": "apps/v1",
    "kind": "Deployment",
    "metadata": {"name": "web"},
    "spec": {
        "replicas": 2,
        "selector": {"matchLabels": {"app": "web"}},
        "template": {"spec": {"containers": [{"name": "nginx", "image": "nginx:1.25"}]}}
    }
}"#;

fn state(mock: MockResourceGateway) -> ApiState {
    ApiState::new(Arc::new(mock), WatchConfig::default())
}

/// Gateway that fails the test if any method is reached
fn untouched_gateway() -> MockResourceGateway {
    let mut mock = MockResourceGateway::new();
    mock.expect_list().times(0);
    mock.expect_get().times(0);
    mock.expect_create().times(0);
    mock.expect_update().times(0);
    mock.expect_delete().times(0);
    mock.expect_scale().times(0);
    mock.expect_watch().times(0);
    mock.expect_pod_list().times(0);
    mock
}

fn stored(
    namespace: &str,
    name: &str,
) -> Deployment {
    Deployment {
        metadata: ObjectMeta {
            name: name.to_string(),
            namespace: namespace.to_string(),
            resource_version: "1".to_string(),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn not_found(name: &str) -> GatewayError {
    GatewayError::NotFound {
        kind: "deployment",
        namespace: "default".to_string(),
        name: name.to_string(),
    }
}

async fn call(
    mock: MockResourceGateway,
    request: warp::test::RequestBuilder,
) -> (StatusCode, Value) {
    let api = routes(state(mock), 1024 * 1024);
    let res = request.reply(&api).await;
    let body: Value = serde_json::from_slice(res.body()).unwrap_or(Value::Null);
    (res.status(), body)
}

fn json_request(
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

#[tokio::test]
async fn test_invalid_namespace_rejected_on_every_endpoint() {
    let requests = vec![
        warp::test::request().method("GET").path("/Bad_NS!/deployments"),
        json_request("POST", "/Bad_NS!/deployments", MANIFEST),
        warp::test::request().method("GET").path("/Bad_NS!/deployments/web"),
        json_request("PUT", "/Bad_NS!/deployments/web", MANIFEST),
        warp::test::request().method("DELETE").path("/Bad_NS!/deployments/web"),
        json_request("PATCH", "/Bad_NS!/deployments/web/scale", r#"{"replicas": 1}"#),
        warp::test::request().method("GET").path("/Bad_NS!/deployments/web/pods"),
        warp::test::request().method("GET").path("/Bad_NS!/deployments/watch"),
    ];

    for request in requests {
        let (status, body) = call(untouched_gateway(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"code": 400, "message": "invalid namespace format"}));
    }
}

#[tokio::test]
async fn test_invalid_name_rejected_on_every_endpoint() {
    let requests = vec![
        warp::test::request().method("GET").path("/default/deployments/Web_1"),
        json_request("PUT", "/default/deployments/Web_1", MANIFEST),
        warp::test::request().method("DELETE").path("/default/deployments/Web_1"),
        json_request("PATCH", "/default/deployments/Web_1/scale", r#"{"replicas": 1}"#),
        warp::test::request().method("GET").path("/default/deployments/Web_1/pods"),
    ];

    for request in requests {
        let (status, body) = call(untouched_gateway(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "invalid deployment name format");
    }
}

#[tokio::test]
async fn test_create_with_invalid_manifest_name_is_rejected() {
    let manifest = MANIFEST.replace("\"web\"", "\"Web!\"");
    let (status, body) = call(untouched_gateway(), json_request("POST", "/default/deployments", &manifest)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "invalid deployment name format");
}

#[tokio::test]
async fn test_list_returns_projected_array() {
    let mut mock = MockResourceGateway::new();
    mock.expect_list()
        .times(1)
        .returning(|_| Ok(vec![stored("default", "api"), stored("default", "web")]));

    let (status, body) = call(mock, warp::test::request().path("/default/deployments")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 200);
    assert_eq!(body["message"], "success");
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(body["data"]["items"][1]["name"], "web");
    assert!(body["data"]["items"][0].get("metadata").is_none());
}

#[tokio::test]
async fn test_empty_list_is_array_not_null() {
    let mut mock = MockResourceGateway::new();
    mock.expect_list().times(1).returning(|_| Ok(vec![]));

    let (status, body) = call(mock, warp::test::request().path("/default/deployments")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"], json!([]));
}

#[tokio::test]
async fn test_list_upstream_failure_is_500() {
    let mut mock = MockResourceGateway::new();
    mock.expect_list()
        .times(1)
        .returning(|_| Err(GatewayError::Upstream("connection refused".to_string())));

    let (status, body) = call(mock, warp::test::request().path("/default/deployments")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body["message"],
        "failed to list deployments: upstream failure: connection refused"
    );
}

#[tokio::test]
async fn test_create_fills_namespace_from_path() {
    let mut mock = MockResourceGateway::new();
    mock.expect_create()
        .withf(|_, d: &Deployment| d.metadata.namespace == "prod" && d.metadata.name == "web")
        .times(1)
        .returning(|_, mut d| {
            d.metadata.resource_version = "1".to_string();
            Ok(d)
        });

    let (status, body) = call(mock, json_request("POST", "/prod/deployments", MANIFEST)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["namespace"], "prod");
    assert_eq!(body["data"]["replicas"], 2);
}

#[tokio::test]
async fn test_create_accepts_yaml() {
    let yaml = "kind: Deployment\nmetadata:\n  name: web\nspec:\n  replicas: 1\n";
    let mut mock = MockResourceGateway::new();
    mock.expect_create().times(1).returning(|_, d| Ok(d));

    let request = warp::test::request()
        .method("POST")
        .path("/default/deployments")
        .header("content-type", "application/x-yaml")
        .body(yaml);
    let (status, body) = call(mock, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "web");
}

#[tokio::test]
async fn test_create_and_update_reject_oversized_replicas() {
    let manifest = MANIFEST.replace(r#""replicas": 2"#, r#""replicas": 2147483647"#);

    let (status, body) = call(untouched_gateway(), json_request("POST", "/default/deployments", &manifest)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "invalid replicas format: must be between 0 and 1000, got 2147483647"
    );

    let (status, _) = call(untouched_gateway(), json_request("PUT", "/default/deployments/web", &manifest)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_rejects_namespace_mismatch() {
    let manifest = MANIFEST.replace(r#"{"name": "web"}"#, r#"{"name": "web", "namespace": "other"}"#);
    let (status, body) = call(untouched_gateway(), json_request("POST", "/default/deployments", &manifest)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "manifest namespace other does not match request namespace default"
    );
}

#[tokio::test]
async fn test_create_unsupported_media_type() {
    for content_type in [Some("text/plain"), None] {
        let mut request = warp::test::request()
            .method("POST")
            .path("/default/deployments")
            .body(MANIFEST);
        if let Some(ct) = content_type {
            request = request.header("content-type", ct);
        }

        let (status, body) = call(untouched_gateway(), request).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(body["code"], 415);
    }
}

#[tokio::test]
async fn test_create_malformed_body_is_400() {
    let (status, body) = call(untouched_gateway(), json_request("POST", "/default/deployments", "{not json")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("failed to parse JSON manifest"));
}

#[tokio::test]
async fn test_create_already_exists_is_409() {
    let mut mock = MockResourceGateway::new();
    mock.expect_create().times(1).returning(|ns, d| {
        Err(GatewayError::AlreadyExists {
            kind: "deployment",
            namespace: ns.to_string(),
            name: d.metadata.name,
        })
    });

    let (status, body) = call(mock, json_request("POST", "/default/deployments", MANIFEST)).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, json!({"code": 409, "message": "deployment already exists"}));
}

#[tokio::test]
async fn test_get_not_found_is_404() {
    let mut mock = MockResourceGateway::new();
    mock.expect_get().times(1).returning(|_, name| Err(not_found(name)));

    let (status, body) = call(mock, warp::test::request().path("/default/deployments/ghost")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"code": 404, "message": "deployment not found"}));
}

#[tokio::test]
async fn test_get_returns_projection() {
    let mut mock = MockResourceGateway::new();
    mock.expect_get().times(1).returning(|ns, name| Ok(stored(ns, name)));

    let (status, body) = call(mock, warp::test::request().path("/default/deployments/web")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "web");
    assert_eq!(body["data"]["resourceVersion"], "1");
}

#[tokio::test]
async fn test_update_fills_name_and_maps_errors() {
    let manifest = MANIFEST.replace(r#""name": "web""#, r#""labels": {"a": "b"}"#);

    let mut mock = MockResourceGateway::new();
    mock.expect_update()
        .withf(|_, _, d: &Deployment| d.metadata.name == "web")
        .times(1)
        .returning(|_, _, _| {
            Err(GatewayError::Conflict {
                kind: "deployment",
                namespace: "default".to_string(),
                name: "web".to_string(),
                expected: "1".to_string(),
                actual: "2".to_string(),
            })
        });
    let (status, body) = call(mock, json_request("PUT", "/default/deployments/web", &manifest)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body["message"],
        "deployment has been modified, please retry (resourceVersion conflict)"
    );

    let mut mock = MockResourceGateway::new();
    mock.expect_update().times(1).returning(|_, name, _| Err(not_found(name)));
    let (status, body) = call(mock, json_request("PUT", "/default/deployments/web", MANIFEST)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body["message"],
        "deployment not found (it may have been deleted during the update)"
    );
}

#[tokio::test]
async fn test_update_rejects_name_mismatch() {
    let (status, body) = call(untouched_gateway(), json_request("PUT", "/default/deployments/api", MANIFEST)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "manifest name web does not match request name api");
}

#[tokio::test]
async fn test_delete_success_and_not_found() {
    let mut mock = MockResourceGateway::new();
    mock.expect_delete().times(1).returning(|_, _| Ok(()));
    let (status, body) = call(mock, warp::test::request().method("DELETE").path("/default/deployments/web")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({"message": "deleted"}));

    let mut mock = MockResourceGateway::new();
    mock.expect_delete().times(1).returning(|_, name| Err(not_found(name)));
    let (status, body) = call(mock, warp::test::request().method("DELETE").path("/default/deployments/web")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "deployment not found");
}

#[tokio::test]
async fn test_scale_validates_body() {
    for body in [
        r#"{"replicas": -1}"#,
        r#"{"replicas": "three"}"#,
        r#"{"replicas": 1001}"#,
        r#"{"replicas": 2147483647}"#,
        "{}",
        "",
    ] {
        let (status, resp) = call(untouched_gateway(), json_request("PATCH", "/default/deployments/web/scale", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {body:?}");
        assert!(resp["message"]
            .as_str()
            .unwrap()
            .starts_with("invalid replicas format"));
    }
}

#[tokio::test]
async fn test_scale_success() {
    let mut mock = MockResourceGateway::new();
    mock.expect_scale()
        .withf(|_, _, replicas| *replicas == 5)
        .times(1)
        .returning(|ns, name, replicas| {
            let mut d = stored(ns, name);
            d.spec.replicas = Some(replicas);
            Ok(d)
        });

    let (status, body) = call(mock, json_request("PATCH", "/default/deployments/web/scale", r#"{"replicas": 5}"#)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["replicas"], 5);
}

#[tokio::test]
async fn test_pods_limit_falls_back_to_default() {
    for query in ["", "?limit=abc", "?limit=-3", "?limit=0"] {
        let mut mock = MockResourceGateway::new();
        mock.expect_pod_list()
            .withf(|_, _, limit| *limit == 500)
            .times(1)
            .returning(|_, _, _| Ok(vec![]));

        let path = format!("/default/deployments/web/pods{query}");
        let (status, body) = call(mock, warp::test::request().path(&path)).await;
        assert_eq!(status, StatusCode::OK, "query {query:?}");
        assert_eq!(body["data"], json!({"items": [], "total": 0}));
    }
}

#[tokio::test]
async fn test_pods_explicit_limit_and_projection() {
    let mut mock = MockResourceGateway::new();
    mock.expect_pod_list()
        .withf(|_, _, limit| *limit == 2)
        .times(1)
        .returning(|ns, _, _| {
            Ok(vec![Pod {
                metadata: ObjectMeta {
                    name: "web-abcde".to_string(),
                    namespace: ns.to_string(),
                    ..Default::default()
                },
                ..Default::default()
            }])
        });

    let (status, body) = call(mock, warp::test::request().path("/default/deployments/web/pods?limit=2")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["name"], "web-abcde");
}

#[tokio::test]
async fn test_pods_for_missing_deployment_is_404() {
    let mut mock = MockResourceGateway::new();
    mock.expect_pod_list().times(1).returning(|_, owner, _| Err(not_found(owner)));

    let (status, _) = call(mock, warp::test::request().path("/default/deployments/ghost/pods")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_watch_establishment_failures() {
    let mut mock = MockResourceGateway::new();
    mock.expect_watch()
        .times(1)
        .returning(|_, _| Err(GatewayError::Upstream("watch refused".to_string())));
    let (status, body) = call(mock, warp::test::request().path("/default/deployments/watch")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body["message"],
        "failed to start watching deployments: upstream failure: watch refused"
    );

    let mut mock = MockResourceGateway::new();
    mock.expect_watch()
        .times(1)
        .returning(|_, _| Err(GatewayError::InvalidSelector("empty requirement".to_string())));
    let (status, _) = call(
        mock,
        warp::test::request().path("/default/deployments/watch?labelSelector=app%3D%2C"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_route_and_method() {
    let (status, body) = call(untouched_gateway(), warp::test::request().path("/default/services")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);

    let (status, _) = call(untouched_gateway(), warp::test::request().method("POST").path("/default/deployments/web")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[test]
fn test_pods_query_effective_limit() {
    let q = |limit: Option<&str>| PodsQuery {
        limit: limit.map(str::to_string),
    };
    assert_eq!(q(None).effective_limit(), 500);
    assert_eq!(q(Some("25")).effective_limit(), 25);
    assert_eq!(q(Some(" 7 ")).effective_limit(), 7);
    assert_eq!(q(Some("0")).effective_limit(), 500);
    assert_eq!(q(Some("1.5")).effective_limit(), 500);
}
