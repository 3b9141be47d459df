use deployment_gateway::ResourceGateway;
use serde_json::json;
use warp::http::StatusCode;

use crate::common::json_request;
use crate::common::manifest;
use crate::common::TestApp;
use crate::enable_logger;

#[tokio::test]
async fn test_create_then_get_returns_same_projection() {
    enable_logger();
    let app = TestApp::new();

    let (status, created) = app
        .call(json_request("POST", "/default/deployments", &manifest("web", 2)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["code"], 200);
    assert_eq!(created["message"], "success");
    assert_eq!(created["data"]["name"], "web");
    assert_eq!(created["data"]["namespace"], "default");
    assert_eq!(created["data"]["replicas"], 2);

    let (status, fetched) = app
        .call(warp::test::request().path("/default/deployments/web"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["data"], created["data"]);

    let (_, list) = app.call(warp::test::request().path("/default/deployments")).await;
    assert_eq!(list["data"]["total"], 1);
    assert_eq!(list["data"]["items"][0], created["data"]);
}

#[tokio::test]
async fn test_create_from_yaml_manifest() {
    let app = TestApp::new();
    let yaml = "\
apiVersion: apps/v1
kind: Deployment
metadata:
  name: api
spec:
  replicas: 1
  selector:
    matchLabels:
      app: api
  template:
    metadata:
      labels:
        app: api
    spec:
      containers:
        - name: main
          image: busybox
";
    let request = warp::test::request()
        .method("POST")
        .path("/default/deployments")
        .header("content-type", "application/yaml")
        .body(yaml);

    let (status, body) = app.call(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "api");
    assert_eq!(body["data"]["containers"][0]["image"], "busybox");
}

#[tokio::test]
async fn test_duplicate_create_conflicts() {
    let app = TestApp::new();
    app.call(json_request("POST", "/default/deployments", &manifest("web", 1)))
        .await;

    let (status, body) = app
        .call(json_request("POST", "/default/deployments", &manifest("web", 1)))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 409);
}

#[tokio::test]
async fn test_delete_twice_then_get_is_not_found() {
    let app = TestApp::new();
    app.call(json_request("POST", "/default/deployments", &manifest("web", 1)))
        .await;

    let delete = || warp::test::request().method("DELETE").path("/default/deployments/web");

    let (status, body) = app.call(delete()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({"message": "deleted"}));

    let (status, body) = app.call(delete()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"code": 404, "message": "deployment not found"}));

    let (status, _) = app
        .call(warp::test::request().path("/default/deployments/web"))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_with_stale_resource_version_conflicts() {
    let app = TestApp::new();
    let (_, created) = app
        .call(json_request("POST", "/default/deployments", &manifest("web", 1)))
        .await;
    let rv = created["data"]["resourceVersion"].as_str().unwrap().to_string();

    let mut body: serde_json::Value = serde_json::from_str(&manifest("web", 3)).unwrap();
    body["metadata"]["resourceVersion"] = json!(rv);
    let (status, updated) = app
        .call(json_request("PUT", "/default/deployments/web", &body.to_string()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["data"]["replicas"], 3);

    // replaying the same resourceVersion is now stale
    let (status, _) = app
        .call(json_request("PUT", "/default/deployments/web", &body.to_string()))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_scale_then_list_pods() {
    let app = TestApp::new();
    app.call(json_request("POST", "/default/deployments", &manifest("web", 1)))
        .await;

    let (status, scaled) = app
        .call(json_request("PATCH", "/default/deployments/web/scale", r#"{"replicas":3}"#))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(scaled["data"]["replicas"], 3);

    let (status, pods) = app
        .call(warp::test::request().path("/default/deployments/web/pods"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pods["data"]["total"], 3);
    let items = pods["data"]["items"].as_array().unwrap();
    assert!(items.iter().all(|p| p["phase"] == "Running"));
    assert!(items.iter().all(|p| p["name"].as_str().unwrap().starts_with("web-")));

    let (_, limited) = app
        .call(warp::test::request().path("/default/deployments/web/pods?limit=2"))
        .await;
    assert_eq!(limited["data"]["total"], 2);

    let (status, _) = app
        .call(json_request("PATCH", "/default/deployments/web/scale", r#"{"replicas":-1}"#))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_namespace_is_rejected_before_the_store() {
    let app = TestApp::new();

    let (status, body) = app
        .call(json_request("POST", "/Bad_NS!/deployments", &manifest("web", 1)))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"code": 400, "message": "invalid namespace format"}));
    assert!(app.store.list("Bad_NS!").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_route_and_wrong_method() {
    let app = TestApp::new();

    let (status, _) = app.call(warp::test::request().path("/default/services")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .call(warp::test::request().method("PATCH").path("/default/deployments"))
        .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}
