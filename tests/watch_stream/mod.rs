use std::time::Duration;

use deployment_gateway::routes;
use deployment_gateway::Deployment;
use deployment_gateway::ResourceGateway;
use deployment_gateway::Status;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use warp::http::StatusCode;

use crate::common::manifest;
use crate::common::parse_sse;
use crate::common::TestApp;
use crate::common::MAX_BODY_SIZE;
use crate::enable_logger;

fn deployment(name: &str) -> Deployment {
    serde_json::from_str(&manifest(name, 1)).unwrap()
}

#[tokio::test]
async fn test_watch_streams_changes_then_close() {
    enable_logger();
    let app = TestApp::new();
    let store = app.store.clone();

    let writer = tokio::spawn({
        let store = store.clone();
        async move {
            while store.watcher_count() == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            store.create("default", deployment("web")).await.unwrap();
            store.create("other", deployment("skipped")).await.unwrap();
            store.scale("default", "web", 2).await.unwrap();
            store.delete("default", "web").await.unwrap();
            store.close_watchers();
        }
    });

    let res = tokio::time::timeout(
        Duration::from_secs(5),
        warp::test::request().path("/default/deployments/watch").reply(&app.api()),
    )
    .await
    .expect("stream did not end");
    writer.await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "text/event-stream");

    let frames = parse_sse(res.body());
    let kinds: Vec<&str> = frames
        .iter()
        .map(|(event, data)| match event.as_str() {
            "message" => data["type"].as_str().unwrap(),
            other => other,
        })
        .collect();
    assert_eq!(kinds, vec!["ADDED", "MODIFIED", "DELETED", "close"]);
    assert_eq!(frames[0].1["object"]["name"], "web");
    assert_eq!(frames[1].1["object"]["replicas"], 2);
    assert_eq!(frames[3].1["message"], "watch channel closed");
    assert_eq!(store.watcher_count(), 0);
}

#[tokio::test]
async fn test_watch_label_selector_and_error_event() {
    let app = TestApp::new();
    let store = app.store.clone();

    let writer = tokio::spawn({
        let store = store.clone();
        async move {
            while store.watcher_count() == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            store.create("default", deployment("web")).await.unwrap();
            store.create("default", deployment("api")).await.unwrap();
            store.notify_error("default", Status::failure(410, "Expired", "too old resource version"));
            store.close_watchers();
        }
    });

    let res = warp::test::request()
        .path("/default/deployments/watch?labelSelector=app%3Dapi")
        .reply(&app.api())
        .await;
    writer.await.unwrap();

    let frames = parse_sse(res.body());
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0].1["type"], "ADDED");
    assert_eq!(frames[0].1["object"]["name"], "api");
    assert_eq!(frames[1].1["type"], "ERROR");
    assert_eq!(frames[1].1["error"], "K8s API Error: too old resource version (Code: 410)");
    assert_eq!(frames[2].0, "close");
}

#[tokio::test]
async fn test_shutdown_ends_open_streams_without_close_frame() {
    let app = TestApp::new();
    let shutdown = app.state.shutdown.clone();
    let store = app.store.clone();

    let stopper = tokio::spawn(async move {
        while store.watcher_count() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        shutdown.cancel();
    });

    let res = tokio::time::timeout(
        Duration::from_secs(5),
        warp::test::request().path("/default/deployments/watch").reply(&app.api()),
    )
    .await
    .expect("stream did not end on shutdown");
    stopper.await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert!(parse_sse(res.body()).is_empty());
    app.wait_for_watchers(0).await;
}

#[tokio::test]
async fn test_watch_rejects_bad_namespace_and_selector() {
    let app = TestApp::new();

    let res = warp::test::request()
        .path("/Bad_NS!/deployments/watch")
        .reply(&app.api())
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = warp::test::request()
        .path("/default/deployments/watch?labelSelector=app%3D%2C")
        .reply(&app.api())
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.store.watcher_count(), 0);
}

#[tokio::test]
async fn test_client_disconnect_releases_subscription() {
    enable_logger();
    let app = TestApp::new();
    let (addr, server) = warp::serve(routes(app.state.clone(), MAX_BODY_SIZE)).bind_ephemeral(([127, 0, 0, 1], 0));
    let server = tokio::spawn(server);

    let mut client = TcpStream::connect(addr).await.unwrap();
    client
        .write_all(b"GET /default/deployments/watch HTTP/1.1\r\nHost: localhost\r\nAccept: text/event-stream\r\n\r\n")
        .await
        .unwrap();

    let mut head = [0u8; 512];
    let n = client.read(&mut head).await.unwrap();
    assert!(String::from_utf8_lossy(&head[..n]).starts_with("HTTP/1.1 200"));
    app.wait_for_watchers(1).await;

    drop(client);
    app.wait_for_watchers(0).await;

    // nothing is left to receive later changes
    app.store.create("default", deployment("web")).await.unwrap();
    assert_eq!(app.store.watcher_count(), 0);
    server.abort();
}
