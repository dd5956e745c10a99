//! Exercises `PdpClient` against an in-process pdp stub bound on a random port.

use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use permit_server::{
    parse_attributes, Authorizer, AuthorizationQuery, PdpClient, Resource,
};

#[derive(Clone, Default)]
struct Seen(Arc<Mutex<Vec<(Option<String>, Value)>>>);

async fn spawn_pdp(status: StatusCode, reply: Value) -> (String, Seen) {
    let seen = Seen::default();
    let router = Router::new()
        .route(
            "/allowed",
            post(
                move |State(seen): State<Seen>,
                      headers: HeaderMap,
                      Json(body): Json<Value>| async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_owned);
                    seen.0.lock().unwrap().push((auth, body));
                    (status, Json(reply))
                },
            ),
        )
        .with_state(seen.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (format!("http://{}/", addr), seen)
}

fn query() -> AuthorizationQuery {
    AuthorizationQuery::new(
        "user123",
        "read",
        Resource::parse("document:readme", "default"),
    )
}

fn client(url: &str) -> PdpClient {
    PdpClient::new(url, "permit_key_test", Duration::from_secs(2)).unwrap()
}

#[tokio::test]
async fn allowed() {
    let (url, seen) = spawn_pdp(StatusCode::OK, json!({"allow": true})).await;

    let query = query()
        .with_user_attributes(parse_attributes("age:42").unwrap())
        .unwrap();
    assert!(client(&url).check(&query).await.unwrap());

    let seen = seen.0.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let (auth, body) = &seen[0];
    assert_eq!(auth.as_deref(), Some("Bearer permit_key_test"));
    assert_eq!(
        body,
        &json!({
            "user": {"key": "user123", "age": 42},
            "action": "read",
            "resource": {
                "type": "document",
                "key": "readme",
                "tenant": "default"
            },
            "context": {}
        })
    );
}

#[tokio::test]
async fn denied_with_extra_fields() {
    let (url, _) = spawn_pdp(
        StatusCode::OK,
        json!({"allow": false, "query": {}, "debug": {"reason": "no role"}}),
    )
    .await;

    assert!(!client(&url).check(&query()).await.unwrap());
}

#[tokio::test]
async fn error_status() {
    let (url, _) = spawn_pdp(
        StatusCode::UNAUTHORIZED,
        json!({"detail": "invalid api key"}),
    )
    .await;

    let err = client(&url).check(&query()).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(err.to_string().contains("401"));
    assert!(err.to_string().contains("invalid api key"));
}

#[tokio::test]
async fn malformed_answer() {
    let (url, _) = spawn_pdp(StatusCode::OK, json!({"permitted": "yes"})).await;

    assert!(client(&url).check(&query()).await.is_err());
}

#[tokio::test]
async fn unreachable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(&format!("http://{}", addr))
        .check(&query())
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn slow_pdp_times_out() {
    let router = Router::new().route(
        "/allowed",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({"allow": false}))
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let client = PdpClient::new(
        &format!("http://{}", addr),
        "permit_key_test",
        Duration::from_millis(300),
    )
    .unwrap();
    let start = Instant::now();
    let err = client.check(&query()).await.unwrap_err();

    assert!(start.elapsed() < Duration::from_secs(3));
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(err.to_string().contains("timed out"), "{}", err);
}
