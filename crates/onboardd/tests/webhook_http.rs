//! Router tests driven through `tower::ServiceExt::oneshot`, without a socket.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use github_app_client::fakes::MemoryGitHub;
use github_app_client::InstallationId;
use onboard_core::{sign, EmbeddedTemplates, Provisioner};
use onboard_state::fakes::MemoryConfigStore;
use onboardd::{build_router, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;
use tracing_test::traced_test;

const SECRET: &str = "webhook-secret";

fn app(github: Arc<MemoryGitHub>, secret: Option<&str>) -> Router {
    let store = MemoryConfigStore::with_documents([(
        "acme/api",
        json!({
            "technology": "node",
            "runner": {"type": "hosted"},
            "triggers": {"workflow_dispatch": true},
            "notify": "slack",
            "docker": false,
            "deploy": "s3"
        }),
    )]);
    let provisioner = Provisioner::new(Arc::new(store), github, Arc::new(EmbeddedTemplates));
    let mut state = AppState::new(provisioner).with_max_body_bytes(64 * 1024);
    if let Some(secret) = secret {
        state = state.with_webhook_secret(secret);
    }
    build_router(state)
}

fn repository_created() -> Vec<u8> {
    json!({
        "action": "created",
        "installation": {"id": 77},
        "repository": {"name": "api", "full_name": "acme/api", "owner": {"login": "acme"}}
    })
    .to_string()
    .into_bytes()
}

fn delivery(uri: &str, event: &str, body: Vec<u8>, signature: Option<String>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("X-GitHub-Event", event)
        .header("X-GitHub-Delivery", "delivery-1");
    if let Some(signature) = signature {
        builder = builder.header("X-Hub-Signature-256", signature);
    }
    builder.body(Body::from(body)).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn healthz_is_ok() {
    let response = app(Arc::new(MemoryGitHub::new()), None)
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({"status": "ok"}));
}

#[tokio::test]
async fn signed_repository_event_provisions_and_reports() {
    let github = Arc::new(MemoryGitHub::new());
    let body = repository_created();
    let signature = sign(SECRET.as_bytes(), &body).unwrap();

    let response = app(github.clone(), Some(SECRET))
        .oneshot(delivery("/webhook", "repository", body, Some(signature)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let value = json_body(response).await;
    assert_eq!(value["message"], json!("Webhook received"));
    assert_eq!(value["report"]["installation_id"], json!(77));
    assert_eq!(value["report"]["repositories"][0]["customized"], json!(true));

    let workflow = github
        .file("acme/api", ".github/workflows/build-and-deploy.yml")
        .unwrap();
    assert!(workflow.contains("name: node Build and Deploy Workflow"));
    assert_eq!(github.deleted_installations(), vec![InstallationId(77)]);
}

#[tokio::test]
async fn root_path_accepts_deliveries() {
    let github = Arc::new(MemoryGitHub::new());
    let response = app(github.clone(), None)
        .oneshot(delivery("/", "repository", repository_created(), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(github.writes().len(), 4);
}

#[tokio::test]
async fn bad_or_missing_signature_is_unauthorized() {
    let github = Arc::new(MemoryGitHub::new());

    let response = app(github.clone(), Some(SECRET))
        .oneshot(delivery("/webhook", "repository", repository_created(), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let forged = sign(b"wrong-secret", &repository_created()).unwrap();
    let response = app(github.clone(), Some(SECRET))
        .oneshot(delivery("/webhook", "repository", repository_created(), Some(forged)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    assert!(github.writes().is_empty());
    assert!(github.deleted_installations().is_empty());
}

#[tokio::test]
#[traced_test]
async fn forged_signature_is_logged_as_rejected_delivery() {
    let forged = sign(b"wrong-secret", &repository_created()).unwrap();
    let response = app(Arc::new(MemoryGitHub::new()), Some(SECRET))
        .oneshot(delivery("/webhook", "repository", repository_created(), Some(forged)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(logs_contain("delivery.rejected"));
    assert!(logs_contain("delivery-1"));
    assert!(!logs_contain("provision.started"));
}

#[tokio::test]
async fn invalid_payload_is_bad_request() {
    let response = app(Arc::new(MemoryGitHub::new()), None)
        .oneshot(delivery(
            "/webhook",
            "repository",
            br#"{"action":"created"}"#.to_vec(),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let value = json_body(response).await;
    assert!(value["error"].as_str().unwrap().contains("repository"));
}

#[tokio::test]
async fn missing_event_header_is_bad_request() {
    let request = Request::builder()
        .method("POST")
        .uri("/webhook")
        .body(Body::from(repository_created()))
        .unwrap();
    let response = app(Arc::new(MemoryGitHub::new()), None)
        .oneshot(request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn other_events_are_ignored() {
    let github = Arc::new(MemoryGitHub::new());
    let response = app(github.clone(), None)
        .oneshot(delivery(
            "/webhook",
            "push",
            br#"{"ref":"refs/heads/main"}"#.to_vec(),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let value = json_body(response).await;
    assert_eq!(value["ignored"], json!(true));
    assert!(github.writes().is_empty());
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let body = vec![b' '; 128 * 1024];
    let response = app(Arc::new(MemoryGitHub::new()), None)
        .oneshot(delivery("/webhook", "ping", body, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
