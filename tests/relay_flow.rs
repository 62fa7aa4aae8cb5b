mod common;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use common::{read_json, TestApp};
use doccollect::domain::account::Role;
use doccollect::email::{FallbackPolicy, HttpEmailTransport};
use doccollect::relay::{self, MailError, MailMessage, MailSender, RelayConfig, RelayState};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower::util::ServiceExt;

const TOKEN: &str = "relay-token-0123456789";

/// Mail sender that records messages, or fails with a connection error.
/// `fail_sends` keeps `verify` healthy and only breaks delivery.
#[derive(Default)]
struct FakeSender {
    sent: Mutex<Vec<MailMessage>>,
    fail_with_connection: bool,
    fail_sends: bool,
}

#[async_trait]
impl MailSender for FakeSender {
    async fn verify(&self) -> Result<(), MailError> {
        if self.fail_with_connection {
            return Err(MailError::Connection("connection refused".into()));
        }
        Ok(())
    }

    async fn send(&self, message: &MailMessage) -> Result<String, MailError> {
        if self.fail_with_connection || self.fail_sends {
            return Err(MailError::Connection("connection refused".into()));
        }
        let mut sent = self.sent.lock().await;
        sent.push(message.clone());
        Ok(format!("<smtp-{}@doccollect.fr>", sent.len()))
    }
}

fn relay_router(sender: Arc<FakeSender>, config: RelayConfig) -> Router {
    relay::create_router(RelayState::new(config, sender))
}

fn valid_body() -> Value {
    json!({
        "to": { "email": "client@example.com", "name": "Jean Dupont" },
        "subject": "Demande de documents - Dossier Location",
        "html": "<p>Bonjour</p>",
        "text": "Bonjour",
        "credentials": { "email": "client@example.com", "password": "Abcd2345" },
        "requestData": { "id": "r-1" }
    })
}

async fn post(router: &Router, body: &Value, token: Option<&str>) -> Result<axum::response::Response> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/send-email")
        .header("content-type", "application/json")
        .header("x-forwarded-for", "203.0.113.7");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = builder.body(Body::from(serde_json::to_vec(body)?))?;
    Ok(router.clone().oneshot(request).await.expect("infallible response"))
}

async fn get(router: &Router, path: &str) -> Result<axum::response::Response> {
    let request = Request::builder().uri(path).body(Body::empty())?;
    Ok(router.clone().oneshot(request).await.expect("infallible response"))
}

#[tokio::test]
async fn sends_and_never_echoes_credentials() -> Result<()> {
    let sender = Arc::new(FakeSender::default());
    let router = relay_router(sender.clone(), RelayConfig::default());

    let response = post(&router, &valid_body(), Some(TOKEN)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = read_json(response).await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["messageId"], "<smtp-1@doccollect.fr>");
    assert!(!body.to_string().contains("Abcd2345"));

    let sent = sender.sent.lock().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to_name, "Jean Dupont");
    assert_eq!(sent[0].text.as_deref(), Some("Bonjour"));
    Ok(())
}

#[tokio::test]
async fn missing_fields_are_validation_errors() -> Result<()> {
    let router = relay_router(Arc::new(FakeSender::default()), RelayConfig::default());

    let mut body = valid_body();
    body["to"] = json!({ "email": "client@example.com" });
    let response = post(&router, &body, Some(TOKEN)).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error: Value = read_json(response).await?;
    assert_eq!(error["code"], "VALIDATION_ERROR");
    assert_eq!(error["error"], "Destinataire manquant (email et nom requis)");
    assert!(error["timestamp"].is_string());

    let mut body = valid_body();
    body["credentials"] = json!({ "email": "client@example.com" });
    let response = post(&router, &body, Some(TOKEN)).await?;
    let error: Value = read_json(response).await?;
    assert_eq!(error["error"], "Identifiants client manquants");
    Ok(())
}

#[tokio::test]
async fn short_or_wrong_tokens_are_unauthorized() -> Result<()> {
    let router = relay_router(Arc::new(FakeSender::default()), RelayConfig::default());
    let response = post(&router, &valid_body(), Some("short")).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let response = post(&router, &valid_body(), None).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let keyed = relay_router(
        Arc::new(FakeSender::default()),
        RelayConfig {
            api_key: Some("expected-relay-key".into()),
            ..RelayConfig::default()
        },
    );
    let response = post(&keyed, &valid_body(), Some(TOKEN)).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let response = post(&keyed, &valid_body(), Some("expected-relay-key")).await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn rate_limit_applies_per_client() -> Result<()> {
    let router = relay_router(
        Arc::new(FakeSender::default()),
        RelayConfig {
            rate_limit_max: 2,
            ..RelayConfig::default()
        },
    );

    for _ in 0..2 {
        let response = post(&router, &valid_body(), Some(TOKEN)).await?;
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = post(&router, &valid_body(), Some(TOKEN)).await?;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let error: Value = read_json(response).await?;
    assert_eq!(error["code"], "RATE_LIMITED");
    Ok(())
}

#[tokio::test]
async fn smtp_outage_is_service_unavailable() -> Result<()> {
    let sender = Arc::new(FakeSender {
        fail_with_connection: true,
        ..FakeSender::default()
    });
    let router = relay_router(sender, RelayConfig::default());

    let response = post(&router, &valid_body(), Some(TOKEN)).await?;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let error: Value = read_json(response).await?;
    assert_eq!(error["code"], "ECONNECTION");
    Ok(())
}

#[tokio::test]
async fn health_and_unknown_routes() -> Result<()> {
    let router = relay_router(Arc::new(FakeSender::default()), RelayConfig::default());

    let response = get(&router, "/health").await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = read_json(response).await?;
    assert_eq!(body["status"], "OK");
    assert_eq!(body["service"], relay::SERVICE_NAME);

    let response = get(&router, "/nowhere").await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = read_json(response).await?;
    assert_eq!(body["path"], "/nowhere");
    Ok(())
}

async fn running_relay(sender: Arc<FakeSender>) -> Result<Arc<HttpEmailTransport>> {
    let router = relay_router(sender, RelayConfig::default());
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    Ok(Arc::new(HttpEmailTransport::new(
        format!("http://{addr}"),
        Some(TOKEN.to_string()),
        Duration::from_secs(5),
        Duration::from_secs(5),
    )))
}

#[tokio::test]
async fn relay_smtp_outage_is_a_bad_gateway_even_when_simulating() -> Result<()> {
    let sender = Arc::new(FakeSender {
        fail_sends: true,
        ..FakeSender::default()
    });
    let transport = running_relay(sender.clone()).await?;
    let app = TestApp::with_email(Some(transport), FallbackPolicy::Simulate).await?;
    let (_, token) = app.account("pro@example.com", Role::Professional).await?;
    let client_id = app.create_client(&token, "client@example.com").await?;
    let request_id = app.create_request(&token, client_id, &["RIB"]).await?;

    let response = app
        .post_empty(&format!("/api/requests/{request_id}/send-email"), Some(&token))
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let detail: Value =
        read_json(app.get(&format!("/api/requests/{request_id}"), Some(&token)).await?).await?;
    assert_eq!(detail["email_sent"], false);
    assert!(sender.sent.lock().await.is_empty());

    let response = app
        .post_empty(&format!("/api/requests/{request_id}/send-email"), Some(&token))
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    Ok(())
}

#[tokio::test]
async fn backend_delivers_through_a_running_relay() -> Result<()> {
    let sender = Arc::new(FakeSender::default());
    let transport = running_relay(sender.clone()).await?;
    let app = TestApp::with_email(Some(transport), FallbackPolicy::Fail).await?;
    let (_, token) = app.account("pro@example.com", Role::Professional).await?;
    let client_id = app.create_client(&token, "client@example.com").await?;
    let request_id = app.create_request(&token, client_id, &["RIB"]).await?;

    let response = app
        .post_empty(&format!("/api/requests/{request_id}/send-email"), Some(&token))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = read_json(response).await?;
    assert_eq!(body["simulated"], false);
    assert_eq!(body["message_id"], "<smtp-1@doccollect.fr>");

    let sent = sender.sent.lock().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to_email, "client@example.com");
    assert_eq!(sent[0].subject, "Demande de documents - Documents requis");
    Ok(())
}
