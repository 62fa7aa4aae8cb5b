mod common;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::http::StatusCode;
use common::{read_json, RecordingTransport, TestApp};
use doccollect::domain::account::Role;
use doccollect::email::{EmailTransport, FallbackPolicy, HttpEmailTransport};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use uuid::Uuid;

/// Transport aimed at a local port nothing listens on.
async fn unreachable_transport() -> Result<Arc<dyn EmailTransport>> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(Arc::new(HttpEmailTransport::new(
        format!("http://{addr}"),
        None,
        Duration::from_secs(2),
        Duration::from_secs(2),
    )))
}

async fn prepared_request(app: &TestApp) -> Result<(String, Uuid)> {
    let (_, token) = app.account("pro@example.com", Role::Professional).await?;
    let client_id = app.create_client(&token, "jean.dupont@example.com").await?;
    let request_id = app
        .create_request(&token, client_id, &["Pièce d'identité", "Justificatif de domicile"])
        .await?;
    Ok((token, request_id))
}

fn send_path(request_id: Uuid) -> String {
    format!("/api/requests/{request_id}/send-email")
}

#[tokio::test]
async fn unreachable_relay_is_simulated_and_credentials_work() -> Result<()> {
    let app = TestApp::with_email(Some(unreachable_transport().await?), FallbackPolicy::Simulate)
        .await?;
    let (token, request_id) = prepared_request(&app).await?;

    let response = app
        .post_json(
            &send_path(request_id),
            &json!({ "custom_message": "  Merci de faire vite.  " }),
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let sent: Value = read_json(response).await?;
    assert_eq!(sent["success"], true);
    assert_eq!(sent["simulated"], true);
    assert_eq!(sent["credentials"]["email"], "jean.dupont@example.com");
    let password = sent["credentials"]["password"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    assert_eq!(password.len(), 8);

    let response = app.get(&format!("/api/requests/{request_id}"), Some(&token)).await?;
    let detail: Value = read_json(response).await?;
    assert_eq!(detail["email_sent"], true);
    assert_eq!(detail["client_credentials"]["delivery"], "simulated");
    assert!(detail["client_credentials"].get("password_hash").is_none());
    assert!(!detail.to_string().contains(&password));

    let response = app
        .post_json(
            "/api/auth/client-login",
            &json!({ "email": "Jean.Dupont@example.com", "password": password }),
            None,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let login: Value = read_json(response).await?;
    assert_eq!(login["request_id"], request_id.to_string());
    assert_eq!(login["token_type"], "Bearer");
    let client_token = login["access_token"].as_str().unwrap_or_default().to_string();

    // The client sees its own request, but not the professional's client records.
    let response = app
        .get(&format!("/api/requests/{request_id}"), Some(&client_token))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let response = app
        .upload_file(
            &format!("/api/requests/{request_id}/documents/piece-d-identite"),
            "cni.pdf",
            "application/pdf",
            b"%PDF-1.4\n",
            &client_token,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    Ok(())
}

#[tokio::test]
async fn second_send_is_refused() -> Result<()> {
    let transport = Arc::new(RecordingTransport::default());
    let app = TestApp::with_email(Some(transport.clone()), FallbackPolicy::Fail).await?;
    let (token, request_id) = prepared_request(&app).await?;

    let response = app.post_empty(&send_path(request_id), Some(&token)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let sent: Value = read_json(response).await?;
    assert_eq!(sent["simulated"], false);
    assert_eq!(sent["message_id"], "relay-1");

    let response = app.post_empty(&send_path(request_id), Some(&token)).await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let delivered = transport.sent().await;
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].to.email, "jean.dupont@example.com");
    assert!(delivered[0].text.contains(&delivered[0].credentials.password));
    assert_eq!(delivered[0].request_data.requested_documents.len(), 2);
    Ok(())
}

#[tokio::test]
async fn fail_policy_leaves_no_trace() -> Result<()> {
    let app =
        TestApp::with_email(Some(unreachable_transport().await?), FallbackPolicy::Fail).await?;
    let (token, request_id) = prepared_request(&app).await?;

    let response = app.post_empty(&send_path(request_id), Some(&token)).await?;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = app.get(&format!("/api/requests/{request_id}"), Some(&token)).await?;
    let detail: Value = read_json(response).await?;
    assert_eq!(detail["email_sent"], false);
    assert!(detail["client_credentials"].is_null());
    Ok(())
}

#[tokio::test]
async fn only_the_owner_sends() -> Result<()> {
    let app = TestApp::new().await?;
    let (_, owner) = app.account("owner@example.com", Role::Professional).await?;
    let (_, stranger) = app.account("stranger@example.com", Role::Professional).await?;
    let client_id = app.create_client(&owner, "client@example.com").await?;
    let request_id = app.create_request(&owner, client_id, &["RIB"]).await?;

    let response = app.post_empty(&send_path(request_id), Some(&stranger)).await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .post_empty(&send_path(Uuid::new_v4()), Some(&owner))
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}
