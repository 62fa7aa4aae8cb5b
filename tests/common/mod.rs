use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, ensure, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use doccollect::auth::jwt::JwtService;
use doccollect::config::{AppConfig, EmailConfig, StorageConfig};
use doccollect::domain::account::Role;
use doccollect::email::{
    DeliveryReceipt, EmailDispatcher, EmailRenderer, EmailTransport, FallbackPolicy,
    OutgoingEmail, TransportError,
};
use doccollect::repository::{MemoryRepository, Repository};
use doccollect::routes;
use doccollect::services::{accounts, notifications::Notifier};
use doccollect::state::AppState;
use doccollect::storage::{MemoryStorage, ObjectStorage};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tower::util::ServiceExt;
use uuid::Uuid;

pub const PASSWORD: &str = "s3cret-password";

/// Healthy relay stand-in that records every message it is asked to send.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<OutgoingEmail>>,
}

#[async_trait]
impl EmailTransport for RecordingTransport {
    async fn health(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<DeliveryReceipt, TransportError> {
        let mut guard = self.sent.lock().await;
        guard.push(email.clone());
        Ok(DeliveryReceipt {
            message_id: Some(format!("relay-{}", guard.len())),
        })
    }
}

impl RecordingTransport {
    #[allow(dead_code)]
    pub async fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().await.clone()
    }
}

pub struct TestApp {
    pub state: AppState,
    router: Router,
    repo: Arc<MemoryRepository>,
    storage: Arc<MemoryStorage>,
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: None,
        database_max_pool_size: 1,
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        jwt_secret: "test-secret".to_string(),
        jwt_issuer: "test-issuer".to_string(),
        jwt_audience: "test-audience".to_string(),
        jwt_expiry_minutes: 60,
        cors_allowed_origin: None,
        storage: StorageConfig {
            s3_bucket: None,
            aws_endpoint_url: None,
            aws_access_key_id: None,
            aws_secret_access_key: None,
            aws_region: "us-east-1".to_string(),
            download_url_ttl: Duration::from_secs(300),
        },
        email: EmailConfig::default(),
    }
}

impl TestApp {
    /// No email endpoint, simulated delivery.
    pub async fn new() -> Result<Self> {
        Self::with_email(None, FallbackPolicy::Simulate).await
    }

    pub async fn with_email(
        transport: Option<Arc<dyn EmailTransport>>,
        policy: FallbackPolicy,
    ) -> Result<Self> {
        let mut config = test_config();
        config.email.fallback = policy;

        let repo = Arc::new(MemoryRepository::new());
        let storage = Arc::new(MemoryStorage::new());
        let repo_for_state: Arc<dyn Repository> = repo.clone();
        let storage_for_state: Arc<dyn ObjectStorage> = storage.clone();
        let jwt = JwtService::from_config(&config)?;
        let notifier = Notifier::new(
            EmailDispatcher::new(transport, policy),
            EmailRenderer::new(&config.email)?,
        );
        let state = AppState::new(repo_for_state, config, storage_for_state, jwt, notifier);
        let router = routes::create_router(state.clone());

        Ok(Self {
            state,
            router,
            repo,
            storage,
        })
    }

    #[allow(dead_code)]
    pub fn repo(&self) -> Arc<MemoryRepository> {
        self.repo.clone()
    }

    #[allow(dead_code)]
    pub fn storage(&self) -> Arc<MemoryStorage> {
        self.storage.clone()
    }

    pub fn insert_user(&self, username: &str, password: &str, role: Role) -> Result<Uuid> {
        let user = accounts::create_user(self.repo.as_ref(), username, password, role)?;
        Ok(user.id)
    }

    pub async fn login_token(&self, username: &str, password: &str) -> Result<String> {
        #[derive(Serialize)]
        struct LoginPayload<'a> {
            username: &'a str,
            password: &'a str,
        }

        let response = self
            .post_json(
                "/api/auth/login",
                &LoginPayload { username, password },
                None,
            )
            .await?;

        ensure!(
            response.status() == StatusCode::OK,
            "login failed with status {}",
            response.status()
        );

        #[derive(Deserialize)]
        struct LoginResponse {
            access_token: String,
        }
        let parsed: LoginResponse = read_json(response).await?;
        Ok(parsed.access_token)
    }

    /// Creates an account with the given role and returns its id and a bearer token.
    pub async fn account(&self, username: &str, role: Role) -> Result<(Uuid, String)> {
        let id = self.insert_user(username, PASSWORD, role)?;
        let token = self.login_token(username, PASSWORD).await?;
        Ok((id, token))
    }

    #[allow(dead_code)]
    pub async fn create_client(&self, token: &str, email: &str) -> Result<Uuid> {
        let response = self
            .post_json(
                "/api/clients",
                &json!({
                    "first_name": "Jean",
                    "last_name": "Dupont",
                    "email": email,
                    "phone": "0612345678",
                }),
                Some(token),
            )
            .await?;
        ensure!(
            response.status() == StatusCode::CREATED,
            "client creation failed with status {}",
            response.status()
        );
        let body: Value = read_json(response).await?;
        id_of(&body)
    }

    /// Request for `client_id` asking for the named documents, all required.
    #[allow(dead_code)]
    pub async fn create_request(
        &self,
        token: &str,
        client_id: Uuid,
        documents: &[&str],
    ) -> Result<Uuid> {
        let documents: Vec<Value> = documents
            .iter()
            .map(|name| json!({ "name": name, "required": true }))
            .collect();
        let response = self
            .post_json(
                "/api/requests",
                &json!({ "client_id": client_id, "documents": documents }),
                Some(token),
            )
            .await?;
        ensure!(
            response.status() == StatusCode::CREATED,
            "request creation failed with status {}",
            response.status()
        );
        let body: Value = read_json(response).await?;
        id_of(&body)
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        self.send(Method::POST, path, Some(body), token).await
    }

    #[allow(dead_code)]
    pub async fn patch_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        self.send(Method::PATCH, path, Some(body), token).await
    }

    #[allow(dead_code)]
    pub async fn post_empty(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        self.send(Method::POST, path, None, token).await
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        self.send(Method::GET, path, None, token).await
    }

    #[allow(dead_code)]
    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        self.send(Method::DELETE, path, None, token).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        json_body: Option<Vec<u8>>,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder().method(method).uri(path);
        if json_body.is_some() {
            builder = builder.header("content-type", "application/json");
        }
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(json_body.map(Body::from).unwrap_or_else(Body::empty))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    #[allow(dead_code)]
    pub async fn upload_file(
        &self,
        path: &str,
        filename: &str,
        content_type: &str,
        data: &[u8],
        token: &str,
    ) -> Result<hyper::Response<Body>> {
        let boundary = format!("boundary-{}", Uuid::new_v4());
        let mut body = Vec::new();
        body.extend(format!("--{boundary}\r\n").as_bytes());
        body.extend(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
                filename
            )
            .as_bytes(),
        );
        body.extend(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
        body.extend(data);
        body.extend(b"\r\n");
        body.extend(format!("--{boundary}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .header("authorization", format!("Bearer {token}"))
            .body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }
}

pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(collected.to_bytes().to_vec())
}

pub async fn read_json<T: DeserializeOwned>(response: hyper::Response<Body>) -> Result<T> {
    let body = body_to_vec(response.into_body()).await?;
    Ok(serde_json::from_slice(&body)?)
}

pub fn id_of(body: &Value) -> Result<Uuid> {
    let raw = body["id"]
        .as_str()
        .ok_or_else(|| anyhow!("response has no id: {body}"))?;
    Ok(Uuid::parse_str(raw)?)
}
