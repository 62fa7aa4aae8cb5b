use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;

use super::{DeliveryReceipt, EmailTransport, OutgoingEmail, TransportError};

/// Talks to the email relay over HTTP (`GET /test-email`, `POST /send-email`).
#[derive(Clone)]
pub struct HttpEmailTransport {
    client: Client,
    base_url: String,
    token: Option<String>,
    health_timeout: Duration,
    send_timeout: Duration,
}

#[derive(Deserialize)]
struct RelayErrorBody {
    error: Option<String>,
}

impl HttpEmailTransport {
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        health_timeout: Duration,
        send_timeout: Duration,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            health_timeout,
            send_timeout,
        }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

fn map_send_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Unreachable(err.to_string())
    }
}

#[async_trait]
impl EmailTransport for HttpEmailTransport {
    async fn health(&self) -> Result<(), TransportError> {
        let response = self
            .authorize(self.client.get(format!("{}/test-email", self.base_url)))
            .timeout(self.health_timeout)
            .send()
            .await
            .map_err(map_send_error)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(TransportError::Unhealthy(response.status().as_u16()))
        }
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<DeliveryReceipt, TransportError> {
        let response = self
            .authorize(self.client.post(format!("{}/send-email", self.base_url)))
            .timeout(self.send_timeout)
            .json(email)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<DeliveryReceipt>()
                .await
                .map_err(|err| TransportError::Unreachable(format!("invalid relay response: {err}")));
        }

        let message = response
            .json::<RelayErrorBody>()
            .await
            .ok()
            .and_then(|body| body.error)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("relay error")
                    .to_string()
            });
        Err(TransportError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}
