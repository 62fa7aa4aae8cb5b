//! SMTP relay: accepts rendered request emails over HTTP and hands them to an SMTP server.

use std::sync::Arc;

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod config;
pub mod handlers;
pub mod mailer;
pub mod rate_limit;

pub use config::RelayConfig;
pub use mailer::{MailError, MailMessage, MailSender, SmtpMailer};
pub use rate_limit::RateLimiter;

pub const SERVICE_NAME: &str = "DocCollect Email Service";

#[derive(Clone)]
pub struct RelayState {
    pub config: Arc<RelayConfig>,
    pub mailer: Arc<dyn MailSender>,
    pub limiter: Arc<RateLimiter>,
}

impl RelayState {
    pub fn new(config: RelayConfig, mailer: Arc<dyn MailSender>) -> Self {
        let limiter = RateLimiter::new(config.rate_limit_max, config.rate_limit_window);
        Self {
            config: Arc::new(config),
            mailer,
            limiter: Arc::new(limiter),
        }
    }
}

pub fn create_router(state: RelayState) -> Router<()> {
    let allow_origin = match state.config.frontend_url.parse::<HeaderValue>() {
        Ok(origin) => AllowOrigin::exact(origin),
        Err(err) => {
            tracing::warn!(origin = %state.config.frontend_url, error = %err, "invalid FRONTEND_URL");
            AllowOrigin::list(Vec::<HeaderValue>::new())
        }
    };
    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(tower_http::cors::AllowMethods::mirror_request())
        .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
        .allow_credentials(true);

    Router::new()
        .route("/send-email", post(handlers::send_email))
        .route("/test-email", get(handlers::test_email))
        .route("/health", get(handlers::health))
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
