pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod email;
pub mod error;
pub mod models;
pub mod relay;
pub mod repository;
pub mod routes;
pub mod s3;
pub mod schema;
pub mod services;
pub mod state;
pub mod storage;

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::AppConfig;
use crate::email::{EmailDispatcher, EmailRenderer, EmailTransport, HttpEmailTransport};
use crate::repository::{MemoryRepository, PgRepository, Repository};
use crate::services::notifications::Notifier;

/// PostgreSQL when `DATABASE_URL` is set, process memory otherwise. Migrations run on startup.
pub fn build_repository(config: &AppConfig) -> Result<Arc<dyn Repository>> {
    match &config.database_url {
        Some(url) => {
            let pool = db::init_pool_with_size(url, config.database_max_pool_size)
                .context("failed to create database pool")?;
            let applied = db::run_migrations(&pool)?;
            tracing::info!(applied, "database migrations applied");
            Ok(Arc::new(PgRepository::new(pool)))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; records are kept in memory");
            Ok(Arc::new(MemoryRepository::new()))
        }
    }
}

/// Email dispatch through the relay at `EMAIL_API_URL`, with the configured fallback.
pub fn build_notifier(config: &AppConfig) -> Result<Notifier> {
    let email = &config.email;
    let transport: Option<Arc<dyn EmailTransport>> = email.api_url.as_ref().map(|url| {
        Arc::new(HttpEmailTransport::new(
            url.clone(),
            email.api_token.clone(),
            email.health_timeout,
            email.send_timeout,
        )) as Arc<dyn EmailTransport>
    });
    if transport.is_none() {
        tracing::warn!(fallback = %email.fallback, "EMAIL_API_URL not set");
    }
    let renderer = EmailRenderer::new(email).context("failed to load email templates")?;
    Ok(Notifier::new(
        EmailDispatcher::new(transport, email.fallback),
        renderer,
    ))
}
