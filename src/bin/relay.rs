use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use doccollect::relay::{self, MailSender, RelayConfig, RelayState, SmtpMailer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = RelayConfig::from_env()?;
    tracing::info!(
        component = "relay",
        smtp_host = %config.smtp_host,
        smtp_port = config.smtp_port,
        from = %config.from_email,
        api_key_configured = config.api_key.is_some(),
        rate_limit_max = config.rate_limit_max,
        rate_limit_window_secs = config.rate_limit_window.as_secs(),
        "loaded relay configuration"
    );

    let mailer = SmtpMailer::new(&config)?;
    match mailer.verify().await {
        Ok(()) => tracing::info!(component = "relay", "SMTP server ready"),
        Err(err) => tracing::error!(component = "relay", error = %err, "SMTP verification failed"),
    }

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("RELAY_HOST and RELAY_PORT must form a socket address")?;
    let state = RelayState::new(config, Arc::new(mailer));
    let app = relay::create_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "relay listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("relay received shutdown signal");
        }
    })
    .await
    .context("relay server error")?;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
