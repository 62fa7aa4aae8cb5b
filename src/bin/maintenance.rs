use std::env;

use anyhow::{anyhow, bail, Context, Result};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use doccollect::{
    build_repository,
    config::AppConfig,
    domain::{account::Role, Actor},
    repository::UserStore,
    services::{accounts, ownership},
};

const USAGE: &str = "Usage:\n  maintenance repair-ownership --actor <user-uuid>\n  maintenance create-user <email> <password> --role <client|professional|admin>";

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("repair-ownership") => repair_ownership(&args[1..])?,
        Some("create-user") => create_user(&args[1..])?,
        Some(cmd) => {
            eprintln!("Unknown command: {cmd}\n{USAGE}");
            std::process::exit(1);
        }
        None => {
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
    }

    Ok(())
}

fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|arg| arg == name)
        .and_then(|index| args.get(index + 1))
        .map(String::as_str)
}

fn load_config() -> Result<AppConfig> {
    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "maintenance",
        database_url = %config.redacted_database_url(),
        pool_size = config.database_max_pool_size,
        "loaded backend configuration"
    );
    Ok(config)
}

/// Runs as the given user with administrator rights: shell access to this binary is
/// operator access.
fn repair_ownership(args: &[String]) -> Result<()> {
    let actor_id: Uuid = flag(args, "--actor")
        .ok_or_else(|| anyhow!("--actor <user-uuid> is required\n{USAGE}"))?
        .parse()
        .context("--actor must be a UUID")?;

    let config = load_config()?;
    let repo = build_repository(&config)?;
    let user = repo
        .find_user(actor_id)?
        .ok_or_else(|| anyhow!("no user with id {actor_id}"))?;

    let actor = Actor::new(user.id, user.username, Role::Admin);
    let report = ownership::repair_ownership(repo.as_ref(), &actor)?;
    println!(
        "Ownership repaired: {} clients, {} document lists.",
        report.clients_fixed, report.lists_fixed
    );
    Ok(())
}

fn create_user(args: &[String]) -> Result<()> {
    let (Some(email), Some(password)) = (args.first(), args.get(1)) else {
        bail!("email and password are required\n{USAGE}");
    };
    let role: Role = flag(args, "--role")
        .unwrap_or("professional")
        .parse()
        .map_err(|err: String| anyhow!(err))?;

    let config = load_config()?;
    let repo = build_repository(&config)?;
    let user = accounts::create_user(repo.as_ref(), email, password, role)?;
    println!(
        "Created {} account {} ({}), quota {}.",
        user.role, user.username, user.id, user.quota_remaining
    );
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
