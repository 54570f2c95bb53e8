//! Halseth Authorization Server - Entry Point

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use halseth_auth::{config::Config, server::AuthServer};

#[derive(Parser, Debug)]
#[command(name = "halseth-auth")]
#[command(about = "OAuth 2.0 authorization server and bearer gate for the Halseth API")]
#[command(version)]
struct Cli {
    /// HTTP server port
    #[arg(long, default_value = "8000", env = "PORT")]
    port: u16,

    /// Public origin used in OAuth metadata (derived from the Host header when unset)
    #[arg(long, env = "BASE_URL")]
    base_url: Option<String>,

    /// Display name on the authorization page and in challenges
    #[arg(long, default_value = "Halseth", env = "SYSTEM_NAME")]
    system_name: String,

    /// SQLite URL for the credential store (in-memory when unset)
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        subscriber.with(tracing_subscriber::fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.json_logs);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Halseth authorization server");

    // Secrets come from the environment only, never from argv.
    let mut config = Config::new(
        std::env::var("ADMIN_SECRET").ok(),
        std::env::var("MCP_AUTH_SECRET").ok(),
    )
    .with_system_name(cli.system_name);
    if let Some(base_url) = cli.base_url {
        config = config.with_base_url(base_url);
    }
    if let Some(database_url) = cli.database_url {
        config = config.with_database_url(database_url);
    }

    tracing::debug!(?config, "Loaded configuration");

    let server = AuthServer::from_config(config).await?;
    server.run_http(cli.port, axum::Router::new()).await
}
