use clap::Parser;
use gridgate::{create_router, AppConfig, AppState};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "gridgate")]
#[command(about = "Gridgate - dynamic query and batch save backend for data grids", long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = "gridgate.toml")]
    config: PathBuf,

    /// Port to listen on (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gridgate=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = if args.config.exists() {
        tracing::info!("Loading configuration from {}", args.config.display());
        AppConfig::load(&args.config)?
    } else {
        tracing::warn!(
            "Configuration file {} not found, using defaults",
            args.config.display()
        );
        AppConfig::default()
    };
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if config.query.allowed_tables.is_empty() {
        tracing::warn!("No queryable tables configured; every dynamic query will be rejected");
    }

    let addr = config.listen_addr();
    let state = AppState::from_config(config)?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
