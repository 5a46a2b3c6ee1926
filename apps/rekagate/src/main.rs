use std::error::Error;
use std::sync::Arc;

use clap::Parser;
use rekagate_core::Gateway;
use tracing::info;

mod cli;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.environment);
    if let Err(err) = run(cli).await {
        eprintln!("rekagate failed: {err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = cli.gateway_config();
    if config.fallback_token.is_none() && !config.has_credentials() {
        info!("no REKA_TOKEN and no REKA_USER/REKA_PASS set; requests will need X-Reka-Token");
    }

    let gateway = Arc::new(Gateway::new(config)?);
    let app = rekagate_router::router(gateway);

    let bind = format!("{}:{}", cli.host, cli.port);
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!(addr = %bind, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn init_tracing(environment: &str) {
    let default_filter = if environment.eq_ignore_ascii_case("development") {
        "debug"
    } else {
        "info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        info!("shutdown signal listener failed; running until killed");
        std::future::pending::<()>().await;
    }
}
