use std::{env, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use permit_server::{
    load, shutdown_signal, version, App, AppConfig, AppRouter, AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = env::args().collect::<Vec<_>>();
    let config =
        if args.len() == 3 && (args[1] == "-c" || args[1] == "--config") {
            load(&args[2])?
        } else {
            AppConfig::parse()
        };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.rust_log))
        .with(tracing_subscriber::fmt::layer())
        .init();

    debug!(
        pdp_url = %config.pdp_url,
        port = config.port,
        user_id = %config.user_id,
        action = %config.action,
        resource = %config.resource,
        tenant = %config.tenant,
        "configuration parsed"
    );
    info!("{}", version());
    run_server(config).await
}

async fn run_server(config: AppConfig) -> Result<()> {
    let host = format!("0.0.0.0:{}", config.port);
    let app = Arc::new(
        App::new(config).context("could not initialize application")?,
    );

    let router = AppRouter::build(AppState(app));
    let listener = TcpListener::bind(&host)
        .await
        .context("could not bind to endpoint")?;

    info!("example app listening at http://{}", host);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("error while starting API server")?;

    Ok(())
}
