use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use sluice_api::ControlApi;
use sluice_runtime::{init_tracing, RuntimeApp};

#[derive(Debug, Parser)]
#[command(name = "sluice-server", about = "Epoch-driven behaviour net server")]
struct Args {
    /// Path to the net configuration file.
    #[arg(long, default_value = "config_samples/config.json")]
    config: PathBuf,

    /// Listen address override; defaults to the config's http_server.
    #[arg(long)]
    addr: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let app = RuntimeApp::from_config_path(&args.config)
        .with_context(|| format!("loading config from {}", args.config.display()))?;

    let addr = match args.addr {
        Some(addr) => addr,
        None => match &app.config.controller.http_server {
            Some(server) => format!("{}:{}", server.address, server.port)
                .parse()
                .with_context(|| "parsing http_server address from config")?,
            None => SocketAddr::from(([0, 0, 0, 0], 8080)),
        },
    };

    let controller = Arc::clone(&app.controller);
    let engine = tokio::spawn(async move { controller.run().await });

    let handle = app.handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown requested");
            handle.shutdown();
        }
    });

    let api: Arc<dyn ControlApi> = Arc::new(app.handle.clone());
    sluice_server::serve(addr, api, app.controller.cancel_token()).await?;

    engine.await.context("engine task panicked")??;
    Ok(())
}
