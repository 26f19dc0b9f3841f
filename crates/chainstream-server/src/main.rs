#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod api;
mod config;

use api::state::StreamContext;
use config::ServerConfig;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing logger
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "info,chainstream_server=debug,chainstream_core=debug".into()
            }),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .init();

    let config = ServerConfig::load()?;
    tracing::info!(
        tick_interval_ms = config.tick_interval_ms,
        upstream = %config.upstream_url,
        "Starting chainstream server"
    );

    let state = Arc::new(StreamContext::new(
        config.tick_interval(),
        config.upstream_url.clone(),
    ));
    let app = api::router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .map_err(|err| anyhow::anyhow!("Failed to bind to {}: {}", address, err))?;

    tracing::info!("chainstream running on http://{}", address);

    axum::serve(listener, app).await?;
    Ok(())
}
