mod config;
mod errors;
mod extraction;
mod llm_client;
mod pipeline;
mod routes;
mod state;
#[cfg(test)]
mod testing;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::extraction::PdfTextExtractor;
use crate::llm_client::ModelGateway;
use crate::pipeline::orchestrator::Pipeline;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing provider keys)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},ai_interaction=info",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting KazeHire API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize model gateway (providers in preference order)
    let gateway = ModelGateway::from_configs(&config.providers, config.provider_timeout)?;
    info!(
        "Model gateway initialized (providers: {}, timeout: {}s)",
        gateway.provider_ids().join(" → "),
        config.provider_timeout.as_secs()
    );

    let state = AppState {
        pipeline: Arc::new(Pipeline::new(Arc::new(PdfTextExtractor), gateway)),
    };

    // Build router
    let app = build_router(state, config.max_upload_bytes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the recruiter dashboard host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
