//! MCP server initialization for stdio and SSE transports.
//!
//! Provides [`serve_stdio`] and [`serve_sse`] entry points that open the
//! memory engine and wire it into a running MCP server.

use crate::config::MnemoConfig;
use crate::memory::engine::MemoryEngine;
use crate::tools::MnemoTools;
use anyhow::Result;
use rmcp::ServiceExt;
use std::sync::Arc;

/// Shared setup: open the engine over the configured log and index paths.
fn setup_shared_state(config: MnemoConfig) -> Result<Arc<MemoryEngine>> {
    let log_path = config.resolved_log_path();
    let index_path = config.resolved_index_path();
    let engine = MemoryEngine::open(config)?;
    tracing::info!(
        log = %log_path.display(),
        index = %index_path.display(),
        "memory engine ready"
    );

    Ok(Arc::new(engine))
}

/// Start the MCP server over stdio transport.
pub async fn serve_stdio(config: MnemoConfig) -> Result<()> {
    tracing::info!("starting mnemo MCP server on stdio");

    let engine = setup_shared_state(config)?;

    let tools = MnemoTools::new(engine);
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running — waiting for client");

    server.waiting().await?;
    tracing::info!("MCP server shut down");

    Ok(())
}

/// Start the MCP server over Streamable HTTP (SSE) transport.
pub async fn serve_sse(config: MnemoConfig) -> Result<()> {
    let host = config.server.host.clone();
    let port = config.server.port;
    let bind_addr = format!("{host}:{port}");

    tracing::info!(addr = %bind_addr, "starting mnemo MCP server on SSE/HTTP");

    let engine = setup_shared_state(config)?;

    let service = rmcp::transport::streamable_http_server::StreamableHttpService::new(
        move || Ok(MnemoTools::new(engine.clone())),
        rmcp::transport::streamable_http_server::session::local::LocalSessionManager::default()
            .into(),
        Default::default(),
    );

    let router = axum::Router::new().nest_service("/mcp", service);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "MCP server listening at http://{bind_addr}/mcp");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to listen for ctrl-c");
            tracing::info!("shutting down SSE server");
        })
        .await?;

    Ok(())
}
