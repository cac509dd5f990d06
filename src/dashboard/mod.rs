//! Dashboard Module
//!
//! Read-only HTTP status API over the running engine.
//! Only compiled when the `dashboard` feature is enabled.

mod api;
mod types;

pub use api::create_router;
pub use types::*;

use crate::scanner::SharedEngine;

/// Start the dashboard server
pub async fn start_server(engine: SharedEngine, bind: &str) -> anyhow::Result<()> {
    let app = create_router(engine);
    let addr: std::net::SocketAddr = bind.parse()?;

    tracing::info!("🖥️ Dashboard API starting on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
