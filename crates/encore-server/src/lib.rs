//! encore page server.
//!
//! Serves an app's pages over WebSocket. Each connection is one session with
//! its own store; passes for a session run one at a time, in order.
//!
//! # Architecture
//!
//! The server consists of:
//! - **Session**: one [`Session`](encore_core::Session) per connection, behind a fair mutex
//! - **Protocol**: Defines client/server message types
//! - **Routes**: HTTP and WebSocket handlers

pub mod error;
pub mod protocol;
pub mod routes;
pub mod session;

use std::net::SocketAddr;
use std::sync::Arc;

use encore_core::{EngineConfig, PageRegistry};

pub use error::{ServerError, ServerResult};
pub use protocol::{ClientMessage, ServerMessage};
pub use routes::{AppState, create_router};
pub use session::{PendingPass, SessionHandle, SessionManager, SessionSnapshot};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl ServerConfig {
    /// Parse `host:port` into a socket address.
    pub fn addr(&self) -> ServerResult<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ServerError::InvalidAddress(format!("{}:{}", self.host, self.port)))
    }
}

/// Start the server for an app.
pub async fn serve(
    registry: PageRegistry,
    engine: EngineConfig,
    config: ServerConfig,
) -> ServerResult<()> {
    let addr = config.addr()?;

    let state = Arc::new(AppState {
        sessions: SessionManager::new(Arc::new(registry), engine),
    });
    let app = create_router(state);

    tracing::info!("Starting encore server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received shutdown signal");
            let _ = shutdown_tx.send(());
        }
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        })
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}
