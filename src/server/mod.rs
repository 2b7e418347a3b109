//! HTTP surface of the dashboard backend.

mod app;
mod handlers;
mod models;
mod state;

pub use app::build_router;
pub use handlers::ApiError;
pub use state::AppState;

use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::error::{InsightsError, Result};

pub async fn bind_listener(host: &str, port: u16) -> Result<TcpListener> {
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .map_err(|e| InsightsError::config(format!("Invalid listen address {host}:{port}: {e}")))?;
    TcpListener::bind(addr)
        .await
        .map_err(|e| InsightsError::internal(format!("Could not bind {addr}: {e}")))
}

pub async fn shutdown_signal() {
    // Handle ctrl-c and SIGTERM to allow graceful shutdown.
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(_) => {
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}
