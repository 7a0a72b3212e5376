//! HTTP server for the penguin inference service
//!
//! Thin axum layer over [`crate::service::InferenceService`]: route
//! registration, request validation, and error-to-status mapping. Artifact
//! metadata is loaded once when the state is built; the server then serves
//! until a ctrl+c shutdown signal.

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use error::ServerError;
pub use state::AppState;

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::error::Result;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory holding model.json, columns.json and label_classes.json
    pub data_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()),
        }
    }
}

/// Run the server until interrupted
pub async fn run(config: ServerConfig) -> Result<()> {
    let state = Arc::new(AppState::new(config.clone())?);
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, data_dir = %config.data_dir, "Penguin inference server listening");

    let started = Instant::now();
    let shutdown_signal = async move {
        let _ = tokio::signal::ctrl_c().await;
        info!(
            uptime_secs = started.elapsed().as_secs(),
            "Shutdown signal received, stopping server gracefully"
        );
    };

    info!("Server started successfully (press ctrl+c to stop)");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8000);
        assert!(!config.data_dir.is_empty());
    }
}
