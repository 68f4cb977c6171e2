//! Local HLS proxy that serves playlists with ad breaks removed.

mod error;
mod playlist;
mod status;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use hls_adfilter::{AdFilter, AdFilterConfig, HttpPlaylistFetcher, PlaylistFetcher, ToastSlot};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 12580,
            enable_cors: true,
        }
    }
}

impl ServerConfig {
    /// Apply `ADFILTER_BIND_ADDRESS` and `ADFILTER_PORT` on top of the loaded values.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(bind_address) = std::env::var("ADFILTER_BIND_ADDRESS")
            && !bind_address.trim().is_empty()
        {
            self.bind_address = bind_address;
        }

        if let Ok(port) = std::env::var("ADFILTER_PORT")
            && let Ok(parsed) = port.parse::<u16>()
        {
            self.port = parsed;
        }

        self
    }
}

/// Shared state handed to every route.
#[derive(Clone)]
pub struct AppState {
    pub filter: Arc<AdFilter>,
    pub fetcher: Arc<dyn PlaylistFetcher>,
    pub toast: Arc<ToastSlot>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: &AdFilterConfig) -> Result<Self> {
        let fetcher = HttpPlaylistFetcher::new(&config.fetch)?;
        Ok(Self::with_fetcher(config, Arc::new(fetcher)))
    }

    pub fn with_fetcher(config: &AdFilterConfig, fetcher: Arc<dyn PlaylistFetcher>) -> Self {
        let toast = Arc::new(ToastSlot::new(config.notification_timeout()));
        let filter = Arc::new(AdFilter::new(config.clone(), toast.clone()));
        Self {
            filter,
            fetcher,
            toast,
            start_time: Instant::now(),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(playlist::router())
        .merge(status::router())
        .with_state(state)
}

pub struct ProxyServer {
    config: ServerConfig,
    state: AppState,
}

impl ProxyServer {
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    fn build_router(&self) -> Router {
        let mut router = create_router(self.state.clone());

        if self.config.enable_cors {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
            router = router.layer(cors);
        }

        router.layer(TraceLayer::new_for_http())
    }

    pub async fn run(&self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.bind_address, self.config.port)
            .parse()
            .map_err(|e| AppError::Server(format!("Invalid address: {e}")))?;

        let router = self.build_router();
        let listener = TcpListener::bind(addr).await?;

        info!("Ad filter proxy listening on http://{}", addr);
        info!("Point your player at http://{}/playlist?url=<playlist url>", addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Proxy shutting down...");
                }
            })
            .await
            .map_err(|e| AppError::Server(format!("Server error: {e}")))?;

        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.port, 12580);
        assert!(config.enable_cors);
    }

    #[test]
    fn state_shares_toast_with_filter() {
        let state = AppState::new(&AdFilterConfig::default()).unwrap();
        assert!(state.toast.current().is_none());
        assert!(state.filter.is_enabled());
    }
}
