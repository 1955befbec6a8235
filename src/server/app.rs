//! Main application server.
//!
//! Provides the dashboard server with signal handling and graceful
//! shutdown coordination.

use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::metrics::WATCHED_DIRECTORIES;
use super::rest::{create_rest_router, DashboardState};
use crate::Result;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Shutdown timeout duration
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

/// Dashboard application server.
pub struct App {
    config: ServerConfig,
    state: DashboardState,
}

impl App {
    /// Create a new application over a running supervisor.
    #[must_use]
    pub fn new(config: ServerConfig, state: DashboardState) -> Self {
        let count = i64::try_from(state.supervisor.directory_count()).unwrap_or(i64::MAX);
        WATCHED_DIRECTORIES.set(count);
        Self { config, state }
    }

    /// Build the router with all endpoints.
    pub(crate) fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        create_rest_router(self.state.clone())
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(|request: &axum::http::Request<_>| {
                        tracing::info_span!(
                            "http_request",
                            method = %request.method(),
                            uri = %request.uri(),
                        )
                    })
                    .on_response(
                        |response: &axum::response::Response,
                         latency: std::time::Duration,
                         _span: &tracing::Span| {
                            tracing::debug!(
                                status = %response.status(),
                                latency_ms = latency.as_millis(),
                                "Request completed"
                            );
                        },
                    ),
            )
            .layer(cors)
    }

    /// Run the server until shutdown signal.
    ///
    /// The server listens for SIGTERM (Unix) and Ctrl+C signals,
    /// then gracefully shuts down all connections.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or cannot be bound.
    pub async fn run(self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|e| crate::Error::config(format!("invalid address: {e}")))?;

        let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
            crate::error::ServerError::BindFailed {
                address: addr.to_string(),
                reason: e.to_string(),
            }
        })?;

        tracing::info!(%addr, "Dashboard listening");
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on a bound listener until `signal` resolves.
    ///
    /// Open connections get `shutdown_timeout` to finish; after that the
    /// server is abandoned.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails while running.
    pub async fn serve<F>(self, listener: TcpListener, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let drain_timeout = self.config.shutdown_timeout;
        let (signalled_tx, signalled_rx) = oneshot::channel::<()>();

        let server = axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                signal.await;
                let _ = signalled_tx.send(());
            })
            .into_future();

        let deadline = async move {
            if signalled_rx.await.is_err() {
                std::future::pending::<()>().await;
            }
            tokio::time::sleep(drain_timeout).await;
        };

        tokio::select! {
            result = server => {
                result.map_err(|e| crate::error::ServerError::Request(e.to_string()))?;
                tracing::info!("Server shut down gracefully");
            }
            () = deadline => {
                tracing::warn!(
                    timeout_secs = drain_timeout.as_secs_f64(),
                    "Graceful shutdown timed out, dropping open connections"
                );
            }
        }

        Ok(())
    }
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
