//! Server execution logic.

use std::sync::Arc;

use axum::{Router, routing::get};
use hiroba_shared::time::Clock;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::{
    config::ServerConfig,
    usecase::{Dispatcher, LivenessSweeper},
};

use super::{handler::websocket_handler, signal::shutdown_signal, state::AppState};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// WebSocket room relay server
///
/// # Example
///
/// ```ignore
/// let server = Server::new(ServerConfig::default(), Arc::new(SystemClock));
/// server.run().await?;
/// ```
pub struct Server {
    config: ServerConfig,
    dispatcher: Arc<Dispatcher>,
}

impl Server {
    pub fn new(config: ServerConfig, clock: Arc<dyn Clock>) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(&config, clock));
        Self { config, dispatcher }
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        self.dispatcher.clone()
    }

    pub fn router(&self) -> Router {
        let state = Arc::new(AppState {
            dispatcher: self.dispatcher.clone(),
        });
        Router::new()
            .route("/", get(websocket_handler))
            .route("/ws", get(websocket_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Bind to the configured address and serve until Ctrl+C or SIGTERM
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the address cannot
    /// be bound, or the server fails while running.
    pub async fn run(self) -> Result<(), BoxError> {
        self.config.validate()?;
        let bind_addr = self.config.bind_addr();
        let listener = TcpListener::bind(&bind_addr).await?;
        tracing::info!("Connect to: ws://{}/ws", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    ///
    /// The liveness sweeper runs for as long as the server does.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), BoxError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.config.validate()?;
        let app = self.router();

        let sweeper = LivenessSweeper::new(
            self.dispatcher.clone(),
            self.config.ping_interval,
            self.config.liveness_timeout(),
        );
        tracing::info!(
            "Liveness sweep every {:?}, timeout {:?}",
            self.config.ping_interval,
            sweeper.timeout()
        );
        let sweeper = sweeper.spawn();

        tracing::info!(
            "WebSocket room server listening on {}",
            listener.local_addr()?
        );
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await;
        sweeper.abort();
        result?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}
