//! # Tesouro Server
//!
//! Read-only REST server for Tesouro Direto bond rates.
//!
//! ## Features
//!
//! - `GET /health`: liveness plus the state of the published snapshot
//! - `GET /bonds`: every bond of the current snapshot
//! - `GET /bonds/{name}`: one bond, case-insensitive, `_`/`-` match spaces
//! - Per-client-IP rate limiting
//! - Graceful shutdown with a bounded drain period
//!
//! ## Usage
//!
//! ```ignore
//! use tesouro_server::Server;
//!
//! let server = Server::new(config.server.clone(), store);
//! server.start(shutdown).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod handlers;
pub mod rate_limit;
pub mod routes;
pub mod signal;

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use tesouro_config::ServerSettings;
use tesouro_engine::{Shutdown, SnapshotStore};

pub use error::{ApiError, ApiResult};
pub use rate_limit::RateLimiter;

const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// The Tesouro rates server.
pub struct Server {
    settings: ServerSettings,
    store: Arc<SnapshotStore>,
    limiter: Arc<RateLimiter>,
}

impl Server {
    /// Create a new server reading from `store`.
    pub fn new(settings: ServerSettings, store: Arc<SnapshotStore>) -> Self {
        let limiter = Arc::new(RateLimiter::per_minute(settings.rate_limit_per_minute));
        Self {
            settings,
            store,
            limiter,
        }
    }

    /// Build the router.
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        routes::create_router(self.store.clone(), self.limiter.clone())
            .layer(TraceLayer::new_for_http())
            .layer(cors)
    }

    /// Bind the configured address and serve until `shutdown`.
    pub async fn start(&self, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let listener = TcpListener::bind(self.settings.bind_address()).await?;
        info!("Starting Tesouro server on {}", listener.local_addr()?);
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown`.
    ///
    /// After the trigger the listener closes and in-flight requests get the
    /// configured grace period to finish. Once it elapses this returns without
    /// waiting for them; connections still open stay up until the runtime
    /// shuts down.
    pub async fn serve(&self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let grace = self.settings.shutdown_grace();
        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();

        let pruner = tokio::spawn(prune_limiter(self.limiter.clone(), shutdown.clone()));

        let graceful = {
            let shutdown = shutdown.clone();
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.wait().await })
                .into_future()
        };
        tokio::pin!(graceful);

        let deadline = async {
            shutdown.wait().await;
            tokio::time::sleep(grace).await;
        };

        let result = tokio::select! {
            result = &mut graceful => result,
            _ = deadline => {
                warn!(grace_seconds = grace.as_secs(), "Grace period elapsed, no longer waiting for open connections");
                Ok(())
            }
        };

        pruner.abort();
        info!("API stopped");
        result
    }
}

async fn prune_limiter(limiter: Arc<RateLimiter>, shutdown: Shutdown) {
    let mut ticker = tokio::time::interval(PRUNE_INTERVAL);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = limiter.prune();
                if removed > 0 {
                    debug!(removed, remaining = limiter.tracked_clients(), "Pruned idle rate-limit buckets");
                }
            }
            _ = shutdown.wait() => return,
        }
    }
}
