//! HTTP Server configuration and startup.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use wallet_types::{LedgerStore, RateProvider};

use super::handlers::{self, AppState};
use crate::openapi::ApiDoc;
use crate::{LedgerService, RateService};

/// Upper bound on draining queued persistence writes at shutdown.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP Server for the Wallet API.
pub struct HttpServer<P: RateProvider, S: LedgerStore> {
    state: Arc<AppState<P, S>>,
}

impl<P: RateProvider, S: LedgerStore> HttpServer<P, S> {
    /// Creates a new HTTP server with the given services.
    pub fn new(rates: RateService<P>, ledger: LedgerService<S>) -> Self {
        Self {
            state: Arc::new(AppState { rates, ledger }),
        }
    }

    /// Builds the Axum router with all routes.
    pub fn router(&self) -> Router {
        // Build HTTP metrics layer (uses globally set MeterProvider)
        let metrics = axum_otel_metrics::HttpMetricsLayerBuilder::new().build();

        Router::new()
            .route("/health", get(handlers::health))
            .route("/api/rates", get(handlers::get_rates::<P, S>))
            .route(
                "/api/holdings",
                get(handlers::get_holdings::<P, S>)
                    .put(handlers::replace_holdings::<P, S>)
                    .delete(handlers::reset_holdings::<P, S>),
            )
            .route(
                "/api/holdings/{currency}",
                put(handlers::update_holding::<P, S>),
            )
            .route(
                "/api/expenses",
                get(handlers::list_expenses::<P, S>)
                    .post(handlers::add_expense::<P, S>)
                    .delete(handlers::clear_expenses::<P, S>),
            )
            .route(
                "/api/expenses/restore",
                post(handlers::restore_expense::<P, S>),
            )
            .route(
                "/api/expenses/{id}",
                delete(handlers::remove_expense::<P, S>),
            )
            .route("/api/summary", get(handlers::summary::<P, S>))
            .route(
                "/api/backup",
                get(handlers::export_backup::<P, S>).post(handlers::import_backup::<P, S>),
            )
            .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
            .layer(metrics)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Runs the server on the given address with graceful shutdown.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        // Remote mirror writes are queued; drain them before the runtime goes away.
        if tokio::time::timeout(FLUSH_TIMEOUT, self.state.ledger.flush())
            .await
            .is_err()
        {
            tracing::error!(
                timeout = ?FLUSH_TIMEOUT,
                "Timed out flushing ledger writes; pending remote writes are lost"
            );
        }

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
