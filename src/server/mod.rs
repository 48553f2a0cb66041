//! HTTP inference API
//!
//! Exposes the ensemble scorer over JSON. The model bundle is loaded before
//! the listener is bound and shared read-only by every request.

pub mod handlers;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::config::ScorerConfig;
use crate::error::Result;
use crate::models::ModelBundle;
use crate::scoring::{EnsembleScorer, ScoringMode};

/// Shared request state
#[derive(Clone)]
pub struct AppState {
    pub scorer: Arc<EnsembleScorer>,
    pub mode: ScoringMode,
    pub max_batch_rows: usize,
}

impl AppState {
    pub fn new(scorer: EnsembleScorer, config: &ScorerConfig) -> Self {
        Self {
            scorer: Arc::new(scorer.with_epsilon(config.scoring.epsilon)),
            mode: config.scoring.mode,
            max_batch_rows: config.scoring.max_batch_rows,
        }
    }
}

/// Build the API router
pub fn create_router(state: AppState, config: &ScorerConfig) -> Router {
    let router = Router::new()
        .route("/", get(handlers::service_info))
        .route("/health", get(handlers::health))
        .route("/predict", post(handlers::predict))
        .route("/predict/batch", post(handlers::predict_batch))
        .route("/predict/one", post(handlers::predict_one))
        .layer(DefaultBodyLimit::max(config.server.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if config.server.cors_enabled {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

/// Load the bundle once and build the scorer
///
/// With `model.require_on_startup` the failure is returned to the caller;
/// otherwise the scorer starts in the unavailable state.
pub fn load_scorer(config: &ScorerConfig) -> Result<EnsembleScorer> {
    match ModelBundle::load(&config.model.bundle_path) {
        Ok(bundle) => Ok(EnsembleScorer::new(Arc::new(bundle))),
        Err(e) if !config.model.require_on_startup => {
            warn!("Starting without a model bundle: {}", e);
            Ok(EnsembleScorer::unavailable(e.to_string()))
        }
        Err(e) => {
            error!("Failed to load model bundle: {}", e);
            Err(e.into())
        }
    }
}

/// Serve until Ctrl-C or SIGTERM
pub async fn serve(config: &ScorerConfig, scorer: EnsembleScorer) -> Result<()> {
    let addr = config.bind_addr()?;
    let state = AppState::new(scorer, config);
    let app = create_router(state, config);

    let listener = TcpListener::bind(addr).await?;
    info!(
        "Starting scoring API on {} (mode: {})",
        addr, config.scoring.mode
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Scoring API stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
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
    info!("Shutdown signal received");
}
