//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Translate submissions into `SyncManager::dispatch` calls
//! - Serve health and status views

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::setup_admin_router;
use crate::config::GatewayConfig;
use crate::error::DispatchError;
use crate::http::request::{self, MakeRequestUuid, SendMessageRequest, X_REQUEST_ID};
use crate::http::response::{HealthResponse, SendMessageResponse};
use crate::sync::{CallContext, IntegrationStatus, SyncManager};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<SyncManager>,
    pub config: Arc<GatewayConfig>,
}

/// HTTP boundary in front of the sync manager.
pub struct HttpServer {
    router: Router,
    config: Arc<GatewayConfig>,
}

impl HttpServer {
    pub fn new(config: GatewayConfig, manager: Arc<SyncManager>) -> Self {
        let config = Arc::new(config);
        let state = AppState {
            manager,
            config: config.clone(),
        };

        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/v1/messages", post(send_message))
            .route("/v1/integrations", get(list_integrations))
            .route("/health", get(health));

        if config.admin.enabled {
            router = router.merge(setup_admin_router(state.clone()));
        }

        // The body limit sits outside the timeout: `Timeout` needs a response
        // body with `Default`, which the limit's own body does not provide.
        router.with_state(state).layer(
            ServiceBuilder::new()
                .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
                .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
        )
    }

    /// Router with all layers, for embedding or in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            admin = self.config.admin.enabled,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

async fn send_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<Json<SendMessageResponse>, DispatchError> {
    let Json(payload) = payload?;
    let (name, message) = payload.validate()?;

    // Bound the send below the request timeout so callers see a typed 504.
    let mut ctx =
        CallContext::with_timeout(Duration::from_secs(state.config.timeouts.dispatch_secs));
    ctx.request_id = request::request_id(&headers);

    let delivery = state.manager.dispatch(&ctx, &name, &message).await?;
    Ok(Json(SendMessageResponse::success(delivery)))
}

async fn list_integrations(State(state): State<AppState>) -> Json<Vec<IntegrationStatus>> {
    let mut statuses: Vec<IntegrationStatus> =
        state.manager.status_snapshot().into_values().collect();
    statuses.sort_by(|a, b| a.name.cmp(&b.name));
    Json(statuses)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let integrations = state.manager.status_snapshot();
    let all_connected = integrations.values().all(|s| s.connected);
    Json(HealthResponse::new(all_connected, integrations))
}
