use axum::{
    extract::State,
    http::{header, StatusCode},
    middleware::from_fn,
    response::IntoResponse,
    routing::get,
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use webapi_storage::Database;

use crate::{actions, middleware, projects, telemetry};

pub const LIVENESS_TEXT: &str = "Project: webapi-challenge is up and running!";

#[derive(Clone)]
pub struct AppState {
    metrics: PrometheusHandle,
    storage: Database,
}

impl AppState {
    pub fn new(metrics: PrometheusHandle, storage: Database) -> Self {
        Self { metrics, storage }
    }

    pub fn metrics(&self) -> &PrometheusHandle {
        &self.metrics
    }

    pub fn storage(&self) -> &Database {
        &self.storage
    }
}

pub fn app_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/", get(liveness))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .nest("/api/projects", projects::router())
        .nest("/api/actions", actions::router())
        .layer(from_fn(middleware::log_request))
        .with_state(state);

    middleware::with_security_headers(router)
}

async fn liveness() -> &'static str {
    LIVENESS_TEXT
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = telemetry::render_metrics(state.metrics());
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
}
