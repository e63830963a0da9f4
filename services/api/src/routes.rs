use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use loanflow::workflows::origination::{
    origination_router, ApplicationRepository, DocumentRepository, NotificationGateway,
    ObjectStore, OriginationService, SessionAuthenticator,
};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_origination_routes<R, D, O, N>(
    service: Arc<OriginationService<R, D, O, N>>,
    sessions: Arc<dyn SessionAuthenticator>,
) -> axum::Router
where
    R: ApplicationRepository + 'static,
    D: DocumentRepository + 'static,
    O: ObjectStore + 'static,
    N: NotificationGateway + 'static,
{
    origination_router(service, sessions)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
