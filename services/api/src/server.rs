use crate::cli::ServeArgs;
use crate::infra::{
    AppState, DiskObjectStore, EmailNotificationGateway, InMemoryApplicationRepository,
    InMemoryDocumentRepository, StaticTokenSessions,
};
use crate::routes::with_origination_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use loanflow::config::AppConfig;
use loanflow::error::AppError;
use loanflow::telemetry;
use loanflow::workflows::origination::OriginationService;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let applications = Arc::new(InMemoryApplicationRepository::default());
    let documents = Arc::new(InMemoryDocumentRepository::default());
    let objects = Arc::new(DiskObjectStore::new(&config.storage));
    let notifications = Arc::new(EmailNotificationGateway::new(config.email.clone()));
    let sessions = Arc::new(StaticTokenSessions::from_env());
    let service = Arc::new(OriginationService::new(
        applications,
        documents,
        objects,
        notifications,
    ));

    let app = with_origination_routes(service, sessions)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "loan application service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
