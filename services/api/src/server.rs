use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_lead_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use lead_intake::config::AppConfig;
use lead_intake::error::AppError;
use lead_intake::leads::{
    CrmSync, HttpCrmTransport, InMemoryLeadStore, LeadAdmissionService, SystemClock,
};
use lead_intake::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

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
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let transport = Arc::new(HttpCrmTransport::new(
        &config.crm.base_url,
        config.crm.settings.timeout,
    )?);
    let crm = CrmSync::new(transport, config.crm.settings.clone());
    let store = Arc::new(InMemoryLeadStore::new());
    let service = Arc::new(LeadAdmissionService::new(
        store,
        crm,
        Arc::new(SystemClock),
        config.admission.clone(),
    ));

    let app = with_lead_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        crm = %config.crm.base_url,
        cooldown_minutes = config.admission.cooldown_minutes,
        "lead intake service ready"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(readiness_flag))
        .await?;
    Ok(())
}

async fn shutdown_signal(readiness: Arc<AtomicBool>) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    readiness.store(false, Ordering::Release);
    info!("shutdown signal received, draining connections");
}
