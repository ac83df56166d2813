//! # hoersaal-observability
//!
//! Observability-Crate fuer Hoersaal:
//! - Prometheus-kompatible Metriken (`/metrics`)
//! - Health-Check-Endpunkt (`/health`)
//! - Structured Logging via tracing-subscriber
//!
//! Der Signaling-Kern bleibt frei von HTTP- und Prometheus-Abhaengigkeiten;
//! das Server-Binary verdrahtet beide Seiten ueber einen Sampler-Task.

pub mod health;
pub mod logging;
pub mod metrics;

pub use health::{health_router, HealthResponse, HealthState, HealthStatus};
pub use logging::logging_initialisieren;
pub use metrics::{metrics_router, HoersaalMetrics};

use anyhow::Result;
use std::net::SocketAddr;

/// Startet den Observability-HTTP-Server (Metriken + Health)
///
/// Endpunkte:
/// - `GET /metrics` – Prometheus scrape format
/// - `GET /health`  – Health-Check JSON (Liveness)
pub async fn observability_server_starten(
    bind_addr: SocketAddr,
    metriken: HoersaalMetrics,
    health_state: HealthState,
) -> Result<()> {
    use axum::Router;
    use tower_http::trace::TraceLayer;

    let app = Router::new()
        .merge(metrics_router(metriken))
        .merge(health_router(health_state))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(addr = %bind_addr, "Observability-Server gestartet");

    axum::serve(listener, app).await?;
    Ok(())
}
