//! Prometheus-kompatible Metriken fuer Hoersaal
//!
//! Registrierte Metriken:
//! - `hoersaal_verbindungen_aktiv` – Gauge: Aktuell registrierte Verbindungen
//! - `hoersaal_raeume_aktiv` – Gauge: Aktuell referenzierte Raeume
//! - `hoersaal_relays_gesamt` – Gauge: Relayte Nachrichten seit Start
//! - `hoersaal_relay_fehler_gesamt` – Gauge: Relays auf nicht erreichbare Ziele
//!
//! Die Werte stammen aus dem Signaling-Zustand und werden vom
//! Server-Binary periodisch gesampelt – der Kern haengt nicht an
//! Prometheus.

use anyhow::Result;
use axum::{response::IntoResponse, routing::get, Router};
use prometheus::{Encoder, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Alle Hoersaal-Prometheus-Metriken
#[derive(Clone)]
pub struct HoersaalMetrics {
    pub registry: Arc<Registry>,

    pub verbindungen_aktiv: IntGauge,
    pub raeume_aktiv: IntGauge,
    pub relays_gesamt: IntGauge,
    pub relay_fehler_gesamt: IntGauge,
}

impl HoersaalMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        let verbindungen_aktiv = IntGauge::with_opts(Opts::new(
            "hoersaal_verbindungen_aktiv",
            "Anzahl aktuell registrierter Verbindungen",
        ))?;
        registry.register(Box::new(verbindungen_aktiv.clone()))?;

        let raeume_aktiv = IntGauge::with_opts(Opts::new(
            "hoersaal_raeume_aktiv",
            "Anzahl aktuell referenzierter Raeume",
        ))?;
        registry.register(Box::new(raeume_aktiv.clone()))?;

        let relays_gesamt = IntGauge::with_opts(Opts::new(
            "hoersaal_relays_gesamt",
            "Relayte Verhandlungsnachrichten seit Serverstart",
        ))?;
        registry.register(Box::new(relays_gesamt.clone()))?;

        let relay_fehler_gesamt = IntGauge::with_opts(Opts::new(
            "hoersaal_relay_fehler_gesamt",
            "Relays auf nicht erreichbare Ziele seit Serverstart",
        ))?;
        registry.register(Box::new(relay_fehler_gesamt.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            verbindungen_aktiv,
            raeume_aktiv,
            relays_gesamt,
            relay_fehler_gesamt,
        })
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: HoersaalMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(
    axum::extract::State(metriken): axum::extract::State<HoersaalMetrics>,
) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            axum::http::StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4",
            )],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Metriken-Export fehlgeschlagen: {err}");
            axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
