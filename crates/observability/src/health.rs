//! Health-Check-Endpunkt fuer Hoersaal
//!
//! Endpoint: `GET /health`
//! Response: JSON mit Status, Version, Uptime und Verbindungsanzahl.
//! Der Endpunkt ist ein Liveness-Signal – jenseits von "Service
//! erreichbar" gibt es keinen Body-Vertrag.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Status des Health-Checks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Antwort des Health-Check-Endpunkts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub verbindungen: usize,
}

/// Geteilter Zustand fuer den Health-Check-Handler
///
/// Die Verbindungsanzahl wird vom Server-Binary per Sampler gesetzt;
/// der Kern kennt diesen Zustand nicht.
#[derive(Clone)]
pub struct HealthState {
    pub start_time: Arc<Instant>,
    pub verbindungen: Arc<AtomicUsize>,
}

impl HealthState {
    pub fn neu() -> Self {
        Self {
            start_time: Arc::new(Instant::now()),
            verbindungen: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn verbindungen_setzen(&self, anzahl: usize) {
        self.verbindungen.store(anzahl, Ordering::Relaxed);
    }

    pub fn verbindungen(&self) -> usize {
        self.verbindungen.load(Ordering::Relaxed)
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::neu()
    }
}

/// Axum-Router fuer den `/health`-Endpunkt
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(state)
}

/// `GET /health` – gibt den Serverstatus zurueck
async fn health_handler(State(state): State<HealthState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        verbindungen: state.verbindungen(),
    };

    (StatusCode::OK, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_state_uptime_frisch() {
        let state = HealthState::neu();
        assert!(state.uptime_seconds() < 5);
    }

    #[test]
    fn verbindungen_setzen_und_lesen() {
        let state = HealthState::neu();
        assert_eq!(state.verbindungen(), 0);
        state.verbindungen_setzen(42);
        assert_eq!(state.verbindungen(), 42);
    }

    #[test]
    fn health_response_serialisierung() {
        let response = HealthResponse {
            status: HealthStatus::Healthy,
            version: "0.1.0".to_string(),
            uptime_seconds: 7,
            verbindungen: 3,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"healthy\""));
        assert!(json.contains("\"verbindungen\":3"));
    }
}
