//! hoersaal-server – Bibliotheks-Root
//!
//! Deklariert die Server-Module und komponiert die Subsysteme:
//! Signaling-TCP-Listener, Observability-HTTP-Server und den
//! Metrik-Sampler. Es gibt keinen persistierten Zustand – ein Neustart
//! verliert alle Sessions, die Clients bauen sie neu auf.

pub mod config;

use anyhow::Result;
use config::ServerConfig;
use hoersaal_observability::{HealthState, HoersaalMetrics};
use hoersaal_signaling::{SignalingConfig, SignalingServer, SignalingState};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet alle Server-Subsysteme und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Signaling-Zustand aufbauen
    /// 2. TCP-Listener binden und starten (Signaling-Protokoll)
    /// 3. Observability-Server starten (/health, /metrics)
    /// 4. Metrik-Sampler starten
    /// 5. Auf Ctrl-C warten, dann Shutdown signalisieren
    pub async fn starten(self) -> Result<()> {
        let signaling_config = SignalingConfig {
            server_name: self.config.server.name.clone(),
            max_verbindungen: self.config.server.max_verbindungen,
            keepalive_sek: self.config.keepalive.intervall_sek,
            verbindungs_timeout_sek: self.config.keepalive.timeout_sek,
        };
        let state = SignalingState::neu(signaling_config);

        tracing::info!(
            server_name = %self.config.server.name,
            tcp = %self.config.tcp_bind_adresse(),
            observability = %self.config.observability_bind_adresse(),
            "Server startet"
        );

        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

        // Signaling-TCP-Listener
        let tcp_addr = self.config.tcp_bind_adresse().parse()?;
        let signaling_server = SignalingServer::binden(Arc::clone(&state), tcp_addr).await?;
        let signaling_handle = tokio::spawn(signaling_server.starten(shutdown_rx.clone()));

        // Observability-Server + Sampler
        if self.config.observability.aktiviert {
            let metriken = HoersaalMetrics::neu()?;
            let health_state = HealthState::neu();
            let obs_addr = self.config.observability_bind_adresse().parse()?;

            let metriken_clone = metriken.clone();
            let health_clone = health_state.clone();
            tokio::spawn(async move {
                if let Err(e) = hoersaal_observability::observability_server_starten(
                    obs_addr,
                    metriken_clone,
                    health_clone,
                )
                .await
                {
                    tracing::error!(fehler = %e, "Observability-Server beendet");
                }
            });

            metrik_sampler_starten(
                Arc::clone(&state),
                metriken,
                health_state,
                Duration::from_secs(self.config.observability.sampler_intervall_sek),
                shutdown_rx.clone(),
            );
        }

        tracing::info!("Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");
        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutdown-Signal empfangen, Server wird beendet");

        let _ = shutdown_tx.send(true);
        signaling_handle.await??;

        Ok(())
    }
}

/// Spiegelt den Signaling-Zustand periodisch in die Prometheus-Gauges
/// und den Health-Zustand
fn metrik_sampler_starten(
    state: Arc<SignalingState>,
    metriken: HoersaalMetrics,
    health_state: HealthState,
    intervall: Duration,
    mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(intervall);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let verbindungen = state.registry.anzahl();
                    metriken.verbindungen_aktiv.set(verbindungen as i64);
                    metriken.raeume_aktiv.set(state.registry.raeume_anzahl() as i64);
                    metriken
                        .relays_gesamt
                        .set(state.relays_gesamt.load(Ordering::Relaxed) as i64);
                    metriken
                        .relay_fehler_gesamt
                        .set(state.relay_fehler.load(Ordering::Relaxed) as i64);
                    health_state.verbindungen_setzen(verbindungen);
                }
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
    });
}
