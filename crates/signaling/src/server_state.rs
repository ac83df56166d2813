//! Gemeinsamer Server-Zustand fuer den Signaling-Service
//!
//! Haelt Registry, Router und Raum-Koordinator als geteilte Manager,
//! die sicher zwischen tokio-Tasks geteilt werden koennen. Alles ist
//! in-memory und geht mit einem Neustart verloren – Sessions sind
//! ephemer und werden von den Clients neu aufgebaut.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::registry::VerbindungsRegistry;
use crate::rooms::RaumKoordinator;
use crate::router::SignalRouter;

/// Konfiguration fuer den Signaling-Service
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Anzeigename des Servers
    pub server_name: String,
    /// Maximale gleichzeitige Verbindungen
    pub max_verbindungen: u32,
    /// Keepalive-Intervall in Sekunden
    pub keepalive_sek: u64,
    /// Timeout fuer inaktive Verbindungen in Sekunden
    pub verbindungs_timeout_sek: u64,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            server_name: "Hoersaal Server".to_string(),
            max_verbindungen: 512,
            keepalive_sek: 30,
            verbindungs_timeout_sek: 90,
        }
    }
}

/// Gemeinsamer Server-Zustand (thread-safe, Arc-geteilt)
pub struct SignalingState {
    /// Server-Konfiguration
    pub config: Arc<SignalingConfig>,
    /// Verbindungs-Registry (wer ist wer)
    pub registry: VerbindungsRegistry,
    /// Signal-Router (Zustellung)
    pub router: SignalRouter,
    /// Raum-Koordinator (Broadcast-Ereignisse)
    pub koordinator: RaumKoordinator,
    /// Startzeitpunkt des Servers (fuer Uptime-Berechnung)
    pub start_time: Instant,
    /// Zaehler: relayte Nachrichten insgesamt
    pub relays_gesamt: AtomicU64,
    /// Zaehler: fehlgeschlagene Relays (Ziel nicht erreichbar)
    pub relay_fehler: AtomicU64,
}

impl SignalingState {
    /// Erstellt einen neuen SignalingState
    pub fn neu(config: SignalingConfig) -> Arc<Self> {
        let registry = VerbindungsRegistry::neu();
        let router = SignalRouter::neu(registry.clone());
        let koordinator = RaumKoordinator::neu(registry.clone(), router.clone());

        Arc::new(Self {
            config: Arc::new(config),
            registry,
            router,
            koordinator,
            start_time: Instant::now(),
            relays_gesamt: AtomicU64::new(0),
            relay_fehler: AtomicU64::new(0),
        })
    }

    /// Gibt die Uptime in Sekunden zurueck
    pub fn uptime_sek(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Zaehlt einen Relay-Versuch
    pub fn relay_zaehlen(&self, erfolgreich: bool) {
        self.relays_gesamt.fetch_add(1, Ordering::Relaxed);
        if !erfolgreich {
            self.relay_fehler.fetch_add(1, Ordering::Relaxed);
        }
    }
}
