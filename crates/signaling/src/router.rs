//! Signal-Router – stellt Nachrichten identitaetsgenau zu
//!
//! Der Router haelt die Send-Queues aller verbundenen Clients und
//! leitet adressierte Verhandlungsnachrichten (Offer, Answer,
//! ICE-Kandidat, Signal) zwischen zwei per ID benannten Verbindungen
//! weiter. Er ist eine dumme Leitung: Verhandlungs-Blobs werden nie
//! inspiziert, die Korrektheit der Sequenz ist Sache der Endpunkte.
//!
//! ## Zustell-Garantien
//! - Identitaetsgenau: eine an X adressierte Nachricht erreicht X genau
//!   dann wenn X registriert ist – und niemals jemand anderen
//! - Pro geordnetem (Sender, Empfaenger)-Paar in Sendereihenfolge
//!   (eine FIFO-Queue pro Empfaenger)
//! - Kein Lock wird ueber einen Send hinweg gehalten: `try_send` auf die
//!   mpsc-Queue blockiert nie

use dashmap::DashMap;
use hoersaal_core::types::ConnectionId;
use hoersaal_protocol::control::{SignalMessage, SignalPayload};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::{SignalingError, SignalingResult};
use crate::registry::VerbindungsRegistry;

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Groesse der Send-Queue pro Client
const SEND_QUEUE_GROESSE: usize = 64;

// ---------------------------------------------------------------------------
// ClientSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue eines verbundenen Clients
#[derive(Clone, Debug)]
pub struct ClientSender {
    pub id: ConnectionId,
    pub tx: mpsc::Sender<SignalMessage>,
}

impl ClientSender {
    /// Sendet eine Nachricht nicht-blockierend an den Client
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    pub fn senden(&self, nachricht: SignalMessage) -> bool {
        match self.tx.try_send(nachricht) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(verbindung = %self.id, "Send-Queue voll – Nachricht verworfen");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(verbindung = %self.id, "Send-Queue geschlossen (Client getrennt)");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// SignalRouter
// ---------------------------------------------------------------------------

/// Zentraler Router fuer alle Signaling-Zustellungen
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct SignalRouter {
    inner: Arc<RouterInner>,
}

struct RouterInner {
    /// Registry fuer die Ziel-Pruefung beim Relay
    registry: VerbindungsRegistry,
    /// Client-Sender, indiziert nach ConnectionId
    clients: DashMap<ConnectionId, ClientSender>,
}

impl SignalRouter {
    /// Erstellt einen neuen Router ueber der gegebenen Registry
    pub fn neu(registry: VerbindungsRegistry) -> Self {
        Self {
            inner: Arc::new(RouterInner {
                registry,
                clients: DashMap::new(),
            }),
        }
    }

    /// Registriert einen neuen Client und gibt seine Empfangs-Queue zurueck
    ///
    /// Die `ClientConnection` liest aus dieser Queue und sendet via TCP.
    pub fn registrieren(&self, id: ConnectionId) -> mpsc::Receiver<SignalMessage> {
        let (tx, rx) = mpsc::channel(SEND_QUEUE_GROESSE);
        self.inner.clients.insert(id, ClientSender { id, tx });
        tracing::debug!(verbindung = %id, "Client im Router registriert");
        rx
    }

    /// Entfernt einen Client aus dem Router
    ///
    /// Laufende Relay-Versuche auf diese ID schlagen ab jetzt sauber
    /// mit `ZielNichtErreichbar` fehl.
    pub fn entfernen(&self, id: &ConnectionId) {
        self.inner.clients.remove(id);
        tracing::debug!(verbindung = %id, "Client aus Router entfernt");
    }

    /// Leitet eine Verhandlungsnachricht an die Zielverbindung weiter
    ///
    /// Das Ziel muss registriert sein und eine zugewiesene Rolle haben;
    /// andernfalls `ZielNichtErreichbar` – fuer den Absender eine
    /// informative Notiz, nie fatal. `payload` traegt das bereits
    /// eingestempelte `from`-Feld und wird unveraendert zugestellt.
    pub fn relay(
        &self,
        von: ConnectionId,
        ziel: ConnectionId,
        payload: SignalPayload,
    ) -> SignalingResult<()> {
        let info = self
            .inner
            .registry
            .lookup(&ziel)
            .ok_or(SignalingError::ZielNichtErreichbar(ziel))?;

        // Nur Verbindungen mit zugewiesener Rolle sind gueltige Ziele
        if !info.rolle.ist_zugewiesen() {
            return Err(SignalingError::ZielNichtErreichbar(ziel));
        }

        let gesendet = match self.inner.clients.get(&ziel) {
            Some(sender) => sender.senden(SignalMessage::event(payload)),
            None => false,
        };

        if !gesendet {
            return Err(SignalingError::ZielNichtErreichbar(ziel));
        }

        tracing::trace!(von = %von, ziel = %ziel, "Nachricht relayed");
        Ok(())
    }

    /// Sendet ein Server-Event an eine einzelne Verbindung
    ///
    /// Gibt `true` zurueck wenn die Nachricht eingereiht wurde.
    pub fn an_verbindung_senden(&self, id: &ConnectionId, nachricht: SignalMessage) -> bool {
        match self.inner.clients.get(id) {
            Some(sender) => sender.senden(nachricht),
            None => {
                tracing::debug!(verbindung = %id, "Senden an unbekannten Client");
                false
            }
        }
    }

    /// Prueft ob ein Client im Router registriert ist
    pub fn ist_registriert(&self, id: &ConnectionId) -> bool {
        self.inner.clients.contains_key(id)
    }

    /// Gibt die Anzahl der registrierten Clients zurueck
    pub fn anzahl(&self) -> usize {
        self.inner.clients.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
