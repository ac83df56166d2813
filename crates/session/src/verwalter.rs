//! SessionVerwalter – Tabelle aller PeerSessions eines Endpunkts
//!
//! Ein Presenter verhandelt mit jedem Listener unabhaengig (Mesh statt
//! geteilter Session); ein Listener fuehrt normalerweise genau eine
//! Session mit dem Presenter. Der Verwalter haelt diese Tabelle und
//! setzt die Abschluss-Benachrichtigungen des Relays (peer-left,
//! presenter-left, target-unreachable) in Session-Uebergaenge um.

use hoersaal_core::types::ConnectionId;
use std::collections::HashMap;

use crate::session::{PeerSession, SessionSeite, SessionZustand};

/// Tabelle aller Sessions eines Endpunkts, indiziert nach Gegenstelle
///
/// Nicht thread-safe – gehoert genau einem Verbindungs-Task, wie die
/// Sessions selbst.
#[derive(Debug)]
pub struct SessionVerwalter {
    seite: SessionSeite,
    sessions: HashMap<ConnectionId, PeerSession>,
}

impl SessionVerwalter {
    /// Erstellt einen Verwalter fuer die Presenter-Seite
    pub fn presenter() -> Self {
        Self::neu(SessionSeite::Presenter)
    }

    /// Erstellt einen Verwalter fuer die Listener-Seite
    pub fn listener() -> Self {
        Self::neu(SessionSeite::Listener)
    }

    fn neu(seite: SessionSeite) -> Self {
        Self {
            seite,
            sessions: HashMap::new(),
        }
    }

    /// Gibt die Session fuer eine Gegenstelle zurueck, legt sie bei
    /// Bedarf an (Idle)
    pub fn session_oder_neu(&mut self, gegenstelle: ConnectionId) -> &mut PeerSession {
        let seite = self.seite;
        self.sessions.entry(gegenstelle).or_insert_with(|| match seite {
            SessionSeite::Presenter => PeerSession::presenter(gegenstelle),
            SessionSeite::Listener => PeerSession::listener(gegenstelle),
        })
    }

    /// Read-only Zugriff auf eine Session
    pub fn session(&self, gegenstelle: &ConnectionId) -> Option<&PeerSession> {
        self.sessions.get(gegenstelle)
    }

    /// Mutabler Zugriff auf eine bestehende Session
    pub fn session_mut(&mut self, gegenstelle: &ConnectionId) -> Option<&mut PeerSession> {
        self.sessions.get_mut(gegenstelle)
    }

    /// Gegenstelle wurde vom Relay evicted (peer-left / presenter-left)
    ///
    /// Idempotent; eine unbekannte Gegenstelle ist ein No-op.
    pub fn peer_getrennt(&mut self, gegenstelle: &ConnectionId) {
        if let Some(session) = self.sessions.get_mut(gegenstelle) {
            session.schliessen();
        }
    }

    /// Relay meldete target-unreachable fuer eine Gegenstelle
    pub fn ziel_unerreichbar(&mut self, gegenstelle: &ConnectionId) {
        if let Some(session) = self.sessions.get_mut(gegenstelle) {
            session.ziel_unerreichbar();
        }
    }

    /// Schliesst alle Sessions (eigener Disconnect / Vorlesungs-Stopp)
    pub fn alle_schliessen(&mut self) {
        for session in self.sessions.values_mut() {
            session.schliessen();
        }
    }

    /// Anzahl der nicht-terminalen Sessions
    pub fn aktive_anzahl(&self) -> usize {
        self.sessions.values().filter(|s| !s.ist_beendet()).count()
    }

    /// Entfernt terminale Sessions aus der Tabelle
    pub fn beendete_aufraeumen(&mut self) {
        self.sessions.retain(|_, s| !s.ist_beendet());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
