//! Fehlertypen fuer den Signaling-Service

use hoersaal_core::types::ConnectionId;
use thiserror::Error;

/// Fehlertyp fuer den Signaling-Service
///
/// Kein Fehler dieser Schicht beendet eine Verbindung – nur ein
/// expliziter Disconnect oder ein Transportfehler tut das.
#[derive(Debug, Error)]
pub enum SignalingError {
    /// IO-Fehler (TCP, Socket)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// Operation referenziert eine nicht registrierte Verbindung
    /// (Aufruferfehler – wird geloggt, Operation ist ein No-op)
    #[error("Unbekannte Verbindung: {0}")]
    UnbekannteVerbindung(ConnectionId),

    /// Relay-Ziel nicht registriert – erwartetes Rennen beim Disconnect,
    /// wird dem Absender als informative Notiz gemeldet
    #[error("Ziel nicht erreichbar: {0}")]
    ZielNichtErreichbar(ConnectionId),

    /// start-lecture von einer Verbindung ohne Presenter-Rolle oder fuer
    /// einen Raum dessen Presenter-Platz belegt ist
    #[error("Keine Presenter-Berechtigung: {0}")]
    KeinPresenter(ConnectionId),

    /// Protokollfehler (ungueltiges Frame, fehlendes Feld)
    #[error("Protokollfehler: {0}")]
    Protokoll(String),

    /// Server ist voll
    #[error("Server ist voll")]
    ServerVoll,

    /// Senden an Client fehlgeschlagen (Queue geschlossen)
    #[error("Senden fehlgeschlagen")]
    SendFehler,
}

impl SignalingError {
    /// Erstellt einen Protokollfehler
    pub fn protokoll(msg: impl Into<String>) -> Self {
        Self::Protokoll(msg.into())
    }
}

/// Result-Typ fuer den Signaling-Service
pub type SignalingResult<T> = Result<T, SignalingError>;
