//! Fehlertypen fuer Hoersaal
//!
//! Zentraler Fehler-Enum der alle moeglichen Fehlerzustaende abdeckt.
//! Untermodule koennen eigene Fehler definieren und via `#[from]` konvertieren.

use thiserror::Error;

/// Globaler Result-Alias fuer Hoersaal
pub type Result<T> = std::result::Result<T, HoersaalError>;

/// Alle moeglichen Fehler im Hoersaal-System
#[derive(Debug, Error)]
pub enum HoersaalError {
    // --- Verbindung & Netzwerk ---
    #[error("Verbindung fehlgeschlagen: {0}")]
    Verbindung(String),

    #[error("Verbindung getrennt: {0}")]
    Getrennt(String),

    #[error("Zeitlimit ueberschritten: {0}")]
    Zeitlimit(String),

    // --- Protokoll ---
    #[error("Ungueltige Nachricht: {0}")]
    UngueltigeNachricht(String),

    // --- Ressourcen ---
    #[error("Verbindung nicht gefunden: {0}")]
    VerbindungNichtGefunden(String),

    #[error("Raum nicht gefunden: {0}")]
    RaumNichtGefunden(String),

    #[error("Server voll: maximale Verbindungsanzahl erreicht")]
    ServerVoll,

    // --- Konfiguration ---
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl HoersaalError {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Gibt true zurueck wenn der Fehler wiederholbar sein koennte
    pub fn ist_wiederholbar(&self) -> bool {
        matches!(
            self,
            Self::Zeitlimit(_) | Self::Verbindung(_) | Self::Getrennt(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehler_anzeige() {
        let e = HoersaalError::UngueltigeNachricht("fehlendes to-Feld".into());
        assert_eq!(e.to_string(), "Ungueltige Nachricht: fehlendes to-Feld");
    }

    #[test]
    fn wiederholbar_erkennung() {
        assert!(HoersaalError::Zeitlimit("test".into()).ist_wiederholbar());
        assert!(!HoersaalError::ServerVoll.ist_wiederholbar());
    }
}
