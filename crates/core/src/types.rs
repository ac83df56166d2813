//! Gemeinsame Identifikations- und Rollen-Typen fuer Hoersaal
//!
//! Verbindungs-IDs verwenden das Newtype-Pattern um Verwechslungen mit
//! anderen UUIDs zur Compilezeit auszuschliessen. Raum-IDs sind bewusst
//! Strings: der Raumname wird vom Client gewaehlt (z.B. "classroom1")
//! und hat keine serverseitige Lebensdauer.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Eindeutige Verbindungs-ID
///
/// Wird beim Accept vergeben und identifiziert die Verbindung fuer ihre
/// gesamte Lebensdauer. Opak fuer Clients – sie adressieren Relay-Ziele
/// ausschliesslich ueber diese ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Erstellt eine neue zufaellige ConnectionId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn:{}", self.0)
    }
}

/// Raum-ID – ein vom Client gewaehlter Name
///
/// Ein Raum existiert implizit sobald eine Verbindung ihn beansprucht
/// und verschwindet wenn das letzte Mitglied ihn verlaesst.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomId(pub String);

impl RoomId {
    /// Erstellt eine RoomId aus einem beliebigen String
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Gibt den inneren Namen zurueck
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "raum:{}", self.0)
    }
}

/// Rolle einer Verbindung im Broadcast
///
/// Jede Verbindung startet unzugewiesen. Die Rolle wird per `role`-Event
/// gesetzt; erst mit zugewiesener Rolle ist eine Verbindung gueltiges
/// Relay-Ziel. Letzte Zuweisung gewinnt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Rolle {
    /// Noch keine Rolle zugewiesen
    #[default]
    Unzugewiesen,
    /// Sendet Audio an alle Listener eines Raums
    Presenter,
    /// Empfaengt den Audio-Stream des Presenters
    Listener,
}

impl Rolle {
    /// Prueft ob die Rolle explizit zugewiesen wurde
    pub fn ist_zugewiesen(&self) -> bool {
        !matches!(self, Rolle::Unzugewiesen)
    }
}

impl std::fmt::Display for Rolle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rolle::Unzugewiesen => write!(f, "unzugewiesen"),
            Rolle::Presenter => write!(f, "presenter"),
            Rolle::Listener => write!(f, "listener"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_id_eindeutig() {
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        assert_ne!(a, b, "Zwei neue ConnectionIds muessen verschieden sein");
    }

    #[test]
    fn connection_id_display() {
        let id = ConnectionId(Uuid::nil());
        assert!(id.to_string().starts_with("conn:"));
    }

    #[test]
    fn room_id_aus_str() {
        let raum = RoomId::from("classroom1");
        assert_eq!(raum.as_str(), "classroom1");
        assert_eq!(raum, RoomId::new("classroom1"));
    }

    #[test]
    fn rolle_standard_unzugewiesen() {
        assert_eq!(Rolle::default(), Rolle::Unzugewiesen);
        assert!(!Rolle::default().ist_zugewiesen());
        assert!(Rolle::Presenter.ist_zugewiesen());
        assert!(Rolle::Listener.ist_zugewiesen());
    }

    #[test]
    fn rolle_wire_format_kleingeschrieben() {
        // Clients senden {"role": "presenter"} bzw. {"role": "listener"}
        assert_eq!(
            serde_json::to_string(&Rolle::Presenter).unwrap(),
            "\"presenter\""
        );
        let r: Rolle = serde_json::from_str("\"listener\"").unwrap();
        assert_eq!(r, Rolle::Listener);
    }

    #[test]
    fn ids_sind_serde_kompatibel() {
        let id = ConnectionId::new();
        let json = serde_json::to_string(&id).unwrap();
        let zurueck: ConnectionId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, zurueck);

        let raum = RoomId::new("R1");
        let json = serde_json::to_string(&raum).unwrap();
        assert_eq!(json, "\"R1\"");
    }
}
