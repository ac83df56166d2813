//! hoersaal-core – Gemeinsame Typen und Fehlertypen
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen Hoersaal-Crates gemeinsam genutzt werden: ID-Newtypes, die
//! Rollen-Zuweisung einer Verbindung und der globale Fehler-Enum.

pub mod error;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{HoersaalError, Result};
pub use types::{ConnectionId, RoomId, Rolle};
