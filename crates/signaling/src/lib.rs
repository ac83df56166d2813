//! hoersaal-signaling – TCP Signaling-Relay
//!
//! Dieser Crate implementiert die Signaling-Vermittlung fuer Hoersaal:
//! Verbindungs-Registrierung und Rollen-Zuweisung, Raum-Mitgliedschaft,
//! identitaetsgenaue Weiterleitung von Verhandlungsnachrichten und die
//! raum-weiten Broadcast-Ereignisse. Der Medientransport selbst laeuft
//! peer-to-peer an den Endpunkten vorbei am Relay.
//!
//! ## Architektur
//!
//! ```text
//! TCP Listener (SignalingServer)
//!     |
//!     v
//! ClientConnection (pro Verbindung ein Task)
//!     |  registered -> role -> join-room -> offer/answer/ice-candidate
//!     |
//!     v
//! MessageDispatcher
//!     |
//!     +-- RollenHandler   (role)
//!     +-- RaumHandler     (join-room, start-lecture, stop-lecture)
//!     +-- RelayHandler    (offer, answer, ice-candidate, signal)
//!
//! VerbindungsRegistry – wer ist wer: Rolle, Raum, ein ID-Raum
//! SignalRouter        – Send-Queues, identitaetsgenaue Zustellung
//! RaumKoordinator     – broadcast-started, peer-joined, presenter-left
//! ```

pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod registry;
pub mod rooms;
pub mod router;
pub mod server_state;
pub mod tcp;

// Bequeme Re-Exporte
pub use connection::ClientConnection;
pub use dispatcher::MessageDispatcher;
pub use error::{SignalingError, SignalingResult};
pub use registry::VerbindungsRegistry;
pub use rooms::RaumKoordinator;
pub use router::SignalRouter;
pub use server_state::{SignalingConfig, SignalingState};
pub use tcp::SignalingServer;
