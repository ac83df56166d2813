//! hoersaal-session – Verhandlungs-Zustandsmaschine pro Peer-Paar
//!
//! Das Relay ist absichtlich zustandslos was Sessions betrifft: es
//! garantiert nur geordnete Zustellung pro (Sender, Empfaenger)-Paar.
//! Die eigentliche Offer/Answer/Kandidaten-Verhandlung lebt an den
//! Endpunkten – dieses Crate ist der dort eingebettete Vertrag.
//!
//! ## Zustaende
//!
//! ```text
//! Idle -> OfferGesendet -> AnswerErhalten -> Verbunden
//!   \________\________________\_________________/
//!                    |
//!        Geschlossen / Fehlgeschlagen (aus jedem Zustand)
//! ```
//!
//! Presenter-Seite: Offer erstellen, Answer anwenden. Listener-Seite:
//! Offer anwenden, Answer erstellen. Kandidaten die vor der entfernten
//! Beschreibung eintreffen werden zwingend gepuffert und nach deren
//! Anwendung in Empfangsreihenfolge nachgezogen – das Relay ordnet
//! Nachrichtenarten untereinander nicht.
//!
//! Ein Presenter fuehrt pro Listener genau eine Session (Mesh aus
//! unabhaengigen Peer-Verbindungen); der [`SessionVerwalter`] haelt
//! diese Tabelle.

pub mod session;
pub mod verwalter;

pub use session::{PeerSession, SessionError, SessionSeite, SessionZustand};
pub use verwalter::SessionVerwalter;
