//! hoersaal-protocol – Netzwerkprotokoll-Definitionen
//!
//! Dieses Crate definiert alle Nachrichtentypen die zwischen Client und
//! Relay ausgetauscht werden, sowie das Wire-Format (Laengenpraefix +
//! JSON) fuer die TCP-Verbindung.

pub mod control;
pub mod wire;

pub use control::{ErrorCode, SignalData, SignalMessage, SignalPayload};
pub use wire::FrameCodec;
