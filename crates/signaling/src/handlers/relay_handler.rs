//! Relay-Handler – Offer, Answer, ICE-Kandidat und Signal weiterleiten
//!
//! Alle vier Nachrichtenarten folgen demselben Muster: `to` entnehmen,
//! `from` einstempeln, zustellen. Ein nicht erreichbares Ziel ist ein
//! erwartetes Disconnect-Rennen und geht als informative
//! `target-unreachable`-Notiz an den Absender zurueck – nie als Fehler
//! der die Verbindung beendet. Die Verhandlungs-Blobs selbst werden
//! unveraendert durchgereicht.

use hoersaal_core::types::ConnectionId;
use hoersaal_protocol::control::{
    AnswerMessage, ErrorCode, IceCandidateMessage, OfferMessage, SignalMessage, SignalPayload,
    SignalRelay,
};
use std::sync::Arc;

use crate::error::SignalingError;
use crate::server_state::SignalingState;

/// Leitet ein Legacy-Offer weiter
pub fn handle_offer(
    mut msg: OfferMessage,
    request_id: u32,
    absender: ConnectionId,
    state: &Arc<SignalingState>,
) -> Option<SignalMessage> {
    let Some(ziel) = msg.to.take() else {
        return Some(fehlendes_ziel(request_id));
    };
    msg.from = Some(absender);
    weiterleiten(absender, ziel, SignalPayload::Offer(msg), request_id, state)
}

/// Leitet eine Legacy-Answer weiter
pub fn handle_answer(
    mut msg: AnswerMessage,
    request_id: u32,
    absender: ConnectionId,
    state: &Arc<SignalingState>,
) -> Option<SignalMessage> {
    let Some(ziel) = msg.to.take() else {
        return Some(fehlendes_ziel(request_id));
    };
    msg.from = Some(absender);
    weiterleiten(absender, ziel, SignalPayload::Answer(msg), request_id, state)
}

/// Leitet einen Legacy-ICE-Kandidaten weiter
pub fn handle_ice_candidate(
    mut msg: IceCandidateMessage,
    request_id: u32,
    absender: ConnectionId,
    state: &Arc<SignalingState>,
) -> Option<SignalMessage> {
    let Some(ziel) = msg.to.take() else {
        return Some(fehlendes_ziel(request_id));
    };
    msg.from = Some(absender);
    weiterleiten(
        absender,
        ziel,
        SignalPayload::IceCandidate(msg),
        request_id,
        state,
    )
}

/// Leitet eine generalisierte Signal-Nachricht weiter
///
/// Die Form fuer den 1:n-Fall: ein Kanal pro Peer traegt alle drei
/// Verhandlungsarten.
pub fn handle_signal(
    mut msg: SignalRelay,
    request_id: u32,
    absender: ConnectionId,
    state: &Arc<SignalingState>,
) -> Option<SignalMessage> {
    let Some(ziel) = msg.to.take() else {
        return Some(fehlendes_ziel(request_id));
    };
    msg.from = Some(absender);
    weiterleiten(absender, ziel, SignalPayload::Signal(msg), request_id, state)
}

// ---------------------------------------------------------------------------
// Interne Hilfsfunktionen
// ---------------------------------------------------------------------------

/// Gemeinsamer Zustellpfad aller Relay-Arten
fn weiterleiten(
    absender: ConnectionId,
    ziel: ConnectionId,
    payload: SignalPayload,
    request_id: u32,
    state: &Arc<SignalingState>,
) -> Option<SignalMessage> {
    match state.router.relay(absender, ziel, payload) {
        Ok(()) => {
            state.relay_zaehlen(true);
            None
        }
        Err(SignalingError::ZielNichtErreichbar(z)) => {
            state.relay_zaehlen(false);
            tracing::debug!(
                von = %absender,
                ziel = %z,
                "Relay-Ziel nicht erreichbar (Disconnect-Rennen)"
            );
            Some(SignalMessage::target_unreachable(request_id, z))
        }
        Err(e) => {
            state.relay_zaehlen(false);
            tracing::error!(von = %absender, fehler = %e, "Relay fehlgeschlagen");
            Some(SignalMessage::error(
                request_id,
                ErrorCode::InternalError,
                "Relay fehlgeschlagen",
            ))
        }
    }
}

fn fehlendes_ziel(request_id: u32) -> SignalMessage {
    SignalMessage::error(
        request_id,
        ErrorCode::InvalidRequest,
        "Relay-Nachricht ohne to-Feld",
    )
}
