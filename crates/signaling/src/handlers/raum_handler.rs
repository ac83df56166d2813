//! Raum-Handler – Beitritt, Vorlesungs-Start und -Stopp
//!
//! Beitritt ist idempotent und fire-and-forget. `start-lecture` ist die
//! einzige autorisierte Operation des Protokolls: nur eine Verbindung
//! mit Presenter-Rolle darf sie ausloesen, ein Verstoss wird abgelehnt
//! ohne die Verbindung zu beenden.

use hoersaal_core::types::ConnectionId;
use hoersaal_protocol::control::{
    ErrorCode, JoinRoomRequest, SignalMessage, StartLectureRequest, StopLectureRequest,
};
use std::sync::Arc;

use crate::error::SignalingError;
use crate::server_state::SignalingState;

/// Verarbeitet einen Raum-Beitritt
pub fn handle_raum_beitritt(
    request: JoinRoomRequest,
    request_id: u32,
    verbindungs_id: ConnectionId,
    state: &Arc<SignalingState>,
) -> Option<SignalMessage> {
    let raum_id = request.room_id;
    match state.registry.raum_beitreten(&verbindungs_id, raum_id.clone()) {
        Ok(wechsel) => {
            state
                .koordinator
                .beitritt_verarbeiten(verbindungs_id, &raum_id, &wechsel);
            None
        }
        Err(e) => {
            tracing::warn!(verbindung = %verbindungs_id, fehler = %e, "Raum-Beitritt fehlgeschlagen");
            Some(SignalMessage::error(
                request_id,
                ErrorCode::UnknownConnection,
                "Verbindung nicht registriert",
            ))
        }
    }
}

/// Verarbeitet den Vorlesungs-Start
pub fn handle_vorlesung_start(
    request: StartLectureRequest,
    request_id: u32,
    verbindungs_id: ConnectionId,
    state: &Arc<SignalingState>,
) -> Option<SignalMessage> {
    match state
        .koordinator
        .vorlesung_starten(request.room_id, verbindungs_id)
    {
        Ok(_) => None,
        Err(SignalingError::KeinPresenter(_)) => Some(SignalMessage::error(
            request_id,
            ErrorCode::NotPresenter,
            "Nur der Presenter darf die Vorlesung starten",
        )),
        Err(SignalingError::UnbekannteVerbindung(_)) => Some(SignalMessage::error(
            request_id,
            ErrorCode::UnknownConnection,
            "Verbindung nicht registriert",
        )),
        Err(e) => {
            tracing::error!(verbindung = %verbindungs_id, fehler = %e, "Vorlesungs-Start fehlgeschlagen");
            Some(SignalMessage::error(
                request_id,
                ErrorCode::InternalError,
                "Interner Fehler",
            ))
        }
    }
}

/// Verarbeitet den expliziten Vorlesungs-Stopp
pub fn handle_vorlesung_stop(
    request: StopLectureRequest,
    request_id: u32,
    verbindungs_id: ConnectionId,
    state: &Arc<SignalingState>,
) -> Option<SignalMessage> {
    match state
        .koordinator
        .vorlesung_stoppen(request.room_id, verbindungs_id)
    {
        Ok(_) => None,
        Err(SignalingError::KeinPresenter(_)) => Some(SignalMessage::error(
            request_id,
            ErrorCode::NotPresenter,
            "Nur der Presenter darf die Vorlesung beenden",
        )),
        Err(e) => {
            tracing::error!(verbindung = %verbindungs_id, fehler = %e, "Vorlesungs-Stopp fehlgeschlagen");
            Some(SignalMessage::error(
                request_id,
                ErrorCode::InternalError,
                "Interner Fehler",
            ))
        }
    }
}
