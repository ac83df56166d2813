//! Rollen-Handler – Zuweisung der Broadcast-Rolle
//!
//! Setzt die Rolle einer Verbindung in der Registry. Letzte Zuweisung
//! gewinnt; raeumt der Wechsel einen Presenter-Platz, meldet der
//! Koordinator den betroffenen Listenern das Vorlesungs-Ende.

use hoersaal_core::types::ConnectionId;
use hoersaal_protocol::control::{ErrorCode, RoleRequest, SignalMessage};
use std::sync::Arc;

use crate::server_state::SignalingState;

/// Verarbeitet die Rollenwahl eines Clients
///
/// Fire-and-forget: bei Erfolg gibt es keine Antwort.
pub fn handle_rolle(
    request: RoleRequest,
    request_id: u32,
    verbindungs_id: ConnectionId,
    state: &Arc<SignalingState>,
) -> Option<SignalMessage> {
    match state.registry.rolle_setzen(&verbindungs_id, request.role) {
        Ok(wechsel) => {
            state
                .koordinator
                .rollen_wechsel_verarbeiten(verbindungs_id, &wechsel);
            tracing::info!(
                verbindung = %verbindungs_id,
                rolle = %request.role,
                "Rolle zugewiesen"
            );
            None
        }
        Err(e) => {
            tracing::warn!(verbindung = %verbindungs_id, fehler = %e, "Rollenwahl fehlgeschlagen");
            Some(SignalMessage::error(
                request_id,
                ErrorCode::UnknownConnection,
                "Verbindung nicht registriert",
            ))
        }
    }
}
