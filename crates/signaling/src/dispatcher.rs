//! Message-Dispatcher – Routet SignalMessages an die richtigen Handler
//!
//! Der Dispatcher empfaengt SignalMessages von einer ClientConnection,
//! bestimmt den richtigen Handler und gibt die Antwort zurueck. Die
//! meisten Client-Events sind fire-and-forget (keine Antwort bei
//! Erfolg); nur Fehler und Relay-Notizen gehen an den Absender zurueck.

use hoersaal_core::types::ConnectionId;
use hoersaal_protocol::control::{ErrorCode, SignalMessage, SignalPayload};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::handlers::{raum_handler, relay_handler, rollen_handler};
use crate::server_state::SignalingState;

/// Dispatcher-Kontext – Informationen ueber die aktuelle Verbindung
pub struct DispatcherContext {
    /// Beim Accept vergebene Verbindungs-ID
    pub verbindungs_id: ConnectionId,
    /// Peer-Adresse fuer Logging
    pub peer_addr: SocketAddr,
}

/// Zentraler Message-Dispatcher
///
/// Routet eingehende SignalMessages an die entsprechenden Handler und
/// gibt die Antwort-SignalMessage zurueck.
pub struct MessageDispatcher {
    state: Arc<SignalingState>,
}

impl MessageDispatcher {
    /// Erstellt einen neuen Dispatcher
    pub fn neu(state: Arc<SignalingState>) -> Self {
        Self { state }
    }

    /// Verarbeitet eine eingehende SignalMessage und gibt die Antwort zurueck
    ///
    /// Gibt `None` zurueck wenn keine Antwort gesendet werden soll
    /// (erfolgreiche fire-and-forget-Events, Pong).
    pub fn dispatch(&self, message: SignalMessage, ctx: &DispatcherContext) -> Option<SignalMessage> {
        let request_id = message.request_id;
        let id = ctx.verbindungs_id;

        match message.payload {
            // -------------------------------------------------------------------
            // Keepalive
            // -------------------------------------------------------------------
            SignalPayload::Ping(ping) => Some(SignalMessage::pong(request_id, ping.timestamp_ms)),

            SignalPayload::Pong(_) => {
                tracing::trace!(verbindung = %id, "Pong empfangen");
                None
            }

            // -------------------------------------------------------------------
            // Registrierung & Raum
            // -------------------------------------------------------------------
            SignalPayload::Role(req) => {
                rollen_handler::handle_rolle(req, request_id, id, &self.state)
            }

            SignalPayload::JoinRoom(req) => {
                raum_handler::handle_raum_beitritt(req, request_id, id, &self.state)
            }

            SignalPayload::StartLecture(req) => {
                raum_handler::handle_vorlesung_start(req, request_id, id, &self.state)
            }

            SignalPayload::StopLecture(req) => {
                raum_handler::handle_vorlesung_stop(req, request_id, id, &self.state)
            }

            // -------------------------------------------------------------------
            // Relay-Nachrichten
            // -------------------------------------------------------------------
            SignalPayload::Offer(msg) => {
                relay_handler::handle_offer(msg, request_id, id, &self.state)
            }

            SignalPayload::Answer(msg) => {
                relay_handler::handle_answer(msg, request_id, id, &self.state)
            }

            SignalPayload::IceCandidate(msg) => {
                relay_handler::handle_ice_candidate(msg, request_id, id, &self.state)
            }

            SignalPayload::Signal(msg) => {
                relay_handler::handle_signal(msg, request_id, id, &self.state)
            }

            // -------------------------------------------------------------------
            // Unerwartete Server->Client Nachrichten
            // -------------------------------------------------------------------
            SignalPayload::Registered(_)
            | SignalPayload::BroadcastStarted(_)
            | SignalPayload::PeerJoined(_)
            | SignalPayload::PeerLeft(_)
            | SignalPayload::PresenterLeft(_)
            | SignalPayload::TargetUnreachable(_)
            | SignalPayload::Error(_) => {
                tracing::warn!(
                    verbindung = %id,
                    request_id,
                    "Unerwartete Server->Client Nachricht vom Client empfangen"
                );
                Some(SignalMessage::error(
                    request_id,
                    ErrorCode::InvalidRequest,
                    "Unerwartete Nachricht",
                ))
            }
        }
    }

    /// Bereinigt alle Ressourcen einer Verbindung beim Trennen
    ///
    /// Reihenfolge ist Teil des Vertrags: zuerst verschwindet die
    /// Send-Queue aus dem Router (laufende Relays schlagen ab sofort
    /// sauber fehl), dann die Registry-Eintraege, danach gehen die
    /// Teardown-Notizen an die betroffenen Peers.
    pub fn client_cleanup(&self, id: &ConnectionId) {
        self.state.router.entfernen(id);
        if let Some(ende) = self.state.registry.entfernen(id) {
            self.state.koordinator.verbindung_getrennt(&ende);
        }
        tracing::debug!(verbindung = %id, "Client-Ressourcen bereinigt");
    }
}
