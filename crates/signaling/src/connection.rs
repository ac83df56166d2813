//! Client-Connection – Verwaltet eine einzelne TCP-Verbindung
//!
//! Jede TCP-Verbindung bekommt eine `ClientConnection` in einem eigenen
//! tokio-Task. Beim Accept registriert sie sich in Registry und Router
//! und teilt dem Client seine frische ID mit (`registered`); beim
//! Trennen werden alle Eintraege entfernt und die betroffenen Peers
//! benachrichtigt. Trennen ist ein sofortiges, idempotentes Ereignis –
//! Relays die gleichzeitig auf diese ID zielen schlagen sauber fehl.
//!
//! ## Keepalive
//! - Server sendet alle `keepalive_sek` einen Ping
//! - Bleibt die Verbindung `verbindungs_timeout_sek` still, wird getrennt

use futures_util::{SinkExt, StreamExt};
use hoersaal_protocol::{control::SignalMessage, wire::FrameCodec};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

use crate::dispatcher::{DispatcherContext, MessageDispatcher};
use crate::server_state::SignalingState;

/// Verarbeitet eine einzelne TCP-Verbindung
///
/// Liest Frames via `FrameCodec`, dispatcht an `MessageDispatcher` und
/// sendet Antworten sowie Router-Zustellungen zurueck. Laeuft in einem
/// eigenen tokio-Task.
pub struct ClientConnection {
    state: Arc<SignalingState>,
    peer_addr: SocketAddr,
}

impl ClientConnection {
    /// Erstellt eine neue ClientConnection
    pub fn neu(state: Arc<SignalingState>, peer_addr: SocketAddr) -> Self {
        Self { state, peer_addr }
    }

    /// Startet die Verbindungs-Verarbeitungsschleife
    ///
    /// Laeuft bis die Verbindung getrennt wird oder ein Shutdown-Signal
    /// eingeht.
    pub async fn verarbeiten(
        self,
        stream: TcpStream,
        mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) {
        let peer_addr = self.peer_addr;
        let keepalive_intervall = Duration::from_secs(self.state.config.keepalive_sek);
        let timeout_dauer = Duration::from_secs(self.state.config.verbindungs_timeout_sek);

        let mut framed = Framed::new(stream, FrameCodec::new());

        // Registrierung: frische ID, Send-Queue im Router
        let verbindungs_id = self.state.registry.registrieren();
        let mut sende_rx = self.state.router.registrieren(verbindungs_id);

        let dispatcher = MessageDispatcher::neu(Arc::clone(&self.state));
        let ctx = DispatcherContext {
            verbindungs_id,
            peer_addr,
        };

        tracing::info!(peer = %peer_addr, verbindung = %verbindungs_id, "Neue Verbindung");

        // Dem Client seine ID mitteilen
        if let Err(e) = framed.send(SignalMessage::registered(verbindungs_id)).await {
            tracing::warn!(peer = %peer_addr, fehler = %e, "Begruessung fehlgeschlagen");
            dispatcher.client_cleanup(&verbindungs_id);
            return;
        }

        // Zeitpunkt des letzten empfangenen Frames
        let mut letzter_empfang = Instant::now();
        // Zeitpunkt des naechsten Ping
        let mut naechster_ping = Instant::now() + keepalive_intervall;
        let mut ping_request_id: u32 = 0;

        loop {
            let jetzt = Instant::now();

            // Timeout-Pruefung
            if jetzt.duration_since(letzter_empfang) > timeout_dauer {
                tracing::warn!(peer = %peer_addr, verbindung = %verbindungs_id, "Verbindungs-Timeout");
                break;
            }

            // Naechsten Ping-Zeitpunkt berechnen
            let ping_verzoegerung = if jetzt < naechster_ping {
                naechster_ping.duration_since(jetzt)
            } else {
                Duration::from_millis(1)
            };

            tokio::select! {
                // Eingehende Nachricht vom Client
                frame = framed.next() => {
                    match frame {
                        Some(Ok(nachricht)) => {
                            letzter_empfang = Instant::now();
                            tracing::trace!(
                                verbindung = %verbindungs_id,
                                request_id = nachricht.request_id,
                                "Nachricht empfangen"
                            );

                            if let Some(antwort) = dispatcher.dispatch(nachricht, &ctx) {
                                if let Err(e) = framed.send(antwort).await {
                                    tracing::warn!(
                                        verbindung = %verbindungs_id,
                                        fehler = %e,
                                        "Senden fehlgeschlagen"
                                    );
                                    break;
                                }
                            }
                        }
                        Some(Err(e)) => {
                            // Nur noch fatale Codec-Fehler landen hier
                            // (ueberlanger Frame) – ungueltiges JSON wird
                            // bereits im Codec verworfen
                            tracing::warn!(
                                verbindung = %verbindungs_id,
                                fehler = %e,
                                "Frame-Lesefehler"
                            );
                            break;
                        }
                        None => {
                            tracing::info!(verbindung = %verbindungs_id, "Verbindung vom Client getrennt");
                            break;
                        }
                    }
                }

                // Ausgehende Nachricht aus dem Router (Relay-Zustellungen,
                // Raum-Ereignisse)
                Some(ausgehend) = sende_rx.recv() => {
                    if let Err(e) = framed.send(ausgehend).await {
                        tracing::warn!(
                            verbindung = %verbindungs_id,
                            fehler = %e,
                            "Zustellung fehlgeschlagen"
                        );
                        break;
                    }
                }

                // Keepalive-Ping
                _ = tokio::time::sleep(ping_verzoegerung) => {
                    if jetzt >= naechster_ping {
                        ping_request_id = ping_request_id.wrapping_add(1);
                        let ts = std::time::SystemTime::now()
                            .duration_since(std::time::UNIX_EPOCH)
                            .unwrap_or_default()
                            .as_millis() as u64;

                        if let Err(e) = framed.send(SignalMessage::ping(ping_request_id, ts)).await {
                            tracing::warn!(
                                verbindung = %verbindungs_id,
                                fehler = %e,
                                "Ping-Senden fehlgeschlagen"
                            );
                            break;
                        }
                        naechster_ping = Instant::now() + keepalive_intervall;
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(verbindung = %verbindungs_id, "Shutdown-Signal – Verbindung wird getrennt");
                        break;
                    }
                }
            }
        }

        // Cleanup beim Verbindungsende: Router zuerst, dann Registry,
        // dann Teardown-Notizen an die Peers
        dispatcher.client_cleanup(&verbindungs_id);
        tracing::info!(peer = %peer_addr, verbindung = %verbindungs_id, "Verbindungs-Task beendet");
    }
}
