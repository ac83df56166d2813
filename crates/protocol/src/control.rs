//! Signal-Protokoll (TCP)
//!
//! Definiert alle Signaling-Nachrichten die ueber die TCP-Verbindung
//! zwischen Client und Relay ausgetauscht werden.
//!
//! ## Design
//! - Jede Nachricht traegt eine `request_id: u32` zur Zuordnung von
//!   Fehler-Antworten; Relay-Zustellungen und Server-Events nutzen 0
//! - JSON-Serialisierung via serde (TCP, nicht zeitkritisch)
//! - Tagged Enum mit kebab-case-Tags, damit die Wire-Namen exakt dem
//!   Event-Vokabular der Clients entsprechen (`join-room`,
//!   `ice-candidate`, `broadcast-started`, ...)
//!
//! Verhandlungs-Blobs (SDP, ICE-Kandidaten) werden als rohes
//! `serde_json::Value` transportiert: das Relay ist eine dumme Leitung
//! und validiert deren Inhalt nie.

use hoersaal_core::types::{ConnectionId, RoomId, Rolle};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Fehler-Codes
// ---------------------------------------------------------------------------

/// Standardisierte Fehler-Codes fuer Error-Responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Allgemein
    InternalError,
    InvalidRequest,
    // Registry
    UnknownConnection,
    // Raum / Broadcast
    NotPresenter,
    // Server
    ServerFull,
}

// ---------------------------------------------------------------------------
// Client -> Server: Registrierung & Raum
// ---------------------------------------------------------------------------

/// Rollenwahl des Clients
///
/// Wire: `{"type": "role", "role": "presenter" | "listener"}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleRequest {
    /// Gewuenschte Rolle – letzte Zuweisung gewinnt
    pub role: Rolle,
}

/// Raum-Beitritt
///
/// Eine Verbindung gehoert zu hoechstens einem Raum; der Beitritt zu
/// einem neuen Raum verlaesst den alten implizit. Wiederholter Beitritt
/// zum selben Raum ist ein No-op.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomRequest {
    pub room_id: RoomId,
}

/// Vorlesungs-Start durch den Presenter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartLectureRequest {
    pub room_id: RoomId,
}

/// Expliziter Vorlesungs-Stopp durch den Presenter
///
/// Gleichwertig zum Presenter-Disconnect was die Benachrichtigung der
/// Listener betrifft; die Verbindung selbst bleibt bestehen.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopLectureRequest {
    pub room_id: RoomId,
}

// ---------------------------------------------------------------------------
// Relay-Nachrichten (beide Richtungen)
// ---------------------------------------------------------------------------

/// Punkt-zu-Punkt Offer (Legacy-Form)
///
/// Client -> Relay: `to` gesetzt. Relay -> Client: `from` gesetzt, `to`
/// entfernt. Der `offer`-Blob wird unveraendert durchgereicht.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<ConnectionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<ConnectionId>,
    pub offer: serde_json::Value,
}

/// Punkt-zu-Punkt Answer (Legacy-Form)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<ConnectionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<ConnectionId>,
    pub answer: serde_json::Value,
}

/// Punkt-zu-Punkt ICE-Kandidat (Legacy-Form)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IceCandidateMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<ConnectionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<ConnectionId>,
    pub candidate: serde_json::Value,
}

/// Inhalt einer generalisierten Signal-Nachricht
///
/// Ein Kanal traegt alle drei Verhandlungsarten pro Peer – das ist die
/// Form fuer den 1:n-Fall (ein Presenter, viele Listener).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SignalData {
    Offer { sdp: String },
    Answer { sdp: String },
    IceCandidate { candidate: serde_json::Value },
}

/// Generalisierte Signal-Nachricht
///
/// Wire: `{"type": "signal", "to": ..., "data": {"type": "offer", "sdp": ...}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalRelay {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<ConnectionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<ConnectionId>,
    pub data: SignalData,
}

// ---------------------------------------------------------------------------
// Server -> Client: Benachrichtigungen
// ---------------------------------------------------------------------------

/// Begruessung direkt nach dem Accept – teilt dem Client seine ID mit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredNotice {
    pub id: ConnectionId,
}

/// Snapshot-Broadcast an alle Listener eines Raums beim Vorlesungs-Start
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastStartedNotice {
    pub room_id: RoomId,
}

/// Neuer Listener im Raum – der Presenter erstellt daraufhin ein
/// frisches Offer fuer genau diesen Peer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerJoinedNotice {
    pub id: ConnectionId,
}

/// Listener hat den Raum verlassen – der Presenter schliesst die
/// zugehoerige PeerSession
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerLeftNotice {
    pub id: ConnectionId,
}

/// Der Presenter ist weg – die Vorlesung ist vorbei
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenterLeftNotice {
    pub room_id: RoomId,
}

/// Relay-Ziel nicht erreichbar
///
/// Informativ, nie fatal: Nachrichten die waehrend des Disconnects eines
/// Peers unterwegs sind, sind ein erwartetes Rennen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetUnreachableNotice {
    pub to: ConnectionId,
}

/// Fehler-Antwort auf eine Client-Anfrage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Keepalive
// ---------------------------------------------------------------------------

/// Ping (Server-initiiert)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingMessage {
    pub timestamp_ms: u64,
}

/// Pong-Antwort
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PongMessage {
    pub echo_timestamp_ms: u64,
}

// ---------------------------------------------------------------------------
// Haupt-Enum: SignalPayload
// ---------------------------------------------------------------------------

/// Alle moeglichen Signaling-Nachrichten (typsicher via Tagged Enum)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SignalPayload {
    // Client -> Server
    Role(RoleRequest),
    JoinRoom(JoinRoomRequest),
    StartLecture(StartLectureRequest),
    StopLecture(StopLectureRequest),

    // Relay (beide Richtungen)
    Offer(OfferMessage),
    Answer(AnswerMessage),
    IceCandidate(IceCandidateMessage),
    Signal(SignalRelay),

    // Server -> Client
    Registered(RegisteredNotice),
    BroadcastStarted(BroadcastStartedNotice),
    PeerJoined(PeerJoinedNotice),
    PeerLeft(PeerLeftNotice),
    PresenterLeft(PresenterLeftNotice),
    TargetUnreachable(TargetUnreachableNotice),
    Error(ErrorResponse),

    // Keepalive
    Ping(PingMessage),
    Pong(PongMessage),
}

// ---------------------------------------------------------------------------
// Umschlag: SignalMessage
// ---------------------------------------------------------------------------

/// Nachrichten-Umschlag mit Request-ID
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalMessage {
    /// Zuordnungs-ID fuer Fehler-Antworten; 0 bei Zustellungen und
    /// Server-Events
    pub request_id: u32,
    /// Inhalt der Nachricht
    #[serde(flatten)]
    pub payload: SignalPayload,
}

impl SignalMessage {
    /// Erstellt eine neue Signal-Nachricht
    pub fn new(request_id: u32, payload: SignalPayload) -> Self {
        Self {
            request_id,
            payload,
        }
    }

    /// Erstellt ein Server-Event (request_id 0)
    pub fn event(payload: SignalPayload) -> Self {
        Self::new(0, payload)
    }

    /// Erstellt die Begruessungsnachricht nach dem Accept
    pub fn registered(id: ConnectionId) -> Self {
        Self::event(SignalPayload::Registered(RegisteredNotice { id }))
    }

    /// Erstellt eine Ping-Nachricht
    pub fn ping(request_id: u32, timestamp_ms: u64) -> Self {
        Self::new(request_id, SignalPayload::Ping(PingMessage { timestamp_ms }))
    }

    /// Erstellt eine Pong-Antwort
    pub fn pong(request_id: u32, echo_timestamp_ms: u64) -> Self {
        Self::new(
            request_id,
            SignalPayload::Pong(PongMessage { echo_timestamp_ms }),
        )
    }

    /// Erstellt eine Fehler-Antwort
    pub fn error(request_id: u32, code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(
            request_id,
            SignalPayload::Error(ErrorResponse {
                code,
                message: message.into(),
            }),
        )
    }

    /// Erstellt eine Ziel-nicht-erreichbar-Notiz fuer den Absender
    pub fn target_unreachable(request_id: u32, to: ConnectionId) -> Self {
        Self::new(
            request_id,
            SignalPayload::TargetUnreachable(TargetUnreachableNotice { to }),
        )
    }

    /// Serialisiert die Nachricht als JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Deserialisiert eine Nachricht aus JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
