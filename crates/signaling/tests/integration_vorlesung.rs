//! Integrationstests fuer den kompletten Vorlesungs-Ablauf
//!
//! Startet den echten TCP-Server und verbindet Test-Clients ueber den
//! FrameCodec. Die Listener-Seite fuehrt zusaetzlich die endpunktseitige
//! PeerSession mit, damit auch der Session-Abschluss beim Disconnect
//! des Presenters abgedeckt ist.

use futures_util::{SinkExt, StreamExt};
use hoersaal_core::types::{ConnectionId, RoomId, Rolle};
use hoersaal_protocol::control::{
    AnswerMessage, ErrorCode, IceCandidateMessage, JoinRoomRequest, OfferMessage, RoleRequest,
    SignalData, SignalMessage, SignalPayload, SignalRelay, StartLectureRequest,
};
use hoersaal_protocol::wire::FrameCodec;
use hoersaal_session::{SessionVerwalter, SessionZustand};
use hoersaal_signaling::{SignalingConfig, SignalingServer, SignalingState};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

// ---------------------------------------------------------------------------
// Test-Infrastruktur
// ---------------------------------------------------------------------------

/// Startet einen Server auf einem freien Port und gibt seine Adresse zurueck
async fn server_starten() -> (SocketAddr, tokio::sync::watch::Sender<bool>) {
    let config = SignalingConfig {
        // Keepalive weit weg schieben – die Tests pingen nicht
        keepalive_sek: 600,
        verbindungs_timeout_sek: 1200,
        ..SignalingConfig::default()
    };
    let state = SignalingState::neu(config);

    let server = SignalingServer::binden(state, "127.0.0.1:0".parse().unwrap())
        .await
        .expect("Server muss binden");
    let addr = server.lokale_adresse().expect("Adresse muss abfragbar sein");

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        let _ = server.starten(shutdown_rx).await;
    });

    (addr, shutdown_tx)
}

/// Framed TCP-Client fuer die Tests
struct TestClient {
    framed: Framed<TcpStream, FrameCodec>,
    id: ConnectionId,
    naechste_request_id: u32,
}

impl TestClient {
    /// Verbindet und wartet auf die `registered`-Begruessung
    async fn verbinden(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("TCP-Connect");
        let mut framed = Framed::new(stream, FrameCodec::new());

        let begruessung = empfangen_roh(&mut framed).await;
        let id = match begruessung.payload {
            SignalPayload::Registered(r) => r.id,
            andere => panic!("Erwartet registered, erhalten: {andere:?}"),
        };

        Self {
            framed,
            id,
            naechste_request_id: 1,
        }
    }

    async fn senden(&mut self, payload: SignalPayload) -> u32 {
        let request_id = self.naechste_request_id;
        self.naechste_request_id += 1;
        self.framed
            .send(SignalMessage::new(request_id, payload))
            .await
            .expect("Senden");
        request_id
    }

    /// Naechste Nachricht, Keepalive-Pings werden uebersprungen
    async fn empfangen(&mut self) -> SignalMessage {
        loop {
            let msg = empfangen_roh(&mut self.framed).await;
            if matches!(msg.payload, SignalPayload::Ping(_)) {
                continue;
            }
            return msg;
        }
    }

    async fn rolle_setzen(&mut self, rolle: Rolle) {
        self.senden(SignalPayload::Role(RoleRequest { role: rolle }))
            .await;
    }

    async fn raum_beitreten(&mut self, raum: &str) {
        self.senden(SignalPayload::JoinRoom(JoinRoomRequest {
            room_id: RoomId::new(raum),
        }))
        .await;
    }

    /// Ping/Pong-Barriere: garantiert dass alle vorher gesendeten
    /// Events dieser Verbindung serverseitig verarbeitet sind
    async fn abwarten(&mut self) {
        self.senden(SignalPayload::Ping(hoersaal_protocol::control::PingMessage {
            timestamp_ms: 0,
        }))
        .await;
        loop {
            if matches!(self.empfangen().await.payload, SignalPayload::Pong(_)) {
                return;
            }
        }
    }
}

async fn empfangen_roh(framed: &mut Framed<TcpStream, FrameCodec>) -> SignalMessage {
    tokio::time::timeout(Duration::from_secs(5), framed.next())
        .await
        .expect("Timeout beim Empfangen")
        .expect("Verbindung unerwartet geschlossen")
        .expect("Frame-Fehler")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// Der komplette Ablauf: Registrierung, Rollen, Raum, Start, Offer,
/// Answer, Presenter-Disconnect, target-unreachable, Session-Abschluss.
#[tokio::test]
async fn vorlesung_ende_zu_ende() {
    let (addr, _shutdown) = server_starten().await;

    // Presenter T1 richtet sich ein
    let mut t1 = TestClient::verbinden(addr).await;
    t1.rolle_setzen(Rolle::Presenter).await;
    t1.raum_beitreten("R1").await;

    // Listener S1 richtet sich ein
    let mut s1 = TestClient::verbinden(addr).await;
    s1.rolle_setzen(Rolle::Listener).await;
    s1.raum_beitreten("R1").await;
    s1.abwarten().await;

    // Vorlesung starten -> S1 sieht broadcast-started{R1}
    t1.senden(SignalPayload::StartLecture(StartLectureRequest {
        room_id: RoomId::new("R1"),
    }))
    .await;

    match s1.empfangen().await.payload {
        SignalPayload::BroadcastStarted(b) => assert_eq!(b.room_id, RoomId::new("R1")),
        andere => panic!("Erwartet broadcast-started, erhalten: {andere:?}"),
    }

    // T1 bekommt S1 als peer-joined gemeldet (Mesh-Aufbau)
    match t1.empfangen().await.payload {
        SignalPayload::PeerJoined(p) => assert_eq!(p.id, s1.id),
        andere => panic!("Erwartet peer-joined, erhalten: {andere:?}"),
    }

    // S1 fuehrt die endpunktseitige Session mit
    let mut sessions = SessionVerwalter::listener();

    // T1 sendet sdp1 an S1 -> S1 empfaengt {sdp1, from: T1}
    let sdp1 = serde_json::json!({"type": "offer", "sdp": "v=0 sdp1"});
    t1.senden(SignalPayload::Offer(OfferMessage {
        to: Some(s1.id),
        from: None,
        offer: sdp1.clone(),
    }))
    .await;

    let von_t1 = match s1.empfangen().await.payload {
        SignalPayload::Offer(o) => {
            assert_eq!(o.offer, sdp1, "Blob muss unveraendert ankommen");
            assert_eq!(o.from, Some(t1.id));
            assert_eq!(o.to, None);
            o.from.unwrap()
        }
        andere => panic!("Erwartet offer, erhalten: {andere:?}"),
    };

    let session = sessions.session_oder_neu(von_t1);
    session.angebot_anwenden("v=0 sdp1").unwrap();
    session.antwort_erstellen("v=0 sdp2").unwrap();

    // S1 antwortet mit sdp2 -> T1 empfaengt {sdp2, from: S1}
    let sdp2 = serde_json::json!({"type": "answer", "sdp": "v=0 sdp2"});
    s1.senden(SignalPayload::Answer(AnswerMessage {
        to: Some(t1.id),
        from: None,
        answer: sdp2.clone(),
    }))
    .await;

    match t1.empfangen().await.payload {
        SignalPayload::Answer(a) => {
            assert_eq!(a.answer, sdp2);
            assert_eq!(a.from, Some(s1.id));
        }
        andere => panic!("Erwartet answer, erhalten: {andere:?}"),
    }

    // T1 trennt -> S1 wird presenter-left gemeldet
    let t1_id = t1.id;
    drop(t1);

    match s1.empfangen().await.payload {
        SignalPayload::PresenterLeft(p) => assert_eq!(p.room_id, RoomId::new("R1")),
        andere => panic!("Erwartet presenter-left, erhalten: {andere:?}"),
    }

    // Ein nachfolgender Kandidat an T1 laeuft ins Leere
    let req_id = s1
        .senden(SignalPayload::IceCandidate(IceCandidateMessage {
            to: Some(t1_id),
            from: None,
            candidate: serde_json::json!({"candidate": "candidate:1"}),
        }))
        .await;

    match s1.empfangen().await {
        SignalMessage {
            request_id,
            payload: SignalPayload::TargetUnreachable(n),
        } => {
            assert_eq!(request_id, req_id, "Notiz traegt die Request-ID des Absenders");
            assert_eq!(n.to, t1_id);
        }
        andere => panic!("Erwartet target-unreachable, erhalten: {andere:?}"),
    }

    // Die PeerSession mit T1 geht auf Geschlossen
    sessions.ziel_unerreichbar(&t1_id);
    assert_eq!(
        sessions.session(&t1_id).unwrap().zustand(),
        SessionZustand::Geschlossen
    );
}

/// Nachzuegler erhalten kein broadcast-started; stattdessen wird der
/// Presenter per peer-joined informiert.
#[tokio::test]
async fn nachzuegler_wird_dem_presenter_gemeldet() {
    let (addr, _shutdown) = server_starten().await;

    let mut presenter = TestClient::verbinden(addr).await;
    presenter.rolle_setzen(Rolle::Presenter).await;
    presenter.raum_beitreten("R2").await;
    presenter
        .senden(SignalPayload::StartLecture(StartLectureRequest {
            room_id: RoomId::new("R2"),
        }))
        .await;
    presenter.abwarten().await;

    // Nachzuegler
    let mut spaet = TestClient::verbinden(addr).await;
    spaet.rolle_setzen(Rolle::Listener).await;
    spaet.raum_beitreten("R2").await;

    match presenter.empfangen().await.payload {
        SignalPayload::PeerJoined(p) => assert_eq!(p.id, spaet.id),
        andere => panic!("Erwartet peer-joined, erhalten: {andere:?}"),
    }

    // Der Nachzuegler verhandelt ueber den signal-Kanal, nie ueber ein
    // nachtraegliches broadcast-started
    presenter
        .senden(SignalPayload::Signal(SignalRelay {
            to: Some(spaet.id),
            from: None,
            data: SignalData::Offer {
                sdp: "v=0 fanout".into(),
            },
        }))
        .await;

    match spaet.empfangen().await.payload {
        SignalPayload::Signal(s) => {
            assert_eq!(s.from, Some(presenter.id));
            assert!(matches!(s.data, SignalData::Offer { .. }));
        }
        andere => panic!("Erwartet signal, erhalten: {andere:?}"),
    }
}

/// start-lecture ohne Presenter-Rolle wird abgelehnt, die Verbindung
/// bleibt aber offen und nutzbar.
#[tokio::test]
async fn start_ohne_presenter_rolle() {
    let (addr, _shutdown) = server_starten().await;

    let mut client = TestClient::verbinden(addr).await;
    client.rolle_setzen(Rolle::Listener).await;
    client.raum_beitreten("R3").await;

    let req_id = client
        .senden(SignalPayload::StartLecture(StartLectureRequest {
            room_id: RoomId::new("R3"),
        }))
        .await;

    match client.empfangen().await {
        SignalMessage {
            request_id,
            payload: SignalPayload::Error(e),
        } => {
            assert_eq!(request_id, req_id);
            assert_eq!(e.code, ErrorCode::NotPresenter);
        }
        andere => panic!("Erwartet error, erhalten: {andere:?}"),
    }

    // Verbindung lebt noch: ein weiterer Beitritt funktioniert
    client.raum_beitreten("R3").await;
    client.raum_beitreten("R3").await;
}

/// Ein kaputter Frame wird verworfen, die Verbindung bleibt offen.
#[tokio::test]
async fn ungueltiger_frame_beendet_verbindung_nicht() {
    use tokio::io::AsyncWriteExt;

    let (addr, _shutdown) = server_starten().await;

    let stream = TcpStream::connect(addr).await.unwrap();
    let mut framed = Framed::new(stream, FrameCodec::new());
    let _begruessung = empfangen_roh(&mut framed).await;

    // Rohen Muell-Frame schreiben (gueltiges Laengenpraefix, kaputtes JSON)
    let muell = b"{kein json}";
    let mut roh = Vec::new();
    roh.extend_from_slice(&(muell.len() as u32).to_be_bytes());
    roh.extend_from_slice(muell);
    framed.get_mut().write_all(&roh).await.unwrap();

    // Danach funktioniert die Verbindung weiter wie gehabt
    framed
        .send(SignalMessage::new(
            1,
            SignalPayload::Role(RoleRequest {
                role: Rolle::Listener,
            }),
        ))
        .await
        .unwrap();
    framed
        .send(SignalMessage::new(
            2,
            SignalPayload::StartLecture(StartLectureRequest {
                room_id: RoomId::new("R4"),
            }),
        ))
        .await
        .unwrap();

    // Die Fehlerantwort auf start-lecture beweist dass der Server noch
    // zuhoert
    let antwort = empfangen_roh(&mut framed).await;
    assert!(matches!(antwort.payload, SignalPayload::Error(_)));
}
