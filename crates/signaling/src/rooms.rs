//! Raum-Koordinator – Vorlesungs-Start und Raum-Ereignisse
//!
//! Setzt auf Registry und Router auf: beim Vorlesungs-Start geht ein
//! Snapshot-Broadcast (`broadcast-started`) an genau die Listener die in
//! diesem Moment Mitglied sind; Nachzuegler werden stattdessen dem
//! Presenter als `peer-joined` gemeldet, damit er fuer genau diesen Peer
//! ein frisches Offer erstellt. So entsteht das Mesh unabhaengiger
//! Peer-Sessions – eine Verhandlung pro Listener, keine geteilte Session.
//!
//! Verlaesst der Presenter den Raum (Disconnect, Stop, Rollenwechsel),
//! erhalten die verbliebenen Listener `presenter-left`; verlaesst ein
//! Listener den Raum, erhaelt der Presenter `peer-left` und schliesst
//! die zugehoerige Session.

use hoersaal_core::types::{ConnectionId, RoomId, Rolle};
use hoersaal_protocol::control::{
    BroadcastStartedNotice, PeerJoinedNotice, PeerLeftNotice, PresenterLeftNotice, SignalMessage,
    SignalPayload,
};

use crate::error::{SignalingError, SignalingResult};
use crate::registry::{RaumWechsel, RollenWechsel, VerbindungsEnde, VerbindungsRegistry};
use crate::router::SignalRouter;

/// Koordiniert Raum-Mitgliedschaft und raum-weite Ereignisse
///
/// Clone teilt Registry und Router; der Koordinator selbst haelt keinen
/// eigenen Zustand.
#[derive(Clone)]
pub struct RaumKoordinator {
    registry: VerbindungsRegistry,
    router: SignalRouter,
}

impl RaumKoordinator {
    /// Erstellt einen neuen Koordinator
    pub fn neu(registry: VerbindungsRegistry, router: SignalRouter) -> Self {
        Self { registry, router }
    }

    /// Startet die Vorlesung eines Raums
    ///
    /// Nur eine Verbindung mit Presenter-Rolle darf starten; sie
    /// beansprucht dabei den Presenter-Platz des Raums (ein belegter
    /// Platz wird verteidigt). Der Presenter wird bei Bedarf implizit
    /// Raum-Mitglied.
    ///
    /// Gibt die Anzahl der benachrichtigten Listener zurueck.
    pub fn vorlesung_starten(
        &self,
        raum_id: RoomId,
        presenter_id: ConnectionId,
    ) -> SignalingResult<usize> {
        let info = self
            .registry
            .lookup(&presenter_id)
            .ok_or(SignalingError::UnbekannteVerbindung(presenter_id))?;

        if info.rolle != Rolle::Presenter {
            return Err(SignalingError::KeinPresenter(presenter_id));
        }

        // Presenter implizit in den Raum holen (der Raumwechsel kann
        // einen alten Raum verlassen – Ereignisse wie ueblich)
        let wechsel = self.registry.raum_beitreten(&presenter_id, raum_id.clone())?;
        self.beitritt_verarbeiten(presenter_id, &raum_id, &wechsel);

        self.registry.presenter_beanspruchen(&raum_id, &presenter_id)?;
        self.registry.vorlesung_aktiv_setzen(&raum_id, true);

        // Snapshot: genau die Listener die JETZT Mitglied sind. Fuer
        // jeden davon bekommt der Presenter ausserdem ein peer-joined,
        // damit das Mesh auch fuer Frueh-Beitreter aufgebaut wird.
        let belegung = self
            .registry
            .raum_belegung(&raum_id)
            .ok_or(SignalingError::UnbekannteVerbindung(presenter_id))?;

        let mut benachrichtigt = 0;
        for mitglied in &belegung.mitglieder {
            if *mitglied == presenter_id {
                continue;
            }
            let Some(m_info) = self.registry.lookup(mitglied) else {
                continue;
            };
            if m_info.rolle != Rolle::Listener {
                continue;
            }

            if self.router.an_verbindung_senden(
                mitglied,
                SignalMessage::event(SignalPayload::BroadcastStarted(BroadcastStartedNotice {
                    room_id: raum_id.clone(),
                })),
            ) {
                benachrichtigt += 1;
            }
            self.router.an_verbindung_senden(
                &presenter_id,
                SignalMessage::event(SignalPayload::PeerJoined(PeerJoinedNotice { id: *mitglied })),
            );
        }

        tracing::info!(
            raum = %raum_id,
            presenter = %presenter_id,
            listener = benachrichtigt,
            "Vorlesung gestartet"
        );
        Ok(benachrichtigt)
    }

    /// Beendet die Vorlesung eines Raums explizit
    ///
    /// Nur der Platz-Inhaber darf stoppen. Die Verbindung bleibt
    /// registriert und Raum-Mitglied; die Listener erhalten dieselbe
    /// `presenter-left`-Notiz wie beim Disconnect.
    pub fn vorlesung_stoppen(
        &self,
        raum_id: RoomId,
        presenter_id: ConnectionId,
    ) -> SignalingResult<usize> {
        if !self.registry.presenter_raeumen(&raum_id, &presenter_id) {
            return Err(SignalingError::KeinPresenter(presenter_id));
        }

        let anzahl = self.presenter_weg_melden(&raum_id, &presenter_id);
        tracing::info!(raum = %raum_id, presenter = %presenter_id, "Vorlesung beendet");
        Ok(anzahl)
    }

    /// Verarbeitet einen abgeschlossenen Raum-Beitritt
    ///
    /// Ein Wechsel aus einem alten Raum loest dort die Austritts-
    /// Ereignisse aus. Tritt ein Listener einem Raum mit laufender
    /// Vorlesung bei, erhaelt der Presenter `peer-joined` – Nachzuegler
    /// bekommen nie ein nachtraegliches `broadcast-started`.
    pub fn beitritt_verarbeiten(
        &self,
        id: ConnectionId,
        raum_id: &RoomId,
        wechsel: &RaumWechsel,
    ) {
        if let Some(ref alter) = wechsel.vorheriger_raum {
            if wechsel.war_presenter_im_alten {
                self.presenter_weg_melden(alter, &id);
            } else {
                self.peer_weg_melden(alter, &id);
            }
        }

        if wechsel.bereits_mitglied {
            return;
        }

        let Some(info) = self.registry.lookup(&id) else {
            return;
        };
        if info.rolle == Rolle::Listener && self.registry.vorlesung_aktiv(raum_id) {
            if let Some(presenter) = self.registry.presenter_von(raum_id) {
                self.router.an_verbindung_senden(
                    &presenter,
                    SignalMessage::event(SignalPayload::PeerJoined(PeerJoinedNotice { id })),
                );
                tracing::debug!(raum = %raum_id, listener = %id, "peer-joined an Presenter gemeldet");
            }
        }
    }

    /// Verarbeitet einen Rollenwechsel
    ///
    /// Hat der Wechsel einen Presenter-Platz geraeumt (letzte Rolle
    /// gewinnt), ist die Vorlesung dieses Raums vorbei.
    pub fn rollen_wechsel_verarbeiten(&self, id: ConnectionId, wechsel: &RollenWechsel) {
        if let Some(ref raum_id) = wechsel.geraeumter_raum {
            self.presenter_weg_melden(raum_id, &id);
        }
    }

    /// Verarbeitet das Entfernen einer Verbindung aus der Registry
    ///
    /// Session-Teardown-Benachrichtigung an die Peers deren Verhandlung
    /// die Verbindung betraf – best-effort, das Relay garantiert die
    /// Zustellung nicht wenn der Peer selbst gerade trennt.
    pub fn verbindung_getrennt(&self, ende: &VerbindungsEnde) {
        let Some(ref raum_id) = ende.info.raum_id else {
            return;
        };
        if ende.war_presenter {
            self.presenter_weg_melden(raum_id, &ende.info.id);
        } else {
            self.peer_weg_melden(raum_id, &ende.info.id);
        }
    }

    // -----------------------------------------------------------------------
    // Interne Hilfsmethoden
    // -----------------------------------------------------------------------

    /// `presenter-left` an alle verbliebenen Listener des Raums
    fn presenter_weg_melden(&self, raum_id: &RoomId, presenter_id: &ConnectionId) -> usize {
        let Some(belegung) = self.registry.raum_belegung(raum_id) else {
            return 0;
        };

        let mut benachrichtigt = 0;
        for mitglied in &belegung.mitglieder {
            if mitglied == presenter_id {
                continue;
            }
            let Some(info) = self.registry.lookup(mitglied) else {
                continue;
            };
            if info.rolle != Rolle::Listener {
                continue;
            }
            if self.router.an_verbindung_senden(
                mitglied,
                SignalMessage::event(SignalPayload::PresenterLeft(PresenterLeftNotice {
                    room_id: raum_id.clone(),
                })),
            ) {
                benachrichtigt += 1;
            }
        }
        benachrichtigt
    }

    /// `peer-left` an den Presenter des Raums
    fn peer_weg_melden(&self, raum_id: &RoomId, id: &ConnectionId) {
        if let Some(presenter) = self.registry.presenter_von(raum_id) {
            if presenter != *id {
                self.router.an_verbindung_senden(
                    &presenter,
                    SignalMessage::event(SignalPayload::PeerLeft(PeerLeftNotice { id: *id })),
                );
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    struct Aufbau {
        registry: VerbindungsRegistry,
        router: SignalRouter,
        koordinator: RaumKoordinator,
    }

    impl Aufbau {
        fn neu() -> Self {
            let registry = VerbindungsRegistry::neu();
            let router = SignalRouter::neu(registry.clone());
            let koordinator = RaumKoordinator::neu(registry.clone(), router.clone());
            Self {
                registry,
                router,
                koordinator,
            }
        }

        fn verbindung(&self, rolle: Rolle) -> (ConnectionId, mpsc::Receiver<SignalMessage>) {
            let id = self.registry.registrieren();
            self.registry.rolle_setzen(&id, rolle).unwrap();
            (id, self.router.registrieren(id))
        }

        fn beitreten(&self, id: ConnectionId, raum: &RoomId) {
            let wechsel = self.registry.raum_beitreten(&id, raum.clone()).unwrap();
            self.koordinator.beitritt_verarbeiten(id, raum, &wechsel);
        }
    }

    fn naechstes_event(rx: &mut mpsc::Receiver<SignalMessage>) -> SignalPayload {
        rx.try_recv().expect("Event erwartet").payload
    }

    #[tokio::test]
    async fn snapshot_broadcast_an_fruehe_listener() {
        let a = Aufbau::neu();
        let raum = RoomId::new("R1");

        let (presenter, mut rx_p) = a.verbindung(Rolle::Presenter);
        let (l1, mut rx_l1) = a.verbindung(Rolle::Listener);
        let (l2, mut rx_l2) = a.verbindung(Rolle::Listener);

        a.beitreten(presenter, &raum);
        a.beitreten(l1, &raum);
        a.beitreten(l2, &raum);

        let n = a.koordinator.vorlesung_starten(raum.clone(), presenter).unwrap();
        assert_eq!(n, 2);

        // Beide Listener sehen broadcast-started – und sonst nichts
        for rx in [&mut rx_l1, &mut rx_l2] {
            match naechstes_event(rx) {
                SignalPayload::BroadcastStarted(b) => assert_eq!(b.room_id, raum),
                andere => panic!("Erwartet broadcast-started, erhalten: {andere:?}"),
            }
            assert!(rx.try_recv().is_err());
        }

        // Der Presenter bekommt pro Listener ein peer-joined (Mesh-Aufbau)
        let mut gemeldet = Vec::new();
        for _ in 0..2 {
            match naechstes_event(&mut rx_p) {
                SignalPayload::PeerJoined(p) => gemeldet.push(p.id),
                andere => panic!("Erwartet peer-joined, erhalten: {andere:?}"),
            }
        }
        gemeldet.sort_by_key(|id| id.inner());
        let mut erwartet = vec![l1, l2];
        erwartet.sort_by_key(|id| id.inner());
        assert_eq!(gemeldet, erwartet);
    }

    #[tokio::test]
    async fn nachzuegler_bekommt_kein_broadcast_started() {
        let a = Aufbau::neu();
        let raum = RoomId::new("R1");

        let (presenter, mut rx_p) = a.verbindung(Rolle::Presenter);
        a.beitreten(presenter, &raum);
        a.koordinator.vorlesung_starten(raum.clone(), presenter).unwrap();

        // Nachzuegler tritt nach dem Start bei
        let (spaet, mut rx_spaet) = a.verbindung(Rolle::Listener);
        a.beitreten(spaet, &raum);

        assert!(
            rx_spaet.try_recv().is_err(),
            "Nachzuegler darf kein broadcast-started sehen"
        );
        match naechstes_event(&mut rx_p) {
            SignalPayload::PeerJoined(p) => assert_eq!(p.id, spaet),
            andere => panic!("Erwartet peer-joined, erhalten: {andere:?}"),
        }
    }

    #[tokio::test]
    async fn start_ohne_presenter_rolle_wird_abgelehnt() {
        let a = Aufbau::neu();
        let raum = RoomId::new("R1");

        let (listener, _rx) = a.verbindung(Rolle::Listener);
        assert!(matches!(
            a.koordinator.vorlesung_starten(raum, listener),
            Err(SignalingError::KeinPresenter(_))
        ));
    }

    #[tokio::test]
    async fn fremder_presenter_platz_wird_verteidigt() {
        let a = Aufbau::neu();
        let raum = RoomId::new("R1");

        let (p1, _rx1) = a.verbindung(Rolle::Presenter);
        let (p2, _rx2) = a.verbindung(Rolle::Presenter);
        a.beitreten(p1, &raum);
        a.koordinator.vorlesung_starten(raum.clone(), p1).unwrap();

        assert!(matches!(
            a.koordinator.vorlesung_starten(raum, p2),
            Err(SignalingError::KeinPresenter(_))
        ));
    }

    #[tokio::test]
    async fn presenter_disconnect_meldet_presenter_left() {
        let a = Aufbau::neu();
        let raum = RoomId::new("R1");

        let (presenter, _rx_p) = a.verbindung(Rolle::Presenter);
        let (listener, mut rx_l) = a.verbindung(Rolle::Listener);
        a.beitreten(presenter, &raum);
        a.beitreten(listener, &raum);
        a.koordinator.vorlesung_starten(raum.clone(), presenter).unwrap();
        let _ = rx_l.try_recv(); // broadcast-started abraeumen

        a.router.entfernen(&presenter);
        let ende = a.registry.entfernen(&presenter).unwrap();
        a.koordinator.verbindung_getrennt(&ende);

        match naechstes_event(&mut rx_l) {
            SignalPayload::PresenterLeft(p) => assert_eq!(p.room_id, raum),
            andere => panic!("Erwartet presenter-left, erhalten: {andere:?}"),
        }
    }

    #[tokio::test]
    async fn listener_disconnect_meldet_peer_left() {
        let a = Aufbau::neu();
        let raum = RoomId::new("R1");

        let (presenter, mut rx_p) = a.verbindung(Rolle::Presenter);
        let (listener, _rx_l) = a.verbindung(Rolle::Listener);
        a.beitreten(presenter, &raum);
        a.beitreten(listener, &raum);
        a.koordinator.vorlesung_starten(raum.clone(), presenter).unwrap();
        let _ = rx_p.try_recv(); // peer-joined abraeumen

        a.router.entfernen(&listener);
        let ende = a.registry.entfernen(&listener).unwrap();
        a.koordinator.verbindung_getrennt(&ende);

        match naechstes_event(&mut rx_p) {
            SignalPayload::PeerLeft(p) => assert_eq!(p.id, listener),
            andere => panic!("Erwartet peer-left, erhalten: {andere:?}"),
        }
    }

    #[tokio::test]
    async fn vorlesung_stoppen_meldet_presenter_left() {
        let a = Aufbau::neu();
        let raum = RoomId::new("R1");

        let (presenter, _rx_p) = a.verbindung(Rolle::Presenter);
        let (listener, mut rx_l) = a.verbindung(Rolle::Listener);
        a.beitreten(presenter, &raum);
        a.beitreten(listener, &raum);
        a.koordinator.vorlesung_starten(raum.clone(), presenter).unwrap();
        let _ = rx_l.try_recv();

        let n = a.koordinator.vorlesung_stoppen(raum.clone(), presenter).unwrap();
        assert_eq!(n, 1);
        assert!(!a.registry.vorlesung_aktiv(&raum));

        match naechstes_event(&mut rx_l) {
            SignalPayload::PresenterLeft(_) => {}
            andere => panic!("Erwartet presenter-left, erhalten: {andere:?}"),
        }

        // Stoppen ohne Platz-Inhaberschaft wird abgelehnt
        assert!(matches!(
            a.koordinator.vorlesung_stoppen(raum, listener),
            Err(SignalingError::KeinPresenter(_))
        ));
    }

    #[tokio::test]
    async fn rollen_wechsel_beendet_vorlesung() {
        let a = Aufbau::neu();
        let raum = RoomId::new("R1");

        let (presenter, _rx_p) = a.verbindung(Rolle::Presenter);
        let (listener, mut rx_l) = a.verbindung(Rolle::Listener);
        a.beitreten(presenter, &raum);
        a.beitreten(listener, &raum);
        a.koordinator.vorlesung_starten(raum.clone(), presenter).unwrap();
        let _ = rx_l.try_recv();

        // Letzte Rolle gewinnt – der Presenter wird Listener
        let wechsel = a.registry.rolle_setzen(&presenter, Rolle::Listener).unwrap();
        a.koordinator.rollen_wechsel_verarbeiten(presenter, &wechsel);

        match naechstes_event(&mut rx_l) {
            SignalPayload::PresenterLeft(_) => {}
            andere => panic!("Erwartet presenter-left, erhalten: {andere:?}"),
        }
    }
}
