//! Verbindungs-Registry – die eine Quelle der Wahrheit fuer "wer ist wer"
//!
//! Haelt jede lebende Verbindung mit zugewiesener Rolle und
//! Raum-Mitgliedschaft. Ein einziger ID-Raum fuer alle Verbindungen;
//! getrennte Presenter-/Listener-Tabellen gibt es bewusst nicht.
//! Raum-Mitgliedschaft ist zusaetzlich nach Raum indiziert, damit ein
//! Broadcast O(Raumgroesse) kostet und nicht O(alle Verbindungen).
//!
//! Thread-safe via Arc + DashMap. Clone der Registry teilt den inneren
//! Zustand. Alle Mutationen laufen durch diese Registry; eine Verbindung
//! gehoert ihr vom Accept bis zum Disconnect.

use dashmap::DashMap;
use hoersaal_core::types::{ConnectionId, RoomId, Rolle};
use std::sync::Arc;

use crate::error::{SignalingError, SignalingResult};

// ---------------------------------------------------------------------------
// Datensaetze
// ---------------------------------------------------------------------------

/// Momentaufnahme einer registrierten Verbindung
#[derive(Debug, Clone)]
pub struct VerbindungsInfo {
    pub id: ConnectionId,
    pub rolle: Rolle,
    pub raum_id: Option<RoomId>,
}

/// Momentaufnahme eines Raums
#[derive(Debug, Clone)]
pub struct RaumBelegung {
    /// Inhaber des Presenter-Platzes (hoechstens einer)
    pub presenter: Option<ConnectionId>,
    /// Laeuft gerade eine Vorlesung?
    pub aktiv: bool,
    /// Alle Mitglieder in Beitrittsreihenfolge (inkl. Presenter)
    pub mitglieder: Vec<ConnectionId>,
}

/// Ergebnis einer Rollen-Zuweisung
#[derive(Debug, Clone)]
pub struct RollenWechsel {
    pub vorherige: Rolle,
    /// Raum dessen Presenter-Platz durch den Wechsel frei wurde
    pub geraeumter_raum: Option<RoomId>,
}

/// Ergebnis eines Raum-Beitritts
#[derive(Debug, Clone)]
pub struct RaumWechsel {
    /// Verlassener Raum (None wenn vorher raumlos oder derselbe Raum)
    pub vorheriger_raum: Option<RoomId>,
    /// War die Verbindung bereits Mitglied? (Beitritt ist idempotent)
    pub bereits_mitglied: bool,
    /// Hielt die Verbindung den Presenter-Platz des verlassenen Raums?
    pub war_presenter_im_alten: bool,
}

/// Endzustand einer entfernten Verbindung
#[derive(Debug, Clone)]
pub struct VerbindungsEnde {
    pub info: VerbindungsInfo,
    /// Hielt die Verbindung beim Entfernen einen Presenter-Platz?
    pub war_presenter: bool,
}

// ---------------------------------------------------------------------------
// VerbindungsRegistry
// ---------------------------------------------------------------------------

/// Raum-Eintrag im Index
#[derive(Debug, Default)]
struct RaumEintrag {
    presenter: Option<ConnectionId>,
    aktiv: bool,
    mitglieder: Vec<ConnectionId>,
}

/// Zentrale Registry aller lebenden Verbindungen
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct VerbindungsRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    /// Alle Verbindungen, ein ID-Raum
    verbindungen: DashMap<ConnectionId, VerbindungsInfo>,
    /// Raum -> Mitglieder-Index
    raeume: DashMap<RoomId, RaumEintrag>,
}

impl VerbindungsRegistry {
    /// Erstellt eine neue, leere Registry
    pub fn neu() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                verbindungen: DashMap::new(),
                raeume: DashMap::new(),
            }),
        }
    }

    /// Registriert eine frisch akzeptierte Verbindung
    ///
    /// Vergibt eine frische eindeutige ID; Rolle ist Unzugewiesen,
    /// kein Raum.
    pub fn registrieren(&self) -> ConnectionId {
        let id = ConnectionId::new();
        self.inner.verbindungen.insert(
            id,
            VerbindungsInfo {
                id,
                rolle: Rolle::Unzugewiesen,
                raum_id: None,
            },
        );
        tracing::debug!(verbindung = %id, "Verbindung registriert");
        id
    }

    /// Entfernt eine Verbindung endgueltig
    ///
    /// Raum-Mitgliedschaft und Presenter-Platz werden mit entfernt;
    /// nachfolgende Routing-Entscheidungen sehen die Verbindung nicht
    /// mehr. Idempotent – doppeltes Entfernen ist ein No-op.
    pub fn entfernen(&self, id: &ConnectionId) -> Option<VerbindungsEnde> {
        let (_, info) = self.inner.verbindungen.remove(id)?;

        let mut war_presenter = false;
        if let Some(ref raum_id) = info.raum_id {
            war_presenter = self.aus_raum_entfernen_intern(id, raum_id);
        }

        tracing::info!(verbindung = %id, rolle = %info.rolle, "Verbindung entfernt");
        Some(VerbindungsEnde {
            info,
            war_presenter,
        })
    }

    /// Read-only Lookup einer Verbindung
    pub fn lookup(&self, id: &ConnectionId) -> Option<VerbindungsInfo> {
        self.inner.verbindungen.get(id).map(|e| e.clone())
    }

    /// Weist einer Verbindung ihre Rolle zu
    ///
    /// Letzte Zuweisung gewinnt. Verliert eine Verbindung dabei die
    /// Presenter-Rolle waehrend sie den Presenter-Platz ihres Raums
    /// haelt, wird der Platz geraeumt und der Raum im Ergebnis gemeldet.
    pub fn rolle_setzen(
        &self,
        id: &ConnectionId,
        rolle: Rolle,
    ) -> SignalingResult<RollenWechsel> {
        let (vorherige, raum_id) = {
            let mut entry = self
                .inner
                .verbindungen
                .get_mut(id)
                .ok_or(SignalingError::UnbekannteVerbindung(*id))?;
            let vorherige = entry.rolle;
            entry.rolle = rolle;
            (vorherige, entry.raum_id.clone())
        };

        let mut geraeumter_raum = None;
        if vorherige == Rolle::Presenter && rolle != Rolle::Presenter {
            if let Some(raum_id) = raum_id {
                if self.presenter_raeumen(&raum_id, id) {
                    geraeumter_raum = Some(raum_id);
                }
            }
        }

        tracing::debug!(verbindung = %id, von = %vorherige, nach = %rolle, "Rolle zugewiesen");
        Ok(RollenWechsel {
            vorherige,
            geraeumter_raum,
        })
    }

    /// Fuegt eine Verbindung einem Raum hinzu
    ///
    /// Idempotent; hoechstens ein Raum pro Verbindung – der Beitritt zu
    /// einem neuen Raum verlaesst den alten implizit.
    pub fn raum_beitreten(
        &self,
        id: &ConnectionId,
        raum_id: RoomId,
    ) -> SignalingResult<RaumWechsel> {
        let alter_raum = {
            let mut entry = self
                .inner
                .verbindungen
                .get_mut(id)
                .ok_or(SignalingError::UnbekannteVerbindung(*id))?;

            if entry.raum_id.as_ref() == Some(&raum_id) {
                return Ok(RaumWechsel {
                    vorheriger_raum: None,
                    bereits_mitglied: true,
                    war_presenter_im_alten: false,
                });
            }

            let alter = entry.raum_id.take();
            entry.raum_id = Some(raum_id.clone());
            alter
        };

        let mut war_presenter_im_alten = false;
        if let Some(ref alter) = alter_raum {
            war_presenter_im_alten = self.aus_raum_entfernen_intern(id, alter);
        }

        let mut eintrag = self.inner.raeume.entry(raum_id.clone()).or_default();
        if !eintrag.mitglieder.contains(id) {
            eintrag.mitglieder.push(*id);
        }
        drop(eintrag);

        tracing::debug!(verbindung = %id, raum = %raum_id, "Raum beigetreten");
        Ok(RaumWechsel {
            vorheriger_raum: alter_raum,
            bereits_mitglied: false,
            war_presenter_im_alten,
        })
    }

    /// Momentaufnahme eines Raums
    pub fn raum_belegung(&self, raum_id: &RoomId) -> Option<RaumBelegung> {
        self.inner.raeume.get(raum_id).map(|e| RaumBelegung {
            presenter: e.presenter,
            aktiv: e.aktiv,
            mitglieder: e.mitglieder.clone(),
        })
    }

    /// Gibt den Raum einer Verbindung zurueck
    pub fn raum_von(&self, id: &ConnectionId) -> Option<RoomId> {
        self.inner.verbindungen.get(id)?.raum_id.clone()
    }

    /// Beansprucht den Presenter-Platz eines Raums
    ///
    /// Ein freier oder bereits selbst gehaltener Platz wird (erneut)
    /// belegt; ein von einer anderen lebenden Verbindung gehaltener
    /// Platz wird verteidigt.
    pub fn presenter_beanspruchen(
        &self,
        raum_id: &RoomId,
        id: &ConnectionId,
    ) -> SignalingResult<()> {
        let mut eintrag = self.inner.raeume.entry(raum_id.clone()).or_default();
        match eintrag.presenter {
            None => {
                eintrag.presenter = Some(*id);
                Ok(())
            }
            Some(inhaber) if inhaber == *id => Ok(()),
            Some(_) => Err(SignalingError::KeinPresenter(*id)),
        }
    }

    /// Raeumt den Presenter-Platz falls `id` ihn haelt
    ///
    /// Beendet damit auch eine laufende Vorlesung. Gibt `true` zurueck
    /// wenn tatsaechlich geraeumt wurde.
    pub fn presenter_raeumen(&self, raum_id: &RoomId, id: &ConnectionId) -> bool {
        match self.inner.raeume.get_mut(raum_id) {
            Some(mut eintrag) if eintrag.presenter == Some(*id) => {
                eintrag.presenter = None;
                eintrag.aktiv = false;
                true
            }
            _ => false,
        }
    }

    /// Gibt den Presenter eines Raums zurueck
    pub fn presenter_von(&self, raum_id: &RoomId) -> Option<ConnectionId> {
        self.inner.raeume.get(raum_id)?.presenter
    }

    /// Markiert die Vorlesung eines Raums als laufend/beendet
    pub fn vorlesung_aktiv_setzen(&self, raum_id: &RoomId, aktiv: bool) {
        if let Some(mut eintrag) = self.inner.raeume.get_mut(raum_id) {
            eintrag.aktiv = aktiv;
        }
    }

    /// Laeuft in diesem Raum gerade eine Vorlesung?
    pub fn vorlesung_aktiv(&self, raum_id: &RoomId) -> bool {
        self.inner
            .raeume
            .get(raum_id)
            .map(|e| e.aktiv)
            .unwrap_or(false)
    }

    /// Anzahl der registrierten Verbindungen
    pub fn anzahl(&self) -> usize {
        self.inner.verbindungen.len()
    }

    /// Anzahl der referenzierten Raeume
    pub fn raeume_anzahl(&self) -> usize {
        self.inner.raeume.len()
    }

    // -----------------------------------------------------------------------
    // Interne Hilfsmethoden
    // -----------------------------------------------------------------------

    /// Entfernt `id` aus dem Raum-Index; gibt zurueck ob `id` den
    /// Presenter-Platz hielt. Ein leerer Raum verschwindet aus dem Index.
    fn aus_raum_entfernen_intern(&self, id: &ConnectionId, raum_id: &RoomId) -> bool {
        let mut war_presenter = false;
        if let Some(mut eintrag) = self.inner.raeume.get_mut(raum_id) {
            eintrag.mitglieder.retain(|m| m != id);
            if eintrag.presenter == Some(*id) {
                eintrag.presenter = None;
                eintrag.aktiv = false;
                war_presenter = true;
            }
            let ist_leer = eintrag.mitglieder.is_empty();
            drop(eintrag);
            if ist_leer {
                self.inner.raeume.remove(raum_id);
            }
        }
        war_presenter
    }
}

impl Default for VerbindungsRegistry {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registrieren_und_entfernen() {
        let registry = VerbindungsRegistry::neu();

        let id = registry.registrieren();
        let info = registry.lookup(&id).expect("Verbindung muss auffindbar sein");
        assert_eq!(info.rolle, Rolle::Unzugewiesen);
        assert_eq!(info.raum_id, None);
        assert_eq!(registry.anzahl(), 1);

        let ende = registry.entfernen(&id).expect("Entfernen liefert Endzustand");
        assert!(!ende.war_presenter);
        assert!(registry.lookup(&id).is_none());
        assert_eq!(registry.anzahl(), 0);

        // Doppeltes Entfernen ist ein No-op
        assert!(registry.entfernen(&id).is_none());
    }

    #[test]
    fn lookup_nur_zwischen_register_und_unregister() {
        let registry = VerbindungsRegistry::neu();
        let fremd = ConnectionId::new();
        assert!(registry.lookup(&fremd).is_none());

        let id = registry.registrieren();
        assert!(registry.lookup(&id).is_some());
        registry.entfernen(&id);
        assert!(registry.lookup(&id).is_none());
    }

    #[test]
    fn rolle_setzen_letzte_gewinnt() {
        let registry = VerbindungsRegistry::neu();
        let id = registry.registrieren();

        let w = registry.rolle_setzen(&id, Rolle::Listener).unwrap();
        assert_eq!(w.vorherige, Rolle::Unzugewiesen);

        let w = registry.rolle_setzen(&id, Rolle::Presenter).unwrap();
        assert_eq!(w.vorherige, Rolle::Listener);
        assert_eq!(registry.lookup(&id).unwrap().rolle, Rolle::Presenter);
    }

    #[test]
    fn rolle_setzen_unbekannte_verbindung() {
        let registry = VerbindungsRegistry::neu();
        let fremd = ConnectionId::new();
        assert!(matches!(
            registry.rolle_setzen(&fremd, Rolle::Listener),
            Err(SignalingError::UnbekannteVerbindung(_))
        ));
    }

    #[test]
    fn raum_beitritt_idempotent() {
        let registry = VerbindungsRegistry::neu();
        let id = registry.registrieren();
        let raum = RoomId::new("R1");

        let w = registry.raum_beitreten(&id, raum.clone()).unwrap();
        assert!(!w.bereits_mitglied);

        let w = registry.raum_beitreten(&id, raum.clone()).unwrap();
        assert!(w.bereits_mitglied);

        let belegung = registry.raum_belegung(&raum).unwrap();
        assert_eq!(belegung.mitglieder, vec![id], "Einfache Mitgliedschaft");
    }

    #[test]
    fn raum_wechsel_verlaesst_alten_raum() {
        let registry = VerbindungsRegistry::neu();
        let id = registry.registrieren();

        registry.raum_beitreten(&id, RoomId::new("A")).unwrap();
        let w = registry.raum_beitreten(&id, RoomId::new("B")).unwrap();
        assert_eq!(w.vorheriger_raum, Some(RoomId::new("A")));

        // Raum A ist leer und damit aus dem Index verschwunden
        assert!(registry.raum_belegung(&RoomId::new("A")).is_none());
        assert_eq!(
            registry.raum_belegung(&RoomId::new("B")).unwrap().mitglieder,
            vec![id]
        );
    }

    #[test]
    fn entfernen_raeumt_raum_und_presenter_platz() {
        let registry = VerbindungsRegistry::neu();
        let presenter = registry.registrieren();
        let listener = registry.registrieren();
        let raum = RoomId::new("R1");

        registry.rolle_setzen(&presenter, Rolle::Presenter).unwrap();
        registry.raum_beitreten(&presenter, raum.clone()).unwrap();
        registry.raum_beitreten(&listener, raum.clone()).unwrap();
        registry.presenter_beanspruchen(&raum, &presenter).unwrap();
        registry.vorlesung_aktiv_setzen(&raum, true);

        let ende = registry.entfernen(&presenter).unwrap();
        assert!(ende.war_presenter);

        let belegung = registry.raum_belegung(&raum).unwrap();
        assert_eq!(belegung.presenter, None);
        assert!(!belegung.aktiv, "Eviction beendet die Vorlesung");
        assert_eq!(belegung.mitglieder, vec![listener]);
    }

    #[test]
    fn presenter_platz_wird_verteidigt() {
        let registry = VerbindungsRegistry::neu();
        let a = registry.registrieren();
        let b = registry.registrieren();
        let raum = RoomId::new("R1");

        registry.presenter_beanspruchen(&raum, &a).unwrap();
        // Erneutes Beanspruchen durch den Inhaber ist ok
        registry.presenter_beanspruchen(&raum, &a).unwrap();
        // Ein anderer wird abgewiesen
        assert!(matches!(
            registry.presenter_beanspruchen(&raum, &b),
            Err(SignalingError::KeinPresenter(_))
        ));
    }

    #[test]
    fn rollen_wechsel_raeumt_presenter_platz() {
        let registry = VerbindungsRegistry::neu();
        let id = registry.registrieren();
        let raum = RoomId::new("R1");

        registry.rolle_setzen(&id, Rolle::Presenter).unwrap();
        registry.raum_beitreten(&id, raum.clone()).unwrap();
        registry.presenter_beanspruchen(&raum, &id).unwrap();

        let w = registry.rolle_setzen(&id, Rolle::Listener).unwrap();
        assert_eq!(w.geraeumter_raum, Some(raum.clone()));
        assert_eq!(registry.presenter_von(&raum), None);
    }

    #[test]
    fn clone_teilt_inneren_state() {
        let r1 = VerbindungsRegistry::neu();
        let r2 = r1.clone();
        let id = r1.registrieren();
        assert!(r2.lookup(&id).is_some());
    }
}
