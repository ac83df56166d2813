//! PeerSession – Verhandlungszustand fuer genau ein Peer-Paar
//!
//! Jede asynchrone Verhandlungsstufe (Beschreibung anwenden, Answer
//! erzeugen, Transportbestaetigung) ist ein expliziter Uebergang mit
//! eigenem Wiedereinstieg; verschachtelte Callback-Ketten gibt es nicht.
//! Die Medienebene ruft die Methoden auf sobald ihre jeweilige
//! asynchrone Operation abgeschlossen ist.

use hoersaal_core::types::ConnectionId;
use hoersaal_protocol::control::SignalData;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Zustaende & Seiten
// ---------------------------------------------------------------------------

/// Verhandlungszustand einer PeerSession
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionZustand {
    /// Noch keine Verhandlung gestartet
    Idle,
    /// Presenter: lokales Offer erstellt und relayed
    OfferGesendet,
    /// Beide Seiten: Answer liegt vor, Transport verbindet noch
    AnswerErhalten,
    /// Transport hat die Verbindung bestaetigt
    Verbunden,
    /// Expliziter Abschluss (Disconnect, Stop, Eviction-Notiz)
    Geschlossen,
    /// Transportfehler oder Verhandlung nicht mehr fortsetzbar
    Fehlgeschlagen,
}

impl SessionZustand {
    /// Prueft ob der Zustand terminal ist
    pub fn ist_terminal(&self) -> bool {
        matches!(self, SessionZustand::Geschlossen | SessionZustand::Fehlgeschlagen)
    }
}

/// Auf welcher Seite des Paars diese Session lebt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSeite {
    Presenter,
    Listener,
}

// ---------------------------------------------------------------------------
// Fehler
// ---------------------------------------------------------------------------

/// Fehler der Zustandsmaschine
#[derive(Debug, Error)]
pub enum SessionError {
    /// Operation passt nicht zum aktuellen Zustand
    #[error("Ungueltiger Uebergang aus {von:?}: {operation}")]
    UngueltigerUebergang {
        von: SessionZustand,
        operation: &'static str,
    },

    /// Operation gehoert zur anderen Seite des Paars
    #[error("Operation {operation} ist der {seite:?}-Seite vorbehalten")]
    FalscheSeite {
        seite: SessionSeite,
        operation: &'static str,
    },
}

// ---------------------------------------------------------------------------
// PeerSession
// ---------------------------------------------------------------------------

/// Verhandlungskontext zwischen einem Presenter und einem Listener
///
/// Wird endpunktseitig pro Gegenstelle gefuehrt. Nicht thread-safe –
/// eine Session gehoert genau einem Verbindungs-Task.
#[derive(Debug)]
pub struct PeerSession {
    /// ConnectionId der Gegenstelle
    gegenstelle: ConnectionId,
    seite: SessionSeite,
    zustand: SessionZustand,
    /// Eigene Session-Beschreibung (Offer bzw. Answer)
    lokale_beschreibung: Option<String>,
    /// Beschreibung der Gegenstelle – erst wenn sie gesetzt ist duerfen
    /// Kandidaten angewendet werden
    entfernte_beschreibung: Option<String>,
    /// Kandidaten die vor der entfernten Beschreibung eintrafen,
    /// in Empfangsreihenfolge
    wartende_kandidaten: Vec<serde_json::Value>,
}

impl PeerSession {
    /// Erstellt die Presenter-Seite einer Session
    pub fn presenter(gegenstelle: ConnectionId) -> Self {
        Self::neu(gegenstelle, SessionSeite::Presenter)
    }

    /// Erstellt die Listener-Seite einer Session
    pub fn listener(gegenstelle: ConnectionId) -> Self {
        Self::neu(gegenstelle, SessionSeite::Listener)
    }

    fn neu(gegenstelle: ConnectionId, seite: SessionSeite) -> Self {
        Self {
            gegenstelle,
            seite,
            zustand: SessionZustand::Idle,
            lokale_beschreibung: None,
            entfernte_beschreibung: None,
            wartende_kandidaten: Vec::new(),
        }
    }

    /// Gibt den aktuellen Zustand zurueck
    pub fn zustand(&self) -> SessionZustand {
        self.zustand
    }

    /// Gibt die Gegenstelle zurueck
    pub fn gegenstelle(&self) -> ConnectionId {
        self.gegenstelle
    }

    /// Gibt die Seite zurueck
    pub fn seite(&self) -> SessionSeite {
        self.seite
    }

    /// Prueft ob die Session in einem terminalen Zustand ist
    pub fn ist_beendet(&self) -> bool {
        self.zustand.ist_terminal()
    }

    // -----------------------------------------------------------------------
    // Presenter-Seite
    // -----------------------------------------------------------------------

    /// Presenter: lokales Offer uebernehmen, Session geht auf OfferGesendet
    ///
    /// Das zurueckgegebene [`SignalData`] wird an die Gegenstelle relayed.
    pub fn angebot_erstellen(&mut self, sdp: impl Into<String>) -> Result<SignalData, SessionError> {
        self.seite_pruefen(SessionSeite::Presenter, "angebot_erstellen")?;
        if self.zustand != SessionZustand::Idle {
            return Err(self.uebergangsfehler("angebot_erstellen"));
        }

        let sdp = sdp.into();
        self.lokale_beschreibung = Some(sdp.clone());
        self.zustand = SessionZustand::OfferGesendet;
        tracing::debug!(peer = %self.gegenstelle, "Offer erstellt");
        Ok(SignalData::Offer { sdp })
    }

    /// Presenter: Answer der Gegenstelle anwenden
    ///
    /// Gibt die bis dahin gepufferten Kandidaten in Empfangsreihenfolge
    /// zurueck; die Medienebene wendet sie unmittelbar an.
    pub fn antwort_anwenden(&mut self, sdp: impl Into<String>) -> Result<Vec<serde_json::Value>, SessionError> {
        self.seite_pruefen(SessionSeite::Presenter, "antwort_anwenden")?;
        if self.zustand != SessionZustand::OfferGesendet {
            return Err(self.uebergangsfehler("antwort_anwenden"));
        }

        self.entfernte_beschreibung = Some(sdp.into());
        self.zustand = SessionZustand::AnswerErhalten;
        tracing::debug!(peer = %self.gegenstelle, "Answer angewendet");
        Ok(std::mem::take(&mut self.wartende_kandidaten))
    }

    // -----------------------------------------------------------------------
    // Listener-Seite
    // -----------------------------------------------------------------------

    /// Listener: Offer des Presenters anwenden
    ///
    /// Gibt die bis dahin gepufferten Kandidaten in Empfangsreihenfolge
    /// zurueck. Die Session bleibt in Idle bis die Answer erstellt ist –
    /// der Aufruf von [`PeerSession::antwort_erstellen`] ist der
    /// Wiedereinstieg nach der asynchronen Answer-Erzeugung.
    pub fn angebot_anwenden(&mut self, sdp: impl Into<String>) -> Result<Vec<serde_json::Value>, SessionError> {
        self.seite_pruefen(SessionSeite::Listener, "angebot_anwenden")?;
        if self.zustand != SessionZustand::Idle || self.entfernte_beschreibung.is_some() {
            return Err(self.uebergangsfehler("angebot_anwenden"));
        }

        self.entfernte_beschreibung = Some(sdp.into());
        tracing::debug!(peer = %self.gegenstelle, "Offer angewendet");
        Ok(std::mem::take(&mut self.wartende_kandidaten))
    }

    /// Listener: erzeugte Answer uebernehmen, Session geht auf AnswerErhalten
    ///
    /// Das zurueckgegebene [`SignalData`] wird an den Presenter relayed.
    pub fn antwort_erstellen(&mut self, sdp: impl Into<String>) -> Result<SignalData, SessionError> {
        self.seite_pruefen(SessionSeite::Listener, "antwort_erstellen")?;
        if self.zustand != SessionZustand::Idle || self.entfernte_beschreibung.is_none() {
            return Err(self.uebergangsfehler("antwort_erstellen"));
        }

        let sdp = sdp.into();
        self.lokale_beschreibung = Some(sdp.clone());
        self.zustand = SessionZustand::AnswerErhalten;
        tracing::debug!(peer = %self.gegenstelle, "Answer erstellt");
        Ok(SignalData::Answer { sdp })
    }

    // -----------------------------------------------------------------------
    // Kandidaten & Transport
    // -----------------------------------------------------------------------

    /// Nimmt einen ICE-Kandidaten der Gegenstelle entgegen
    ///
    /// `Some(kandidat)` heisst: jetzt anwenden. `None` heisst: gepuffert
    /// (entfernte Beschreibung fehlt noch) oder verworfen (Session
    /// terminal). Das Puffern ist zwingend – das Relay garantiert keine
    /// Ordnung zwischen Offer/Answer und Kandidaten.
    pub fn kandidat_empfangen(&mut self, kandidat: serde_json::Value) -> Option<serde_json::Value> {
        if self.ist_beendet() {
            tracing::trace!(peer = %self.gegenstelle, "Kandidat fuer beendete Session verworfen");
            return None;
        }

        if self.entfernte_beschreibung.is_some() {
            Some(kandidat)
        } else {
            self.wartende_kandidaten.push(kandidat);
            None
        }
    }

    /// Anzahl der aktuell gepufferten Kandidaten
    pub fn wartende_kandidaten(&self) -> usize {
        self.wartende_kandidaten.len()
    }

    /// Transport meldet: Verbindung steht
    pub fn verbindung_bestaetigt(&mut self) -> Result<(), SessionError> {
        if self.zustand != SessionZustand::AnswerErhalten {
            return Err(self.uebergangsfehler("verbindung_bestaetigt"));
        }
        self.zustand = SessionZustand::Verbunden;
        tracing::info!(peer = %self.gegenstelle, "Peer-Verbindung bestaetigt");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Terminale Uebergaenge
    // -----------------------------------------------------------------------

    /// Expliziter Abschluss: Disconnect/Stop einer Seite oder
    /// Eviction-Benachrichtigung des Relays
    ///
    /// Aus jedem Zustand erreichbar; ein bereits terminaler Zustand
    /// bleibt unveraendert (erster terminaler Uebergang gewinnt).
    pub fn schliessen(&mut self) {
        if self.ist_beendet() {
            return;
        }
        self.zustand = SessionZustand::Geschlossen;
        self.ressourcen_freigeben();
        tracing::debug!(peer = %self.gegenstelle, "Session geschlossen");
    }

    /// Transportfehler – Session nicht mehr fortsetzbar
    pub fn fehlgeschlagen(&mut self) {
        if self.ist_beendet() {
            return;
        }
        self.zustand = SessionZustand::Fehlgeschlagen;
        self.ressourcen_freigeben();
        tracing::warn!(peer = %self.gegenstelle, "Session fehlgeschlagen");
    }

    /// Relay meldet: Gegenstelle nicht erreichbar
    ///
    /// Vor dem Answer-Austausch bedeutet das: die Verhandlung kommt nie
    /// zustande (Fehlgeschlagen). Danach ist die Gegenstelle schlicht
    /// weg – regulaerer Abschluss (Geschlossen).
    pub fn ziel_unerreichbar(&mut self) {
        match self.zustand {
            SessionZustand::Idle | SessionZustand::OfferGesendet => self.fehlgeschlagen(),
            SessionZustand::AnswerErhalten | SessionZustand::Verbunden => self.schliessen(),
            SessionZustand::Geschlossen | SessionZustand::Fehlgeschlagen => {}
        }
    }

    /// Gibt alle fuer dieses Paar gehaltenen Ressourcen frei
    ///
    /// Beide terminalen Zustaende verlangen das; die Medienebene
    /// beobachtet den terminalen Zustand und raeumt ihren Transport ab.
    fn ressourcen_freigeben(&mut self) {
        self.lokale_beschreibung = None;
        self.entfernte_beschreibung = None;
        self.wartende_kandidaten.clear();
    }

    /// Prueft ob alle Ressourcen freigegeben wurden (Test-Hilfsmethode)
    pub fn ressourcen_freigegeben(&self) -> bool {
        self.lokale_beschreibung.is_none()
            && self.entfernte_beschreibung.is_none()
            && self.wartende_kandidaten.is_empty()
    }

    // -----------------------------------------------------------------------
    // Interne Hilfsmethoden
    // -----------------------------------------------------------------------

    fn seite_pruefen(
        &self,
        erwartet: SessionSeite,
        operation: &'static str,
    ) -> Result<(), SessionError> {
        if self.seite != erwartet {
            return Err(SessionError::FalscheSeite {
                seite: erwartet,
                operation,
            });
        }
        Ok(())
    }

    fn uebergangsfehler(&self, operation: &'static str) -> SessionError {
        SessionError::UngueltigerUebergang {
            von: self.zustand,
            operation,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
