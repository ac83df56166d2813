//! Wire-Format fuer die Signaling-Verbindung
//!
//! Frame-basiertes Protokoll: Length(u32 big-endian) + JSON-Payload.
//!
//! ```text
//! +--------+--------+--------+--------+----...----+
//! | Laenge (u32 BE) | 4 Bytes        | Payload    |
//! +--------+--------+--------+--------+----...----+
//! ```
//!
//! Die Laenge zaehlt nur die Payload-Bytes. Maximale Frame-Groesse ist
//! konfigurierbar (Standard: 256 KB – SDP-Blobs bleiben weit darunter).
//!
//! ## Fehlerverhalten
//! Ein Frame dessen Payload kein gueltiges JSON ist, wird verworfen und
//! geloggt; die Verbindung bleibt offen (das Laengenpraefix haelt den
//! Stream synchron). Nur ein ueberlanger Frame ist fatal, weil dann die
//! Frame-Grenzen nicht mehr vertrauenswuerdig sind.

use bytes::{Buf, BufMut, BytesMut};
use std::io;
use tokio_util::codec::{Decoder, Encoder};

use crate::control::SignalMessage;

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// Standard-maximale Frame-Groesse (256 KB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 256 * 1024;

/// Groesse des Laengen-Felds in Bytes
pub const LENGTH_FIELD_SIZE: usize = 4;

// ---------------------------------------------------------------------------
// FrameCodec
// ---------------------------------------------------------------------------

/// tokio-util Codec fuer die frame-basierte Signaling-Verbindung
///
/// Implementiert `Encoder<SignalMessage>` und `Decoder` fuer nahtlose
/// Integration mit `tokio_util::codec::Framed`.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    /// Maximale erlaubte Frame-Groesse in Bytes
    max_frame_size: usize,
}

impl FrameCodec {
    /// Erstellt einen neuen `FrameCodec` mit Standard-Limits
    pub fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Erstellt einen `FrameCodec` mit benutzerdefinierter maximaler Frame-Groesse
    pub fn with_max_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    /// Gibt die konfigurierte maximale Frame-Groesse zurueck
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Decoder-Implementierung
// ---------------------------------------------------------------------------

impl Decoder for FrameCodec {
    type Item = SignalMessage;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Ungueltige Frames werden hier verworfen, daher die Schleife:
        // nach einem verworfenen Frame kann der naechste bereits im
        // Buffer liegen.
        loop {
            if src.len() < LENGTH_FIELD_SIZE {
                return Ok(None);
            }

            let length = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;

            if length > self.max_frame_size {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "Frame zu gross: {} Bytes (Maximum: {} Bytes)",
                        length, self.max_frame_size
                    ),
                ));
            }

            let total_size = LENGTH_FIELD_SIZE + length;
            if src.len() < total_size {
                // Speicher vorbelegen um Reallocations zu vermeiden
                src.reserve(total_size - src.len());
                return Ok(None);
            }

            src.advance(LENGTH_FIELD_SIZE);
            let payload = src.split_to(length);

            match serde_json::from_slice::<SignalMessage>(&payload) {
                Ok(message) => return Ok(Some(message)),
                Err(e) => {
                    // Nicht fatal (Stream bleibt durch das Laengenpraefix
                    // synchron) – Frame verwerfen und weiter
                    tracing::warn!(fehler = %e, bytes = length, "Ungueltiger Frame verworfen");
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Encoder-Implementierung
// ---------------------------------------------------------------------------

impl Encoder<SignalMessage> for FrameCodec {
    type Error = io::Error;

    fn encode(&mut self, item: SignalMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let json = serde_json::to_vec(&item).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("JSON-Serialisierung fehlgeschlagen: {}", e),
            )
        })?;

        if json.len() > self.max_frame_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Nachricht zu gross: {} Bytes (Maximum: {} Bytes)",
                    json.len(),
                    self.max_frame_size
                ),
            ));
        }

        dst.reserve(LENGTH_FIELD_SIZE + json.len());
        dst.put_u32(json.len() as u32);
        dst.put_slice(&json);

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{OfferMessage, SignalPayload};
    use hoersaal_core::types::ConnectionId;

    fn test_offer(request_id: u32) -> SignalMessage {
        SignalMessage::new(
            request_id,
            SignalPayload::Offer(OfferMessage {
                to: Some(ConnectionId::new()),
                from: None,
                offer: serde_json::json!({"sdp": "v=0", "type": "offer"}),
            }),
        )
    }

    #[test]
    fn encode_decode_round_trip() {
        let mut codec = FrameCodec::new();
        let original = test_offer(42);

        let mut buf = BytesMut::new();
        codec.encode(original, &mut buf).unwrap();

        let payload_len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
        assert_eq!(buf.len(), LENGTH_FIELD_SIZE + payload_len);

        let decoded = codec
            .decode(&mut buf)
            .unwrap()
            .expect("Muss eine Nachricht enthalten");
        assert_eq!(decoded.request_id, 42);
        assert!(matches!(decoded.payload, SignalPayload::Offer(_)));
        assert!(buf.is_empty());
    }

    #[test]
    fn unvollstaendiger_frame_wartet_auf_daten() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(test_offer(1), &mut buf).unwrap();

        let half = buf.len() / 2;
        let mut partial = buf.split_to(half);

        assert!(codec.decode(&mut partial).unwrap().is_none());
    }

    #[test]
    fn zu_wenig_bytes_fuer_laengenfeld() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&[0x00, 0x00][..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn ablehnung_zu_grosser_frame() {
        let mut codec = FrameCodec::with_max_size(100);

        let mut buf = BytesMut::new();
        buf.put_u32(200);
        buf.put_slice(&[b'x'; 200]);

        assert!(codec.decode(&mut buf).is_err());
    }

    #[test]
    fn ablehnung_beim_encode_zu_grosse_nachricht() {
        let mut codec = FrameCodec::with_max_size(10);
        let mut buf = BytesMut::new();
        assert!(codec.encode(test_offer(1), &mut buf).is_err());
    }

    #[test]
    fn ungueltiges_json_wird_uebersprungen() {
        // Ein Frame mit kaputtem JSON darf weder die Verbindung beenden
        // noch nachfolgende Frames blockieren.
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();

        let muell = b"{nicht json";
        buf.put_u32(muell.len() as u32);
        buf.put_slice(muell);
        codec.encode(test_offer(7), &mut buf).unwrap();

        let msg = codec
            .decode(&mut buf)
            .unwrap()
            .expect("Gueltige Nachricht hinter dem Muell-Frame erwartet");
        assert_eq!(msg.request_id, 7);
    }

    #[test]
    fn mehrere_nachrichten_im_buffer() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();

        for i in 0..3u32 {
            codec.encode(test_offer(i), &mut buf).unwrap();
        }

        for i in 0..3u32 {
            let msg = codec.decode(&mut buf).unwrap().expect("Nachricht erwartet");
            assert_eq!(msg.request_id, i);
        }
        assert!(buf.is_empty());
    }
}
