//! Test doubles for the session layer.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::auth::sim::SimulatedBand;
use crate::core::{
    AUTH_MESSAGE_TYPE, CharacteristicRole, DEFAULT_MTU, HR_SET_INTERVAL, Notification, Transport,
    TransportError,
};
use crate::telemetry::HeartRateSample;
use crate::transport::{Message, Reassembler, encode_chunks};

use super::SessionObserver;

pub(crate) const AUTH_KEY: [u8; 16] = *b"0123456789abcdef";

/// Records every write; optionally plays the band on the other end.
#[derive(Clone, Default)]
pub(crate) struct RecordingTransport {
    pub(crate) writes: Arc<Mutex<Vec<(CharacteristicRole, Vec<u8>)>>>,
    pub(crate) notify_enabled: Arc<Mutex<Vec<CharacteristicRole>>>,
    band: Option<Arc<Mutex<BandEnd>>>,
}

pub(crate) struct BandEnd {
    band: SimulatedBand,
    reassembler: Reassembler,
    notifications: mpsc::Sender<Notification>,
    heart_rate: u16,
}

impl RecordingTransport {
    /// A transport whose writes are answered by a simulated band.
    pub(crate) fn with_band(notifications: mpsc::Sender<Notification>, heart_rate: u16) -> Self {
        Self {
            band: Some(Arc::new(Mutex::new(BandEnd {
                band: SimulatedBand::new(AUTH_KEY),
                reassembler: Reassembler::new(),
                notifications,
                heart_rate,
            }))),
            ..Self::default()
        }
    }

    pub(crate) fn writes_to(&self, role: CharacteristicRole) -> Vec<Vec<u8>> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .filter(|(r, _)| *r == role)
            .map(|(_, v)| v.clone())
            .collect()
    }

    /// Reassemble everything written to the chunked-write characteristic.
    pub(crate) fn sent_messages(&self) -> Vec<Message> {
        let mut reassembler = Reassembler::new();
        self.writes_to(CharacteristicRole::ChunkedWrite)
            .iter()
            .filter_map(|frame| reassembler.ingest_frame(frame).unwrap().into_message())
            .collect()
    }
}

impl BandEnd {
    fn on_write(&mut self, role: CharacteristicRole, value: &[u8]) {
        match role {
            CharacteristicRole::ChunkedWrite => {
                let Some(message) = self.reassembler.ingest_frame(value).unwrap().into_message()
                else {
                    return;
                };
                let reply = if message.payload.first() == Some(&0x05) {
                    self.band.answer_confirmation(&message.payload)
                } else {
                    self.band.answer_public_key(&message.payload).unwrap()
                };
                for frame in encode_chunks(message.handle, AUTH_MESSAGE_TYPE, &reply, DEFAULT_MTU)
                    .unwrap()
                {
                    self.notify(CharacteristicRole::ChunkedRead, frame);
                }
            }
            CharacteristicRole::HeartRateControl if value == HR_SET_INTERVAL => {
                let bpm = self.heart_rate.to_be_bytes();
                self.notify(CharacteristicRole::HeartRateMeasure, bpm.to_vec());
            }
            _ => {}
        }
    }

    fn notify(&self, role: CharacteristicRole, value: Vec<u8>) {
        self.notifications
            .try_send(Notification::new(role, value))
            .unwrap();
    }
}

impl Transport for RecordingTransport {
    async fn write(&self, role: CharacteristicRole, value: &[u8]) -> Result<(), TransportError> {
        self.writes.lock().unwrap().push((role, value.to_vec()));
        if let Some(band) = &self.band {
            band.lock().unwrap().on_write(role, value);
        }
        Ok(())
    }

    async fn enable_notifications(&self, role: CharacteristicRole) -> Result<bool, TransportError> {
        self.notify_enabled.lock().unwrap().push(role);
        Ok(true)
    }
}

/// Observer that keeps everything it is told.
#[derive(Debug, Default)]
pub(crate) struct RecordingObserver {
    pub(crate) handshakes: usize,
    pub(crate) alerts: Vec<HeartRateSample>,
    pub(crate) samples: Vec<HeartRateSample>,
    pub(crate) flushes: Vec<Vec<HeartRateSample>>,
}

impl SessionObserver for RecordingObserver {
    fn on_handshake_complete(&mut self) {
        self.handshakes += 1;
    }

    fn on_alert(&mut self, sample: &HeartRateSample) {
        self.alerts.push(*sample);
    }

    fn on_sample_recorded(&mut self, sample: &HeartRateSample) {
        self.samples.push(*sample);
    }

    fn on_buffer_flush(&mut self, samples: &[HeartRateSample]) {
        self.flushes.push(samples.to_vec());
    }
}
