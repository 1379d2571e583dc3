//! Heart-rate ingest and drop detection.

use std::time::Instant;

use tracing::{debug, warn};

use super::buffer::{HeartRateSample, SampleBuffer};
use crate::core::{ALERT_DROP_BPM, ALERT_MIN_SAMPLES, TelemetryError};

/// Result of ingesting one notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Ingested {
    /// The decoded sample.
    pub sample: HeartRateSample,
    /// Mean bpm including this sample.
    pub mean: f64,
    /// The sample fell far enough below the mean to alert.
    pub alert: bool,
    /// Samples evicted because the buffer could not grow.
    pub flushed: Option<Vec<HeartRateSample>>,
}

/// Decodes samples, stores them and decides when to alert.
#[derive(Debug)]
pub struct TelemetryEngine {
    origin: Instant,
    buffer: SampleBuffer,
}

impl TelemetryEngine {
    /// Create an engine timing samples from `origin`.
    pub fn new(origin: Instant, initial_capacity: usize, max_capacity: Option<usize>) -> Self {
        Self {
            origin,
            buffer: SampleBuffer::new(initial_capacity, max_capacity),
        }
    }

    /// Instant sample timestamps count from.
    pub fn origin(&self) -> Instant {
        self.origin
    }

    /// Samples currently held.
    pub fn samples(&self) -> &[HeartRateSample] {
        self.buffer.as_slice()
    }

    /// Current buffer capacity.
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Decode and record a heart-rate notification received at `now`.
    pub fn ingest(&mut self, raw: &[u8], now: Instant) -> Result<Ingested, TelemetryError> {
        let sample = decode_sample(raw, self.origin, now)?;
        debug!("Heart rate {} bpm at {}s", sample.bpm, sample.timestamp_secs);

        let flushed = match self.buffer.push(sample) {
            Ok(()) => None,
            Err(TelemetryError::ResourceExhaustion { requested }) => {
                warn!(
                    "Sample buffer could not grow to {}; flushing {} samples",
                    requested,
                    self.buffer.len()
                );
                let flushed = self.buffer.take();
                self.buffer.push(sample)?;
                Some(flushed)
            }
            Err(e) => return Err(e),
        };

        let mean = self.buffer.mean().unwrap_or(f64::from(sample.bpm));
        let alert = self.buffer.len() >= ALERT_MIN_SAMPLES
            && f64::from(sample.bpm) < mean - ALERT_DROP_BPM;
        if alert {
            warn!("Heart rate dropped to {} bpm (mean {:.1})", sample.bpm, mean);
        }

        Ok(Ingested {
            sample,
            mean,
            alert,
            flushed,
        })
    }

    /// Hand out every held sample, leaving the buffer at its initial size.
    pub fn drain(&mut self) -> Vec<HeartRateSample> {
        self.buffer.take()
    }
}

/// First two bytes as a big-endian bpm, stamped relative to `origin`.
pub fn decode_sample(
    raw: &[u8],
    origin: Instant,
    now: Instant,
) -> Result<HeartRateSample, TelemetryError> {
    let [hi, lo, ..] = raw else {
        return Err(TelemetryError::SampleTooShort(raw.len()));
    };
    let elapsed = now.saturating_duration_since(origin).as_secs();
    Ok(HeartRateSample {
        timestamp_secs: i32::try_from(elapsed).unwrap_or(i32::MAX),
        bpm: i32::from(u16::from_be_bytes([*hi, *lo])),
    })
}
