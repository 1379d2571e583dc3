//! Growable heart-rate sample storage.

use crate::core::TelemetryError;

/// One heart-rate reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartRateSample {
    /// Seconds since the handshake completed.
    pub timestamp_secs: i32,
    /// Beats per minute.
    pub bpm: i32,
}

/// Append-only sample buffer with explicit geometric growth.
///
/// Capacity is tracked logically so growth is deterministic regardless of
/// what the allocator hands back. A failed [`grow`](Self::grow) leaves the
/// buffer untouched; the caller decides whether to [`take`](Self::take) it.
#[derive(Debug)]
pub struct SampleBuffer {
    samples: Vec<HeartRateSample>,
    capacity: usize,
    initial_capacity: usize,
    max_capacity: Option<usize>,
    bpm_sum: i64,
}

impl SampleBuffer {
    /// Create a buffer holding `initial_capacity` samples before it grows.
    pub fn new(initial_capacity: usize, max_capacity: Option<usize>) -> Self {
        let initial_capacity = initial_capacity.max(1);
        Self {
            samples: Vec::with_capacity(initial_capacity),
            capacity: initial_capacity,
            initial_capacity,
            max_capacity,
            bpm_sum: 0,
        }
    }

    /// Number of samples held.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if no samples are held.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples the buffer holds before it must grow.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples in arrival order.
    pub fn as_slice(&self) -> &[HeartRateSample] {
        &self.samples
    }

    /// Mean bpm over the samples held.
    pub fn mean(&self) -> Option<f64> {
        (!self.samples.is_empty()).then(|| self.bpm_sum as f64 / self.samples.len() as f64)
    }

    /// Check if the next push needs to grow first.
    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.capacity
    }

    /// Double the capacity.
    ///
    /// Fails with [`TelemetryError::ResourceExhaustion`] when the ceiling
    /// would be crossed or the allocator refuses.
    pub fn grow(&mut self) -> Result<(), TelemetryError> {
        let requested = self
            .capacity
            .checked_mul(2)
            .ok_or(TelemetryError::ResourceExhaustion {
                requested: usize::MAX,
            })?;
        if self.max_capacity.is_some_and(|max| requested > max) {
            return Err(TelemetryError::ResourceExhaustion { requested });
        }
        self.samples
            .try_reserve_exact(requested - self.samples.len())
            .map_err(|_| TelemetryError::ResourceExhaustion { requested })?;
        self.capacity = requested;
        Ok(())
    }

    /// Append a sample, growing when full.
    pub fn push(&mut self, sample: HeartRateSample) -> Result<(), TelemetryError> {
        if self.is_full() {
            self.grow()?;
        }
        self.samples.push(sample);
        self.bpm_sum += i64::from(sample.bpm);
        Ok(())
    }

    /// Hand out every sample and restart at the initial capacity.
    pub fn take(&mut self) -> Vec<HeartRateSample> {
        self.capacity = self.initial_capacity;
        self.bpm_sum = 0;
        std::mem::replace(&mut self.samples, Vec::with_capacity(self.initial_capacity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(i: usize) -> HeartRateSample {
        HeartRateSample {
            timestamp_secs: i as i32,
            bpm: 60 + (i % 40) as i32,
        }
    }

    #[test]
    fn test_single_doubling_preserves_order() {
        let mut buffer = SampleBuffer::new(1000, None);
        for i in 0..1000 {
            buffer.push(sample(i)).unwrap();
        }
        assert_eq!(buffer.capacity(), 1000);
        assert!(buffer.is_full());

        buffer.push(sample(1000)).unwrap();
        assert_eq!(buffer.capacity(), 2000);
        assert_eq!(buffer.len(), 1001);
        assert!(
            buffer
                .as_slice()
                .iter()
                .enumerate()
                .all(|(i, s)| *s == sample(i))
        );
    }

    #[test]
    fn test_mean() {
        let mut buffer = SampleBuffer::new(4, None);
        assert_eq!(buffer.mean(), None);
        for bpm in [60, 70, 80] {
            buffer
                .push(HeartRateSample {
                    timestamp_secs: 0,
                    bpm,
                })
                .unwrap();
        }
        assert_eq!(buffer.mean(), Some(70.0));
    }

    #[test]
    fn test_ceiling_exhaustion_leaves_buffer_intact() {
        let mut buffer = SampleBuffer::new(2, Some(3));
        buffer.push(sample(0)).unwrap();
        buffer.push(sample(1)).unwrap();

        assert_eq!(
            buffer.push(sample(2)),
            Err(TelemetryError::ResourceExhaustion { requested: 4 })
        );
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.capacity(), 2);
    }

    #[test]
    fn test_take_resets() {
        let mut buffer = SampleBuffer::new(2, None);
        for i in 0..5 {
            buffer.push(sample(i)).unwrap();
        }
        assert_eq!(buffer.capacity(), 8);

        let taken = buffer.take();
        assert_eq!(taken.len(), 5);
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), 2);
        assert_eq!(buffer.mean(), None);
    }
}
