//! Session event callbacks.

use crate::telemetry::HeartRateSample;

/// Receives session events. Every method defaults to a no-op.
///
/// Callbacks run on the session task; keep them short.
pub trait SessionObserver: Send {
    /// The band accepted the handshake.
    fn on_handshake_complete(&mut self) {}

    /// An alert was written to the band.
    fn on_alert(&mut self, _sample: &HeartRateSample) {}

    /// A sample was stored.
    fn on_sample_recorded(&mut self, _sample: &HeartRateSample) {}

    /// Samples leaving the session, on buffer exhaustion or teardown.
    fn on_buffer_flush(&mut self, _samples: &[HeartRateSample]) {}
}

impl SessionObserver for () {}

impl<O: SessionObserver + ?Sized> SessionObserver for Box<O> {
    fn on_handshake_complete(&mut self) {
        (**self).on_handshake_complete();
    }

    fn on_alert(&mut self, sample: &HeartRateSample) {
        (**self).on_alert(sample);
    }

    fn on_sample_recorded(&mut self, sample: &HeartRateSample) {
        (**self).on_sample_recorded(sample);
    }

    fn on_buffer_flush(&mut self, samples: &[HeartRateSample]) {
        (**self).on_buffer_flush(samples);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingObserver {
        alerts: usize,
    }

    impl SessionObserver for CountingObserver {
        fn on_alert(&mut self, _sample: &HeartRateSample) {
            self.alerts += 1;
        }
    }

    #[test]
    fn test_default_hooks_are_noops() {
        let sample = HeartRateSample {
            timestamp_secs: 3,
            bpm: 64,
        };
        let mut observer: Box<dyn SessionObserver> = Box::new(());
        observer.on_handshake_complete();
        observer.on_alert(&sample);
        observer.on_sample_recorded(&sample);
        observer.on_buffer_flush(&[sample]);
    }

    #[test]
    fn test_boxed_observer_forwards() {
        let sample = HeartRateSample {
            timestamp_secs: 0,
            bpm: 50,
        };
        let mut boxed = Box::new(CountingObserver::default());
        boxed.on_alert(&sample);
        boxed.on_sample_recorded(&sample);
        SessionObserver::on_alert(&mut boxed, &sample);
        assert_eq!(boxed.alerts, 2);
    }
}
