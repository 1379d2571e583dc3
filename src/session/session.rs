//! One authenticated link to a band.

use std::time::Instant;

use tracing::{debug, info, warn};

use super::SessionObserver;
use crate::auth::{AuthEvent, AuthMachine, HandshakeState, OutboundMessage};
use crate::config::{AuthKey, SessionConfig};
use crate::core::{
    ALERT_PAYLOAD, BandError, CharacteristicRole, HR_CONTINUOUS_START, HR_SET_INTERVAL,
    Notification, TelemetryError, Transport, TransportError,
};
use crate::telemetry::{HeartRateSample, TelemetryEngine};
use crate::transport::{FrameOutcome, Message, Reassembler, encode_chunks};

/// Protocol state for one connection, from handshake to telemetry.
///
/// The session owns all mutable state; callers feed it notifications and
/// ticks from a single task.
pub struct Session<T: Transport, O: SessionObserver> {
    transport: T,
    observer: O,
    config: SessionConfig,
    auth: AuthMachine,
    reassembler: Reassembler,
    telemetry: Option<TelemetryEngine>,
}

impl<T: Transport, O: SessionObserver> Session<T, O> {
    /// Create a session that will generate its own key pair.
    pub fn new(transport: T, auth_key: AuthKey, observer: O, config: SessionConfig) -> Self {
        Self::with_auth(transport, AuthMachine::new(auth_key), observer, config)
    }

    /// Create a session around a prepared handshake.
    pub fn with_auth(transport: T, auth: AuthMachine, observer: O, config: SessionConfig) -> Self {
        Self {
            transport,
            observer,
            config,
            auth,
            reassembler: Reassembler::new(),
            telemetry: None,
        }
    }

    /// Handshake state.
    pub fn state(&self) -> HandshakeState {
        self.auth.state()
    }

    /// Check if the handshake completed.
    pub fn is_authenticated(&self) -> bool {
        self.auth.is_authenticated()
    }

    /// When the handshake completed.
    pub fn handshake_completed_at(&self) -> Option<Instant> {
        self.telemetry.as_ref().map(TelemetryEngine::origin)
    }

    /// Samples currently buffered.
    pub fn samples(&self) -> &[HeartRateSample] {
        self.telemetry
            .as_ref()
            .map(TelemetryEngine::samples)
            .unwrap_or_default()
    }

    /// Session tunables.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Get the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get the observer.
    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Enable chunked-read notifications and announce our public key.
    pub async fn start(&mut self) -> Result<(), BandError> {
        let role = CharacteristicRole::ChunkedRead;
        if !self.transport.enable_notifications(role).await? {
            return Err(TransportError::Notify {
                role,
                reason: "declined by device".into(),
            }
            .into());
        }

        let announcement = self.auth.start()?;
        info!("Sending public key announcement");
        self.send(&announcement).await
    }

    /// Handle one notification.
    ///
    /// Malformed chunks and samples are logged and dropped. Errors returned
    /// here come from the handshake or the transport.
    pub async fn on_notification(&mut self, notification: Notification) -> Result<(), BandError> {
        match notification.role {
            CharacteristicRole::ChunkedRead => self.on_chunk(&notification.value).await,
            CharacteristicRole::HeartRateMeasure => self.on_heart_rate(&notification.value).await,
            role => {
                debug!("Ignoring notification from {}", role);
                Ok(())
            }
        }
    }

    /// Periodic keep-alive: ask the band to keep measuring.
    pub async fn on_tick(&mut self) -> Result<(), BandError> {
        if !self.is_authenticated() {
            return Ok(());
        }
        debug!("Keep-alive");
        self.request_measurement().await
    }

    /// End the session, handing every buffered sample to the observer.
    pub fn finish(mut self) -> (T, O) {
        let samples = self
            .telemetry
            .as_mut()
            .map(TelemetryEngine::drain)
            .unwrap_or_default();
        info!("Session finished with {} samples", samples.len());
        self.observer.on_buffer_flush(&samples);
        (self.transport, self.observer)
    }

    async fn on_chunk(&mut self, frame: &[u8]) -> Result<(), BandError> {
        let outcome = match self.reassembler.ingest_frame(frame) {
            Ok(outcome) => outcome,
            Err(violation) => {
                warn!("Dropping chunk: {}", violation);
                return Ok(());
            }
        };

        if let FrameOutcome::AwaitingMore { handle, .. } = outcome {
            if let Some(pending) = self.reassembler.pending(handle) {
                self.auth.observe_pending(&pending)?;
            }
            return Ok(());
        }

        match outcome.into_message() {
            Some(message) => self.on_message(&message).await,
            None => Ok(()),
        }
    }

    async fn on_message(&mut self, message: &Message) -> Result<(), BandError> {
        match self.auth.on_message(message)? {
            AuthEvent::Send(reply) => {
                info!("Sending auth confirmation");
                self.send(&reply).await
            }
            AuthEvent::Authenticated => self.on_authenticated().await,
            AuthEvent::Ignored => {
                debug!(
                    "Unhandled message type=0x{:04x} ({} bytes)",
                    message.message_type,
                    message.payload.len()
                );
                Ok(())
            }
        }
    }

    async fn on_authenticated(&mut self) -> Result<(), BandError> {
        info!("Authenticated with band");
        let role = CharacteristicRole::HeartRateMeasure;
        match self.transport.enable_notifications(role).await {
            Ok(true) => {}
            Ok(false) => warn!("Band declined heart-rate notifications"),
            Err(e) => warn!("Failed to enable heart-rate notifications: {}", e),
        }

        self.telemetry = Some(TelemetryEngine::new(
            Instant::now(),
            self.config.initial_capacity,
            self.config.max_capacity,
        ));
        self.observer.on_handshake_complete();
        self.request_measurement().await
    }

    async fn on_heart_rate(&mut self, value: &[u8]) -> Result<(), BandError> {
        let Some(telemetry) = self.telemetry.as_mut() else {
            debug!("Heart-rate notification before authentication");
            return Ok(());
        };
        let ingested = match telemetry.ingest(value, Instant::now()) {
            Ok(ingested) => ingested,
            Err(e @ TelemetryError::SampleTooShort(_)) => {
                warn!("Dropping heart-rate notification: {}", e);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(flushed) = &ingested.flushed {
            self.observer.on_buffer_flush(flushed);
        }
        self.observer.on_sample_recorded(&ingested.sample);
        if ingested.alert {
            self.transport
                .write(CharacteristicRole::Alert, &ALERT_PAYLOAD)
                .await?;
            self.observer.on_alert(&ingested.sample);
        }
        Ok(())
    }

    async fn request_measurement(&mut self) -> Result<(), BandError> {
        let role = CharacteristicRole::HeartRateControl;
        self.transport.write(role, &HR_CONTINUOUS_START).await?;
        self.transport.write(role, &HR_SET_INTERVAL).await?;
        Ok(())
    }

    async fn send(&mut self, message: &OutboundMessage) -> Result<(), BandError> {
        let frames = encode_chunks(
            message.handle,
            message.message_type,
            &message.payload,
            self.config.mtu,
        )?;
        for frame in frames {
            self.transport
                .write(CharacteristicRole::ChunkedWrite, &frame)
                .await?;
        }
        Ok(())
    }
}

impl<T: Transport, O: SessionObserver> std::fmt::Debug for Session<T, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("auth", &self.auth)
            .field("in_flight", &self.reassembler.in_flight())
            .field("samples", &self.samples().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AUTH_MESSAGE_TYPE;
    use crate::crypto::KeyPair;
    use crate::session::testing::{AUTH_KEY, RecordingObserver, RecordingTransport};
    use tokio::sync::mpsc;

    type TestSession = Session<RecordingTransport, RecordingObserver>;

    fn session(transport: RecordingTransport, config: SessionConfig) -> TestSession {
        let mut scalar = [0x6Du8; 24];
        scalar[0] = 0x01;
        let auth = AuthMachine::with_key_pair(
            AuthKey::new(AUTH_KEY),
            KeyPair::from_private(scalar).unwrap(),
        );
        Session::with_auth(transport, auth, RecordingObserver::default(), config)
    }

    async fn pump(session: &mut TestSession, rx: &mut mpsc::Receiver<Notification>) {
        while let Ok(notification) = rx.try_recv() {
            session.on_notification(notification).await.unwrap();
        }
    }

    async fn authenticated(config: SessionConfig) -> (TestSession, mpsc::Receiver<Notification>) {
        let (tx, mut rx) = mpsc::channel(128);
        let mut session = session(RecordingTransport::with_band(tx, 72), config);
        session.start().await.unwrap();
        pump(&mut session, &mut rx).await;
        assert!(session.is_authenticated());
        (session, rx)
    }

    fn heart_rate(bpm: u16) -> Notification {
        Notification::new(CharacteristicRole::HeartRateMeasure, bpm.to_be_bytes())
    }

    #[tokio::test]
    async fn test_start_announces_public_key() {
        let transport = RecordingTransport::default();
        let mut session = session(transport.clone(), SessionConfig::default());
        session.start().await.unwrap();

        assert_eq!(
            *transport.notify_enabled.lock().unwrap(),
            vec![CharacteristicRole::ChunkedRead]
        );
        let frames = transport.writes_to(CharacteristicRole::ChunkedWrite);
        assert_eq!(frames.len(), 4);
        assert_eq!(&frames[0][..11], &[0x03, 0x01, 0x00, 0x00, 0x00, 52, 0, 0, 0, 0x82, 0x00]);
        assert!(frames.iter().all(|f| f.len() <= 20));

        let sent = transport.sent_messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(&sent[0].payload[..4], &[0x04, 0x02, 0x00, 0x02]);
        assert_eq!(session.state(), HandshakeState::AwaitingPublicKeyAck);
    }

    #[tokio::test]
    async fn test_full_handshake_starts_measurement() {
        let (session, _rx) = authenticated(SessionConfig::default()).await;
        let transport = session.transport();

        let sent = transport.sent_messages();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].handle, 0);
        assert_eq!(sent[1].handle, 1);
        assert_eq!(sent[1].payload.len(), 33);

        assert_eq!(
            transport.writes_to(CharacteristicRole::HeartRateControl),
            vec![HR_CONTINUOUS_START.to_vec(), HR_SET_INTERVAL.to_vec()]
        );
        assert!(
            transport
                .notify_enabled
                .lock()
                .unwrap()
                .contains(&CharacteristicRole::HeartRateMeasure)
        );
        assert_eq!(session.observer().handshakes, 1);
        assert!(session.handshake_completed_at().is_some());
    }

    #[tokio::test]
    async fn test_samples_recorded_after_auth() {
        let (mut session, mut rx) = authenticated(SessionConfig::default()).await;
        // The band answered the interval write with one sample
        pump(&mut session, &mut rx).await;
        session.on_notification(heart_rate(75)).await.unwrap();

        let bpms: Vec<i32> = session.samples().iter().map(|s| s.bpm).collect();
        assert_eq!(bpms, vec![72, 75]);
        assert_eq!(session.observer().samples.len(), 2);
    }

    #[tokio::test]
    async fn test_heart_rate_before_auth_is_ignored() {
        let mut session = session(RecordingTransport::default(), SessionConfig::default());
        session.on_notification(heart_rate(80)).await.unwrap();
        assert!(session.samples().is_empty());
        assert!(session.observer().samples.is_empty());
    }

    #[tokio::test]
    async fn test_drop_writes_alert() {
        let (mut session, mut rx) = authenticated(SessionConfig::default()).await;
        pump(&mut session, &mut rx).await;
        for _ in 0..59 {
            session.on_notification(heart_rate(72)).await.unwrap();
        }
        session.on_notification(heart_rate(55)).await.unwrap();

        let transport = session.transport();
        assert_eq!(
            transport.writes_to(CharacteristicRole::Alert),
            vec![ALERT_PAYLOAD.to_vec()]
        );
        assert_eq!(session.observer().alerts.len(), 1);
        assert_eq!(session.observer().alerts[0].bpm, 55);
    }

    #[tokio::test]
    async fn test_short_sample_is_dropped() {
        let (mut session, mut rx) = authenticated(SessionConfig::default()).await;
        pump(&mut session, &mut rx).await;
        let before = session.samples().len();
        session
            .on_notification(Notification::new(CharacteristicRole::HeartRateMeasure, [0x48]))
            .await
            .unwrap();
        assert_eq!(session.samples().len(), before);
    }

    #[tokio::test]
    async fn test_exhaustion_flushes_to_observer() {
        let config = SessionConfig {
            initial_capacity: 2,
            max_capacity: Some(2),
            ..SessionConfig::default()
        };
        let (mut session, mut rx) = authenticated(config).await;
        pump(&mut session, &mut rx).await;
        session.on_notification(heart_rate(80)).await.unwrap();
        session.on_notification(heart_rate(90)).await.unwrap();

        let flushes = &session.observer().flushes;
        assert_eq!(flushes.len(), 1);
        assert_eq!(flushes[0].iter().map(|s| s.bpm).collect::<Vec<_>>(), vec![72, 80]);
        assert_eq!(session.samples().len(), 1);
        assert_eq!(session.samples()[0].bpm, 90);
    }

    #[tokio::test]
    async fn test_tick_only_after_auth() {
        let transport = RecordingTransport::default();
        let mut session = session(transport.clone(), SessionConfig::default());
        session.on_tick().await.unwrap();
        assert!(transport.writes.lock().unwrap().is_empty());

        let (mut session, _rx) = authenticated(SessionConfig::default()).await;
        session.on_tick().await.unwrap();
        assert_eq!(
            session
                .transport()
                .writes_to(CharacteristicRole::HeartRateControl)
                .len(),
            4
        );
    }

    #[tokio::test]
    async fn test_malformed_chunk_does_not_end_session() {
        let transport = RecordingTransport::default();
        let mut session = session(transport, SessionConfig::default());
        session.start().await.unwrap();

        session
            .on_notification(Notification::new(CharacteristicRole::ChunkedRead, [0x01, 0x02]))
            .await
            .unwrap();
        session
            .on_notification(Notification::new(
                CharacteristicRole::ChunkedRead,
                [0x03, 0x00, 0x00, 0x09, 0x04],
            ))
            .await
            .unwrap();
        assert_eq!(session.state(), HandshakeState::AwaitingPublicKeyAck);
    }

    #[tokio::test]
    async fn test_rejected_handshake_surfaces_error() {
        let transport = RecordingTransport::default();
        let mut session = session(transport, SessionConfig::default());
        session.start().await.unwrap();

        let frames: Vec<_> = encode_chunks(0, AUTH_MESSAGE_TYPE, &[0x10, 0x04, 0x03], 23)
            .unwrap()
            .collect();
        let err = session
            .on_notification(Notification::new(
                CharacteristicRole::ChunkedRead,
                frames[0].clone(),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, BandError::Auth(_)));
        assert!(!err.is_recoverable());
        assert_eq!(session.state(), HandshakeState::Failed);
    }

    #[tokio::test]
    async fn test_finish_flushes_everything_once() {
        let (mut session, mut rx) = authenticated(SessionConfig::default()).await;
        pump(&mut session, &mut rx).await;
        session.on_notification(heart_rate(68)).await.unwrap();

        let (_transport, observer) = session.finish();
        assert_eq!(observer.flushes.len(), 1);
        assert_eq!(observer.flushes[0].len(), 2);
    }
}
