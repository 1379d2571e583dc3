//! Authentication handshake state machine.
//!
//! ```text
//! host                                   band
//!   -- 04 02 00 02 | pub_host (52) ------->
//!   <------- 10 04 01 | rnd (16) | pub_band (48)
//!   -- 05 | AES(auth, rnd) | AES(derived, rnd) -->
//!   <------- 10 05 01
//! ```
//!
//! Every message travels as a chunk series of type `0x0082`. The machine
//! never touches the transport: it consumes reassembled messages and hands
//! back the messages to send.

use tracing::{debug, info, warn};

use crate::config::AuthKey;
use crate::core::{
    AUTH_MARKER_SIZE, AUTH_MESSAGE_TYPE, AUTH_RESPONSE, AUTH_STATUS_SUCCESS,
    AUTH_STEP_CONFIRMATION, AUTH_STEP_PUBLIC_KEY, AuthError, CONFIRMATION_COMMAND,
    PEER_RANDOM_SIZE, PUBLIC_KEY_PREFIX, PUBLIC_KEY_SIZE,
};
use crate::crypto::{KeyPair, PublicKey, aes_cbc_encrypt, generate_key_pair};
use crate::transport::{Message, PendingMessage};

/// Bytes following the step-1 marker: peer random, then peer public key.
const STEP_ONE_BODY_SIZE: usize = PEER_RANDOM_SIZE + PUBLIC_KEY_SIZE;

/// Handshake progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// Nothing sent yet.
    Idle,
    /// Public key announced, waiting for the band's step-1 reply.
    AwaitingPublicKeyAck,
    /// Step-1 reply is arriving; waiting for the random and the band's key.
    AwaitingRandomAndPublicKey,
    /// Confirmation sent, waiting for the band's verdict.
    AwaitingConfirmation,
    /// The band accepted the confirmation.
    Authenticated,
    /// The handshake cannot continue.
    Failed,
}

/// A message for the chunked-write characteristic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Handle for the chunk series.
    pub handle: u8,
    /// Message type for the first chunk.
    pub message_type: u16,
    /// Payload to chunk.
    pub payload: Vec<u8>,
}

/// What the caller should do after feeding a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// Chunk and write this message.
    Send(OutboundMessage),
    /// Handshake finished.
    Authenticated,
    /// Not a handshake message for the current state.
    Ignored,
}

/// Drives one handshake.
pub struct AuthMachine {
    auth_key: AuthKey,
    state: HandshakeState,
    key_pair: Option<KeyPair>,
    next_handle: u8,
    expected_bytes: usize,
}

impl AuthMachine {
    /// Create a machine that generates a fresh key pair on [`start`](Self::start).
    pub fn new(auth_key: AuthKey) -> Self {
        Self {
            auth_key,
            state: HandshakeState::Idle,
            key_pair: None,
            next_handle: 0,
            expected_bytes: 0,
        }
    }

    /// Create a machine that uses the given key pair.
    pub fn with_key_pair(auth_key: AuthKey, key_pair: KeyPair) -> Self {
        Self {
            key_pair: Some(key_pair),
            ..Self::new(auth_key)
        }
    }

    /// Current state.
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Check if the band accepted us.
    pub fn is_authenticated(&self) -> bool {
        self.state == HandshakeState::Authenticated
    }

    /// Our public key, once generated.
    pub fn public_key(&self) -> Option<&PublicKey> {
        self.key_pair.as_ref().map(KeyPair::public_key)
    }

    /// Generate the key pair if needed and build the announcement.
    pub fn start(&mut self) -> Result<OutboundMessage, AuthError> {
        if self.state != HandshakeState::Idle {
            return Err(AuthError::InvalidState("handshake already started"));
        }
        let key_pair = match self.key_pair.take() {
            Some(key_pair) => key_pair,
            None => generate_key_pair().inspect_err(|_| self.state = HandshakeState::Failed)?,
        };

        let mut payload = Vec::with_capacity(PUBLIC_KEY_PREFIX.len() + PUBLIC_KEY_SIZE);
        payload.extend_from_slice(&PUBLIC_KEY_PREFIX);
        payload.extend_from_slice(key_pair.public_key().as_bytes());
        self.key_pair = Some(key_pair);

        self.transition(HandshakeState::AwaitingPublicKeyAck);
        Ok(self.outbound(payload))
    }

    /// Inspect a step-1 reply that is still being reassembled.
    ///
    /// Moves to [`HandshakeState::AwaitingRandomAndPublicKey`] once the
    /// marker has arrived.
    pub fn observe_pending(&mut self, pending: &PendingMessage<'_>) -> Result<(), AuthError> {
        if self.state != HandshakeState::AwaitingPublicKeyAck
            || pending.message_type != AUTH_MESSAGE_TYPE
            || pending.received.len() < AUTH_MARKER_SIZE
        {
            return Ok(());
        }
        if is_reply_to(pending.received, AUTH_STEP_PUBLIC_KEY) {
            self.check_status(pending.received, AUTH_STEP_PUBLIC_KEY)?;
            self.expect_step_one_body(pending.expected);
        }
        Ok(())
    }

    /// Feed a reassembled message.
    ///
    /// Any error leaves the machine in [`HandshakeState::Failed`].
    pub fn on_message(&mut self, message: &Message) -> Result<AuthEvent, AuthError> {
        if message.message_type != AUTH_MESSAGE_TYPE {
            return Ok(AuthEvent::Ignored);
        }
        let payload = &message.payload;

        match self.state {
            HandshakeState::AwaitingPublicKeyAck | HandshakeState::AwaitingRandomAndPublicKey => {
                self.require_marker(payload)?;
                if !is_reply_to(payload, AUTH_STEP_PUBLIC_KEY) {
                    return Ok(self.unexpected(payload));
                }
                self.check_status(payload, AUTH_STEP_PUBLIC_KEY)?;
                if self.state == HandshakeState::AwaitingPublicKeyAck {
                    self.expect_step_one_body(payload.len());
                }
                let confirmation = self.confirmation(&payload[AUTH_MARKER_SIZE..])?;
                self.transition(HandshakeState::AwaitingConfirmation);
                Ok(AuthEvent::Send(self.outbound(confirmation)))
            }
            HandshakeState::AwaitingConfirmation => {
                self.require_marker(payload)?;
                if !is_reply_to(payload, AUTH_STEP_CONFIRMATION) {
                    return Ok(self.unexpected(payload));
                }
                self.check_status(payload, AUTH_STEP_CONFIRMATION)?;
                self.transition(HandshakeState::Authenticated);
                Ok(AuthEvent::Authenticated)
            }
            HandshakeState::Idle | HandshakeState::Authenticated | HandshakeState::Failed => {
                Ok(AuthEvent::Ignored)
            }
        }
    }

    fn expect_step_one_body(&mut self, declared: usize) {
        self.expected_bytes = declared.saturating_sub(AUTH_MARKER_SIZE);
        self.transition(HandshakeState::AwaitingRandomAndPublicKey);
    }

    fn confirmation(&mut self, body: &[u8]) -> Result<Vec<u8>, AuthError> {
        if body.len() != self.expected_bytes || body.len() != STEP_ONE_BODY_SIZE {
            return Err(self.fail(AuthError::MalformedPayload {
                expected: STEP_ONE_BODY_SIZE,
                actual: body.len(),
            }));
        }
        let (random, peer_public) = body.split_at(PEER_RANDOM_SIZE);

        let Some(key_pair) = self.key_pair.as_ref() else {
            return Err(self.fail(AuthError::InvalidState("no key pair")));
        };
        let proofs = PublicKey::from_slice(peer_public)
            .and_then(|peer| key_pair.diffie_hellman(&peer))
            .and_then(|secret| {
                let session_key = secret.session_key(self.auth_key.as_bytes());
                let c1 = aes_cbc_encrypt(self.auth_key.as_bytes(), random)?;
                let c2 = aes_cbc_encrypt(&session_key, random)?;
                Ok((c1, c2))
            });
        let (c1, c2) = proofs.map_err(|e| self.fail(e.into()))?;
        debug!("Derived session key from band public key");

        let mut command = Vec::with_capacity(1 + c1.len() + c2.len());
        command.push(CONFIRMATION_COMMAND);
        command.extend_from_slice(&c1);
        command.extend_from_slice(&c2);
        Ok(command)
    }

    fn require_marker(&mut self, payload: &[u8]) -> Result<(), AuthError> {
        if payload.len() < AUTH_MARKER_SIZE {
            return Err(self.fail(AuthError::MalformedPayload {
                expected: AUTH_MARKER_SIZE,
                actual: payload.len(),
            }));
        }
        Ok(())
    }

    fn check_status(&mut self, payload: &[u8], step: u8) -> Result<(), AuthError> {
        let status = payload[2];
        if status != AUTH_STATUS_SUCCESS {
            warn!("Band rejected auth step 0x{:02x} with status 0x{:02x}", step, status);
            return Err(self.fail(AuthError::Rejected { step, status }));
        }
        Ok(())
    }

    fn unexpected(&self, payload: &[u8]) -> AuthEvent {
        debug!(
            "Unhandled auth message {:02x?} in state {:?}",
            &payload[..AUTH_MARKER_SIZE],
            self.state
        );
        AuthEvent::Ignored
    }

    fn outbound(&mut self, payload: Vec<u8>) -> OutboundMessage {
        let handle = self.next_handle;
        self.next_handle = self.next_handle.wrapping_add(1);
        OutboundMessage {
            handle,
            message_type: AUTH_MESSAGE_TYPE,
            payload,
        }
    }

    fn transition(&mut self, next: HandshakeState) {
        info!("Handshake {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn fail(&mut self, error: AuthError) -> AuthError {
        warn!("Handshake failed: {}", error);
        self.state = HandshakeState::Failed;
        error
    }
}

impl std::fmt::Debug for AuthMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthMachine")
            .field("state", &self.state)
            .field("next_handle", &self.next_handle)
            .finish_non_exhaustive()
    }
}

fn is_reply_to(payload: &[u8], step: u8) -> bool {
    payload.len() >= AUTH_MARKER_SIZE && payload[0] == AUTH_RESPONSE && payload[1] == step
}
