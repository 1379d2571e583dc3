//! Error types for the band protocol engine.

use std::path::PathBuf;

use thiserror::Error;

use super::characteristic::CharacteristicRole;

/// Errors in the crypto layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// The OS random source could not supply bytes.
    #[error("random source failure: {0}")]
    RandomSource(String),

    /// The peer public key was rejected or the agreement degenerated.
    #[error("key agreement failed: {0}")]
    KeyAgreement(&'static str),

    /// AES input is not a whole number of blocks.
    #[error("invalid AES input length {0}: must be a multiple of 16")]
    InvalidBlockLength(usize),
}

/// A malformed inbound chunk.
///
/// Violations never end a session: the offending message is abandoned and
/// the reassembler keeps waiting for the next one.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolViolation {
    /// Frame is shorter than the header it claims to carry.
    #[error("chunk header too short: expected at least {expected} bytes, got {actual}")]
    HeaderTooShort {
        /// Minimum header size.
        expected: usize,
        /// Actual frame size.
        actual: usize,
    },

    /// First byte is not the chunked-transfer opcode.
    #[error("invalid chunk opcode: 0x{0:02x}")]
    InvalidOpcode(u8),

    /// Continuation chunk for a handle with no message in flight.
    #[error("continuation chunk {sequence} for handle {handle} without a first chunk")]
    ContinuationWithoutStart {
        /// Message handle.
        handle: u8,
        /// Sequence number received.
        sequence: u8,
    },

    /// More payload bytes arrived than the first chunk declared.
    #[error("handle {handle} overflowed: declared {expected} bytes, received {received}")]
    LengthOverflow {
        /// Message handle.
        handle: u8,
        /// Declared total length.
        expected: usize,
        /// Bytes received so far.
        received: usize,
    },
}

/// Errors raised while chunking an outbound payload.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// The MTU leaves no room for payload in the first chunk.
    #[error("mtu {mtu} too small: need at least {min}")]
    MtuTooSmall {
        /// Requested MTU.
        mtu: usize,
        /// Smallest usable MTU.
        min: usize,
    },

    /// The payload length does not fit the 32-bit length field.
    #[error("payload of {0} bytes exceeds the 32-bit length field")]
    PayloadTooLarge(usize),
}

/// Errors surfaced by a transport adapter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection could not be established or was lost.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The device does not expose a required characteristic.
    #[error("characteristic {0} not found on device")]
    CharacteristicMissing(CharacteristicRole),

    /// A characteristic write failed.
    #[error("write to {role} failed: {reason}")]
    Write {
        /// Target characteristic.
        role: CharacteristicRole,
        /// Underlying failure.
        reason: String,
    },

    /// Notifications could not be enabled.
    #[error("enabling notifications on {role} failed: {reason}")]
    Notify {
        /// Target characteristic.
        role: CharacteristicRole,
        /// Underlying failure.
        reason: String,
    },

    /// The notification channel closed.
    #[error("transport disconnected")]
    Disconnected,
}

impl TransportError {
    /// Check if this error leaves the link unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TransportError::Connection(_)
                | TransportError::CharacteristicMissing(_)
                | TransportError::Disconnected
        )
    }
}

/// Errors in the telemetry pipeline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TelemetryError {
    /// Heart-rate notification shorter than two bytes.
    #[error("heart-rate sample too short: {0} bytes")]
    SampleTooShort(usize),

    /// Sample storage could not grow.
    #[error("sample buffer exhausted growing to {requested} samples")]
    ResourceExhaustion {
        /// Capacity that was requested.
        requested: usize,
    },
}

/// Errors in the authentication state machine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Crypto primitive failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Handshake payload has the wrong size.
    #[error("malformed handshake payload: expected {expected} bytes, got {actual}")]
    MalformedPayload {
        /// Expected size.
        expected: usize,
        /// Actual size.
        actual: usize,
    },

    /// The band answered a step with a failure status.
    #[error("band rejected auth step 0x{step:02x} with status 0x{status:02x}")]
    Rejected {
        /// Step being answered.
        step: u8,
        /// Status byte.
        status: u8,
    },

    /// Operation is not valid in the current state.
    #[error("invalid handshake state: {0}")]
    InvalidState(&'static str),
}

/// Errors loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Auth key file could not be read.
    #[error("cannot read auth key file {path:?}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Auth key is not 32 hex characters.
    #[error("invalid auth key: {0}")]
    InvalidAuthKey(String),

    /// Unknown band type selector.
    #[error("unsupported band type: {0}")]
    InvalidBandType(String),

    /// Device address is not a Bluetooth MAC address.
    #[error("invalid device address: {0}")]
    InvalidAddress(String),
}

/// Top-level errors.
#[derive(Debug, Error)]
pub enum BandError {
    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Crypto error.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Handshake error.
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),

    /// Chunk encoding error.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// Protocol violation.
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),

    /// Telemetry error.
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl BandError {
    /// Check if the session can keep running after this error.
    pub fn is_recoverable(&self) -> bool {
        match self {
            BandError::Protocol(_) | BandError::Telemetry(_) => true,
            BandError::Transport(e) => !e.is_fatal(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_transport_errors() {
        assert!(TransportError::Disconnected.is_fatal());
        assert!(TransportError::Connection("gone".into()).is_fatal());
        assert!(TransportError::CharacteristicMissing(CharacteristicRole::ChunkedRead).is_fatal());

        let write = TransportError::Write {
            role: CharacteristicRole::Alert,
            reason: "busy".into(),
        };
        assert!(!write.is_fatal());
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(BandError::from(ProtocolViolation::InvalidOpcode(0x01)).is_recoverable());
        assert!(BandError::from(TelemetryError::SampleTooShort(1)).is_recoverable());
        assert!(!BandError::from(CryptoError::KeyAgreement("off curve")).is_recoverable());
        assert!(!BandError::from(TransportError::Disconnected).is_recoverable());
    }

    #[test]
    fn test_auth_error_from_crypto() {
        let err: AuthError = CryptoError::InvalidBlockLength(3).into();
        assert_eq!(err, AuthError::Crypto(CryptoError::InvalidBlockLength(3)));
    }
}
