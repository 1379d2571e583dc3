//! Protocol constants for the Mi Band chunked-transfer and auth protocol.
//!
//! These values are fixed by the band firmware and MUST NOT be changed.

use std::time::Duration;

// =============================================================================
// CRYPTOGRAPHIC CONSTANTS
// =============================================================================

/// Size of one serialized B-163 field element (tiny-ECDH layout).
pub const FIELD_ELEMENT_SIZE: usize = 24;

/// B-163 private scalar size.
pub const PRIVATE_KEY_SIZE: usize = FIELD_ELEMENT_SIZE;

/// B-163 public key size (`x || y`).
pub const PUBLIC_KEY_SIZE: usize = 2 * FIELD_ELEMENT_SIZE;

/// B-163 shared secret size (`x || y` of the agreed point).
pub const SHARED_SECRET_SIZE: usize = 2 * FIELD_ELEMENT_SIZE;

/// Static auth key size (AES-128).
pub const AUTH_KEY_SIZE: usize = 16;

/// AES block size.
pub const AES_BLOCK_SIZE: usize = 16;

/// Size of the peer random nonce in the step-1 response.
pub const PEER_RANDOM_SIZE: usize = 16;

/// Byte range of the shared secret mixed into the derived session key.
pub const SESSION_KEY_SECRET_OFFSET: usize = 8;

// =============================================================================
// CHUNKED TRANSFER (wire format)
// =============================================================================

/// Opcode byte that starts every chunk.
pub const CHUNK_OPCODE: u8 = 0x03;

/// Flag set on the first chunk of a message.
pub const FLAG_FIRST: u8 = 0x01;

/// Flags set on the last chunk of a message.
pub const FLAG_LAST: u8 = 0x06;

/// First chunk header size (opcode, flags, reserved, handle, seq, len, type).
pub const FIRST_HEADER_SIZE: usize = 11;

/// Continuation chunk header size (opcode, flags, reserved, handle, seq).
pub const CONTINUATION_HEADER_SIZE: usize = 5;

/// ATT overhead subtracted from the MTU for every write.
pub const ATT_OVERHEAD: usize = 3;

/// MTU the band uses unless a larger one is negotiated.
pub const DEFAULT_MTU: usize = 23;

/// Smallest MTU that still leaves a payload byte in the first chunk.
pub const MIN_MTU: usize = ATT_OVERHEAD + FIRST_HEADER_SIZE + 1;

// =============================================================================
// AUTHENTICATION
// =============================================================================

/// Message type used by every auth message (wire bytes `[0x82, 0x00]`).
pub const AUTH_MESSAGE_TYPE: u16 = 0x0082;

/// Prefix of the public key announcement.
pub const PUBLIC_KEY_PREFIX: [u8; 4] = [0x04, 0x02, 0x00, 0x02];

/// Command byte leading the confirmation message.
pub const CONFIRMATION_COMMAND: u8 = 0x05;

/// Response opcode that leads every auth reply from the band.
pub const AUTH_RESPONSE: u8 = 0x10;

/// Command echoed in the reply to the public key announcement.
pub const AUTH_STEP_PUBLIC_KEY: u8 = 0x04;

/// Command echoed in the reply to the confirmation.
pub const AUTH_STEP_CONFIRMATION: u8 = 0x05;

/// Status byte reporting success.
pub const AUTH_STATUS_SUCCESS: u8 = 0x01;

/// Length of the `[response, step, status]` reply marker.
pub const AUTH_MARKER_SIZE: usize = 3;

// =============================================================================
// HEART RATE & ALERTS
// =============================================================================

/// Starts continuous heart-rate measurement.
pub const HR_CONTINUOUS_START: [u8; 3] = [0x15, 0x01, 0x01];

/// Sets the measurement interval.
pub const HR_SET_INTERVAL: [u8; 3] = [0x14, 0x00, 0x01];

/// Alert characteristic payload (incoming-call style vibration).
pub const ALERT_PAYLOAD: [u8; 5] = [0x03, 0x01, 0x0a, 0x0a, 0x0a];

/// Initial telemetry buffer capacity.
pub const INITIAL_SAMPLE_CAPACITY: usize = 1000;

/// Samples required before alerts are considered.
pub const ALERT_MIN_SAMPLES: usize = 61;

/// How far below the running mean (bpm) a sample must fall to alert.
pub const ALERT_DROP_BPM: f64 = 10.0;

// =============================================================================
// TIMING
// =============================================================================

/// Interval between "continue measurement" keep-alive writes.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(10);
