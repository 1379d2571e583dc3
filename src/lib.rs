//! # miband-link
//!
//! Protocol engine for heart-rate monitoring with Mi Band 6/7 bands over a
//! BLE GATT link. It provides:
//!
//! - **Chunked transfer**: fragmentation and reassembly of messages larger
//!   than one ATT write
//! - **Authentication**: the band's ECDH (B-163) + AES-128-CBC handshake
//! - **Telemetry**: heart-rate ingest, a growable sample buffer and
//!   drop alerts against the running mean
//! - **Session**: a single-task async driver tying the above to a transport
//!
//! ## Feature Flags
//!
//! - `crypto` (default): key agreement, AES proofs, configuration and the
//!   handshake state machine
//! - `session` (default): async [`session::Session`] and driver (tokio)
//! - `bluez`: [`ble::BluezTransport`] over BlueZ/D-Bus (Linux only)
//!
//! ## Modules
//!
//! - [`core`]: constants, error types, characteristic roles and the
//!   [`Transport`](core::Transport) seam (always included)
//! - [`transport`]: chunk codec and reassembly (always included)
//! - [`telemetry`]: sample decoding, storage and alerting (always included)
//! - [`crypto`], [`config`], [`auth`]: require `crypto`
//! - [`session`]: requires `session`
//! - [`ble`]: requires `bluez`
//!
//! ## Example Usage
//!
//! ```rust
//! use miband_link::prelude::*;
//!
//! let payload = [0xAB; 52];
//! let frames: Vec<Vec<u8>> = encode_chunks(0, AUTH_MESSAGE_TYPE, &payload, DEFAULT_MTU)
//!     .unwrap()
//!     .collect();
//! assert_eq!(frames.len(), 4);
//!
//! let mut reassembler = Reassembler::new();
//! let mut message = None;
//! for frame in &frames {
//!     message = reassembler.ingest_frame(frame).unwrap().into_message();
//! }
//! assert_eq!(message.unwrap().payload, payload);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

// Chunked transfer (always included)
pub mod transport;

// Telemetry (always included)
pub mod telemetry;

// Crypto layer (feature-gated)
#[cfg(feature = "crypto")]
#[cfg_attr(docsrs, doc(cfg(feature = "crypto")))]
pub mod crypto;

// Configuration (feature-gated)
#[cfg(feature = "crypto")]
#[cfg_attr(docsrs, doc(cfg(feature = "crypto")))]
pub mod config;

// Authentication (feature-gated)
#[cfg(feature = "crypto")]
#[cfg_attr(docsrs, doc(cfg(feature = "crypto")))]
pub mod auth;

// Session and driver (feature-gated)
#[cfg(feature = "session")]
#[cfg_attr(docsrs, doc(cfg(feature = "session")))]
pub mod session;

// BlueZ transport (feature-gated)
#[cfg(feature = "bluez")]
#[cfg_attr(docsrs, doc(cfg(feature = "bluez")))]
pub mod ble;

/// Prelude module for convenient imports.
pub mod prelude {
    // Core traits and types
    pub use crate::core::*;

    // Chunked transfer and telemetry
    pub use crate::telemetry::{HeartRateSample, Ingested, SampleBuffer, TelemetryEngine};
    pub use crate::transport::{
        ChunkHeader, FrameOutcome, Message, PendingMessage, Reassembler, encode_chunks,
    };

    // Crypto, configuration and handshake (when enabled)
    #[cfg(feature = "crypto")]
    pub use crate::auth::{AuthEvent, AuthMachine, HandshakeState, OutboundMessage};
    #[cfg(feature = "crypto")]
    pub use crate::config::{AuthKey, BandConfig, BandType, SessionConfig};
    #[cfg(feature = "crypto")]
    pub use crate::crypto::*;

    // Session (when enabled)
    #[cfg(feature = "session")]
    pub use crate::session::{Session, SessionObserver, run};

    // BlueZ transport (when enabled)
    #[cfg(feature = "bluez")]
    pub use crate::ble::BluezTransport;
}

// Re-export commonly used items at crate root
pub use core::{BandError, CharacteristicRole, Notification, Transport};

#[cfg(feature = "session")]
pub use session::{Session, SessionObserver};
