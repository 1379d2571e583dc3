//! Band authentication.
//!
//! [`AuthMachine`] runs the ECDH + AES handshake as a pure state machine. It
//! is fed reassembled chunked-read messages and returns the messages to
//! write, so it can be driven without a radio.

mod machine;

#[cfg(test)]
pub(crate) mod sim;

pub use machine::*;
