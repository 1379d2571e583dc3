//! Reassembly of inbound chunk series into complete messages.
//!
//! One partial message is tracked per handle. Completion is decided by byte
//! count against the length the first chunk declared; the LAST flag is only
//! cross-checked. Sequence gaps are reported but tolerated, matching what the
//! band firmware expects from its peers.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::chunk::ChunkHeader;
use crate::core::ProtocolViolation;

/// Upper bound on the buffer reserved up front from a declared length.
const MAX_PREALLOCATION: usize = 4096;

/// A fully reassembled message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Handle the message arrived under.
    pub handle: u8,
    /// Message type from the first chunk.
    pub message_type: u16,
    /// Reassembled payload.
    pub payload: Vec<u8>,
}

/// Result of feeding one chunk to the [`Reassembler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// More chunks are needed.
    AwaitingMore {
        /// Message handle.
        handle: u8,
        /// Payload bytes received so far.
        received: usize,
        /// Payload bytes declared by the first chunk.
        expected: usize,
    },
    /// The message is complete.
    Complete(Message),
    /// The chunk's sequence number did not follow the previous one.
    ///
    /// Its bytes were still accepted; `completed` carries the message if
    /// they finished it.
    SequenceGap {
        /// Message handle.
        handle: u8,
        /// Sequence number that was due.
        expected: u8,
        /// Sequence number received.
        received: u8,
        /// Message completed by this chunk, if any.
        completed: Option<Message>,
    },
}

impl FrameOutcome {
    /// Take the completed message, if this outcome carries one.
    pub fn into_message(self) -> Option<Message> {
        match self {
            FrameOutcome::Complete(message) => Some(message),
            FrameOutcome::SequenceGap { completed, .. } => completed,
            FrameOutcome::AwaitingMore { .. } => None,
        }
    }
}

/// View of a message still in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingMessage<'a> {
    /// Message type from the first chunk.
    pub message_type: u16,
    /// Payload bytes declared by the first chunk.
    pub expected: usize,
    /// Payload bytes received so far.
    pub received: &'a [u8],
}

/// Scratch state for a message still in flight.
#[derive(Debug)]
struct PartialMessage {
    message_type: u16,
    expected: usize,
    buffer: Vec<u8>,
    last_sequence: u8,
}

/// Reassembles chunk series, keyed by handle.
#[derive(Debug, Default)]
pub struct Reassembler {
    in_flight: HashMap<u8, PartialMessage>,
}

impl Reassembler {
    /// Create an empty reassembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages currently being reassembled.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// `(received, expected)` byte counts for a handle in flight.
    pub fn progress(&self, handle: u8) -> Option<(usize, usize)> {
        self.in_flight
            .get(&handle)
            .map(|partial| (partial.buffer.len(), partial.expected))
    }

    /// Peek at the bytes gathered so far for a handle.
    pub fn pending(&self, handle: u8) -> Option<PendingMessage<'_>> {
        self.in_flight.get(&handle).map(|partial| PendingMessage {
            message_type: partial.message_type,
            expected: partial.expected,
            received: &partial.buffer,
        })
    }

    /// Drop every partial message.
    pub fn reset(&mut self) {
        self.in_flight.clear();
    }

    /// Feed one inbound chunk.
    ///
    /// A frame with a foreign opcode is rejected without touching any state.
    /// An undersized header abandons the in-flight message of its handle.
    pub fn ingest_frame(&mut self, frame: &[u8]) -> Result<FrameOutcome, ProtocolViolation> {
        let (header, body) = match ChunkHeader::parse(frame) {
            Ok(parsed) => parsed,
            Err(violation @ ProtocolViolation::HeaderTooShort { .. }) => {
                if let Some(&handle) = frame.get(3) {
                    if self.in_flight.remove(&handle).is_some() {
                        warn!("Abandoning message on handle {} after short header", handle);
                    }
                }
                return Err(violation);
            }
            Err(violation) => return Err(violation),
        };

        debug!(
            "Chunk handle={} seq={} flags=0x{:02x} payload={} bytes",
            header.handle,
            header.sequence,
            header.flags.as_byte(),
            body.len()
        );

        let handle = header.handle;
        let gap = match header.start {
            Some(start) => {
                if self.in_flight.contains_key(&handle) {
                    warn!("New message on handle {} replaces an unfinished one", handle);
                }
                let expected = start.total_length as usize;
                self.in_flight.insert(
                    handle,
                    PartialMessage {
                        message_type: start.message_type,
                        expected,
                        buffer: Vec::with_capacity(expected.min(MAX_PREALLOCATION)),
                        last_sequence: header.sequence,
                    },
                );
                (header.sequence != 0).then_some(0)
            }
            None => {
                let partial = self.in_flight.get_mut(&handle).ok_or(
                    ProtocolViolation::ContinuationWithoutStart {
                        handle,
                        sequence: header.sequence,
                    },
                )?;
                let due = partial.last_sequence.wrapping_add(1);
                partial.last_sequence = header.sequence;
                (header.sequence != due).then_some(due)
            }
        };

        if let Some(due) = gap {
            warn!(
                "Unexpected sequence number on handle {}: expected {}, got {}",
                handle, due, header.sequence
            );
        }

        let outcome = self.append(handle, body, header.flags.is_last())?;

        Ok(match gap {
            Some(expected) => FrameOutcome::SequenceGap {
                handle,
                expected,
                received: header.sequence,
                completed: outcome.into_message(),
            },
            None => outcome,
        })
    }

    fn append(
        &mut self,
        handle: u8,
        body: &[u8],
        last_flag: bool,
    ) -> Result<FrameOutcome, ProtocolViolation> {
        let Some(partial) = self.in_flight.get_mut(&handle) else {
            return Err(ProtocolViolation::ContinuationWithoutStart { handle, sequence: 0 });
        };

        let received = partial.buffer.len() + body.len();
        if received > partial.expected {
            let expected = partial.expected;
            self.in_flight.remove(&handle);
            return Err(ProtocolViolation::LengthOverflow {
                handle,
                expected,
                received,
            });
        }
        partial.buffer.extend_from_slice(body);

        if received < partial.expected {
            if last_flag {
                warn!(
                    "Last chunk on handle {} arrived with {} of {} bytes",
                    handle, received, partial.expected
                );
            }
            return Ok(FrameOutcome::AwaitingMore {
                handle,
                received,
                expected: partial.expected,
            });
        }

        let Some(partial) = self.in_flight.remove(&handle) else {
            return Err(ProtocolViolation::ContinuationWithoutStart { handle, sequence: 0 });
        };
        debug!(
            "Reassembled message type=0x{:04x} on handle {} ({} bytes)",
            partial.message_type, handle, received
        );
        Ok(FrameOutcome::Complete(Message {
            handle,
            message_type: partial.message_type,
            payload: partial.buffer,
        }))
    }
}
