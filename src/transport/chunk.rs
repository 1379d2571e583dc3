//! Chunk encoding for the chunked-transfer characteristic.
//!
//! Wire format of the first chunk (11-byte header):
//! ```text
//! +--------+--------+----------+--------+--------+------------------+-----------------+
//! | Opcode | Flags  | Reserved | Handle | Seq=0  | Total length     | Message type    |
//! | 0x03   | 1 byte | 0x00     | 1 byte | 1 byte | 4 bytes (LE32)   | 2 bytes (LE16)  |
//! +--------+--------+----------+--------+--------+------------------+-----------------+
//! ```
//!
//! Continuation chunks carry only the first five bytes. Every chunk is written
//! as one ATT write, so a chunk never exceeds `mtu - 3` bytes.

use crate::core::{
    ATT_OVERHEAD, CHUNK_OPCODE, CONTINUATION_HEADER_SIZE, EncodeError, FIRST_HEADER_SIZE,
    FLAG_FIRST, FLAG_LAST, MIN_MTU, ProtocolViolation,
};

/// Chunk flags byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChunkFlags(u8);

impl ChunkFlags {
    /// No flags set.
    pub const NONE: Self = Self(0);
    /// First chunk of a message.
    pub const FIRST: Self = Self(FLAG_FIRST);
    /// Last chunk of a message.
    pub const LAST: Self = Self(FLAG_LAST);

    /// Create flags from a raw byte.
    pub fn from_byte(byte: u8) -> Self {
        Self(byte)
    }

    /// Get the raw byte value.
    pub fn as_byte(self) -> u8 {
        self.0
    }

    /// Check if the FIRST flag is set.
    pub fn is_first(self) -> bool {
        self.0 & FLAG_FIRST != 0
    }

    /// Check if the LAST flag is set.
    pub fn is_last(self) -> bool {
        self.0 & 0x02 != 0
    }

    /// Set FIRST flag.
    pub fn with_first(self) -> Self {
        Self(self.0 | FLAG_FIRST)
    }

    /// Set LAST flags.
    pub fn with_last(self) -> Self {
        Self(self.0 | FLAG_LAST)
    }
}

/// Fields only the first chunk of a message carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageStart {
    /// Payload bytes across all chunks of the message.
    pub total_length: u32,
    /// Message type.
    pub message_type: u16,
}

/// Parsed chunk header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    /// Chunk flags.
    pub flags: ChunkFlags,
    /// Sender-chosen message handle.
    pub handle: u8,
    /// Position of this chunk within its message (wraps).
    pub sequence: u8,
    /// Length and type, present on the first chunk only.
    pub start: Option<MessageStart>,
}

impl ChunkHeader {
    /// Header size on the wire.
    pub fn size(&self) -> usize {
        if self.start.is_some() {
            FIRST_HEADER_SIZE
        } else {
            CONTINUATION_HEADER_SIZE
        }
    }

    /// Append the header bytes to `buf`.
    pub fn write_to(&self, buf: &mut Vec<u8>) {
        buf.push(CHUNK_OPCODE);
        buf.push(self.flags.as_byte());
        buf.push(0x00);
        buf.push(self.handle);
        buf.push(self.sequence);
        if let Some(start) = self.start {
            buf.extend_from_slice(&start.total_length.to_le_bytes());
            buf.extend_from_slice(&start.message_type.to_le_bytes());
        }
    }

    /// Parse a chunk, returning its header and payload bytes.
    pub fn parse(frame: &[u8]) -> Result<(Self, &[u8]), ProtocolViolation> {
        let Some(&opcode) = frame.first() else {
            return Err(ProtocolViolation::HeaderTooShort {
                expected: CONTINUATION_HEADER_SIZE,
                actual: 0,
            });
        };
        if opcode != CHUNK_OPCODE {
            return Err(ProtocolViolation::InvalidOpcode(opcode));
        }
        if frame.len() < CONTINUATION_HEADER_SIZE {
            return Err(ProtocolViolation::HeaderTooShort {
                expected: CONTINUATION_HEADER_SIZE,
                actual: frame.len(),
            });
        }

        let flags = ChunkFlags::from_byte(frame[1]);
        let handle = frame[3];
        let sequence = frame[4];

        if !flags.is_first() {
            let header = Self {
                flags,
                handle,
                sequence,
                start: None,
            };
            return Ok((header, &frame[CONTINUATION_HEADER_SIZE..]));
        }

        if frame.len() < FIRST_HEADER_SIZE {
            return Err(ProtocolViolation::HeaderTooShort {
                expected: FIRST_HEADER_SIZE,
                actual: frame.len(),
            });
        }
        let total_length = u32::from_le_bytes([frame[5], frame[6], frame[7], frame[8]]);
        let message_type = u16::from_le_bytes([frame[9], frame[10]]);

        let header = Self {
            flags,
            handle,
            sequence,
            start: Some(MessageStart {
                total_length,
                message_type,
            }),
        };
        Ok((header, &frame[FIRST_HEADER_SIZE..]))
    }
}

/// Payload bytes that fit in the first chunk for a given MTU.
pub fn first_chunk_capacity(mtu: usize) -> usize {
    mtu.saturating_sub(ATT_OVERHEAD + FIRST_HEADER_SIZE)
}

/// Payload bytes that fit in a continuation chunk for a given MTU.
pub fn continuation_capacity(mtu: usize) -> usize {
    mtu.saturating_sub(ATT_OVERHEAD + CONTINUATION_HEADER_SIZE)
}

/// Number of chunks a payload of `len` bytes needs.
///
/// Fails like [`encode_chunks`] when `mtu` leaves no room for payload.
pub fn chunk_count(len: usize, mtu: usize) -> Result<usize, EncodeError> {
    if mtu < MIN_MTU {
        return Err(EncodeError::MtuTooSmall { mtu, min: MIN_MTU });
    }
    let first = first_chunk_capacity(mtu);
    if len <= first {
        return Ok(1);
    }
    Ok(1 + (len - first).div_ceil(continuation_capacity(mtu)))
}

/// Lazy chunk iterator over one outbound message.
///
/// Created by [`encode_chunks`]. Chunks must be written in the order they
/// are yielded.
#[derive(Debug, Clone)]
pub struct ChunkEncoder<'a> {
    handle: u8,
    message_type: u16,
    payload: &'a [u8],
    mtu: usize,
    offset: usize,
    sequence: u8,
    started: bool,
    done: bool,
}

impl ChunkEncoder<'_> {
    /// Handle this message is sent under.
    pub fn handle(&self) -> u8 {
        self.handle
    }
}

impl Iterator for ChunkEncoder<'_> {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let first = !self.started;
        let capacity = if first {
            first_chunk_capacity(self.mtu)
        } else {
            continuation_capacity(self.mtu)
        };
        let remaining = self.payload.len() - self.offset;
        let take = remaining.min(capacity);
        let last = remaining <= capacity;

        let mut flags = ChunkFlags::NONE;
        if first {
            flags = flags.with_first();
        }
        if last {
            flags = flags.with_last();
        }

        let header = ChunkHeader {
            flags,
            handle: self.handle,
            sequence: self.sequence,
            start: first.then(|| MessageStart {
                total_length: self.payload.len() as u32,
                message_type: self.message_type,
            }),
        };

        let mut chunk = Vec::with_capacity(header.size() + take);
        header.write_to(&mut chunk);
        chunk.extend_from_slice(&self.payload[self.offset..self.offset + take]);

        self.offset += take;
        self.sequence = self.sequence.wrapping_add(1);
        self.started = true;
        self.done = last;

        Some(chunk)
    }
}

/// Split a payload into MTU-bounded chunks.
///
/// An empty payload yields a single header-only chunk so the peer still sees
/// the message.
pub fn encode_chunks(
    handle: u8,
    message_type: u16,
    payload: &[u8],
    mtu: usize,
) -> Result<ChunkEncoder<'_>, EncodeError> {
    if mtu < MIN_MTU {
        return Err(EncodeError::MtuTooSmall { mtu, min: MIN_MTU });
    }
    if u32::try_from(payload.len()).is_err() {
        return Err(EncodeError::PayloadTooLarge(payload.len()));
    }

    Ok(ChunkEncoder {
        handle,
        message_type,
        payload,
        mtu,
        offset: 0,
        sequence: 0,
        started: false,
        done: false,
    })
}
