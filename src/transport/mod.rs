//! Chunked transfer over GATT.
//!
//! The band moves messages larger than one ATT write as a series of chunks.
//! This module provides:
//!
//! - **Chunk encoding**: [`encode_chunks`] splits a payload for a given MTU
//! - **Header parsing**: [`ChunkHeader`] with the first/continuation layouts
//! - **Reassembly**: [`Reassembler`] rebuilds messages per handle
//!
//! # Wire format
//!
//! ```text
//! first:        03 | flags | 00 | handle | seq | len (u32 LE) | type (u16 LE) | payload
//! continuation: 03 | flags | 00 | handle | seq | payload
//! ```
//!
//! `flags` carries `0x01` on the first chunk and `0x06` on the last one; a
//! single-chunk message carries both.

mod chunk;
mod reassembly;

pub use chunk::*;
pub use reassembly::*;
