//! Definitions of the extended message header and the extended payloads the sink handles.
//!
//! See [6.2.1.2] and [6.5].

pub mod chunked;
pub mod extended_control;

use byteorder::{ByteOrder, LittleEndian};
use proc_bitfield::bitfield;

use crate::protocol_layer::message::{ParseError, ensure_len};

/// Offset of the extended header in a frame.
pub const EXTENDED_HEADER_OFFSET: usize = 2;

bitfield! {
    /// Extended message header, directly following the message header.
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct ExtendedHeader(pub u16): Debug, FromStorage, IntoStorage {
        /// Payload size in bytes.
        pub data_size: u16 @ 0..=8,
        /// Request chunk flag.
        pub request_chunk: bool @ 10,
        /// Chunk number of this extended message.
        pub chunk_number: u8 @ 11..=14,
        /// Whether the message is chunked.
        pub chunked: bool @ 15,
    }
}

impl ExtendedHeader {
    /// Create a new, unchunked extended header for a given payload size.
    pub fn new(data_size: u16) -> Self {
        Self(0).with_data_size(data_size)
    }

    /// Serialize the extended header into the buffer, returning bytes written.
    pub fn to_bytes(self, buf: &mut [u8]) -> usize {
        LittleEndian::write_u16(buf, self.0);
        2
    }

    /// Parse an extended header from bytes.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, ParseError> {
        ensure_len(buf, 2)?;
        Ok(Self(LittleEndian::read_u16(&buf[..2])))
    }

    /// Parse the extended header of a complete frame.
    pub fn from_frame(frame: &[u8]) -> Result<Self, ParseError> {
        ensure_len(frame, EXTENDED_HEADER_OFFSET + 2)?;
        Self::from_bytes(&frame[EXTENDED_HEADER_OFFSET..])
    }
}
