//! Chunked extended message support.
//!
//! Extended messages that exceed a single frame are split into chunks of up to 26 bytes. The
//! receiver asks for each further chunk with a chunk request.
//!
//! See [6.12.2.1].

use super::ExtendedHeader;
use crate::protocol_layer::message::header::{ExtendedMessageType, Header, MessageType, SpecificationRevision};

/// Length of a chunk request frame: header, extended header and two padding bytes.
pub const CHUNK_REQUEST_LEN: usize = 6;

/// Where a received frame sits in a chunked transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChunkKind {
    /// Not chunked.
    Unchunked,
    /// A request from the partner for the given chunk.
    Request(u8),
    /// The given chunk of payload data.
    Data(u8),
}

impl From<ExtendedHeader> for ChunkKind {
    fn from(header: ExtendedHeader) -> Self {
        match (header.chunked(), header.request_chunk()) {
            (false, _) => ChunkKind::Unchunked,
            (true, true) => ChunkKind::Request(header.chunk_number()),
            (true, false) => ChunkKind::Data(header.chunk_number()),
        }
    }
}

/// Build an extended header for requesting a specific chunk.
pub fn build_chunk_request_header(chunk_number: u8) -> ExtendedHeader {
    ExtendedHeader::new(0)
        .with_chunked(true)
        .with_request_chunk(true)
        .with_chunk_number(chunk_number)
}

/// Build a complete chunk request frame for an extended message type.
///
/// The data block (extended header plus data) is padded to a four byte boundary.
pub fn build_chunk_request(
    message_type: ExtendedMessageType,
    chunk_number: u8,
    spec_revision: SpecificationRevision,
) -> [u8; CHUNK_REQUEST_LEN] {
    let mut frame = [0u8; CHUNK_REQUEST_LEN];
    Header::new_sink(MessageType::Extended(message_type), 1, spec_revision).to_bytes(&mut frame[..2]);
    build_chunk_request_header(chunk_number).to_bytes(&mut frame[2..4]);
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_request_for_second_epr_capabilities_chunk() {
        let frame = build_chunk_request(ExtendedMessageType::EprSourceCapabilities, 1, SpecificationRevision::R3_X);
        assert_eq!(frame, [0x91, 0x90, 0x00, 0x8C, 0x00, 0x00]);
    }

    #[test]
    fn classify_chunks() {
        assert_eq!(ChunkKind::from(build_chunk_request_header(1)), ChunkKind::Request(1));
        assert_eq!(
            ChunkKind::from(ExtendedHeader::new(26).with_chunked(true).with_chunk_number(1)),
            ChunkKind::Data(1)
        );
        assert_eq!(ChunkKind::from(ExtendedHeader::new(2)), ChunkKind::Unchunked);
    }
}
