//! Definitions of extended control message content.
//!
//! See [6.5.14].

use byteorder::{ByteOrder, LittleEndian};
use proc_bitfield::bitfield;

use super::ExtendedHeader;
use crate::protocol_layer::message::header::{ExtendedMessageType, Header, MessageType, SpecificationRevision};
use crate::protocol_layer::message::{ParseError, ensure_len};

/// Length of an extended control frame: header, extended header and the two byte payload.
pub const EXTENDED_CONTROL_FRAME_LEN: usize = 6;

/// Types of extended control message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ExtendedControlMessageType {
    /// Get capabilities offered by a source in EPR mode.
    EprGetSourceCap,
    /// Get capabilities offered by a sink in EPR mode.
    EprGetSinkCap,
    /// Periodic traffic of a sink operating in EPR mode.
    EprKeepAlive,
    /// Answer of a source in EPR mode to [`Self::EprKeepAlive`].
    EprKeepAliveAck,
}

impl From<ExtendedControlMessageType> for u8 {
    fn from(value: ExtendedControlMessageType) -> Self {
        match value {
            ExtendedControlMessageType::EprGetSourceCap => 1,
            ExtendedControlMessageType::EprGetSinkCap => 2,
            ExtendedControlMessageType::EprKeepAlive => 3,
            ExtendedControlMessageType::EprKeepAliveAck => 4,
        }
    }
}

impl TryFrom<u8> for ExtendedControlMessageType {
    type Error = ParseError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ExtendedControlMessageType::EprGetSourceCap),
            2 => Ok(ExtendedControlMessageType::EprGetSinkCap),
            3 => Ok(ExtendedControlMessageType::EprKeepAlive),
            4 => Ok(ExtendedControlMessageType::EprKeepAliveAck),
            _ => Err(ParseError::InvalidExtendedControlType(value)),
        }
    }
}

bitfield!(
    /// The extended control message extends the control message space.
    ///
    /// Includes one byte of data.
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct ExtendedControl(pub u16): Debug, FromStorage, IntoStorage {
        /// Payload, shall be set to zero when not used.
        pub data: u8 @ 8..=15,
        /// The raw extended control message type.
        pub message_type_raw: u8 @ 0..=7,
    }
);

impl ExtendedControl {
    /// Create an extended control message of the given type.
    pub fn new(message_type: ExtendedControlMessageType) -> Self {
        Self(0).with_message_type_raw(message_type.into())
    }

    /// The extended control message type, if known.
    pub fn message_type(&self) -> Result<ExtendedControlMessageType, ParseError> {
        ExtendedControlMessageType::try_from(self.message_type_raw())
    }

    /// Store the extended control message in a binary buffer, returning the written size in number of bytes.
    pub fn to_bytes(self, buf: &mut [u8]) -> usize {
        LittleEndian::write_u16(buf, self.0);
        2
    }

    /// Parse an extended control message from bytes.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, ParseError> {
        ensure_len(buf, 2)?;
        Ok(Self(LittleEndian::read_u16(&buf[..2])))
    }

    /// Build a complete extended control frame.
    ///
    /// The payload goes out as a single chunk, so the extended header is marked chunked.
    pub fn build_frame(self, spec_revision: SpecificationRevision) -> [u8; EXTENDED_CONTROL_FRAME_LEN] {
        let mut frame = [0u8; EXTENDED_CONTROL_FRAME_LEN];
        Header::new_sink(MessageType::Extended(ExtendedMessageType::ExtendedControl), 1, spec_revision)
            .to_bytes(&mut frame[..2]);
        ExtendedHeader::new(2).with_chunked(true).to_bytes(&mut frame[2..4]);
        self.to_bytes(&mut frame[4..]);
        frame
    }
}
