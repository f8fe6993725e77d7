//! Definitions of frame content.
//!
//! Frames are handled as raw byte buffers. The types in this module encode and decode the
//! individual fields at their documented bit positions.
pub mod extended;
#[allow(missing_docs)]
pub mod header;
pub mod pdo;
#[allow(missing_docs)]
pub mod request;

/// Maximum length of a frame in bytes, header and payload, without CRC.
pub const MAX_FRAME_LEN: usize = 34;

/// Minimum length of a frame to be sent (a bare header).
pub const MIN_FRAME_LEN: usize = 2;

/// Minimum length of a received frame (header and CRC).
pub const MIN_RX_LEN: usize = 6;

/// Length of the CRC that trails received frames.
pub const CRC_LEN: usize = 4;

/// Length of a single data object.
pub const DATA_OBJECT_LEN: usize = 4;

/// An owned frame.
pub type Frame = heapless::Vec<u8, MAX_FRAME_LEN>;

/// Errors that can occur during header parsing.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// The input buffer has an invalid length.
    /// * `expected` - The minimum expected length.
    /// * `found` - The actual length found.
    #[error("invalid input buffer length (expected {expected:?}, found {found:?})")]
    InvalidLength {
        /// The minimum expected length.
        expected: usize,
        /// The actual length found.
        found: usize,
    },
    /// The specification revision field is not supported.
    #[error("unsupported specification revision `{0}`")]
    UnsupportedSpecificationRevision(u8),
    /// An unknown or reserved extended control message type was encountered.
    #[error("unknown or reserved extended control message type `{0}`")]
    InvalidExtendedControlType(u8),
}

/// Check that a buffer holds at least `expected` bytes.
pub(crate) fn ensure_len(buf: &[u8], expected: usize) -> Result<(), ParseError> {
    if buf.len() < expected {
        Err(ParseError::InvalidLength {
            expected,
            found: buf.len(),
        })
    } else {
        Ok(())
    }
}
