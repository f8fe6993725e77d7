//! Bounded history of captured frames.
//!
//! The ring is lossy: when it is full, recording a new frame drops the oldest unread one, so the
//! receive path never blocks on a slow reader.
pub mod format;

use heapless::{Deque, Vec};
use usbpd_monitor_traits::Sop;

use crate::protocol_layer::message::MAX_FRAME_LEN;

/// Capacity of the ring on the reference design.
pub const DEFAULT_CAPACITY: usize = 16;

/// What kind of event a captured entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CaptureStatus {
    /// Start-of-packet variant, if the PHY could tell.
    pub sop: Option<Sop>,
    /// The entry marks a receiver reset instead of a frame.
    pub rx_reset: bool,
}

impl CaptureStatus {
    /// A frame with the given start-of-packet.
    pub fn frame(sop: Option<Sop>) -> Self {
        Self { sop, rx_reset: false }
    }

    /// A receiver reset.
    pub fn rx_reset(sop: Option<Sop>) -> Self {
        Self { sop, rx_reset: true }
    }
}

/// A single ring entry.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CapturedMessage {
    /// Sequence number, starting at 1 after each counter reset.
    pub sequence: u32,
    /// Capture time in milliseconds.
    pub timestamp_ms: u32,
    /// Raw VBUS sample at capture time.
    pub vbus_raw: u16,
    /// Kind of entry.
    pub status: CaptureStatus,
    /// Frame bytes as seen on the wire. Received frames include their CRC.
    pub data: Vec<u8, MAX_FRAME_LEN>,
}

/// Fixed-capacity ring of captured frames.
#[derive(Debug)]
pub struct MessageRing<const N: usize> {
    entries: Deque<CapturedMessage, N>,
    counter: u32,
}

impl<const N: usize> Default for MessageRing<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> MessageRing<N> {
    /// Create an empty ring.
    pub const fn new() -> Self {
        Self {
            entries: Deque::new(),
            counter: 0,
        }
    }

    /// Record an entry, dropping the oldest one if the ring is full.
    ///
    /// Bytes beyond [`MAX_FRAME_LEN`] are cut off. Returns the sequence number of the new entry.
    pub fn record(&mut self, status: CaptureStatus, bytes: &[u8], timestamp_ms: u32, vbus_raw: u16) -> u32 {
        self.counter = self.counter.wrapping_add(1);

        let len = bytes.len().min(MAX_FRAME_LEN);
        let mut data = Vec::new();
        // Cannot fail, the length is bounded by the capacity.
        let _ = data.extend_from_slice(&bytes[..len]);

        let message = CapturedMessage {
            sequence: self.counter,
            timestamp_ms,
            vbus_raw,
            status,
            data,
        };

        if self.entries.is_full() {
            self.entries.pop_front();
        }
        // There is room after dropping the oldest entry.
        let _ = self.entries.push_back(message);

        self.counter
    }

    /// Take the oldest unread entry.
    pub fn pop(&mut self) -> Option<CapturedMessage> {
        self.entries.pop_front()
    }

    /// Drop all unread entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Restart sequence numbering at 1.
    pub fn reset_counter(&mut self) {
        self.counter = 0;
    }

    /// Number of unread entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no unread entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over unread entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &CapturedMessage> {
        self.entries.iter()
    }
}
