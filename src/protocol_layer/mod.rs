//! The protocol layer sits between the PHY and the sink logic.
//!
//! Handles
//! - GoodCRC acknowledgement of received frames,
//! - header patching of outgoing frames (power role, revision, message ID),
//! - the single pending transmit slot,
//! - capturing every frame on the wire into the message ring.
//!
//! All entry points are called from the PHY interrupt, except for the session lifecycle, which the
//! poll loop drives.
pub mod message;

use message::header::{Header, SpecificationRevision};
use message::{Frame, MAX_FRAME_LEN, MIN_FRAME_LEN};
use usbpd_monitor_traits::{DriverTxError, Phy, Sop};

use crate::PowerRole;
use crate::capture::{CaptureStatus, CapturedMessage, MessageRing};
use crate::sink::session::SinkSession;
use crate::sink::{FrameSender, SessionQuery};

/// Errors that can occur when submitting a frame.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SendError {
    /// The frame is shorter than a header or longer than the largest frame.
    #[error("invalid frame length {found}")]
    InvalidLength {
        /// The length of the rejected frame.
        found: usize,
    },
    /// The port does not act as sink.
    #[error("sink session inactive")]
    Inactive,
    /// A frame is already waiting for the transmitter.
    #[error("pending slot occupied")]
    SlotOccupied,
    /// Blocking transmission was requested while the port acts as sink.
    #[error("sink session active")]
    SessionActive,
    /// The PHY refused the frame.
    #[error("driver error")]
    Phy(DriverTxError),
}

impl From<DriverTxError> for SendError {
    fn from(value: DriverTxError) -> Self {
        SendError::Phy(value)
    }
}

/// Time and VBUS sample attached to captured entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stamp {
    /// Uptime in milliseconds.
    pub timestamp_ms: u32,
    /// Raw VBUS sample.
    pub vbus_raw: u16,
}

fn check_len(frame: &[u8]) -> Result<(), SendError> {
    if (MIN_FRAME_LEN..=MAX_FRAME_LEN).contains(&frame.len()) {
        Ok(())
    } else {
        Err(SendError::InvalidLength { found: frame.len() })
    }
}

/// Link engine for a single port.
///
/// Owns the PHY, the sink session and the capture ring with `N` entries.
#[derive(Debug)]
pub struct PdLink<P: Phy, const N: usize> {
    phy: P,
    session: SinkSession,
    ring: MessageRing<N>,
    pending: Option<Frame>,
    tx_busy: bool,
    ack_in_flight: Option<[u8; 2]>,
    stamp: Stamp,
}

impl<P: Phy, const N: usize> PdLink<P, N> {
    /// Create a new link engine with an inactive session.
    pub fn new(phy: P, spec_revision: SpecificationRevision) -> Self {
        Self {
            phy,
            session: SinkSession::new(spec_revision),
            ring: MessageRing::new(),
            pending: None,
            tx_busy: false,
            ack_in_flight: None,
            stamp: Stamp::default(),
        }
    }

    /// The PHY.
    pub fn phy(&self) -> &P {
        &self.phy
    }

    /// The PHY, mutably.
    pub fn phy_mut(&mut self) -> &mut P {
        &mut self.phy
    }

    /// The sink session.
    pub fn session(&self) -> &SinkSession {
        &self.session
    }

    /// The sink session, mutably.
    pub fn session_mut(&mut self) -> &mut SinkSession {
        &mut self.session
    }

    /// The capture ring.
    pub fn ring(&self) -> &MessageRing<N> {
        &self.ring
    }

    /// The capture ring, mutably.
    pub fn ring_mut(&mut self) -> &mut MessageRing<N> {
        &mut self.ring
    }

    /// Whether a transmission is in progress.
    pub fn is_transmitting(&self) -> bool {
        self.tx_busy
    }

    /// Whether a frame waits in the pending slot.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Set the time and VBUS sample for entries captured from now on.
    pub fn set_stamp(&mut self, stamp: Stamp) {
        self.stamp = stamp;
    }

    /// Start acting as sink.
    pub fn enter(&mut self) {
        self.session.enter();
        self.pending = None;
        self.ack_in_flight = None;
        self.tx_busy = false;
        self.phy.set_sink_pull_down(true);
        self.phy.enter_receive_mode();
        info!("enter sink mode (PD{}.0)", self.session.spec_revision().major());
    }

    /// Stop acting as sink, dropping the pending frame and all captured entries.
    pub fn exit(&mut self) {
        self.session.exit();
        self.pending = None;
        self.ack_in_flight = None;
        self.tx_busy = false;
        self.ring.clear();
        self.ring.reset_counter();
        self.phy.set_sink_pull_down(false);
        self.phy.enter_receive_mode();
        info!("exit sink mode");
    }

    /// Whether a received frame must be acknowledged with GoodCRC.
    ///
    /// Only SOP frames other than GoodCRC are acknowledged, and only while the session is active.
    pub fn needs_acknowledgement(&self, sop: Option<Sop>, data: &[u8]) -> bool {
        if !self.session.is_active() || sop != Some(Sop::Sop) {
            return false;
        }

        Header::from_bytes(data).is_ok_and(|header| !header.is_good_crc())
    }

    /// Acknowledge a received frame, if it needs one.
    ///
    /// The GoodCRC is handed to the PHY without waiting for completion, and captured once the PHY
    /// reports the end of the transmission. Returns whether an acknowledgement was started.
    pub fn acknowledge(&mut self, sop: Option<Sop>, data: &[u8]) -> bool {
        if !self.needs_acknowledgement(sop, data) {
            return false;
        }

        let Ok(header) = Header::from_bytes(data) else {
            return false;
        };

        let mut reply = [0u8; 2];
        header
            .good_crc_reply(self.session.spec_revision())
            .to_bytes(&mut reply);

        match self.phy.start_transmit(Sop::Sop, &reply) {
            Ok(()) => {
                self.tx_busy = true;
                self.ack_in_flight = Some(reply);
                true
            }
            Err(e) => {
                error!("GoodCRC transmission failed: {:?}", e);
                false
            }
        }
    }

    /// Capture a received frame.
    pub fn record_rx(&mut self, sop: Option<Sop>, data: &[u8]) -> u32 {
        self.ring
            .record(CaptureStatus::frame(sop), data, self.stamp.timestamp_ms, self.stamp.vbus_raw)
    }

    /// Capture a receiver reset as an empty entry.
    pub fn record_rx_reset(&mut self, sop: Option<Sop>) -> u32 {
        self.ring
            .record(CaptureStatus::rx_reset(sop), &[], self.stamp.timestamp_ms, self.stamp.vbus_raw)
    }

    /// Handle the end of a transmission.
    ///
    /// Captures the GoodCRC that just left, then sends the pending frame if there is one.
    /// Otherwise, the PHY returns to receive mode.
    pub fn on_tx_complete(&mut self) {
        self.tx_busy = false;

        if let Some(ack) = self.ack_in_flight.take() {
            self.ring
                .record(CaptureStatus::frame(Some(Sop::Sop)), &ack, self.stamp.timestamp_ms, self.stamp.vbus_raw);
        }

        match self.pending.take() {
            Some(frame) => {
                if let Err(e) = self.send(&frame) {
                    error!("pending frame dropped: {:?}", e);
                    self.phy.enter_receive_mode();
                }
            }
            None => self.phy.enter_receive_mode(),
        }
    }

    /// Patch a frame's header and start transmitting it.
    ///
    /// The power role is forced to sink, the revision to the session's, and the session's message
    /// ID is injected. The frame is captured and the message ID advances once the PHY accepted it.
    pub fn send(&mut self, frame: &[u8]) -> Result<(), SendError> {
        check_len(frame)?;

        let mut buf = Frame::new();
        buf.extend_from_slice(frame)
            .map_err(|_| SendError::InvalidLength { found: frame.len() })?;

        let header = Header::from_bytes(&buf)
            .map_err(|_| SendError::InvalidLength { found: frame.len() })?
            .with_port_power_role(PowerRole::Sink)
            .with_spec_revision(self.session.spec_revision())
            .with_message_id(self.session.message_id());
        header.to_bytes(&mut buf[..2]);

        trace!("transmit header {:#x}", header.0);
        self.phy.start_transmit(Sop::Sop, &buf)?;
        self.tx_busy = true;
        self.ring
            .record(CaptureStatus::frame(Some(Sop::Sop)), &buf, self.stamp.timestamp_ms, self.stamp.vbus_raw);
        self.session.next_message_id();

        Ok(())
    }

    /// Transmit a frame and wait for completion.
    ///
    /// Only allowed before a session starts, since waiting would stall the acknowledgement of
    /// received frames.
    pub fn send_blocking(&mut self, sop: Sop, frame: &[u8]) -> Result<(), SendError> {
        if self.session.is_active() {
            warn!("blocking send refused during sink session");
            return Err(SendError::SessionActive);
        }
        check_len(frame)?;

        self.phy.transmit_blocking(sop, frame)?;
        Ok(())
    }

    /// Take the oldest captured entry.
    pub fn pop_captured(&mut self) -> Option<CapturedMessage> {
        self.ring.pop()
    }
}

impl<P: Phy, const N: usize> FrameSender for PdLink<P, N> {
    fn queue_frame(&mut self, frame: &[u8]) -> Result<(), SendError> {
        if !self.session.is_active() {
            return Err(SendError::Inactive);
        }
        check_len(frame)?;

        if !self.tx_busy {
            return self.send(frame);
        }

        if self.pending.is_some() {
            warn!("pending slot occupied");
            return Err(SendError::SlotOccupied);
        }

        let mut buf = Frame::new();
        buf.extend_from_slice(frame)
            .map_err(|_| SendError::InvalidLength { found: frame.len() })?;
        self.pending = Some(buf);

        Ok(())
    }
}

impl<P: Phy, const N: usize> SessionQuery for PdLink<P, N> {
    fn is_active(&self) -> bool {
        self.session.is_active()
    }

    fn spec_revision(&self) -> SpecificationRevision {
        self.session.spec_revision()
    }

    fn request_sent(&self) -> bool {
        self.session.request_sent()
    }
}
