//! Automatic replies that carry a sink through contract negotiation.
//!
//! Rules, checked in order for every received SOP frame, at most one firing per frame:
//! 1. Source Capabilities: request the first power data object, once per session.
//! 2. EPR Source Capabilities (PD 3.x): ask for chunk 1 after chunk 0, send an EPR request after
//!    chunk 1.
//! 3. PS_RDY after the EPR request (PD 3.x): send the first EPR keep-alive and enter EPR mode.
//! 4. EPR keep-alive acknowledgement (PD 3.x): schedule the next keep-alive.
//!
//! Keep-alives after the first are sent from [`AutoReply::poll`], which runs in the poll loop.
use usbpd_monitor_traits::Sop;

use super::{FrameSender, SessionQuery};
#[cfg(feature = "epr")]
use crate::protocol_layer::message::extended::ExtendedHeader;
#[cfg(feature = "epr")]
use crate::protocol_layer::message::extended::chunked::{ChunkKind, build_chunk_request};
use crate::protocol_layer::message::extended::extended_control::{
    EXTENDED_CONTROL_FRAME_LEN, ExtendedControl, ExtendedControlMessageType,
};
#[cfg(feature = "epr")]
use crate::protocol_layer::message::header::{ControlMessageType, ExtendedMessageType};
use crate::protocol_layer::message::header::{DataMessageType, Header, MessageType, SpecificationRevision};
use crate::protocol_layer::message::pdo::FixedSupply;
use crate::protocol_layer::message::request::FixedVariableSupply;
use crate::protocol_layer::message::{DATA_OBJECT_LEN, MIN_RX_LEN};
use crate::timers::Deadline;

/// Data objects of the EPR request: a request for object 1 at 3 A with EPR mode capable set,
/// followed by the copy of the 5 V / 3 A source object that it refers to.
pub const EPR_REQUEST_OBJECTS: [u8; 2 * DATA_OBJECT_LEN] = [0x2C, 0xB1, 0x44, 0x13, 0x2C, 0x91, 0x81, 0x0A];

/// Length of an EPR request frame.
pub const EPR_REQUEST_LEN: usize = 2 + EPR_REQUEST_OBJECTS.len();

/// Build the EPR request frame.
pub fn build_epr_request(spec_revision: SpecificationRevision) -> [u8; EPR_REQUEST_LEN] {
    let mut frame = [0u8; EPR_REQUEST_LEN];
    Header::new_sink(MessageType::Data(DataMessageType::EprRequest), 2, spec_revision).to_bytes(&mut frame[..2]);
    frame[2..].copy_from_slice(&EPR_REQUEST_OBJECTS);
    frame
}

/// Build an EPR keep-alive frame.
pub fn build_keep_alive(spec_revision: SpecificationRevision) -> [u8; EXTENDED_CONTROL_FRAME_LEN] {
    ExtendedControl::new(ExtendedControlMessageType::EprKeepAlive).build_frame(spec_revision)
}

/// What a rule did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AutoAction {
    /// A request for the given source object was submitted.
    RequestSent(FixedSupply),
    /// The given chunk of the EPR source capabilities was requested.
    ChunkRequested(u8),
    /// The EPR request was submitted.
    EprRequestSent,
    /// EPR mode was entered and the first keep-alive submitted.
    EprEntered,
    /// The source acknowledged a keep-alive.
    KeepAliveAcked,
    /// A periodic keep-alive was submitted.
    KeepAliveSent,
}

/// State of the reply rules.
#[derive(Debug, Clone)]
pub struct AutoReply {
    epr_request_sent: bool,
    epr_active: bool,
    keep_alive_due: Option<Deadline>,
    keep_alive_period_ms: u32,
}

impl AutoReply {
    /// Create the rule state with the given keep-alive period.
    pub fn new(keep_alive_period_ms: u32) -> Self {
        Self {
            epr_request_sent: false,
            epr_active: false,
            keep_alive_due: None,
            keep_alive_period_ms,
        }
    }

    /// Forget all negotiation progress.
    pub fn reset(&mut self) {
        self.epr_request_sent = false;
        self.epr_active = false;
        self.keep_alive_due = None;
    }

    /// Whether the EPR request was sent.
    pub fn epr_request_sent(&self) -> bool {
        self.epr_request_sent
    }

    /// Whether EPR mode is active.
    pub fn epr_active(&self) -> bool {
        self.epr_active
    }

    /// When the next keep-alive is due, if one is scheduled.
    pub fn keep_alive_due(&self) -> Option<u32> {
        self.keep_alive_due.map(|deadline| deadline.due())
    }

    /// Inspect a received frame and submit a reply through `link`, if a rule matches.
    #[cfg_attr(not(feature = "epr"), allow(unused_variables))]
    pub fn on_rx<L: FrameSender + SessionQuery>(
        &mut self,
        link: &mut L,
        sop: Option<Sop>,
        frame: &[u8],
        now: u32,
    ) -> Option<AutoAction> {
        if !link.is_active() || sop != Some(Sop::Sop) || frame.len() < MIN_RX_LEN {
            return None;
        }

        let header = Header::from_bytes(frame).ok()?;

        match header.message_type() {
            MessageType::Data(DataMessageType::SourceCapabilities) => Self::request_first_pdo(link, frame),
            #[cfg(feature = "epr")]
            MessageType::Extended(ExtendedMessageType::EprSourceCapabilities) => self.on_epr_source_capabilities(link, frame),
            #[cfg(feature = "epr")]
            MessageType::Control(ControlMessageType::PsRdy) => self.on_ps_rdy(link, now),
            #[cfg(feature = "epr")]
            MessageType::Extended(ExtendedMessageType::ExtendedControl) => self.on_extended_control(link, frame, now),
            _ => None,
        }
    }

    /// Send a keep-alive if EPR mode is active and one is due.
    ///
    /// The next one is scheduled only if the frame was accepted, so a full pending slot causes a
    /// retry on the next call.
    pub fn poll<L: FrameSender + SessionQuery>(&mut self, link: &mut L, now: u32) -> Option<AutoAction> {
        if !self.epr_active || link.spec_revision() != SpecificationRevision::R3_X {
            return None;
        }

        let due = self.keep_alive_due?;
        if !due.expired(now) {
            return None;
        }

        match link.queue_frame(&build_keep_alive(link.spec_revision())) {
            Ok(()) => {
                self.keep_alive_due = Some(Deadline::after(now, self.keep_alive_period_ms));
                debug!("keep-alive sent, next at {}", now.wrapping_add(self.keep_alive_period_ms));
                Some(AutoAction::KeepAliveSent)
            }
            Err(e) => {
                warn!("keep-alive deferred: {:?}", e);
                None
            }
        }
    }

    fn request_first_pdo<L: FrameSender + SessionQuery>(link: &mut L, frame: &[u8]) -> Option<AutoAction> {
        if link.request_sent() {
            return None;
        }

        let pdo = FixedSupply::from_bytes(&frame[2..]).ok()?;
        let request = FixedVariableSupply::for_first_pdo(&pdo, link.spec_revision());

        match link.queue_frame(&request.build_frame()) {
            Ok(()) => {
                debug!("requesting first PDO");
                Some(AutoAction::RequestSent(pdo))
            }
            Err(e) => {
                warn!("request not sent: {:?}", e);
                None
            }
        }
    }

    #[cfg(feature = "epr")]
    fn on_epr_source_capabilities<L: FrameSender + SessionQuery>(
        &mut self,
        link: &mut L,
        frame: &[u8],
    ) -> Option<AutoAction> {
        let revision = link.spec_revision();
        if revision != SpecificationRevision::R3_X {
            return None;
        }

        match ChunkKind::from(ExtendedHeader::from_frame(frame).ok()?) {
            ChunkKind::Data(0) => {
                let request = build_chunk_request(ExtendedMessageType::EprSourceCapabilities, 1, revision);
                match link.queue_frame(&request) {
                    Ok(()) => {
                        debug!("requesting EPR capabilities chunk 1");
                        Some(AutoAction::ChunkRequested(1))
                    }
                    Err(e) => {
                        warn!("chunk request not sent: {:?}", e);
                        None
                    }
                }
            }
            ChunkKind::Data(1) => {
                if let Err(e) = link.queue_frame(&build_epr_request(revision)) {
                    warn!("EPR request not sent: {:?}", e);
                }
                // Marked sent regardless of the queue result.
                self.epr_request_sent = true;
                debug!("EPR request sent");
                Some(AutoAction::EprRequestSent)
            }
            _ => None,
        }
    }

    #[cfg(feature = "epr")]
    fn on_ps_rdy<L: FrameSender + SessionQuery>(&mut self, link: &mut L, now: u32) -> Option<AutoAction> {
        let revision = link.spec_revision();
        if revision != SpecificationRevision::R3_X || !self.epr_request_sent {
            return None;
        }

        if let Err(e) = link.queue_frame(&build_keep_alive(revision)) {
            warn!("first keep-alive not sent: {:?}", e);
        }
        self.epr_active = true;
        self.keep_alive_due = Some(Deadline::after(now, self.keep_alive_period_ms));
        debug!("EPR mode entered");
        Some(AutoAction::EprEntered)
    }

    #[cfg(feature = "epr")]
    fn on_extended_control<L: FrameSender + SessionQuery>(
        &mut self,
        link: &mut L,
        frame: &[u8],
        now: u32,
    ) -> Option<AutoAction> {
        if link.spec_revision() != SpecificationRevision::R3_X {
            return None;
        }

        let extended_header = ExtendedHeader::from_frame(frame).ok()?;
        if extended_header.data_size() < 2 {
            return None;
        }

        let control = ExtendedControl::from_bytes(&frame[4..]).ok()?;
        match control.message_type() {
            Ok(ExtendedControlMessageType::EprKeepAliveAck) => {
                self.epr_active = true;
                self.keep_alive_due = Some(Deadline::after(now, self.keep_alive_period_ms));
                trace!("keep-alive acknowledged");
                Some(AutoAction::KeepAliveAcked)
            }
            _ => None,
        }
    }
}
