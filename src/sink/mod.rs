//! The sink implementation.
//!
//! [`session::SinkSession`] holds the "acting as sink" state, [`auto_reply::AutoReply`] decides
//! which frames to send back. The two only meet through the capability traits below, which the
//! link engine implements.
pub mod auto_reply;
pub mod session;

use crate::protocol_layer::SendError;
use crate::protocol_layer::message::header::SpecificationRevision;

/// Capability to submit a frame for transmission.
pub trait FrameSender {
    /// Send a frame now if the transmitter is idle, or park it in the single pending slot.
    ///
    /// Fails if the session is inactive, the frame length is invalid, or the pending slot is
    /// already occupied.
    fn queue_frame(&mut self, frame: &[u8]) -> Result<(), SendError>;
}

/// Capability to inspect the sink session.
pub trait SessionQuery {
    /// Whether the port currently acts as sink.
    fn is_active(&self) -> bool;

    /// The revision the session speaks.
    fn spec_revision(&self) -> SpecificationRevision;

    /// Whether a request was already sent during this session.
    fn request_sent(&self) -> bool;
}
