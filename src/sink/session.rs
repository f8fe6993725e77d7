//! Sink session state.
use bitflags::bitflags;

use crate::counters::{Counter, CounterType};
use crate::protocol_layer::message::header::SpecificationRevision;
use crate::protocol_layer::message::pdo::FixedSupply;

bitflags! {
    /// Notifications raised while handling events, printed later from the poll loop.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Notices: u8 {
        /// The session was entered.
        const ENTER = 1 << 0;
        /// The session was left.
        const EXIT = 1 << 1;
        /// A request for the first power data object went out.
        const AUTO_REQUEST = 1 << 2;
    }
}

impl Default for Notices {
    fn default() -> Self {
        Self::empty()
    }
}

/// State of the port acting as sink.
#[derive(Debug, Clone)]
pub struct SinkSession {
    active: bool,
    spec_revision: SpecificationRevision,
    message_id: Counter,
    request_sent: bool,
    requested: Option<FixedSupply>,
    notices: Notices,
}

impl SinkSession {
    /// Create an inactive session that will speak the given revision.
    pub fn new(spec_revision: SpecificationRevision) -> Self {
        Self {
            active: false,
            spec_revision,
            message_id: Counter::new(CounterType::MessageId),
            request_sent: false,
            requested: None,
            notices: Notices::empty(),
        }
    }

    /// Activate the session, restarting message IDs and the request bookkeeping.
    pub fn enter(&mut self) {
        self.active = true;
        self.message_id.reset();
        self.request_sent = false;
        self.requested = None;
        self.notices.insert(Notices::ENTER);
    }

    /// Deactivate the session. Only the exit notice survives.
    pub fn exit(&mut self) {
        self.active = false;
        self.message_id.reset();
        self.request_sent = false;
        self.requested = None;
        self.notices = Notices::EXIT;
    }

    /// Whether the port currently acts as sink.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The revision the session speaks.
    pub fn spec_revision(&self) -> SpecificationRevision {
        self.spec_revision
    }

    /// Select the revision from a major version number, 3 selects PD 3.x and anything else PD 2.0.
    pub fn set_spec_revision(&mut self, major: u8) {
        self.spec_revision = SpecificationRevision::from_major(major);
    }

    /// The revision bits of the first header byte.
    pub fn spec_flag(&self) -> u8 {
        self.spec_revision.header_flag()
    }

    /// The message ID the next transmitted frame carries.
    pub fn message_id(&self) -> u8 {
        self.message_id.value()
    }

    /// Take the message ID for a transmission and advance the counter.
    pub fn next_message_id(&mut self) -> u8 {
        let id = self.message_id.value();
        if self.message_id.increment().is_err() {
            trace!("message id wrapped");
        }
        id
    }

    /// Whether a request was already sent during this session.
    pub fn request_sent(&self) -> bool {
        self.request_sent
    }

    /// Remember that the first power data object was requested.
    pub fn mark_request_sent(&mut self, pdo: FixedSupply) {
        self.request_sent = true;
        self.requested = Some(pdo);
        self.notices.insert(Notices::AUTO_REQUEST);
    }

    /// The power data object that was requested, if any.
    pub fn requested(&self) -> Option<FixedSupply> {
        self.requested
    }

    /// Take all pending notices.
    pub fn take_notices(&mut self) -> Notices {
        core::mem::take(&mut self.notices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_ids_advance_and_wrap() {
        let mut session = SinkSession::new(SpecificationRevision::R2_0);
        session.enter();

        let ids: std::vec::Vec<u8> = (0..10).map(|_| session.next_message_id()).collect();
        assert_eq!(ids, [0, 1, 2, 3, 4, 5, 6, 7, 0, 1]);
    }

    #[test]
    fn enter_resets_session_state() {
        let mut session = SinkSession::new(SpecificationRevision::R2_0);
        session.enter();
        session.next_message_id();
        session.mark_request_sent(FixedSupply(0x0801912C));

        session.exit();
        session.enter();
        assert!(session.is_active());
        assert_eq!(session.message_id(), 0);
        assert!(!session.request_sent());
        assert_eq!(session.requested(), None);
    }

    #[test]
    fn exit_keeps_only_the_exit_notice() {
        let mut session = SinkSession::new(SpecificationRevision::R3_X);
        session.enter();
        session.mark_request_sent(FixedSupply(0x0801912C));

        session.exit();
        assert_eq!(session.take_notices(), Notices::EXIT);
        assert_eq!(session.take_notices(), Notices::empty());
    }

    #[test]
    fn revision_selection() {
        let mut session = SinkSession::new(SpecificationRevision::R2_0);
        assert_eq!(session.spec_flag(), 0x40);

        session.set_spec_revision(3);
        assert_eq!(session.spec_revision(), SpecificationRevision::R3_X);
        assert_eq!(session.spec_flag(), 0x80);

        session.set_spec_revision(1);
        assert_eq!(session.spec_revision(), SpecificationRevision::R2_0);
    }
}
