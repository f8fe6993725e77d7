//! The engine context that ties the port together.
//!
//! [`Monitor`] owns every piece of engine state. The PHY interrupt handler calls
//! [`Monitor::on_rx`], [`Monitor::on_rx_reset`] and [`Monitor::on_tx_complete`]; the poll loop calls
//! [`Monitor::service`] and drains captured frames with [`Monitor::pop_captured`].
//!
//! The interrupt entry points must never run concurrently with themselves. When the poll loop and
//! the interrupt share the context, wrap it in a [`crate::shared::SharedMonitor`].
use usbpd_monitor_traits::{CcLine, Clock, Phy, Sop, TextOutput, VoltageSource};

use crate::capture::{CapturedMessage, DEFAULT_CAPACITY};
use crate::cc::{CcEvent, CcMonitor, CcReading};
use crate::config::Config;
use crate::protocol_layer::message::MIN_RX_LEN;
use crate::protocol_layer::message::header::SpecificationRevision;
use crate::protocol_layer::message::pdo::FixedSupply;
use crate::protocol_layer::{PdLink, SendError, Stamp};
use crate::sink::{FrameSender, SessionQuery};
use crate::sink::auto_reply::{AutoAction, AutoReply};
use crate::sink::session::Notices;
use crate::timers::{Interval, TimerType};

/// The operator command that leaves sink mode.
pub const EXIT_COMMAND: &[u8] = b"exit";

/// Port voltages for the debug status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DebugReading {
    /// Attached line number, zero while detached.
    pub connection: u8,
    /// Voltages of this sample.
    pub reading: CcReading,
    /// Supply voltage of the monitor itself, in millivolts.
    pub vdd_mv: u16,
}

/// Everything one processing step produced for the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    /// Uptime of the step in milliseconds.
    pub timestamp_ms: u32,
    /// Debug status line, if requested and due.
    pub debug: Option<DebugReading>,
    /// Attach or detach that happened in this step.
    pub cc_event: Option<CcEvent>,
    /// Session notices raised since the last step that printed them.
    pub notices: Notices,
    /// Revision of the sink session.
    pub spec_revision: SpecificationRevision,
    /// The object that was requested, for the auto-request notice.
    pub requested: Option<FixedSupply>,
    /// Length of an operator frame that was rejected.
    pub invalid_length: Option<usize>,
}

/// A [`Monitor`] with the capture ring size of the reference board.
pub type DefaultMonitor<P, C, V> = Monitor<P, C, V, DEFAULT_CAPACITY>;

/// Engine context of a single port.
pub struct Monitor<P: Phy, C: Clock, V: VoltageSource, const N: usize> {
    config: Config,
    link: PdLink<P, N>,
    auto: AutoReply,
    cc: CcMonitor,
    clock: C,
    voltage: V,
    process: Interval,
    debug: Interval,
    invalid_length: Option<usize>,
}

impl<P: Phy, C: Clock, V: VoltageSource, const N: usize> Monitor<P, C, V, N> {
    /// Create a new monitor, detached and not acting as sink.
    pub fn new(phy: P, clock: C, voltage: V, config: Config) -> Self {
        let now = clock.now_millis();

        Self {
            link: PdLink::new(phy, config.spec_revision),
            auto: AutoReply::new(config.period_ms(TimerType::SinkEprKeepAlive)),
            cc: CcMonitor::new(&config),
            process: Interval::new(now, config.period_ms(TimerType::Process)),
            debug: Interval::new(now, config.period_ms(TimerType::DebugReport)),
            invalid_length: None,
            config,
            clock,
            voltage,
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The link engine.
    pub fn link(&self) -> &PdLink<P, N> {
        &self.link
    }

    /// The link engine, mutably.
    pub fn link_mut(&mut self) -> &mut PdLink<P, N> {
        &mut self.link
    }

    /// The reply rules.
    pub fn auto_reply(&self) -> &AutoReply {
        &self.auto
    }

    /// The attach monitor.
    pub fn cc(&self) -> &CcMonitor {
        &self.cc
    }

    /// The clock.
    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// The voltage source.
    pub fn voltage_mut(&mut self) -> &mut V {
        &mut self.voltage
    }

    fn stamp(&mut self) -> u32 {
        let now = self.clock.now_millis();
        self.link.set_stamp(Stamp {
            timestamp_ms: now,
            vbus_raw: self.voltage.vbus_raw(),
        });
        now
    }

    /// Handle a received frame, as delivered by the PHY including its CRC.
    ///
    /// Frames shorter than a header and CRC are dropped. Otherwise the frame is acknowledged if
    /// needed, captured, and handed to the reply rules.
    pub fn on_rx(&mut self, sop: Option<Sop>, data: &[u8]) {
        if data.len() < MIN_RX_LEN {
            return;
        }

        if self.link.needs_acknowledgement(sop, data) {
            self.clock.delay_us(self.config.good_crc_delay_us);
            self.link.acknowledge(sop, data);
        }

        let now = self.stamp();
        self.link.record_rx(sop, data);

        if let Some(AutoAction::RequestSent(pdo)) = self.auto.on_rx(&mut self.link, sop, data, now) {
            self.link.session_mut().mark_request_sent(pdo);
        }
    }

    /// Handle a receiver reset.
    pub fn on_rx_reset(&mut self, sop: Option<Sop>) {
        self.stamp();
        self.link.record_rx_reset(sop);
    }

    /// Handle the end of a transmission.
    pub fn on_tx_complete(&mut self) {
        self.stamp();
        self.link.on_tx_complete();
    }

    /// Start acting as sink.
    pub fn enter_sink(&mut self) {
        self.auto.reset();
        self.link.enter();
    }

    /// Stop acting as sink and drop all negotiation progress.
    pub fn exit_sink(&mut self) {
        self.auto.reset();
        self.link.exit();
    }

    /// Whether the port acts as sink.
    pub fn is_sink_active(&self) -> bool {
        self.link.is_active()
    }

    /// Select the sink session's revision: 3 for PD 3.x, anything else for PD 2.0.
    pub fn set_spec_revision(&mut self, major: u8) {
        self.link.session_mut().set_spec_revision(major);
    }

    /// The sink session's revision.
    pub fn spec_revision(&self) -> SpecificationRevision {
        self.link.spec_revision()
    }

    /// The revision bits of the first header byte.
    pub fn spec_flag(&self) -> u8 {
        self.link.session().spec_flag()
    }

    /// Handle bytes from the operator.
    ///
    /// Ignored unless the port acts as sink. `exit` leaves sink mode, anything else is sent as a
    /// raw frame. A frame with an invalid length is reported in the next [`Report`].
    pub fn on_external_bytes(&mut self, bytes: &[u8]) -> Result<(), SendError> {
        if !self.link.is_active() {
            return Err(SendError::Inactive);
        }

        if bytes == EXIT_COMMAND {
            self.exit_sink();
            return Ok(());
        }

        self.stamp();
        let result = self.link.queue_frame(bytes);
        if let Err(SendError::InvalidLength { found }) = result {
            self.invalid_length = Some(found);
        }
        result
    }

    /// Transmit a frame and wait for completion. Refused while acting as sink.
    pub fn send_blocking(&mut self, sop: Sop, frame: &[u8]) -> Result<(), SendError> {
        self.link.send_blocking(sop, frame)
    }

    /// Take the oldest captured frame.
    pub fn pop_captured(&mut self) -> Option<CapturedMessage> {
        self.link.pop_captured()
    }

    fn read_port(&mut self) -> CcReading {
        let attached = self.cc.is_attached();

        CcReading {
            cc1_mv: self.voltage.cc_millivolts(CcLine::Cc1, attached),
            cc2_mv: self.voltage.cc_millivolts(CcLine::Cc2, attached),
            vbus_mv: self.config.vbus.millivolts(self.voltage.vbus_raw()),
        }
    }

    /// Run one processing step of the poll loop, if its period has elapsed.
    ///
    /// Samples the port, advances the attach monitor, sends a due keep-alive and collects the
    /// output for the operator. Notices are only collected while `output` is configured, so none
    /// get lost before the host is listening.
    pub fn service<O: TextOutput>(&mut self, output: &O) -> Option<Report> {
        let now = self.clock.now_millis();
        if !self.process.tick(now) {
            return None;
        }

        let reading = self.read_port();

        let debug = if output.debug_enabled() && self.debug.tick(now) {
            Some(DebugReading {
                connection: self.cc.state().number(),
                reading,
                vdd_mv: self.config.vbus.vdd_millivolts(self.voltage.vref_raw()),
            })
        } else {
            None
        };

        let cc_event = self.cc.tick(reading);
        match cc_event {
            Some(CcEvent::Attached(line, _)) => self.link.phy_mut().select_cc(line),
            Some(CcEvent::Detached(..)) => self.on_detach(),
            None => (),
        }

        self.stamp();
        self.auto.poll(&mut self.link, now);

        let notices = if output.is_configured() {
            self.link.session_mut().take_notices()
        } else {
            Notices::empty()
        };

        Some(Report {
            timestamp_ms: now,
            debug,
            cc_event,
            notices,
            spec_revision: self.link.spec_revision(),
            requested: self.link.session().requested(),
            invalid_length: self.invalid_length.take(),
        })
    }

    fn on_detach(&mut self) {
        if self.link.is_active() {
            self.exit_sink();
        } else {
            self.auto.reset();
            self.link.ring_mut().reset_counter();
        }
    }
}
