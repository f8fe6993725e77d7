//! Implements dummy hardware and wire fixtures for testing.
use std::string::String;
use std::vec::Vec;

use crate::{CcLine, Clock, DriverTxError, Phy, Sop, TextOutput, VoltageSource};

/// A dummy PHY that records everything it is asked to do.
#[derive(Debug, Default)]
pub struct DummyPhy {
    /// Frames handed over for non-blocking transmission.
    pub transmitted: Vec<(Sop, Vec<u8>)>,
    /// Frames transmitted with the blocking variant.
    pub transmitted_blocking: Vec<(Sop, Vec<u8>)>,
    /// Reject every transmission with this error.
    pub reject: Option<DriverTxError>,
    /// State of the sink pull-down.
    pub pull_down: bool,
    /// Number of switches to receive mode.
    pub receive_mode_count: usize,
    /// The selected CC line.
    pub selected_cc: Option<CcLine>,
}

impl DummyPhy {
    /// Create a new dummy PHY.
    pub fn new() -> Self {
        Self::default()
    }

    /// The last frame handed over for transmission.
    pub fn last_transmitted(&self) -> Option<&[u8]> {
        self.transmitted.last().map(|(_, frame)| frame.as_slice())
    }
}

impl Phy for DummyPhy {
    fn start_transmit(&mut self, sop: Sop, frame: &[u8]) -> Result<(), DriverTxError> {
        if let Some(e) = self.reject {
            return Err(e);
        }
        self.transmitted.push((sop, frame.to_vec()));
        Ok(())
    }

    fn transmit_blocking(&mut self, sop: Sop, frame: &[u8]) -> Result<(), DriverTxError> {
        if let Some(e) = self.reject {
            return Err(e);
        }
        self.transmitted_blocking.push((sop, frame.to_vec()));
        self.receive_mode_count += 1;
        Ok(())
    }

    fn enter_receive_mode(&mut self) {
        self.receive_mode_count += 1;
    }

    fn set_sink_pull_down(&mut self, enable: bool) {
        self.pull_down = enable;
    }

    fn select_cc(&mut self, line: CcLine) {
        self.selected_cc = Some(line);
    }
}

/// A dummy clock that only moves when told to.
#[derive(Debug, Default)]
pub struct DummyClock {
    /// Current time in milliseconds.
    pub now: u32,
    /// Sum of all requested delays in microseconds.
    pub delayed_us: u32,
}

impl DummyClock {
    /// Create a clock at the given time.
    pub fn at(now: u32) -> Self {
        Self { now, delayed_us: 0 }
    }
}

impl Clock for DummyClock {
    fn now_millis(&self) -> u32 {
        self.now
    }

    fn delay_us(&mut self, microseconds: u32) {
        self.delayed_us = self.delayed_us.wrapping_add(microseconds);
    }
}

/// Fixed voltage readings.
#[derive(Debug, Clone, Copy)]
pub struct DummyVoltage {
    /// CC1 level in millivolts.
    pub cc1_mv: u16,
    /// CC2 level in millivolts.
    pub cc2_mv: u16,
    /// Raw VBUS sample.
    pub vbus_raw: u16,
    /// Raw internal reference sample.
    pub vref_raw: u16,
}

impl DummyVoltage {
    /// Nothing attached.
    pub fn detached() -> Self {
        Self {
            cc1_mv: 0,
            cc2_mv: 0,
            vbus_raw: 0,
            vref_raw: 1489,
        }
    }

    /// A 5 V source on CC1.
    pub fn attached_cc1() -> Self {
        Self {
            cc1_mv: 66,
            cc2_mv: 220,
            vbus_raw: VBUS_RAW_5V,
            vref_raw: 1489,
        }
    }
}

impl VoltageSource for DummyVoltage {
    fn cc_millivolts(&mut self, line: CcLine, _attached: bool) -> u16 {
        match line {
            CcLine::Cc1 => self.cc1_mv,
            CcLine::Cc2 => self.cc2_mv,
        }
    }

    fn vbus_raw(&mut self) -> u16 {
        self.vbus_raw
    }

    fn vref_raw(&mut self) -> u16 {
        self.vref_raw
    }
}

/// A text output that collects everything into a string.
#[derive(Debug)]
pub struct DummyOutput {
    /// Everything written so far.
    pub text: String,
    /// The host configured the transport.
    pub configured: bool,
    /// The host asked for debug output.
    pub debug: bool,
    /// Number of writes.
    pub writes: usize,
}

impl DummyOutput {
    /// A configured output without debug lines.
    pub fn new() -> Self {
        Self {
            text: String::new(),
            configured: true,
            debug: false,
            writes: 0,
        }
    }
}

impl TextOutput for DummyOutput {
    fn is_configured(&self) -> bool {
        self.configured
    }

    fn is_busy(&self) -> bool {
        false
    }

    fn debug_enabled(&self) -> bool {
        self.debug
    }

    fn write(&mut self, bytes: &[u8]) {
        self.writes += 1;
        self.text.push_str(&String::from_utf8_lossy(bytes));
    }
}

/// Raw VBUS sample of roughly 5 V with the default divider.
pub const VBUS_RAW_5V: u16 = 450;

/// Append four CRC bytes, as the PHY delivers received frames.
pub fn with_crc(frame: &[u8]) -> Vec<u8> {
    let mut data = frame.to_vec();
    data.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
    data
}

/// Dummy capabilities to deserialize.
///
/// - Fixed 5 V at 3 A
/// - Fixed 9 V at 3 A
/// - Fixed 15 V at 3 A
/// - Fixed 20 V at 2.25 A
/// - PPS 3.3-11 V at 5 A
/// - PPS 3.3-16 V at 3 A
/// - PPS 3.3-21 V at 2.25 A
pub const DUMMY_CAPABILITIES: [u8; 30] = [
    0xA1, // Header
    0x71, // Header
    0x2c, // +
    0x91, // | Fixed 5V @ 3A
    0x01, // |
    0x08, // +
    0x2c, // +
    0xD1, // |
    0x02, // | Fixed 9V @ 3A
    0x00, // +
    0x2C, // +
    0xB1, // |
    0x04, // | Fixed 15V @ 3A
    0x00, // +
    0xE1, // +
    0x40, // |
    0x06, // | Fixed 20V @ 2.25A
    0x00, // +
    0x64, // +
    0x21, // |
    0xDC, // | PPS 3.3-11V @ 5A
    0xC8, // +
    0x3C, // +
    0x21, // |
    0x40, // | PPS 3.3-16V @ 3A
    0xC9, // +
    0x2D, // +
    0x21, // |
    0xA4, // | PPS 3.3-21V @ 2.25A
    0xC9, // +
];

/// Source capabilities of an EPR capable source, a single 5 V / 3 A object, PD 3.x.
pub const EPR_CAPABLE_CAPABILITIES: [u8; 6] = [
    0xA1, // Header: Source_Capabilities, DFP, PD 3.x
    0x11, // Header: 1 object, source
    0x2C, // +
    0x91, // | Fixed 5V @ 3A, EPR capable,
    0x81, // | unchunked extended messages supported
    0x09, // +
];

/// First chunk of EPR source capabilities (40 bytes in total).
pub const EPR_SOURCE_CAPABILITIES_CHUNK_0: [u8; 30] = [
    0xB1, 0xF3, // Header: EPR_Source_Capabilities, extended, 7 objects, message ID 1
    0x28, 0x80, // Extended header: chunked, chunk 0, 40 bytes
    0x2C, 0x91, 0x81, 0x0A, // Fixed 5V @ 3A
    0x2C, 0xD1, 0x02, 0x00, // Fixed 9V @ 3A
    0x2C, 0xB1, 0x04, 0x00, // Fixed 15V @ 3A
    0xF4, 0x41, 0x06, 0x00, // Fixed 20V @ 5A
    0x00, 0x00, 0x00, 0x00, // Empty
    0x00, 0x00, 0x00, 0x00, // Empty
    0x00, 0x00, // First half of the eighth object
];

/// Second chunk of EPR source capabilities.
pub const EPR_SOURCE_CAPABILITIES_CHUNK_1: [u8; 18] = [
    0xB1, 0xC5, // Header: EPR_Source_Capabilities, extended, 4 objects, message ID 2
    0x28, 0x88, // Extended header: chunked, chunk 1, 40 bytes
    0x00, 0x00, // Second half of the eighth object
    0xF4, 0xC1, 0x08, 0x00, // Fixed 28V @ 5A
    0xF4, 0x81, 0x0B, 0x00, // Fixed 36V @ 5A
    0x00, 0x00, 0x00, 0x00, // Padding
];

/// PS_RDY from a PD 3.x source, message ID 3.
pub const PS_RDY: [u8; 2] = [0xA6, 0x07];

/// Alert from a PD 3.x source, message ID 3. Shares its type number with PS_RDY.
pub const ALERT: [u8; 6] = [0xA6, 0x17, 0x00, 0x00, 0x00, 0x02];

/// EPR keep-alive acknowledgement from a PD 3.x source, message ID 4.
pub const EPR_KEEP_ALIVE_ACK: [u8; 6] = [0xB0, 0x99, 0x02, 0x80, 0x04, 0x00];

/// EPR keep-alive as a PD 3.x sink sends it, before message ID injection.
pub const EPR_KEEP_ALIVE: [u8; 6] = [0x90, 0x90, 0x02, 0x80, 0x03, 0x00];

/// Chunk request for chunk 1 of the EPR source capabilities, before message ID injection.
pub const EPR_CHUNK_REQUEST: [u8; 6] = [0x91, 0x90, 0x00, 0x8C, 0x00, 0x00];

/// EPR request as a PD 3.x sink sends it, before message ID injection.
pub const EPR_REQUEST: [u8; 10] = [0x89, 0x20, 0x2C, 0xB1, 0x44, 0x13, 0x2C, 0x91, 0x81, 0x0A];
