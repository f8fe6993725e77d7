//! USB PD monitor hardware traits.
//!
//! Provides the traits that a board support layer implements so that the monitor engine can drive
//! the PD PHY, read the time, sample voltages and push text to a host.
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

/// Start-of-packet variant of a frame on the CC wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Sop {
    /// Primary port-to-port communication (SOP).
    Sop,
    /// Communication with the near cable plug (SOP').
    SopPrime,
    /// Communication with the far cable plug (SOP'').
    SopDoublePrime,
}

/// One of the two configuration channel lines of a USB-C receptacle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CcLine {
    /// CC1.
    Cc1,
    /// CC2.
    Cc2,
}

impl CcLine {
    /// The line number as printed in diagnostics (1 or 2).
    pub fn number(self) -> u8 {
        match self {
            CcLine::Cc1 => 1,
            CcLine::Cc2 => 2,
        }
    }
}

/// Transmit Error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverTxError {
    /// The transmitter is still busy with a previous frame.
    Busy,

    /// Concurrent receive in progress or excessive noise on the line.
    Discarded,
}

/// PD PHY, through which the link engine puts frames on the wire.
///
/// Receive and transmit completion are reported by the interrupt handler calling into the engine,
/// not through this trait.
pub trait Phy {
    /// Start transmitting a frame (header and payload, no CRC) without waiting for completion.
    ///
    /// Completion must be reported to the engine once the PHY raises its transmit-end event.
    fn start_transmit(&mut self, sop: Sop, frame: &[u8]) -> Result<(), DriverTxError>;

    /// Transmit a frame and wait until it left the PHY, then return to receive mode.
    fn transmit_blocking(&mut self, sop: Sop, frame: &[u8]) -> Result<(), DriverTxError>;

    /// Switch the PHY back to receive mode.
    fn enter_receive_mode(&mut self);

    /// Enable or disable the sink pull-down (Rd) on both CC lines.
    fn set_sink_pull_down(&mut self, enable: bool);

    /// Route PD signaling through the given CC line.
    fn select_cc(&mut self, line: CcLine);
}

/// Time source.
pub trait Clock {
    /// Monotonic millisecond counter, wrapping at `u32::MAX`.
    fn now_millis(&self) -> u32;

    /// Busy-wait for the given number of microseconds.
    fn delay_us(&mut self, microseconds: u32);
}

/// Analog measurements of the port.
pub trait VoltageSource {
    /// Quantized CC line voltage in millivolts, as produced by the comparator ladder.
    ///
    /// `attached` tells the PHY whether the port is currently attached, which selects the
    /// comparator threshold in use.
    fn cc_millivolts(&mut self, line: CcLine, attached: bool) -> u16;

    /// Averaged raw ADC sample of the VBUS divider.
    fn vbus_raw(&mut self) -> u16;

    /// Averaged raw ADC sample of the internal 1.2 V reference.
    fn vref_raw(&mut self) -> u16;
}

/// Byte pipe to the host, e.g. a CDC ACM class.
pub trait TextOutput {
    /// Whether the host side has configured the transport.
    fn is_configured(&self) -> bool;

    /// Whether the previous write is still in flight.
    fn is_busy(&self) -> bool;

    /// Whether the host asked for debug output (e.g. DTR asserted).
    fn debug_enabled(&self) -> bool;

    /// Start sending bytes. Must only be called while [`Self::is_busy`] is `false`.
    fn write(&mut self, bytes: &[u8]);
}
