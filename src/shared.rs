//! Sharing the engine context between the PHY interrupt and the poll loop.
//!
//! Every access runs inside a critical section, so the interrupt cannot preempt the poll loop in
//! the middle of an update. Text output happens outside of critical sections.
use core::cell::RefCell;

use critical_section::Mutex;
use usbpd_monitor_traits::{Clock, Phy, Sop, TextOutput, VoltageSource};

use crate::console::Console;
use crate::monitor::Monitor;
use crate::protocol_layer::SendError;

/// A [`Monitor`] that can live in a `static`.
pub struct SharedMonitor<P: Phy, C: Clock, V: VoltageSource, const N: usize> {
    inner: Mutex<RefCell<Option<Monitor<P, C, V, N>>>>,
}

impl<P: Phy, C: Clock, V: VoltageSource, const N: usize> Default for SharedMonitor<P, C, V, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Phy, C: Clock, V: VoltageSource, const N: usize> SharedMonitor<P, C, V, N> {
    /// Create an empty slot.
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(None)),
        }
    }

    /// Install the monitor. Replaces a previously installed one.
    pub fn init(&self, monitor: Monitor<P, C, V, N>) {
        critical_section::with(|cs| {
            *self.inner.borrow_ref_mut(cs) = Some(monitor);
        });
    }

    /// Run `f` on the monitor inside a critical section.
    ///
    /// Returns `None` if no monitor is installed.
    pub fn with<R>(&self, f: impl FnOnce(&mut Monitor<P, C, V, N>) -> R) -> Option<R> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).as_mut().map(f))
    }

    /// Interrupt entry point for a received frame.
    pub fn on_rx(&self, sop: Option<Sop>, data: &[u8]) {
        self.with(|monitor| monitor.on_rx(sop, data));
    }

    /// Interrupt entry point for a receiver reset.
    pub fn on_rx_reset(&self, sop: Option<Sop>) {
        self.with(|monitor| monitor.on_rx_reset(sop));
    }

    /// Interrupt entry point for the end of a transmission.
    pub fn on_tx_complete(&self) {
        self.with(|monitor| monitor.on_tx_complete());
    }

    /// Hand operator bytes to the monitor.
    pub fn on_external_bytes(&self, bytes: &[u8]) -> Result<(), SendError> {
        self.with(|monitor| monitor.on_external_bytes(bytes))
            .unwrap_or(Err(SendError::Inactive))
    }

    /// One iteration of the poll loop.
    ///
    /// Prints all captured frames, then runs a processing step and prints its report. Each entry
    /// is taken in its own critical section.
    pub fn poll<O: TextOutput>(&self, console: &mut Console<O>) {
        while let Some(message) = self.with(|monitor| monitor.pop_captured()).flatten() {
            console.print_captured(&message);
        }

        if let Some(report) = self.with(|monitor| monitor.service(console.output())).flatten() {
            console.print_report(&report);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::VbusConverter;
    use crate::config::Config;
    use crate::dummy::{DUMMY_CAPABILITIES, DummyClock, DummyOutput, DummyPhy, DummyVoltage, with_crc};

    type TestMonitor = SharedMonitor<DummyPhy, DummyClock, DummyVoltage, 16>;

    #[test]
    fn uninitialized_slot_does_nothing() {
        let shared = TestMonitor::new();
        shared.on_rx(Some(Sop::Sop), &with_crc(&DUMMY_CAPABILITIES));
        assert_eq!(shared.on_external_bytes(b"exit"), Err(SendError::Inactive));
        assert_eq!(shared.with(|_| ()), None);
    }

    #[test]
    fn frames_flow_from_interrupt_to_console() {
        static SHARED: TestMonitor = TestMonitor::new();
        SHARED.init(Monitor::new(
            DummyPhy::new(),
            DummyClock::at(0),
            DummyVoltage::attached_cc1(),
            Config::default(),
        ));
        let mut console = Console::new(DummyOutput::new(), VbusConverter::default());

        SHARED.with(|monitor| monitor.enter_sink());
        SHARED.with(|monitor| monitor.clock_mut().now = 5);
        SHARED.on_rx(Some(Sop::Sop), &with_crc(&DUMMY_CAPABILITIES));
        SHARED.on_tx_complete();
        SHARED.on_tx_complete();

        SHARED.with(|monitor| monitor.clock_mut().now = 10);
        SHARED.poll(&mut console);

        let text = &console.output().text;
        let lines: std::vec::Vec<&str> = text.lines().collect();
        assert!(lines[0].contains("#001") && lines[0].contains("SourceCap"));
        assert!(lines[1].contains("GoodCRC"));
        assert!(lines[2].contains("Request"));
        assert!(text.contains("# enter SNK mode (PD2.0)"));
        assert!(text.contains("# auto REQUEST PDO1"));
    }
}
