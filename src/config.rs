//! Engine configuration.
use crate::calibration::VbusConverter;
use crate::protocol_layer::message::header::SpecificationRevision;
use crate::timers::TimerType;

/// Tunables of the monitor engine.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Revision the sink session speaks, either PD 2.0 or PD 3.x.
    pub spec_revision: SpecificationRevision,
    /// Period between EPR keep-alive messages, in milliseconds.
    pub keep_alive_period_ms: u32,
    /// Wait between the end of a received frame and its GoodCRC, in microseconds.
    pub good_crc_delay_us: u32,
    /// VBUS below this level means nothing is attached, in millivolts.
    pub vbus_present_mv: u16,
    /// Consecutive qualifying samples before attaching.
    pub attach_debounce: u8,
    /// Consecutive failing samples before detaching.
    pub detach_debounce: u8,
    /// Period of the poll loop's processing step, in milliseconds.
    pub process_interval_ms: u32,
    /// Period of the debug status line, in milliseconds.
    pub debug_interval_ms: u32,
    /// Conversion of raw VBUS samples.
    pub vbus: VbusConverter,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spec_revision: SpecificationRevision::R2_0,
            keep_alive_period_ms: 500,
            good_crc_delay_us: 25,
            vbus_present_mv: 1000,
            attach_debounce: 3,
            detach_debounce: 10,
            process_interval_ms: 10,
            debug_interval_ms: 100,
            vbus: VbusConverter::default(),
        }
    }
}

impl Config {
    /// Select the revision from a major version number, 3 selects PD 3.x and anything else PD 2.0.
    pub fn with_spec_revision(mut self, major: u8) -> Self {
        self.spec_revision = SpecificationRevision::from_major(major);
        self
    }

    /// Set the EPR keep-alive period.
    pub fn with_keep_alive_period_ms(mut self, period: u32) -> Self {
        self.keep_alive_period_ms = period;
        self
    }

    /// Set the GoodCRC turnaround delay.
    pub fn with_good_crc_delay_us(mut self, delay: u32) -> Self {
        self.good_crc_delay_us = delay;
        self
    }

    /// Set the VBUS presence threshold.
    pub fn with_vbus_present_mv(mut self, threshold: u16) -> Self {
        self.vbus_present_mv = threshold;
        self
    }

    /// Set the attach and detach debounce depths.
    pub fn with_debounce(mut self, attach: u8, detach: u8) -> Self {
        self.attach_debounce = attach;
        self.detach_debounce = detach;
        self
    }

    /// Set the VBUS converter.
    pub fn with_vbus_converter(mut self, converter: VbusConverter) -> Self {
        self.vbus = converter;
        self
    }

    /// The period of a timer, in milliseconds.
    pub fn period_ms(&self, timer_type: TimerType) -> u32 {
        match timer_type {
            TimerType::SinkEprKeepAlive => self.keep_alive_period_ms,
            TimerType::Process => self.process_interval_ms,
            TimerType::DebugReport => self.debug_interval_ms,
        }
    }
}
