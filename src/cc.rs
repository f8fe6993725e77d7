//! CC attach monitor.
//!
//! Tracks whether a source is attached, and on which CC line, from the quantized CC voltages and
//! VBUS. Attach needs [`Config::attach_debounce`] consecutive qualifying samples, detach needs
//! [`Config::detach_debounce`] consecutive failing samples, and loss of VBUS detaches at once.
//!
//! [`Config::attach_debounce`]: crate::config::Config
//! [`Config::detach_debounce`]: crate::config::Config
use usbpd_monitor_traits::CcLine;

use crate::config::Config;
use crate::counters::Debounce;

/// Comparator level of an open (unterminated) CC line.
pub const CC_OPEN_MV: u16 = 220;

/// Range of a line pulled down by the sink's Rd while the source's Rp is present.
const RD_DETECT_MV: core::ops::RangeInclusive<u16> = 45..=123;

/// Upper bound of a line that reads as grounded.
const CC_LOW_MV: u16 = 22;

/// Voltage pairs that override the generic attach rule, applied in order, in both line orders.
const ATTACH_OVERRIDES: [(u16, u16, bool); 6] = [
    (123, CC_OPEN_MV, true),
    (95, CC_OPEN_MV, true),
    (66, CC_OPEN_MV, true),
    (55, CC_OPEN_MV, true),
    (0, CC_OPEN_MV, false),
    (0, 66, true),
];

/// Voltage pairs that override the generic still-connected rule, applied in order, in both line orders.
const CONNECTED_OVERRIDES: [(u16, u16, bool); 2] = [(0, CC_OPEN_MV, false), (0, 66, true)];

/// Levels that select a line outright when the other line is open.
const PRIORITY_LEVELS_MV: [u16; 4] = [123, 95, 66, 55];

/// Connection state of the port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CcState {
    /// Nothing attached.
    #[default]
    Detached,
    /// A source is attached and communicates on the given line.
    Attached(CcLine),
}

impl CcState {
    /// The connection as printed in diagnostics: 0 when detached, else the line number.
    pub fn number(&self) -> u8 {
        match self {
            CcState::Detached => 0,
            CcState::Attached(line) => line.number(),
        }
    }
}

/// One sample of the port's voltages, in millivolts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CcReading {
    /// Quantized CC1 level.
    pub cc1_mv: u16,
    /// Quantized CC2 level.
    pub cc2_mv: u16,
    /// Calibrated VBUS.
    pub vbus_mv: u16,
}

/// A change of the connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CcEvent {
    /// A source was attached on the given line.
    Attached(CcLine, CcReading),
    /// The source on the given line went away.
    Detached(CcLine, CcReading),
}

/// Attach/detach state machine.
#[derive(Debug, Clone)]
pub struct CcMonitor {
    state: CcState,
    debounce: Debounce,
    vbus_present_mv: u16,
    attach_debounce: u8,
    detach_debounce: u8,
}

fn pair_matches(cc1: u16, cc2: u16, a: u16, b: u16) -> bool {
    (cc1 == a && cc2 == b) || (cc1 == b && cc2 == a)
}

fn apply_overrides(cc1: u16, cc2: u16, initial: bool, overrides: &[(u16, u16, bool)]) -> bool {
    overrides.iter().fold(initial, |cond, &(a, b, verdict)| {
        if pair_matches(cc1, cc2, a, b) { verdict } else { cond }
    })
}

/// Whether a detached port sees a source on exactly one line.
pub fn attach_condition(cc1: u16, cc2: u16) -> bool {
    let open_or_low = |mv: u16| mv >= CC_OPEN_MV || mv <= CC_LOW_MV;

    let generic = (RD_DETECT_MV.contains(&cc1) && open_or_low(cc2)) || (RD_DETECT_MV.contains(&cc2) && open_or_low(cc1));
    let generic = generic && cc1 != CC_OPEN_MV && cc2 != CC_OPEN_MV;

    apply_overrides(cc1, cc2, generic, &ATTACH_OVERRIDES)
}

/// Whether an attached port still sees its source.
pub fn connected_condition(cc1: u16, cc2: u16) -> bool {
    let generic = RD_DETECT_MV.contains(&cc1) || RD_DETECT_MV.contains(&cc2);

    apply_overrides(cc1, cc2, generic, &CONNECTED_OVERRIDES)
}

/// The line a newly attached source communicates on.
pub fn select_line(cc1: u16, cc2: u16) -> CcLine {
    if PRIORITY_LEVELS_MV.contains(&cc1) && cc2 == CC_OPEN_MV {
        CcLine::Cc1
    } else if PRIORITY_LEVELS_MV.contains(&cc2) && cc1 == CC_OPEN_MV {
        CcLine::Cc2
    } else if cc1 > cc2 {
        CcLine::Cc1
    } else {
        CcLine::Cc2
    }
}

impl CcMonitor {
    /// Create a detached monitor.
    pub fn new(config: &Config) -> Self {
        Self {
            state: CcState::Detached,
            debounce: Debounce::default(),
            vbus_present_mv: config.vbus_present_mv,
            attach_debounce: config.attach_debounce,
            detach_debounce: config.detach_debounce,
        }
    }

    /// The current connection state.
    pub fn state(&self) -> CcState {
        self.state
    }

    /// Whether a source is attached.
    pub fn is_attached(&self) -> bool {
        matches!(self.state, CcState::Attached(_))
    }

    /// Feed one sample and advance the state machine.
    pub fn tick(&mut self, reading: CcReading) -> Option<CcEvent> {
        let CcReading { cc1_mv, cc2_mv, vbus_mv } = reading;

        if vbus_mv < self.vbus_present_mv {
            self.debounce.reset();
            return self.force_detach().map(|line| CcEvent::Detached(line, reading));
        }

        match self.state {
            CcState::Attached(line) => {
                if connected_condition(cc1_mv, cc2_mv) {
                    self.debounce.reset();
                    return None;
                }

                self.debounce.increment();
                if self.debounce.reached(self.detach_debounce) {
                    self.force_detach();
                    return Some(CcEvent::Detached(line, reading));
                }

                None
            }
            CcState::Detached => {
                if !attach_condition(cc1_mv, cc2_mv) {
                    self.debounce.reset();
                    return None;
                }

                self.debounce.increment();
                if self.debounce.reached(self.attach_debounce) {
                    let line = select_line(cc1_mv, cc2_mv);
                    self.state = CcState::Attached(line);
                    self.debounce.reset();
                    info!("attached on CC{}", line.number());
                    return Some(CcEvent::Attached(line, reading));
                }

                None
            }
        }
    }

    /// Detach immediately. Returns the line that was attached, if any.
    pub fn force_detach(&mut self) -> Option<CcLine> {
        self.debounce.reset();

        match core::mem::take(&mut self.state) {
            CcState::Attached(line) => {
                info!("detached from CC{}", line.number());
                Some(line)
            }
            CcState::Detached => None,
        }
    }
}
