//! Operator text output.
//!
//! Renders captured frames and engine reports as lines and pushes them through a
//! [`TextOutput`], one write per line.
use core::fmt::Write;

use heapless::String;
use uom::si::electric_current::ampere;
use uom::si::electric_potential::volt;
use usbpd_monitor_traits::TextOutput;

use crate::calibration::VbusConverter;
use crate::capture::CapturedMessage;
use crate::capture::format::Formatter;
use crate::cc::{CcEvent, CcReading};
use crate::monitor::{DebugReading, Report};
use crate::protocol_layer::message::header::SpecificationRevision;
use crate::protocol_layer::message::pdo::FixedSupply;
use crate::sink::session::Notices;

/// Longest line the console renders. Longer lines are cut.
pub const LINE_CAPACITY: usize = 256;

/// Line-oriented writer on top of a text output.
#[derive(Debug)]
pub struct Console<O: TextOutput> {
    output: O,
    formatter: Formatter,
    line: String<LINE_CAPACITY>,
}

impl<O: TextOutput> Console<O> {
    /// Create a console that converts VBUS samples with the given converter.
    pub fn new(output: O, converter: VbusConverter) -> Self {
        Self {
            output,
            formatter: Formatter::new(converter),
            line: String::new(),
        }
    }

    /// The text output.
    pub fn output(&self) -> &O {
        &self.output
    }

    /// The text output, mutably.
    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }

    /// Print one captured frame.
    pub fn print_captured(&mut self, message: &CapturedMessage) {
        self.line.clear();
        if self.formatter.format_into(message, &mut self.line).is_err() {
            trace!("captured line truncated");
        }
        self.flush();
    }

    /// Print everything a processing step produced.
    pub fn print_report(&mut self, report: &Report) {
        if let Some(debug) = &report.debug {
            self.print_debug(debug);
        }

        match report.cc_event {
            Some(CcEvent::Attached(line, reading)) => self.print_connection(report.timestamp_ms, "Attach", line.number(), &reading),
            Some(CcEvent::Detached(line, reading)) => self.print_connection(report.timestamp_ms, "Detach", line.number(), &reading),
            None => (),
        }

        if let Some(length) = report.invalid_length {
            self.print_line(format_args!("! invalid PD length:{}\n", length));
        }

        self.print_notices(report.notices, report.spec_revision, report.requested);
    }

    fn print_debug(&mut self, debug: &DebugReading) {
        let CcReading { cc1_mv, cc2_mv, vbus_mv } = debug.reading;
        self.print_line(format_args!(
            "COND:{}, CC1:{:03}mV, CC2:{:03}mV, VBUS:{:05}mV, VDD:{}mV\n",
            debug.connection, cc1_mv, cc2_mv, vbus_mv, debug.vdd_mv
        ));
    }

    fn print_connection(&mut self, timestamp_ms: u32, what: &str, line: u8, reading: &CcReading) {
        self.print_line(format_args!(
            "{}ms {}:CC{}, CC1:{:03}mV, CC2:{:03}mV, VBUS:{:05}mV\n",
            timestamp_ms, what, line, reading.cc1_mv, reading.cc2_mv, reading.vbus_mv
        ));
    }

    fn print_notices(&mut self, notices: Notices, spec_revision: SpecificationRevision, requested: Option<FixedSupply>) {
        if notices.contains(Notices::ENTER) {
            self.print_line(format_args!(
                "# enter SNK mode (PD{}.0): send raw PD frame bytes over CDC; send 'exit' to leave\n",
                spec_revision.major()
            ));
        }

        if notices.contains(Notices::EXIT) {
            self.print_line(format_args!("# exit SNK mode\n"));
        }

        if notices.contains(Notices::AUTO_REQUEST) {
            match requested {
                Some(pdo) => self.print_line(format_args!(
                    "# auto REQUEST PDO1 ({:.2} V, {:.2} A)\n",
                    pdo.voltage().get::<volt>(),
                    pdo.max_current().get::<ampere>()
                )),
                None => self.print_line(format_args!("# auto REQUEST PDO1\n")),
            }
        }
    }

    fn print_line(&mut self, args: core::fmt::Arguments) {
        self.line.clear();
        if self.line.write_fmt(args).is_err() {
            trace!("line truncated");
        }
        self.flush();
    }

    /// Push the line buffer out, waiting for the previous write to finish.
    fn flush(&mut self) {
        if !self.output.is_configured() {
            return;
        }

        while self.output.is_busy() {
            if !self.output.is_configured() {
                return;
            }
            core::hint::spin_loop();
        }

        self.output.write(self.line.as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use std::string::String;

    use super::*;
    use crate::CcLine;
    use crate::dummy::DummyOutput;

    fn console() -> Console<DummyOutput> {
        Console::new(DummyOutput::new(), VbusConverter::default())
    }

    fn report() -> Report {
        Report {
            timestamp_ms: 1500,
            debug: None,
            cc_event: None,
            notices: Notices::empty(),
            spec_revision: SpecificationRevision::R2_0,
            requested: None,
            invalid_length: None,
        }
    }

    fn text(console: &Console<DummyOutput>) -> String {
        console.output().text.clone()
    }

    #[test]
    fn attach_and_detach_lines() {
        let mut console = console();
        let reading = CcReading {
            cc1_mv: 66,
            cc2_mv: 220,
            vbus_mv: 5012,
        };

        console.print_report(&Report {
            cc_event: Some(CcEvent::Attached(CcLine::Cc1, reading)),
            ..report()
        });
        console.print_report(&Report {
            cc_event: Some(CcEvent::Detached(CcLine::Cc1, CcReading { vbus_mv: 120, ..reading })),
            ..report()
        });

        assert_eq!(
            text(&console),
            "1500ms Attach:CC1, CC1:066mV, CC2:220mV, VBUS:05012mV\n\
             1500ms Detach:CC1, CC1:066mV, CC2:220mV, VBUS:00120mV\n"
        );
    }

    #[test]
    fn debug_line() {
        let mut console = console();
        console.print_report(&Report {
            debug: Some(DebugReading {
                connection: 0,
                reading: CcReading {
                    cc1_mv: 0,
                    cc2_mv: 22,
                    vbus_mv: 0,
                },
                vdd_mv: 3300,
            }),
            ..report()
        });

        assert_eq!(text(&console), "COND:0, CC1:000mV, CC2:022mV, VBUS:00000mV, VDD:3300mV\n");
    }

    #[test]
    fn notices_in_order() {
        let mut console = console();
        console.print_report(&Report {
            notices: Notices::ENTER | Notices::AUTO_REQUEST,
            spec_revision: SpecificationRevision::R3_X,
            requested: Some(FixedSupply(0x0801912C)),
            ..report()
        });
        console.print_report(&Report {
            notices: Notices::EXIT,
            ..report()
        });

        assert_eq!(
            text(&console),
            "# enter SNK mode (PD3.0): send raw PD frame bytes over CDC; send 'exit' to leave\n\
             # auto REQUEST PDO1 (5.00 V, 3.00 A)\n\
             # exit SNK mode\n"
        );
    }

    #[test]
    fn invalid_length_report() {
        let mut console = console();
        console.print_report(&Report {
            invalid_length: Some(40),
            ..report()
        });

        assert_eq!(text(&console), "! invalid PD length:40\n");
    }

    #[test]
    fn nothing_is_written_while_unconfigured() {
        let mut console = console();
        console.output_mut().configured = false;
        console.print_report(&Report {
            notices: Notices::EXIT,
            invalid_length: Some(1),
            ..report()
        });

        assert_eq!(console.output().writes, 0);
    }
}
