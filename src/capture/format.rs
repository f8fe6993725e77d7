//! Rendering of captured frames as diagnostic text lines.
//!
//! A line reads
//! `<ms>ms <vbus>mV #<seq> <sop> <type> <id> <direction> V<rev> [H]0x<header>[0]0x<object>... [CRC]0x<crc>`,
//! with a trailing ` ←WARN!!` when the GoodCRC sequence looks broken.
use core::fmt::{self, Write};

use usbpd_monitor_traits::Sop;

use super::CapturedMessage;
use crate::PowerRole;
use crate::calibration::VbusConverter;
use crate::protocol_layer::message::header::{
    ControlMessageType, DataMessageType, ExtendedMessageType, Header, MessageType,
};
use crate::protocol_layer::message::{CRC_LEN, DATA_OBJECT_LEN};

/// Marker appended to lines that break the frame/GoodCRC alternation.
pub const ANOMALY_MARKER: &str = " ←WARN!!";

fn control_name(message_type: ControlMessageType) -> &'static str {
    match message_type {
        ControlMessageType::GoodCRC => "GoodCRC",
        ControlMessageType::GotoMin => "GotoMin",
        ControlMessageType::Accept => "Accept",
        ControlMessageType::Reject => "Reject",
        ControlMessageType::Ping => "Ping",
        ControlMessageType::PsRdy => "PSRDY",
        ControlMessageType::GetSourceCap => "GetSourceCap",
        ControlMessageType::GetSinkCap => "GetSinkCap",
        ControlMessageType::DrSwap => "DRSwap",
        ControlMessageType::PrSwap => "PRSwap",
        ControlMessageType::VconnSwap => "VconnSwap",
        ControlMessageType::Wait => "Wait",
        ControlMessageType::SoftReset => "SoftReset",
        ControlMessageType::DataReset => "DataReset",
        ControlMessageType::DataResetComplete => "DataResetComplete",
        ControlMessageType::NotSupported => "NotSupported",
        ControlMessageType::GetSourceCapExtended => "GetSourceCapExt",
        ControlMessageType::GetStatus => "GetStatus",
        ControlMessageType::FrSwap => "FRSwap",
        ControlMessageType::GetPpsStatus => "GetPPSStatus",
        ControlMessageType::GetCountryCodes => "GetCountryCodes",
        ControlMessageType::GetSinkCapExtended => "GetSinkCapExt",
        ControlMessageType::GetSourceInfo => "GetSourceInfo",
        ControlMessageType::GetRevision => "GetRevision",
        ControlMessageType::Reserved => "Unknown_Ctrl",
    }
}

fn data_name(message_type: DataMessageType) -> &'static str {
    match message_type {
        DataMessageType::SourceCapabilities => "SourceCap",
        DataMessageType::Request => "Request",
        DataMessageType::Bist => "BIST",
        DataMessageType::SinkCapabilities => "SinkCap",
        DataMessageType::BatteryStatus => "BatteryStatus",
        DataMessageType::Alert => "Alert",
        DataMessageType::GetCountryInfo => "GetCountryInfo",
        DataMessageType::EnterUsb => "EnterUSB",
        DataMessageType::EprRequest => "EPRRequest",
        DataMessageType::EprMode => "EPRMode",
        DataMessageType::SourceInfo => "SourceInfo",
        DataMessageType::Revision => "Revision",
        DataMessageType::VendorDefined => "VendorDefined",
        DataMessageType::Reserved => "Unknown_Data",
    }
}

fn extended_name(message_type: ExtendedMessageType) -> &'static str {
    match message_type {
        ExtendedMessageType::SourceCapabilitiesExtended => "SourceCapExt",
        ExtendedMessageType::Status => "Status",
        ExtendedMessageType::GetBatteryCap => "GetBatteryCap",
        ExtendedMessageType::GetBatteryStatus => "GetBatteryStatus",
        ExtendedMessageType::BatteryCapabilities => "BatteryCap",
        ExtendedMessageType::GetManufacturerInfo => "GetMfrInfo",
        ExtendedMessageType::ManufacturerInfo => "MfrInfo",
        ExtendedMessageType::SecurityRequest => "SecurityReq",
        ExtendedMessageType::SecurityResponse => "SecurityResp",
        ExtendedMessageType::FirmwareUpdateRequest => "FWUpdateReq",
        ExtendedMessageType::FirmwareUpdateResponse => "FWUpdateResp",
        ExtendedMessageType::PpsStatus => "PPSStatus",
        ExtendedMessageType::CountryInfo => "CountryInfo",
        ExtendedMessageType::CountryCodes => "CountryCodes",
        ExtendedMessageType::SinkCapabilitiesExtended => "SinkCapExt",
        ExtendedMessageType::ExtendedControl => "ExtControl",
        ExtendedMessageType::EprSourceCapabilities => "EPRSourceCap",
        ExtendedMessageType::EprSinkCapabilities => "EPRSinkCap",
        ExtendedMessageType::VendorDefinedExtended => "VendorDefinedExt",
        ExtendedMessageType::Reserved => "Unknown_Ext",
    }
}

/// Extended type that some sources use for vendor defined extended messages.
const VENDOR_DEFINED_EXTENDED_ALIAS: u8 = 0b1_1111;

/// Printable name of the message type a header encodes.
pub fn message_name(header: &Header) -> &'static str {
    if header.extended() && header.message_type_raw() == VENDOR_DEFINED_EXTENDED_ALIAS {
        return extended_name(ExtendedMessageType::VendorDefinedExtended);
    }

    match header.message_type() {
        MessageType::Control(x) => control_name(x),
        MessageType::Data(x) => data_name(x),
        MessageType::Extended(x) => extended_name(x),
    }
}

/// Printable start-of-packet label.
pub fn sop_label(sop: Option<Sop>) -> &'static str {
    match sop {
        Some(Sop::Sop) => "SOP",
        Some(Sop::SopPrime) => "SOP'",
        Some(Sop::SopDoublePrime) => "SOP''",
        None => "???",
    }
}

/// Printable direction, from the power role bit and the start-of-packet.
pub fn direction(sop: Option<Sop>, power_role: PowerRole) -> &'static str {
    let cable = matches!(sop, Some(Sop::SopPrime | Sop::SopDoublePrime));

    match (power_role, cable) {
        (PowerRole::Source, false) => "SRC→SNK",
        (PowerRole::Source, true) => "CAB→?",
        (PowerRole::Sink, false) => "SRC←SNK",
        (PowerRole::Sink, true) => "CAB←?",
    }
}

fn write_word<W: Write>(out: &mut W, bytes: &[u8]) -> fmt::Result {
    write!(out, "0x{:02X}{:02X}{:02X}{:02X}", bytes[3], bytes[2], bytes[1], bytes[0])
}

/// Stateful line renderer.
///
/// Remembers whether the previous frame was a GoodCRC, which drives the anomaly marker.
#[derive(Debug, Clone)]
pub struct Formatter {
    converter: VbusConverter,
    last_was_good_crc: bool,
}

impl Formatter {
    /// Create a formatter that converts VBUS samples with the given converter.
    pub fn new(converter: VbusConverter) -> Self {
        Self {
            converter,
            last_was_good_crc: true,
        }
    }

    /// Render one captured entry, including the trailing newline.
    pub fn format_into<W: Write>(&mut self, message: &CapturedMessage, out: &mut W) -> fmt::Result {
        write!(
            out,
            "{}ms {:05}mV #{:03} {:<5} ",
            message.timestamp_ms,
            self.converter.millivolts(message.vbus_raw),
            message.sequence,
            sop_label(message.status.sop)
        )?;

        if message.status.rx_reset {
            return out.write_str("RX_RESET\n");
        }

        let data = message.data.as_slice();
        let Ok(header) = Header::from_bytes(data) else {
            // Nothing to decode.
            return out.write_str("\n");
        };

        write!(
            out,
            "{:<15} {} {} V{} [H]0x{:02X}{:02X}",
            message_name(&header),
            header.message_id(),
            direction(message.status.sop, header.port_power_role()),
            header.spec_revision_raw() + 1,
            data[1],
            data[0]
        )?;

        let objects_end = 2 + header.num_objects() * DATA_OBJECT_LEN;
        if data.len() > 2 {
            for (index, object) in data[2..].chunks_exact(DATA_OBJECT_LEN).take(header.num_objects()).enumerate() {
                write!(out, "[{}]", index)?;
                write_word(out, object)?;
            }
        }

        if data.len() >= objects_end + CRC_LEN {
            out.write_str("[CRC]")?;
            write_word(out, &data[objects_end..objects_end + CRC_LEN])?;
        }

        let is_good_crc = header.is_good_crc();
        let anomaly = (is_good_crc && self.last_was_good_crc)
            || (!is_good_crc && !self.last_was_good_crc && message.sequence != 1);
        if anomaly {
            out.write_str(ANOMALY_MARKER)?;
        }
        self.last_was_good_crc = is_good_crc;

        out.write_str("\n")
    }
}

#[cfg(test)]
mod tests {
    use std::string::String;

    use heapless::Vec;

    use super::*;
    use crate::capture::CaptureStatus;

    fn message(sequence: u32, sop: Option<Sop>, bytes: &[u8]) -> CapturedMessage {
        CapturedMessage {
            sequence,
            timestamp_ms: 1234,
            vbus_raw: 0,
            status: CaptureStatus::frame(sop),
            data: Vec::from_slice(bytes).unwrap(),
        }
    }

    fn render(formatter: &mut Formatter, message: &CapturedMessage) -> String {
        let mut line = String::new();
        formatter.format_into(message, &mut line).unwrap();
        line
    }

    #[test]
    fn source_capabilities_with_crc() {
        let mut formatter = Formatter::new(VbusConverter::default());
        let line = render(
            &mut formatter,
            &message(
                1,
                Some(Sop::Sop),
                &[0x61, 0x11, 0x2C, 0x91, 0x01, 0x08, 0x11, 0x22, 0x33, 0x44],
            ),
        );

        assert_eq!(
            line,
            "1234ms 00000mV #001 SOP   SourceCap       0 SRC→SNK V2 [H]0x1161[0]0x0801912C[CRC]0x44332211\n"
        );
    }

    #[test]
    fn transmitted_good_crc_without_crc_bytes() {
        let mut formatter = Formatter::new(VbusConverter::default());
        render(&mut formatter, &message(1, Some(Sop::Sop), &[0x61, 0x11, 0x2C, 0x91, 0x01, 0x08]));

        let line = render(&mut formatter, &message(2, Some(Sop::Sop), &[0x41, 0x00]));
        assert_eq!(line, "1234ms 00000mV #002 SOP   GoodCRC         0 SRC←SNK V2 [H]0x0041\n");
    }

    #[test]
    fn anomalies_are_marked() {
        let mut formatter = Formatter::new(VbusConverter::default());
        let good_crc = [0x41, 0x00];
        let accept = [0xA3, 0x03];

        // A GoodCRC first follows the initial "previous was GoodCRC" state.
        assert!(render(&mut formatter, &message(1, Some(Sop::Sop), &good_crc)).ends_with(" ←WARN!!\n"));
        assert!(!render(&mut formatter, &message(2, Some(Sop::Sop), &accept)).contains("WARN"));
        // Two frames in a row without an acknowledgement in between.
        assert!(render(&mut formatter, &message(3, Some(Sop::Sop), &accept)).ends_with(" ←WARN!!\n"));
        assert!(!render(&mut formatter, &message(4, Some(Sop::Sop), &good_crc)).contains("WARN"));
        assert!(render(&mut formatter, &message(5, Some(Sop::Sop), &good_crc)).contains("WARN"));
    }

    #[test]
    fn first_sequence_is_never_an_anomaly() {
        let mut formatter = Formatter::new(VbusConverter::default());
        let accept = [0xA3, 0x03];

        render(&mut formatter, &message(7, Some(Sop::Sop), &accept));
        assert!(!render(&mut formatter, &message(1, Some(Sop::Sop), &accept)).contains("WARN"));
    }

    #[test]
    fn rx_reset_entry() {
        let mut formatter = Formatter::new(VbusConverter::default());
        let reset = CapturedMessage {
            sequence: 12,
            timestamp_ms: 5,
            vbus_raw: 0,
            status: CaptureStatus::rx_reset(None),
            data: Vec::new(),
        };

        assert_eq!(render(&mut formatter, &reset), "5ms 00000mV #012 ???   RX_RESET\n");
    }

    #[test]
    fn cable_and_extended_frames() {
        let mut formatter = Formatter::new(VbusConverter::default());
        // Extended control keep-alive as sent by a PD 3.x sink, message ID 5.
        let line = render(&mut formatter, &message(1, Some(Sop::Sop), &[0x90, 0x9A, 0x02, 0x80, 0x03, 0x00]));
        assert!(line.contains("ExtControl      5 SRC←SNK V3 [H]0x9A90[0]0x00038002"));

        let line = render(&mut formatter, &message(2, Some(Sop::SopPrime), &[0x5F, 0x01]));
        assert!(line.contains("SOP'  Unknown_Ctrl    0 CAB→? V2"));
    }

    #[test]
    fn vendor_defined_extended_names() {
        let standard = Header::from_bytes(&[0x9E, 0x80]).unwrap();
        let alias = Header::from_bytes(&[0x9F, 0x80]).unwrap();
        assert_eq!(message_name(&standard), "VendorDefinedExt");
        assert_eq!(message_name(&alias), "VendorDefinedExt");

        // Not extended, so type 0x1F stays an unknown control message.
        let control = Header::from_bytes(&[0x9F, 0x00]).unwrap();
        assert_eq!(message_name(&control), "Unknown_Ctrl");
    }

    #[test]
    fn truncated_objects_are_skipped() {
        let mut formatter = Formatter::new(VbusConverter::default());
        // Claims two objects but carries only one.
        let line = render(&mut formatter, &message(1, Some(Sop::Sop), &[0x42, 0x20, 0x2C, 0xB1, 0x04, 0x13]));
        assert!(line.ends_with("Request         0 SRC←SNK V2 [H]0x2042[0]0x1304B12C\n"));
    }
}
