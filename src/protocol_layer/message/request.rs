//! Definitions of request message content.
use byteorder::{ByteOrder, LittleEndian};
use proc_bitfield::bitfield;
use uom::si::electric_current::centiampere;
use uom::si::f32::ElectricCurrent;

use super::header::{DataMessageType, Header, MessageType, SpecificationRevision};
use super::pdo::FixedSupply;
use super::DATA_OBJECT_LEN;

/// Length of a request frame with its single request data object.
pub const REQUEST_FRAME_LEN: usize = 2 + DATA_OBJECT_LEN;

bitfield! {
    /// Request data object for a fixed or variable supply.
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct FixedVariableSupply(pub u32): Debug, FromStorage, IntoStorage {
        /// Valid range 1..=14
        pub object_position: u8 @ 28..=31,
        pub giveback_flag: bool @ 27,
        pub capability_mismatch: bool @ 26,
        pub usb_communications_capable: bool @ 25,
        pub no_usb_suspend: bool @ 24,
        pub unchunked_extended_messages_supported: bool @ 23,
        pub epr_mode_capable: bool @ 22,
        pub raw_operating_current: u16 @ 10..=19,
        pub raw_max_operating_current: u16 @ 0..=9,
    }
}

impl FixedVariableSupply {
    /// Request the first power data object at its full advertised current.
    ///
    /// With PD 3.x, unchunked extended message and EPR support are mirrored from the source's
    /// object, so that a capable source can offer EPR entry afterwards.
    pub fn for_first_pdo(pdo: &FixedSupply, spec_revision: SpecificationRevision) -> Self {
        let request = Self(0)
            .with_object_position(1)
            .with_usb_communications_capable(true)
            .with_no_usb_suspend(true)
            .with_raw_operating_current(pdo.raw_max_current())
            .with_raw_max_operating_current(pdo.raw_max_current());

        match spec_revision {
            SpecificationRevision::R3_X => request
                .with_unchunked_extended_messages_supported(pdo.unchunked_extended_messages_supported())
                .with_epr_mode_capable(pdo.epr_mode_capable()),
            _ => request,
        }
    }

    /// Write the object as four little-endian bytes. Returns the number of bytes written.
    pub fn to_bytes(self, buf: &mut [u8]) -> usize {
        LittleEndian::write_u32(buf, self.0);
        4
    }

    /// The requested operating current.
    pub fn operating_current(&self) -> ElectricCurrent {
        ElectricCurrent::new::<centiampere>(f32::from(self.raw_operating_current()))
    }

    /// The requested maximum operating current.
    pub fn max_operating_current(&self) -> ElectricCurrent {
        ElectricCurrent::new::<centiampere>(f32::from(self.raw_max_operating_current()))
    }

    /// Build a complete request frame.
    ///
    /// The frame is marked PD 2.0, the link engine patches in the session's revision.
    pub fn build_frame(self) -> [u8; REQUEST_FRAME_LEN] {
        let mut frame = [0u8; REQUEST_FRAME_LEN];
        Header::new_sink(MessageType::Data(DataMessageType::Request), 1, SpecificationRevision::R2_0)
            .to_bytes(&mut frame[..2]);
        self.to_bytes(&mut frame[2..]);
        frame
    }
}

#[cfg(test)]
mod tests {
    use uom::si::electric_current::milliampere;

    use super::*;

    #[test]
    fn request_first_pdo_pd2() {
        let pdo = FixedSupply::from_bytes(&[0x2C, 0x91, 0x01, 0x08]).unwrap();
        let request = FixedVariableSupply::for_first_pdo(&pdo, SpecificationRevision::R2_0);

        assert_eq!(request.object_position(), 1);
        assert!((request.operating_current().get::<milliampere>() - 3000.0).abs() < 0.5);
        assert_eq!(request.build_frame(), [0x42, 0x10, 0x2C, 0xB1, 0x04, 0x13]);
    }

    #[test]
    fn request_first_pdo_pd3_mirrors_epr_flags() {
        // 5 V at 3 A, EPR capable and unchunked extended messages supported.
        let pdo = FixedSupply::from_bytes(&[0x2C, 0x91, 0x81, 0x09]).unwrap();

        let pd3 = FixedVariableSupply::for_first_pdo(&pdo, SpecificationRevision::R3_X);
        assert!(pd3.epr_mode_capable());
        assert!(pd3.unchunked_extended_messages_supported());
        assert_eq!(pd3.build_frame()[2..], [0x2C, 0xB1, 0xC4, 0x13]);

        let pd2 = FixedVariableSupply::for_first_pdo(&pdo, SpecificationRevision::R2_0);
        assert!(!pd2.epr_mode_capable());
        assert_eq!(pd2.build_frame()[2..], [0x2C, 0xB1, 0x04, 0x13]);
    }
}
