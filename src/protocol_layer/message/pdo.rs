//! Definitions of source power data objects.
//!
//! The sink only ever selects the first object, which a source always advertises as the
//! vSafe5V fixed supply, so the fixed supply layout is all that is decoded here.
use byteorder::{ByteOrder, LittleEndian};
use proc_bitfield::bitfield;
use uom::si::electric_current::centiampere;
use uom::si::electric_potential::millivolt;
use uom::si::f32::{ElectricCurrent, ElectricPotential};

use super::{DATA_OBJECT_LEN, ParseError, ensure_len};

/// Millivolts per unit of the fixed supply voltage field.
const FIXED_VOLTAGE_STEP_MV: f32 = 50.0;

bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    /// A fixed supply power data object.
    pub struct FixedSupply(pub u32): Debug, FromStorage, IntoStorage {
        /// Fixed supply
        pub kind: u8 @ 30..=31,
        /// Dual-role power
        pub dual_role_power: bool @ 29,
        /// USB suspend supported
        pub usb_suspend_supported: bool @ 28,
        /// Unconstrained power
        pub unconstrained_power: bool @ 27,
        /// USB communications capable
        pub usb_communications_capable: bool @ 26,
        /// Dual-role data
        pub dual_role_data: bool @ 25,
        /// Unchunked extended messages supported
        pub unchunked_extended_messages_supported: bool @ 24,
        /// EPR mode capable
        pub epr_mode_capable: bool @ 23,
        /// Peak current
        pub peak_current: u8 @ 20..=21,
        /// Voltage in 50 mV units
        pub raw_voltage: u16 @ 10..=19,
        /// Maximum current in 10 mA units
        pub raw_max_current: u16 @ 0..=9,
    }
}

impl FixedSupply {
    /// Parse a power data object from four little-endian bytes.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, ParseError> {
        ensure_len(buf, DATA_OBJECT_LEN)?;
        Ok(Self(LittleEndian::read_u32(&buf[..DATA_OBJECT_LEN])))
    }

    /// The supply voltage.
    pub fn voltage(&self) -> ElectricPotential {
        ElectricPotential::new::<millivolt>(f32::from(self.raw_voltage()) * FIXED_VOLTAGE_STEP_MV)
    }

    /// The maximum current the source offers at this voltage.
    pub fn max_current(&self) -> ElectricCurrent {
        ElectricCurrent::new::<centiampere>(f32::from(self.raw_max_current()))
    }
}
