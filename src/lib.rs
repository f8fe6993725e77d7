//! USB PD bus monitor and sink negotiation engine.
//!
//! The engine captures every frame seen on the CC wire into a ring buffer, renders captured frames
//! as diagnostic text, and can act as a sink: it acknowledges received frames with GoodCRC, requests
//! the first advertised power data object and walks a source through EPR entry and keep-alive.
//!
//! Hardware is reached exclusively through the traits of [`usbpd_monitor_traits`].
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

// This must go FIRST so that all the other modules see its macros.
#[macro_use]
mod fmt;

pub mod calibration;
pub mod capture;
pub mod cc;
pub mod config;
pub mod console;
pub mod counters;
pub mod monitor;
pub mod protocol_layer;
pub mod shared;
pub mod sink;
pub mod timers;

#[cfg(test)]
pub mod dummy;

pub use usbpd_monitor_traits::{CcLine, Clock, DriverTxError, Phy, Sop, TextOutput, VoltageSource};

/// The power role of a port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PowerRole {
    /// The port sources power.
    Source,
    /// The port sinks power.
    Sink,
}

impl From<bool> for PowerRole {
    fn from(value: bool) -> Self {
        match value {
            false => Self::Sink,
            true => Self::Source,
        }
    }
}

impl From<PowerRole> for bool {
    fn from(role: PowerRole) -> bool {
        match role {
            PowerRole::Sink => false,
            PowerRole::Source => true,
        }
    }
}

/// The data role of a port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataRole {
    /// Upstream facing port.
    Ufp,
    /// Downstream facing port.
    Dfp,
}

impl From<bool> for DataRole {
    fn from(value: bool) -> Self {
        match value {
            false => Self::Ufp,
            true => Self::Dfp,
        }
    }
}

impl From<DataRole> for bool {
    fn from(role: DataRole) -> bool {
        match role {
            DataRole::Ufp => false,
            DataRole::Dfp => true,
        }
    }
}
