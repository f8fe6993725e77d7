//! VBUS measurement conversion and piecewise-linear calibration.
//!
//! Raw ADC samples are scaled through the resistor divider to an uncalibrated millivolt value,
//! which a table of measured/actual pairs then corrects.

/// A single calibration point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CalibrationPoint {
    /// The value the uncorrected conversion reports, in millivolts.
    pub measured_mv: u16,
    /// The true voltage at that point, in millivolts.
    pub actual_mv: u16,
}

impl CalibrationPoint {
    /// Create a calibration point.
    pub const fn new(measured_mv: u16, actual_mv: u16) -> Self {
        Self { measured_mv, actual_mv }
    }
}

/// Calibration points of the reference board.
pub const DEFAULT_VBUS_CALIBRATION: [CalibrationPoint; 5] = [
    CalibrationPoint::new(510, 0),
    CalibrationPoint::new(5372, 5007),
    CalibrationPoint::new(9199, 8975),
    CalibrationPoint::new(12070, 11961),
    CalibrationPoint::new(19907, 20030),
];

/// Errors in a calibration table.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationError {
    /// At least two points are needed to define a segment.
    #[error("calibration table needs at least two points, found {0}")]
    TooFewPoints(usize),
    /// Measured values must be strictly ascending.
    #[error("calibration point {0} is not above its predecessor")]
    Unsorted(usize),
}

/// A validated, ascending table of calibration points.
#[derive(Debug, Clone, Copy)]
pub struct CalibrationTable {
    points: &'static [CalibrationPoint],
}

impl CalibrationTable {
    /// Create a table from points sorted ascending by measured value.
    pub fn new(points: &'static [CalibrationPoint]) -> Result<Self, CalibrationError> {
        if points.len() < 2 {
            return Err(CalibrationError::TooFewPoints(points.len()));
        }

        if let Some(index) = points
            .windows(2)
            .position(|pair| pair[1].measured_mv <= pair[0].measured_mv)
        {
            return Err(CalibrationError::Unsorted(index + 1));
        }

        Ok(Self { points })
    }

    /// The calibration points.
    pub fn points(&self) -> &'static [CalibrationPoint] {
        self.points
    }

    /// Correct a measured value, rounding to the nearest millivolt.
    pub fn correct(&self, measured_mv: u16) -> u16 {
        round_millivolts(self.correct_f32(f32::from(measured_mv)))
    }

    /// Correct a measured value without rounding or clamping.
    ///
    /// Values inside the table are interpolated on their bracketing segment, values outside are
    /// extrapolated along the nearest boundary segment.
    pub fn correct_f32(&self, measured_mv: f32) -> f32 {
        let points = self.points;
        let first = points[0];
        let last = points[points.len() - 1];

        let segment = if measured_mv < f32::from(first.measured_mv) {
            (points[0], points[1])
        } else if measured_mv > f32::from(last.measured_mv) {
            (points[points.len() - 2], last)
        } else {
            points
                .windows(2)
                .find(|pair| measured_mv <= f32::from(pair[1].measured_mv))
                .map(|pair| (pair[0], pair[1]))
                .unwrap_or((points[points.len() - 2], last))
        };

        interpolate(segment.0, segment.1, measured_mv)
    }
}

fn interpolate(p1: CalibrationPoint, p2: CalibrationPoint, measured_mv: f32) -> f32 {
    let slope = (f32::from(p2.actual_mv) - f32::from(p1.actual_mv))
        / (f32::from(p2.measured_mv) - f32::from(p1.measured_mv));
    f32::from(p1.actual_mv) + slope * (measured_mv - f32::from(p1.measured_mv))
}

/// Clamp to the `u16` range and round to the nearest integer.
fn round_millivolts(value: f32) -> u16 {
    let clamped = if value < 0.0 {
        0.0
    } else if value > f32::from(u16::MAX) {
        f32::from(u16::MAX)
    } else {
        value
    };

    (clamped + 0.5) as u16
}

/// Converts raw ADC samples of the VBUS divider to millivolts.
#[derive(Debug, Clone, Copy)]
pub struct VbusConverter {
    reference_mv: u16,
    adc_full_scale: u16,
    divider_top_ohm: u32,
    divider_bottom_ohm: u32,
    calibration: Option<CalibrationTable>,
}

impl Default for VbusConverter {
    fn default() -> Self {
        Self {
            reference_mv: 3300,
            adc_full_scale: 4095,
            divider_top_ohm: 68_000,
            divider_bottom_ohm: 4_700,
            calibration: Some(CalibrationTable {
                points: &DEFAULT_VBUS_CALIBRATION,
            }),
        }
    }
}

impl VbusConverter {
    /// Nominal voltage of the internal reference, in millivolts.
    pub const INTERNAL_REFERENCE_MV: u32 = 1200;

    /// Create a converter for a given ADC reference and divider.
    pub fn new(reference_mv: u16, adc_full_scale: u16, divider_top_ohm: u32, divider_bottom_ohm: u32) -> Self {
        Self {
            reference_mv,
            adc_full_scale,
            divider_top_ohm,
            divider_bottom_ohm,
            calibration: None,
        }
    }

    /// Use a calibration table, or none to report uncalibrated values.
    pub fn with_calibration(mut self, calibration: Option<CalibrationTable>) -> Self {
        self.calibration = calibration;
        self
    }

    /// Millivolts at the port per ADC count.
    pub fn scale(&self) -> f32 {
        if self.adc_full_scale == 0 || self.divider_bottom_ohm == 0 {
            return 0.0;
        }

        f32::from(self.reference_mv) / f32::from(self.adc_full_scale)
            * ((self.divider_top_ohm + self.divider_bottom_ohm) as f32 / self.divider_bottom_ohm as f32)
    }

    /// Convert a raw VBUS sample to calibrated millivolts.
    pub fn millivolts(&self, raw: u16) -> u16 {
        let uncalibrated = f32::from(raw) * self.scale();

        round_millivolts(match &self.calibration {
            Some(table) => table.correct_f32(uncalibrated),
            None => uncalibrated,
        })
    }

    /// Supply voltage derived from a raw sample of the internal reference.
    pub fn vdd_millivolts(&self, vref_raw: u16) -> u16 {
        if vref_raw == 0 {
            return 0;
        }

        let vdd = Self::INTERNAL_REFERENCE_MV * u32::from(self.adc_full_scale) / u32::from(vref_raw);
        u16::try_from(vdd).unwrap_or(u16::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static LINEAR: [CalibrationPoint; 2] = [CalibrationPoint::new(100, 200), CalibrationPoint::new(200, 400)];

    fn default_table() -> CalibrationTable {
        CalibrationTable::new(&DEFAULT_VBUS_CALIBRATION).unwrap()
    }

    #[test]
    fn table_entry_maps_to_actual() {
        let table = default_table();
        for point in DEFAULT_VBUS_CALIBRATION {
            assert_eq!(table.correct(point.measured_mv), point.actual_mv);
        }
    }

    #[test]
    fn interpolates_between_entries() {
        let table = default_table();
        assert_eq!(round_millivolts(table.correct_f32(7285.5)), 6991);

        let linear = CalibrationTable::new(&LINEAR).unwrap();
        assert_eq!(linear.correct(150), 300);
    }

    #[test]
    fn extrapolates_along_boundary_segments() {
        let linear = CalibrationTable::new(&LINEAR).unwrap();
        assert_eq!(linear.correct(300), 600);
        assert_eq!(linear.correct(50), 100);

        let table = default_table();
        let slope = (20030.0 - 11961.0) / (19907.0 - 12070.0);
        let expected = 20030.0 + slope * (21000.0 - 19907.0);
        let corrected = i32::from(table.correct(21000));
        assert!((corrected - (expected + 0.5) as i32).abs() <= 1);
    }

    #[test]
    fn result_is_clamped() {
        let table = default_table();
        assert_eq!(table.correct(0), 0);
        assert_eq!(round_millivolts(70000.0), u16::MAX);
    }

    #[test]
    fn invalid_tables_are_rejected() {
        static SINGLE: [CalibrationPoint; 1] = [CalibrationPoint::new(1, 1)];
        static UNSORTED: [CalibrationPoint; 3] = [
            CalibrationPoint::new(1, 1),
            CalibrationPoint::new(5, 5),
            CalibrationPoint::new(5, 6),
        ];

        assert_eq!(CalibrationTable::new(&SINGLE).unwrap_err(), CalibrationError::TooFewPoints(1));
        assert_eq!(CalibrationTable::new(&UNSORTED).unwrap_err(), CalibrationError::Unsorted(2));
    }

    #[test]
    fn converter_applies_divider_and_calibration() {
        let uncalibrated = VbusConverter::new(3300, 4095, 68_000, 4_700);
        // 3300 / 4095 * 72700 / 4700 = 12.465 mV per count.
        assert_eq!(uncalibrated.millivolts(0), 0);
        assert_eq!(uncalibrated.millivolts(400), 4986);

        let calibrated = VbusConverter::default();
        assert_eq!(calibrated.millivolts(0), 0);
        assert!(calibrated.millivolts(400) < 4986);
    }

    #[test]
    fn vdd_from_internal_reference() {
        let converter = VbusConverter::default();
        assert_eq!(converter.vdd_millivolts(1489), 3300);
        assert_eq!(converter.vdd_millivolts(0), 0);
    }
}
