//! Load-cell calibration math
//!
//! Two independent calibration paths exist for the scale unit:
//!
//! - **Firmware path**: a two-point procedure computes a *gap* (ADC counts
//!   per gram) that is written to the unit's gap register after the unit
//!   has latched its own zero. The unit then reports calibrated weight.
//! - **Software path**: the host keeps `(zero_adc, scale)` and computes
//!   `weight = (adc - zero_adc) * scale` from raw readings.
//!
//! The gap register is also used additively by zero calibration; both uses
//! are kept as-is.

use serde::Deserialize;

/// Timing and sample count for the firmware calibration procedure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Deserialize)]
#[serde(default)]
pub struct CalibrationTiming {
    /// Raw samples averaged per calibration point
    pub samples: u8,
    /// Delay after each raw sample
    pub sample_interval_ms: u32,
    /// Delay after clearing the gap register
    pub clear_settle_ms: u32,
    /// Time allowed for the user to empty the scale
    pub unloaded_settle_ms: u32,
    /// Delay after the tare command
    pub tare_settle_ms: u32,
    /// Time allowed for the user to place the reference weight
    pub loaded_settle_ms: u32,
    /// Delay between writing the gap and reading it back
    pub verify_settle_ms: u32,
}

impl Default for CalibrationTiming {
    fn default() -> Self {
        Self {
            samples: 10,
            sample_interval_ms: 50,
            clear_settle_ms: 100,
            unloaded_settle_ms: 3000,
            tare_settle_ms: 200,
            loaded_settle_ms: 5000,
            verify_settle_ms: 200,
        }
    }
}

/// Outcome of a firmware calibration run
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationReport {
    /// Averaged raw ADC with the scale empty
    pub raw_adc_zero: i32,
    /// Averaged raw ADC with the reference weight
    pub raw_adc_known: i32,
    /// Gap computed and written
    pub gap: f32,
    /// Gap read back from the unit
    pub verified_gap: f32,
}

impl CalibrationReport {
    /// Whether the read-back gap matches what was written
    pub fn is_verified(&self) -> bool {
        self.gap.to_bits() == self.verified_gap.to_bits()
    }
}

/// Check that a reference weight is usable (finite and positive)
pub fn is_valid_weight(grams: f32) -> bool {
    grams.is_finite() && grams > 0.0
}

/// Average `count` samples summed into `sum`, rounding halves up
///
/// Returns 0 for an empty sample set.
pub fn average_rounded(sum: i64, count: u32) -> i32 {
    if count == 0 {
        return 0;
    }
    let n = count as i64;
    // floor(sum / n + 1/2)
    (2 * sum + n).div_euclid(2 * n) as i32
}

/// Gap (ADC counts per gram) from two calibration points
///
/// Returns `None` if `known_weight` is not a positive finite weight.
pub fn two_point_gap(adc_zero: i32, adc_known: i32, known_weight: f32) -> Option<f32> {
    if !is_valid_weight(known_weight) {
        return None;
    }
    let diff = adc_known as i64 - adc_zero as i64;
    Some(diff as f32 / known_weight)
}

/// Weight implied by a gap at a given raw reading
///
/// Inverse of [`two_point_gap`]: `(adc - adc_zero) / gap`.
pub fn weight_from_gap(adc: i32, adc_zero: i32, gap: f32) -> f32 {
    (adc as i64 - adc_zero as i64) as f32 / gap
}

/// Host-side linear calibration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SoftwareCalibration {
    zero_adc: i32,
    scale: f32,
}

impl SoftwareCalibration {
    /// Build from a zero reading and one reference reading
    ///
    /// Returns `None` if the weight is not positive and finite or the two
    /// readings are equal.
    pub fn new(zero_adc: i32, known_weight: f32, known_adc: i32) -> Option<Self> {
        if !is_valid_weight(known_weight) || known_adc == zero_adc {
            return None;
        }
        let span = known_adc as i64 - zero_adc as i64;
        Some(Self {
            zero_adc,
            scale: known_weight / span as f32,
        })
    }

    /// Raw reading with nothing on the scale
    pub fn zero_adc(&self) -> i32 {
        self.zero_adc
    }

    /// Grams per ADC count
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Convert a raw reading to grams
    pub fn weight(&self, adc: i32) -> f32 {
        (adc as i64 - self.zero_adc as i64) as f32 * self.scale
    }
}
