//! Servo and raw PWM tick math for the PCA9685 timing base
//!
//! The controller runs every channel off one prescaler programmed for a
//! 61 Hz period split into 4096 ticks. A channel's output is described by
//! the tick at which it switches off; the on tick stays at zero.
//!
//! Servo pulse width for an angle `a` in `[-range, range]`:
//!
//! ```text
//! pulse = ((min + max) + a / range * (max - min)) / 2
//! ticks = round(pulse * 61 * 4096)
//! ```

use serde::Deserialize;

/// PWM base frequency fixed by the prescaler
pub const PWM_FREQUENCY_HZ: u32 = 61;

/// Ticks per PWM period
pub const PWM_STEPS: u32 = 4096;

/// Largest tick value the 12-bit registers accept
pub const MAX_TICKS: u16 = 4095;

/// Number of PWM channels
pub const CHANNEL_COUNT: u8 = 16;

/// Highest channel index
pub const MAX_CHANNEL: u8 = CHANNEL_COUNT - 1;

/// Servo pulse calibration
///
/// Fixed once at controller init and invariant afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Deserialize)]
#[serde(default)]
pub struct ServoCalibration {
    /// Pulse width at `-angle_range` in seconds
    pub min_pulse_s: f32,
    /// Pulse width at `+angle_range` in seconds
    pub max_pulse_s: f32,
    /// Half of the usable travel in degrees
    pub angle_range_deg: f32,
}

impl Default for ServoCalibration {
    fn default() -> Self {
        // SG90-class hobby servo
        Self {
            min_pulse_s: 0.0011,
            max_pulse_s: 0.0019,
            angle_range_deg: 30.0,
        }
    }
}

impl ServoCalibration {
    /// Create a calibration from pulse bounds and angle range
    pub const fn new(min_pulse_s: f32, max_pulse_s: f32, angle_range_deg: f32) -> Self {
        Self {
            min_pulse_s,
            max_pulse_s,
            angle_range_deg,
        }
    }

    /// Check that the parameters describe a usable servo
    ///
    /// Pulses must be positive, ordered and fit inside one PWM period, and
    /// the angle range must be positive.
    pub fn is_valid(&self) -> bool {
        let period = 1.0 / PWM_FREQUENCY_HZ as f32;
        self.min_pulse_s.is_finite()
            && self.max_pulse_s.is_finite()
            && self.angle_range_deg.is_finite()
            && self.min_pulse_s > 0.0
            && self.max_pulse_s > self.min_pulse_s
            && self.max_pulse_s < period
            && self.angle_range_deg > 0.0
    }

    /// Clamp an angle to `[-angle_range, angle_range]`
    ///
    /// NaN maps to the center position.
    pub fn clamp_angle(&self, angle_deg: f32) -> f32 {
        if angle_deg.is_nan() {
            return 0.0;
        }
        angle_deg.clamp(-self.angle_range_deg, self.angle_range_deg)
    }

    /// Pulse width in seconds for an angle (clamped first)
    pub fn pulse_seconds(&self, angle_deg: f32) -> f32 {
        let angle = self.clamp_angle(angle_deg);
        let pulse_range = self.max_pulse_s - self.min_pulse_s;
        ((self.min_pulse_s + self.max_pulse_s) + angle / self.angle_range_deg * pulse_range) / 2.0
    }

    /// Tick count for an angle (clamped first)
    pub fn angle_to_ticks(&self, angle_deg: f32) -> u16 {
        seconds_to_ticks(self.pulse_seconds(angle_deg))
    }
}

/// Convert a pulse width to the nearest tick count
pub fn seconds_to_ticks(pulse_s: f32) -> u16 {
    let ticks = pulse_s * (PWM_FREQUENCY_HZ * PWM_STEPS) as f32;
    if ticks.is_nan() || ticks <= 0.0 {
        return 0;
    }
    // Round half up; ticks are never negative here
    let rounded = (ticks + 0.5) as u32;
    rounded.min(MAX_TICKS as u32) as u16
}

/// Convert a raw duty ratio to ticks: `floor(4095 * duty)`
///
/// Returns `None` when `duty` is outside `[0.0, 1.0]` or NaN.
pub fn duty_to_ticks(duty: f32) -> Option<u16> {
    if !(0.0..=1.0).contains(&duty) {
        return None;
    }
    Some((MAX_TICKS as f32 * duty) as u16)
}

/// Clamp a servo channel index to the last channel
pub const fn clamp_channel(channel: u8) -> u8 {
    if channel > MAX_CHANNEL {
        MAX_CHANNEL
    } else {
        channel
    }
}
