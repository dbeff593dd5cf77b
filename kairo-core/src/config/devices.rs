//! Per-peripheral configuration
//!
//! Each driver is constructed from one of these. Defaults match the usual
//! breakout boards: MCP3424 at 0x68, Mini Scales at 0x26, PCA9685 at 0x40
//! and the PCF8574 LCD backpack at 0x27.

use serde::Deserialize;

use super::board::ConfigError;
use crate::calibration::CalibrationTiming;

/// Default MCP3424 address (A0/A1 floating)
pub const DEFAULT_ADC_ADDRESS: u8 = 0x68;

/// Default M5Stack Mini Scales address
pub const DEFAULT_SCALE_ADDRESS: u8 = 0x26;

/// Default PCA9685 address (all address pins low)
pub const DEFAULT_PWM_ADDRESS: u8 = 0x40;

/// Default PCF8574 LCD backpack address
pub const DEFAULT_LCD_ADDRESS: u8 = 0x27;

/// MCP3424 input channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Deserialize)]
#[serde(try_from = "u8")]
pub enum AdcChannel {
    /// Channel 1
    #[default]
    Ch1 = 0,
    /// Channel 2
    Ch2 = 1,
    /// Channel 3
    Ch3 = 2,
    /// Channel 4
    Ch4 = 3,
}

impl TryFrom<u8> for AdcChannel {
    type Error = ConfigError;

    /// Channels are numbered 1-4 as on the datasheet
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(AdcChannel::Ch1),
            2 => Ok(AdcChannel::Ch2),
            3 => Ok(AdcChannel::Ch3),
            4 => Ok(AdcChannel::Ch4),
            _ => Err(ConfigError::InvalidChannel(value)),
        }
    }
}

/// MCP3424 programmable gain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Deserialize)]
#[serde(try_from = "u8")]
pub enum AdcGain {
    /// x1
    #[default]
    X1 = 0,
    /// x2
    X2 = 1,
    /// x4
    X4 = 2,
    /// x8
    X8 = 3,
}

impl TryFrom<u8> for AdcGain {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(AdcGain::X1),
            2 => Ok(AdcGain::X2),
            4 => Ok(AdcGain::X4),
            8 => Ok(AdcGain::X8),
            _ => Err(ConfigError::InvalidGain(value)),
        }
    }
}

/// MCP3424 ADC configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Deserialize)]
#[serde(default)]
pub struct AdcConfig {
    /// 7-bit I2C address
    pub address: u8,
    /// Input channel
    pub channel: AdcChannel,
    /// PGA gain
    pub gain: AdcGain,
}

impl Default for AdcConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADC_ADDRESS,
            channel: AdcChannel::Ch1,
            gain: AdcGain::X1,
        }
    }
}

/// Mini Scales unit configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Deserialize)]
#[serde(default)]
pub struct ScaleConfig {
    /// 7-bit I2C address
    pub address: u8,
    /// Delay after opening the slave
    pub init_settle_ms: u32,
    /// Delay between a register command and reading its response
    pub read_settle_ms: u32,
    /// Delay after writing the gap register or triggering tare
    pub write_settle_ms: u32,
    /// Firmware calibration procedure timing
    pub calibration: CalibrationTiming,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_SCALE_ADDRESS,
            init_settle_ms: 100,
            read_settle_ms: 10,
            write_settle_ms: 100,
            calibration: CalibrationTiming::default(),
        }
    }
}

/// PCA9685 controller configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Deserialize)]
#[serde(default)]
pub struct PwmConfig {
    /// 7-bit I2C address
    pub address: u8,
    /// Drive every channel to the servo center after init
    pub zero_on_init: bool,
    /// Oscillator restart time after programming the mode registers
    pub mode_settle_ms: u32,
}

impl Default for PwmConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_PWM_ADDRESS,
            zero_on_init: true,
            mode_settle_ms: 300,
        }
    }
}

/// Character LCD configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Deserialize)]
#[serde(default)]
pub struct LcdConfig {
    /// 7-bit I2C address of the expander
    pub address: u8,
    /// Hold time around each edge of the enable pulse
    pub enable_pulse_us: u32,
    /// Wait after a clear-display command
    pub clear_settle_ms: u32,
}

impl Default for LcdConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_LCD_ADDRESS,
            enable_pulse_us: 500,
            clear_settle_ms: 2,
        }
    }
}
