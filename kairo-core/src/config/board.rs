//! Board description
//!
//! Lists the peripherals fitted to a board. Every table is optional; a
//! missing table means the part is not fitted.
//!
//! ```toml
//! [adc]
//! address = 0x68
//! channel = 1
//! gain = 1
//!
//! [pwm]
//! address = 0x40
//! zero_on_init = false
//!
//! [servo]
//! min_pulse_s = 0.001
//! max_pulse_s = 0.002
//! angle_range_deg = 30.0
//!
//! [lcd]
//! address = 0x27
//! ```

use core::fmt;

use serde::Deserialize;

use super::devices::{AdcConfig, LcdConfig, PwmConfig, ScaleConfig};
use crate::servo::ServoCalibration;

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Address does not fit in 7 bits
    InvalidAddress(u8),
    /// ADC channel outside 1-4
    InvalidChannel(u8),
    /// ADC gain not one of 1, 2, 4, 8
    InvalidGain(u8),
    /// Servo pulse bounds or angle range unusable
    InvalidServoCalibration,
    /// Two peripherals configured at the same address
    AddressConflict(u8),
    /// Malformed TOML (byte offset of the error, if known)
    Parse {
        /// Byte offset into the input
        offset: Option<usize>,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidAddress(a) => write!(f, "invalid 7-bit address 0x{:02X}", a),
            ConfigError::InvalidChannel(c) => write!(f, "invalid ADC channel {} (1-4)", c),
            ConfigError::InvalidGain(g) => write!(f, "invalid ADC gain {} (1, 2, 4, 8)", g),
            ConfigError::InvalidServoCalibration => f.write_str("invalid servo calibration"),
            ConfigError::AddressConflict(a) => write!(f, "address 0x{:02X} used twice", a),
            ConfigError::Parse { offset: Some(o) } => write!(f, "parse error at byte {}", o),
            ConfigError::Parse { offset: None } => f.write_str("parse error"),
        }
    }
}

impl core::error::Error for ConfigError {}

/// Peripherals fitted to a board
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BoardConfig {
    /// MCP3424 ADC
    pub adc: Option<AdcConfig>,
    /// Mini Scales load-cell unit
    pub scale: Option<ScaleConfig>,
    /// PCA9685 PWM controller
    pub pwm: Option<PwmConfig>,
    /// Servo calibration handed to the PWM controller's init
    pub servo: Option<ServoCalibration>,
    /// Character LCD
    pub lcd: Option<LcdConfig>,
}

impl BoardConfig {
    /// Addresses of all fitted peripherals
    pub fn addresses(&self) -> [Option<u8>; 4] {
        [
            self.adc.map(|c| c.address),
            self.scale.map(|c| c.address),
            self.pwm.map(|c| c.address),
            self.lcd.map(|c| c.address),
        ]
    }

    /// Check addresses and servo parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        let addresses = self.addresses();

        for (i, addr) in addresses.iter().enumerate() {
            let Some(addr) = *addr else { continue };
            if addr > 0x7F {
                return Err(ConfigError::InvalidAddress(addr));
            }
            if addresses[i + 1..].contains(&Some(addr)) {
                return Err(ConfigError::AddressConflict(addr));
            }
        }

        if let Some(servo) = &self.servo {
            if !servo.is_valid() {
                return Err(ConfigError::InvalidServoCalibration);
            }
        }

        Ok(())
    }
}

/// Parse and validate a board description
#[cfg(feature = "toml")]
pub fn parse_board_config(input: &str) -> Result<BoardConfig, ConfigError> {
    let config: BoardConfig = toml::from_str(input).map_err(|e| ConfigError::Parse {
        offset: e.span().map(|s| s.start),
    })?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AdcChannel, AdcGain};

    #[test]
    fn test_empty_board() {
        let config = BoardConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.addresses(), [None; 4]);
    }

    #[test]
    fn test_address_conflict() {
        let config = BoardConfig {
            adc: Some(AdcConfig {
                address: 0x40,
                ..Default::default()
            }),
            pwm: Some(PwmConfig::default()),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::AddressConflict(0x40)));
    }

    #[test]
    fn test_invalid_address() {
        let config = BoardConfig {
            lcd: Some(LcdConfig {
                address: 0x9E,
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidAddress(0x9E)));
    }

    #[test]
    fn test_invalid_servo() {
        let config = BoardConfig {
            servo: Some(ServoCalibration::new(0.002, 0.001, 30.0)),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidServoCalibration));
    }

    #[cfg(feature = "toml")]
    #[test]
    fn test_parse_full_board() {
        let input = r#"
# Bench board
[adc]
address = 0x69
channel = 2
gain = 4

[scale]
address = 0x26
read_settle_ms = 20

[scale.calibration]
samples = 5

[pwm]
zero_on_init = false

[servo]
min_pulse_s = 0.001
max_pulse_s = 0.002
angle_range_deg = 45

[lcd]
"#;
        let config = parse_board_config(input).unwrap();

        let adc = config.adc.unwrap();
        assert_eq!(adc.address, 0x69);
        assert_eq!(adc.channel, AdcChannel::Ch2);
        assert_eq!(adc.gain, AdcGain::X4);

        let scale = config.scale.unwrap();
        assert_eq!(scale.read_settle_ms, 20);
        assert_eq!(scale.write_settle_ms, 100);
        assert_eq!(scale.calibration.samples, 5);
        assert_eq!(scale.calibration.loaded_settle_ms, 5000);

        let pwm = config.pwm.unwrap();
        assert_eq!(pwm.address, 0x40);
        assert!(!pwm.zero_on_init);

        let servo = config.servo.unwrap();
        assert_eq!(servo.angle_range_deg, 45.0);

        assert_eq!(config.lcd, Some(LcdConfig::default()));
    }

    #[cfg(feature = "toml")]
    #[test]
    fn test_parse_rejects_bad_channel() {
        let err = parse_board_config("[adc]\nchannel = 7\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[cfg(feature = "toml")]
    #[test]
    fn test_parse_rejects_unknown_table() {
        let err = parse_board_config("[gps]\nbaud = 9600\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[cfg(feature = "toml")]
    #[test]
    fn test_parse_validates() {
        let err = parse_board_config("[adc]\naddress = 0x27\n[lcd]\n").unwrap_err();
        assert_eq!(err, ConfigError::AddressConflict(0x27));
    }
}
