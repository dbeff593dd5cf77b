//! M5Stack Mini Scales unit
//!
//! An STM32 reads the HX711 and exposes the result through a small register
//! bank. Every access is a command byte, optionally followed by a payload,
//! then a fixed settle delay, then a fixed-length read.
//!
//! # Register map
//!
//! | Command | Access | Payload / response |
//! |---------|--------|--------------------|
//! | 0x00 | R | raw ADC, i32 LE |
//! | 0x10 | R | weight in grams, f32 LE |
//! | 0x20 | R | button status, 1 byte |
//! | 0x30 | R/W | LED colour, 3 bytes RGB |
//! | 0x40 | R/W | gap, f32 LE |
//! | 0x50 | W | tare trigger, `0x01` |
//! | 0x60 | R | weight x100, i32 LE |
//! | 0x70 | R | weight as NUL-terminated ASCII, 16 bytes |
//! | 0x80 | R/W | low-pass filter enable, 1 byte |
//! | 0x81 | R/W | average filter depth, 1 byte |
//! | 0x82 | R/W | EMA filter alpha, 1 byte |
//! | 0xFE | R | firmware version, 1 byte |
//! | 0xFF | R/W | I2C address, 1 byte |
//!
//! # Calibration
//!
//! The gap register plays two roles. [`MiniScale::full_calibration`]
//! treats it as a scale factor (ADC counts per gram) on top of the unit's
//! own latched zero, while [`MiniScale::calibrate_zero`] and
//! [`MiniScale::clear_gap`] treat it as an additive offset in grams. Both
//! paths are kept as the firmware is observed to accept them.
//!
//! A host-only path ([`MiniScale::simple_calibrate`] and
//! [`MiniScale::get_weight_calibrated`]) ignores the unit's calibration
//! entirely and converts raw ADC readings with locally held parameters.

use embedded_hal_async::delay::DelayNs;
use heapless::String;
use kairo_core::calibration::{
    average_rounded, is_valid_weight, two_point_gap, CalibrationReport, SoftwareCalibration,
};
use kairo_core::config::ScaleConfig;
use kairo_core::Error;
use kairo_hal::{is_valid_address, BusPort};

use crate::transport;

/// Command bytes
pub mod cmd {
    /// Raw 24-bit ADC reading (i32)
    pub const RAW_ADC: u8 = 0x00;
    /// Calibrated weight (f32 grams)
    pub const WEIGHT: u8 = 0x10;
    /// Button status
    pub const BUTTON: u8 = 0x20;
    /// RGB LED
    pub const LED: u8 = 0x30;
    /// Gap / offset (f32)
    pub const GAP: u8 = 0x40;
    /// Latch current reading as zero
    pub const TARE: u8 = 0x50;
    /// Calibrated weight (i32, grams x100)
    pub const WEIGHT_X100: u8 = 0x60;
    /// Calibrated weight (ASCII)
    pub const WEIGHT_STRING: u8 = 0x70;
    /// Low-pass filter enable
    pub const LP_FILTER: u8 = 0x80;
    /// Averaging filter depth
    pub const AVG_FILTER: u8 = 0x81;
    /// EMA filter alpha
    pub const EMA_FILTER: u8 = 0x82;
    /// Firmware version
    pub const FIRMWARE_VERSION: u8 = 0xFE;
    /// I2C address
    pub const I2C_ADDRESS: u8 = 0xFF;
}

/// Payload written with [`cmd::TARE`]
const TARE_TRIGGER: u8 = 0x01;

/// Length of the weight string register
pub const WEIGHT_STRING_LEN: usize = 16;

/// LED colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rgb {
    /// Red
    pub r: u8,
    /// Green
    pub g: u8,
    /// Blue
    pub b: u8,
}

impl Rgb {
    /// Create a colour from components
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Unpack `0xRRGGBB`; bits above 24 are ignored
    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: (hex >> 16) as u8,
            g: (hex >> 8) as u8,
            b: hex as u8,
        }
    }

    /// Pack as `0xRRGGBB`
    pub const fn to_hex(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }
}

/// One snapshot of the three weight-related registers
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScaleReading {
    /// Raw ADC
    pub adc: i32,
    /// Weight in grams
    pub weight: f32,
    /// Weight in hundredths of a gram
    pub weight_x100: i32,
}

/// Step of the firmware calibration the user has to act on
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationPhase {
    /// Remove everything from the scale
    Unloaded,
    /// Place the reference weight on the scale
    LoadKnownWeight {
        /// Reference weight in grams
        grams: f32,
    },
}

/// Hook awaited at each user-facing calibration step
///
/// The settle delay for the phase starts after `prompt` returns, so an
/// implementation can wait for a button press instead of relying on the
/// delay alone. `()` does nothing.
#[allow(async_fn_in_trait)]
pub trait CalibrationPrompt {
    /// Tell the user what to do next
    async fn prompt(&mut self, phase: CalibrationPhase);
}

impl CalibrationPrompt for () {
    async fn prompt(&mut self, _phase: CalibrationPhase) {}
}

/// Mini Scales driver
pub struct MiniScale<P: BusPort, D> {
    port: P,
    delay: D,
    config: ScaleConfig,
    address: u8,
    slave: Option<P::Slave>,
    software: Option<SoftwareCalibration>,
}

impl<P: BusPort, D: DelayNs> MiniScale<P, D> {
    /// Create a new driver; nothing is sent until [`MiniScale::init`]
    pub fn new(port: P, delay: D, config: ScaleConfig) -> Self {
        Self {
            port,
            delay,
            address: config.address,
            config,
            slave: None,
            software: None,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &ScaleConfig {
        &self.config
    }

    /// Current slave address
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Check if initialized
    pub fn is_initialized(&self) -> bool {
        self.slave.is_some()
    }

    /// Open the slave and wait for the unit to settle
    pub async fn init(&mut self) -> Result<(), Error<P::Error>> {
        let slave = transport::open(&self.port, self.address).await?;
        self.slave = Some(slave);
        self.delay.delay_ms(self.config.init_settle_ms).await;
        debug!("Mini Scales opened at {:#x}", self.address);
        Ok(())
    }

    // ========================================================================
    // Register access
    // ========================================================================

    /// Write a command byte, settle, read `N` bytes
    async fn query<const N: usize>(&mut self, command: u8) -> Result<[u8; N], Error<P::Error>> {
        let slave = self.slave.as_mut().ok_or(Error::NotInitialized)?;
        transport::write_byte(slave, command).await?;
        self.delay.delay_ms(self.config.read_settle_ms).await;
        transport::read_exact(slave).await
    }

    /// Write a command with payload, then settle
    async fn command(&mut self, bytes: &[u8], settle_ms: u32) -> Result<(), Error<P::Error>> {
        let slave = self.slave.as_mut().ok_or(Error::NotInitialized)?;
        transport::write_bytes(slave, bytes).await?;
        self.delay.delay_ms(settle_ms).await;
        Ok(())
    }

    async fn query_u8(&mut self, command: u8) -> Result<u8, Error<P::Error>> {
        let [value] = self.query::<1>(command).await?;
        Ok(value)
    }

    async fn set_u8(&mut self, command: u8, value: u8) -> Result<(), Error<P::Error>> {
        self.command(&[command, value], self.config.read_settle_ms)
            .await
    }

    // ========================================================================
    // Measurements
    // ========================================================================

    /// Raw signed ADC reading
    pub async fn get_raw_adc(&mut self) -> Result<i32, Error<P::Error>> {
        let data = self.query::<4>(cmd::RAW_ADC).await?;
        Ok(i32::from_le_bytes(data))
    }

    /// Weight in grams as calibrated by the unit
    pub async fn get_weight(&mut self) -> Result<f32, Error<P::Error>> {
        let data = self.query::<4>(cmd::WEIGHT).await?;
        Ok(f32::from_le_bytes(data))
    }

    /// Weight in hundredths of a gram as calibrated by the unit
    pub async fn get_weight_x100(&mut self) -> Result<i32, Error<P::Error>> {
        let data = self.query::<4>(cmd::WEIGHT_X100).await?;
        Ok(i32::from_le_bytes(data))
    }

    /// Weight as the unit formats it
    ///
    /// The register is NUL-terminated ASCII; bytes outside ASCII are
    /// replaced with `?`.
    pub async fn get_weight_string(
        &mut self,
    ) -> Result<String<WEIGHT_STRING_LEN>, Error<P::Error>> {
        let data = self.query::<WEIGHT_STRING_LEN>(cmd::WEIGHT_STRING).await?;
        Ok(decode_weight_string(&data))
    }

    /// Raw ADC, weight and weight x100 in one go
    pub async fn read_data(&mut self) -> Result<ScaleReading, Error<P::Error>> {
        let adc = self.get_raw_adc().await?;
        let weight = self.get_weight().await?;
        let weight_x100 = self.get_weight_x100().await?;
        Ok(ScaleReading {
            adc,
            weight,
            weight_x100,
        })
    }

    // ========================================================================
    // Gap / offset
    // ========================================================================

    /// Current gap register value
    pub async fn get_gap_value(&mut self) -> Result<f32, Error<P::Error>> {
        let data = self.query::<4>(cmd::GAP).await?;
        let gap = f32::from_le_bytes(data);
        debug!("Gap value: {}", gap);
        Ok(gap)
    }

    /// Write the gap register
    pub async fn set_gap_value(&mut self, gap: f32) -> Result<(), Error<P::Error>> {
        let [b0, b1, b2, b3] = gap.to_le_bytes();
        self.command(&[cmd::GAP, b0, b1, b2, b3], self.config.write_settle_ms)
            .await?;
        debug!("Gap set to {}", gap);
        Ok(())
    }

    /// Make the unit latch its current reading as zero (hardware tare)
    pub async fn tare(&mut self) -> Result<(), Error<P::Error>> {
        self.command(&[cmd::TARE, TARE_TRIGGER], self.config.write_settle_ms)
            .await?;
        debug!("Tare latched");
        Ok(())
    }

    /// Zero the current load by folding it into the gap as an offset
    ///
    /// Writes `gap + weight` and returns the weight read afterwards, which
    /// should be near zero.
    pub async fn calibrate_zero(&mut self) -> Result<f32, Error<P::Error>> {
        let weight = self.get_weight().await?;
        let gap = self.get_gap_value().await?;
        let offset = gap + weight;
        info!("Zeroing: weight {} g, gap {} -> {}", weight, gap, offset);

        self.set_gap_value(offset).await?;
        self.delay.delay_ms(self.config.write_settle_ms).await;

        let after = self.get_weight().await?;
        info!("Weight after zeroing: {} g", after);
        Ok(after)
    }

    /// Reset the gap register to zero
    pub async fn clear_gap(&mut self) -> Result<(), Error<P::Error>> {
        self.set_gap_value(0.0).await
    }

    // ========================================================================
    // Firmware calibration
    // ========================================================================

    /// Average the configured number of raw samples
    async fn sample_raw_average(&mut self) -> Result<i32, Error<P::Error>> {
        let timing = self.config.calibration;
        let mut sum: i64 = 0;
        for _ in 0..timing.samples {
            sum += self.get_raw_adc().await? as i64;
            self.delay.delay_ms(timing.sample_interval_ms).await;
        }
        Ok(average_rounded(sum, timing.samples as u32))
    }

    /// Two-point calibration of the unit's gap register
    ///
    /// 1. Clear the gap.
    /// 2. Prompt for an empty scale, settle, average raw samples (`adc0`).
    /// 3. Trigger the unit's tare.
    /// 4. Prompt for `known_weight` grams, settle, average raw samples.
    /// 5. `gap = (adc_known - adc0) / known_weight`, write it, read it back.
    ///
    /// A read-back mismatch is logged and reported, not retried. The
    /// sequence runs to completion or fails at the first bus error.
    pub async fn full_calibration<C: CalibrationPrompt>(
        &mut self,
        known_weight: f32,
        prompt: &mut C,
    ) -> Result<CalibrationReport, Error<P::Error>> {
        if !is_valid_weight(known_weight) {
            return Err(Error::InvalidArgument);
        }
        if self.slave.is_none() {
            return Err(Error::NotInitialized);
        }
        let timing = self.config.calibration;
        info!("Calibration start, reference {} g", known_weight);

        self.set_gap_value(0.0).await?;
        self.delay.delay_ms(timing.clear_settle_ms).await;

        prompt.prompt(CalibrationPhase::Unloaded).await;
        self.delay.delay_ms(timing.unloaded_settle_ms).await;
        let raw_adc_zero = self.sample_raw_average().await?;
        info!("Unloaded ADC average: {}", raw_adc_zero);

        self.tare().await?;
        self.delay.delay_ms(timing.tare_settle_ms).await;

        prompt
            .prompt(CalibrationPhase::LoadKnownWeight {
                grams: known_weight,
            })
            .await;
        self.delay.delay_ms(timing.loaded_settle_ms).await;
        let raw_adc_known = self.sample_raw_average().await?;
        info!("Loaded ADC average: {}", raw_adc_known);

        let gap =
            two_point_gap(raw_adc_zero, raw_adc_known, known_weight).ok_or(Error::InvalidArgument)?;
        info!(
            "Gap = ({} - {}) / {} = {}",
            raw_adc_known, raw_adc_zero, known_weight, gap
        );

        self.set_gap_value(gap).await?;
        self.delay.delay_ms(timing.verify_settle_ms).await;
        let verified_gap = self.get_gap_value().await?;

        let report = CalibrationReport {
            raw_adc_zero,
            raw_adc_known,
            gap,
            verified_gap,
        };
        if report.is_verified() {
            info!("Calibration complete, gap {}", gap);
        } else {
            warn!("Gap read back as {}, wrote {}", verified_gap, gap);
        }
        Ok(report)
    }

    // ========================================================================
    // Software calibration
    // ========================================================================

    /// Store a host-side linear calibration
    ///
    /// `scale = known_weight / (known_adc - zero_adc)`. Needs no bus access.
    pub fn simple_calibrate(
        &mut self,
        zero_adc: i32,
        known_weight: f32,
        known_adc: i32,
    ) -> Result<(), Error<P::Error>> {
        let cal = SoftwareCalibration::new(zero_adc, known_weight, known_adc)
            .ok_or(Error::InvalidArgument)?;
        info!(
            "Software calibration: zero {}, {} g per count",
            cal.zero_adc(),
            cal.scale()
        );
        self.software = Some(cal);
        Ok(())
    }

    /// Host-side calibration, if set
    pub fn software_calibration(&self) -> Option<&SoftwareCalibration> {
        self.software.as_ref()
    }

    /// Weight from a raw reading using the host-side calibration
    pub async fn get_weight_calibrated(&mut self) -> Result<f32, Error<P::Error>> {
        let cal = self.software.ok_or(Error::NotCalibrated)?;
        let adc = self.get_raw_adc().await?;
        Ok(cal.weight(adc))
    }

    // ========================================================================
    // Peripherals and settings
    // ========================================================================

    /// Button status byte
    pub async fn get_button_status(&mut self) -> Result<u8, Error<P::Error>> {
        self.query_u8(cmd::BUTTON).await
    }

    /// Set the LED colour
    pub async fn set_led_color(&mut self, color: Rgb) -> Result<(), Error<P::Error>> {
        self.command(
            &[cmd::LED, color.r, color.g, color.b],
            self.config.read_settle_ms,
        )
        .await
    }

    /// Set the LED colour from `0xRRGGBB`
    pub async fn set_led_color_hex(&mut self, hex: u32) -> Result<(), Error<P::Error>> {
        self.set_led_color(Rgb::from_hex(hex)).await
    }

    /// Current LED colour
    pub async fn get_led_color(&mut self) -> Result<Rgb, Error<P::Error>> {
        let [r, g, b] = self.query::<3>(cmd::LED).await?;
        Ok(Rgb::new(r, g, b))
    }

    /// Enable or disable the low-pass filter
    pub async fn set_lp_filter(&mut self, enable: bool) -> Result<(), Error<P::Error>> {
        self.set_u8(cmd::LP_FILTER, enable as u8).await
    }

    /// Whether the low-pass filter is enabled
    pub async fn get_lp_filter(&mut self) -> Result<bool, Error<P::Error>> {
        Ok(self.query_u8(cmd::LP_FILTER).await? != 0)
    }

    /// Set the averaging filter depth
    pub async fn set_avg_filter(&mut self, depth: u8) -> Result<(), Error<P::Error>> {
        self.set_u8(cmd::AVG_FILTER, depth).await
    }

    /// Averaging filter depth
    pub async fn get_avg_filter(&mut self) -> Result<u8, Error<P::Error>> {
        self.query_u8(cmd::AVG_FILTER).await
    }

    /// Set the EMA filter alpha
    pub async fn set_ema_filter(&mut self, alpha: u8) -> Result<(), Error<P::Error>> {
        self.set_u8(cmd::EMA_FILTER, alpha).await
    }

    /// EMA filter alpha
    pub async fn get_ema_filter(&mut self) -> Result<u8, Error<P::Error>> {
        self.query_u8(cmd::EMA_FILTER).await
    }

    /// Firmware version byte
    pub async fn get_firmware_version(&mut self) -> Result<u8, Error<P::Error>> {
        self.query_u8(cmd::FIRMWARE_VERSION).await
    }

    /// Address the unit reports for itself
    pub async fn get_i2c_address(&mut self) -> Result<u8, Error<P::Error>> {
        self.query_u8(cmd::I2C_ADDRESS).await
    }

    /// Move the unit to a new address and reconnect there
    ///
    /// If reopening fails the driver is left uninitialized at the new
    /// address; call [`MiniScale::init`] to retry.
    pub async fn set_i2c_address(&mut self, address: u8) -> Result<(), Error<P::Error>> {
        if !is_valid_address(address) {
            return Err(Error::InvalidArgument);
        }
        self.set_u8(cmd::I2C_ADDRESS, address).await?;
        info!("Mini Scales moved {:#x} -> {:#x}", self.address, address);

        self.slave = None;
        self.address = address;
        self.init().await
    }
}

/// Decode the NUL-terminated weight string register
fn decode_weight_string(data: &[u8; WEIGHT_STRING_LEN]) -> String<WEIGHT_STRING_LEN> {
    let mut s = String::new();
    for &b in data.iter().take_while(|&&b| b != 0) {
        let c = if b.is_ascii() { b as char } else { '?' };
        // Capacity equals the register length, so this cannot overflow
        let _ = s.push(c);
    }
    s
}
