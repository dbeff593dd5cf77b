//! PCA9685 16-channel PWM controller
//!
//! The prescaler is fixed at 0x64, which with the internal 25 MHz
//! oscillator gives roughly 61 Hz, the usual servo frame rate. Every channel
//! shares that frequency, so [`Pca9685::set_pwm`] is only a duty control.
//!
//! Channel outputs are updated with a single burst to the channel's
//! `LEDn_OFF` register pair. MODE1 auto-increment makes the low and high
//! bytes land in one transaction, so the output never sees a half-updated
//! pulse width.

use embedded_hal_async::delay::DelayNs;
use kairo_core::config::PwmConfig;
use kairo_core::servo::{
    clamp_channel, duty_to_ticks, ServoCalibration, CHANNEL_COUNT, MAX_CHANNEL,
};
use kairo_core::Error;
use kairo_hal::BusPort;

use crate::transport;

/// Register addresses
pub mod reg {
    pub const MODE1: u8 = 0x00;
    pub const MODE2: u8 = 0x01;
    /// `LED0_OFF_L`; each further channel is [`CHANNEL_STRIDE`] higher
    pub const CHANNEL_BASE: u8 = 0x08;
    pub const CHANNEL_STRIDE: u8 = 4;
    pub const PRESCALE: u8 = 0xFE;
}

/// MODE1 bits
mod mode1 {
    pub const SLEEP: u8 = 0x10;
    pub const AUTO_INCREMENT: u8 = 0x20;
}

/// MODE2 totem-pole outputs
const MODE2_OUTDRV: u8 = 0x04;

/// Prescale for ~61 Hz
const PRESCALE_61HZ: u8 = 0x64;

/// Register init sequence, written in order
const INIT_SEQUENCE: [(u8, u8); 5] = [
    (reg::MODE1, 0x00),
    (reg::MODE2, MODE2_OUTDRV),
    (reg::MODE1, mode1::SLEEP),
    (reg::PRESCALE, PRESCALE_61HZ),
    (reg::MODE1, mode1::AUTO_INCREMENT),
];

/// First register of a channel's output pair
pub const fn channel_register(channel: u8) -> u8 {
    reg::CHANNEL_BASE + channel * reg::CHANNEL_STRIDE
}

/// PCA9685 driver
pub struct Pca9685<P: BusPort, D> {
    port: P,
    delay: D,
    config: PwmConfig,
    slave: Option<P::Slave>,
    calibration: Option<ServoCalibration>,
}

impl<P: BusPort, D: DelayNs> Pca9685<P, D> {
    /// Create a new driver; nothing is sent until [`Pca9685::init`]
    pub fn new(port: P, delay: D, config: PwmConfig) -> Self {
        Self {
            port,
            delay,
            config,
            slave: None,
            calibration: None,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &PwmConfig {
        &self.config
    }

    /// Check if initialized
    pub fn is_initialized(&self) -> bool {
        self.slave.is_some()
    }

    /// Servo calibration in use, if any
    pub fn calibration(&self) -> Option<&ServoCalibration> {
        self.calibration.as_ref()
    }

    /// Program the oscillator and, optionally, center every servo
    ///
    /// `None` installs the default calibration, replacing one from an
    /// earlier `init`. An explicit calibration different from the one already
    /// installed is refused with [`Error::AlreadyConfigured`] before any bus
    /// traffic.
    pub async fn init(
        &mut self,
        calibration: Option<ServoCalibration>,
    ) -> Result<(), Error<P::Error>> {
        let calibration = match (self.calibration, calibration) {
            (Some(current), Some(requested)) if current != requested => {
                warn!("PCA9685 already configured, refusing new calibration");
                return Err(Error::AlreadyConfigured);
            }
            (Some(_), None) => {
                warn!("PCA9685 re-init without calibration, using defaults");
                ServoCalibration::default()
            }
            (_, Some(requested)) => requested,
            (None, None) => ServoCalibration::default(),
        };
        if !calibration.is_valid() {
            return Err(Error::InvalidArgument);
        }

        let mut slave = transport::open(&self.port, self.config.address).await?;
        for (register, value) in INIT_SEQUENCE {
            transport::write8(&mut slave, register, value).await?;
        }
        self.delay.delay_ms(self.config.mode_settle_ms).await;

        self.slave = Some(slave);
        self.calibration = Some(calibration);
        debug!(
            "PCA9685 at {:#x}: pulse {} - {} s over +/-{} deg",
            self.config.address,
            calibration.min_pulse_s,
            calibration.max_pulse_s,
            calibration.angle_range_deg
        );

        if self.config.zero_on_init {
            for channel in 0..CHANNEL_COUNT {
                self.set_servo(channel, 0.0).await?;
            }
        }
        Ok(())
    }

    /// Move a servo
    ///
    /// The channel is clamped to 15 and the angle to the calibrated range
    /// (NaN counts as center). Returns the tick count written.
    pub async fn set_servo(&mut self, channel: u8, angle_deg: f32) -> Result<u16, Error<P::Error>> {
        let calibration = self.calibration.ok_or(Error::NotInitialized)?;
        let channel = clamp_channel(channel);
        let ticks = calibration.angle_to_ticks(angle_deg);
        self.write_channel(channel, ticks).await?;
        trace!("Servo {}: {} ticks", channel, ticks);
        Ok(ticks)
    }

    /// Set a raw duty ratio in `[0.0, 1.0]`
    ///
    /// Out-of-range duty or a channel above 15 is rejected. Returns the
    /// tick count written.
    pub async fn set_pwm(&mut self, channel: u8, duty: f32) -> Result<u16, Error<P::Error>> {
        if self.slave.is_none() {
            return Err(Error::NotInitialized);
        }
        if channel > MAX_CHANNEL {
            return Err(Error::InvalidArgument);
        }
        let ticks = duty_to_ticks(duty).ok_or(Error::InvalidArgument)?;
        self.write_channel(channel, ticks).await?;
        trace!("PWM {}: {} ticks", channel, ticks);
        Ok(ticks)
    }

    async fn write_channel(&mut self, channel: u8, ticks: u16) -> Result<(), Error<P::Error>> {
        let slave = self.slave.as_mut().ok_or(Error::NotInitialized)?;
        let [low, high] = ticks.to_le_bytes();
        transport::write_bytes(slave, &[channel_register(channel), low, high & 0x0F]).await
    }
}
