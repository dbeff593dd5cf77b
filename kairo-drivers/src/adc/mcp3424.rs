//! MCP3424 18-bit ADC
//!
//! The MCP3424 is a 4-channel delta-sigma converter with a configuration
//! register selecting channel, conversion mode, resolution and PGA gain.
//!
//! # Protocol
//!
//! - Write the configuration byte. With the RDY bit set in one-shot mode
//!   this starts a new conversion.
//! - Read 3 bytes: the 18-bit result (upper 6 bits of the first byte are
//!   sign extension and are masked off).
//!
//! The read returns the *previous* conversion, not the one just started.
//! The first sample after `init()` or after a configuration change is
//! therefore stale and should be discarded by the caller. This is how the
//! part behaves; the driver does not hide it.
//!
//! Conversion to physical units (thermocouple temperature, voltage) is left
//! to the caller.

use kairo_core::config::{AdcChannel, AdcConfig, AdcGain};
use kairo_core::Error;
use kairo_hal::BusPort;

use crate::transport;

/// Configuration register bits
pub mod cfg {
    /// Ready bit; writing 1 in one-shot mode starts a conversion
    pub const RDY: u8 = 0x80;
    /// 18-bit resolution (3.75 SPS)
    pub const RES_18BIT: u8 = 0b11 << 2;
}

/// Largest raw value of an 18-bit conversion
pub const RAW_MAX: u32 = (1 << 18) - 1;

/// Bytes in an 18-bit conversion response
const RESPONSE_LEN: usize = 3;

/// Build the configuration byte for an 18-bit one-shot conversion
///
/// Channel 1 at gain 1 gives 0x8C.
pub const fn command_byte(channel: AdcChannel, gain: AdcGain) -> u8 {
    cfg::RDY | ((channel as u8) << 5) | cfg::RES_18BIT | gain as u8
}

/// Decode an 18-bit conversion response
///
/// `raw = ((b0 & 0b11) << 16) | (b1 << 8) | b2`
pub const fn decode_raw(data: [u8; 3]) -> u32 {
    (((data[0] & 0b11) as u32) << 16) | ((data[1] as u32) << 8) | data[2] as u32
}

/// MCP3424 driver
pub struct Mcp3424<P: BusPort> {
    port: P,
    config: AdcConfig,
    slave: Option<P::Slave>,
}

impl<P: BusPort> Mcp3424<P> {
    /// Create a new driver; nothing is sent until [`Mcp3424::init`]
    pub fn new(port: P, config: AdcConfig) -> Self {
        Self {
            port,
            config,
            slave: None,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &AdcConfig {
        &self.config
    }

    /// Check if initialized
    pub fn is_initialized(&self) -> bool {
        self.slave.is_some()
    }

    /// Open the slave at the configured address
    pub async fn init(&mut self) -> Result<(), Error<P::Error>> {
        let slave = transport::open(&self.port, self.config.address).await?;
        self.slave = Some(slave);
        debug!("MCP3424 opened at {:#x}", self.config.address);
        Ok(())
    }

    /// Switch channel or gain
    ///
    /// Takes effect with the next [`Mcp3424::read_data`], whose result is
    /// still from the old configuration.
    pub fn set_config(&mut self, channel: AdcChannel, gain: AdcGain) {
        self.config.channel = channel;
        self.config.gain = gain;
    }

    /// Start a conversion and read the previous result
    ///
    /// Returns the raw 18-bit magnitude in `[0, RAW_MAX]`.
    pub async fn read_data(&mut self) -> Result<u32, Error<P::Error>> {
        let command = command_byte(self.config.channel, self.config.gain);
        let slave = self.slave.as_mut().ok_or(Error::NotInitialized)?;

        transport::write_byte(slave, command).await?;
        let data: [u8; RESPONSE_LEN] = transport::read_exact(slave).await?;

        let raw = decode_raw(data);
        trace!("MCP3424 {:?} -> {}", data, raw);
        Ok(raw)
    }
}
