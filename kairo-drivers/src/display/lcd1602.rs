//! HD44780 16x2 character LCD on a PCF8574 backpack
//!
//! The expander drives the LCD's 4-bit bus. Each expander byte carries:
//!
//! | Bit | Signal |
//! |-----|--------|
//! | 7-4 | D7-D4 |
//! | 3 | backlight (always on) |
//! | 2 | E (enable) |
//! | 0 | RS (1 = data) |
//!
//! A byte goes out as two nibbles, high first. The LCD latches a nibble on
//! the falling edge of E, so every nibble is written once with E low, once
//! with E high and once with E low again, with a hold time around each
//! edge.

use embedded_hal_async::delay::DelayNs;
use kairo_core::charset::encode_line;
use kairo_core::config::LcdConfig;
use kairo_core::Error;
use kairo_hal::BusPort;

use crate::transport;

/// Expander bits
mod bits {
    pub const BACKLIGHT: u8 = 0x08;
    pub const ENABLE: u8 = 0x04;
}

/// HD44780 commands
pub mod cmd {
    /// Clear display and home the cursor
    pub const CLEAR: u8 = 0x01;
}

/// Power-on sequence: 8-bit reset twice then switch to 4-bit, entry mode
/// increment, display on with cursor off, 2-line 4-bit, clear
const INIT_SEQUENCE: [u8; 6] = [0x33, 0x32, 0x06, 0x0C, 0x28, cmd::CLEAR];

/// Register select
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Mode {
    /// Instruction register
    Command = 0,
    /// Data register (character codes)
    Data = 1,
}

/// DDRAM address command for the start of each line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Line {
    /// First line, DDRAM 0x00
    One = 0x80,
    /// Second line, DDRAM 0x40
    Two = 0xC0,
}

/// Split a byte into the two expander writes that carry it
pub const fn nibbles(byte: u8, mode: Mode) -> [u8; 2] {
    let rs = mode as u8;
    [
        rs | (byte & 0xF0) | bits::BACKLIGHT,
        rs | ((byte << 4) & 0xF0) | bits::BACKLIGHT,
    ]
}

/// LCD1602 driver
pub struct Lcd1602<P: BusPort, D> {
    port: P,
    delay: D,
    config: LcdConfig,
    slave: Option<P::Slave>,
}

impl<P: BusPort, D: DelayNs> Lcd1602<P, D> {
    /// Create a new driver; nothing is sent until [`Lcd1602::init`]
    pub fn new(port: P, delay: D, config: LcdConfig) -> Self {
        Self {
            port,
            delay,
            config,
            slave: None,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &LcdConfig {
        &self.config
    }

    /// Check if initialized
    pub fn is_initialized(&self) -> bool {
        self.slave.is_some()
    }

    /// Open the expander and run the power-on sequence
    pub async fn init(&mut self) -> Result<(), Error<P::Error>> {
        let slave = transport::open(&self.port, self.config.address).await?;
        self.slave = Some(slave);

        // A display that missed part of the sequence is not usable
        if let Err(e) = self.power_on().await {
            self.slave = None;
            return Err(e);
        }

        debug!("LCD opened at {:#x}", self.config.address);
        Ok(())
    }

    async fn power_on(&mut self) -> Result<(), Error<P::Error>> {
        for command in INIT_SEQUENCE {
            self.lcd_byte(command, Mode::Command).await?;
        }
        self.delay.delay_ms(self.config.clear_settle_ms).await;
        Ok(())
    }

    /// Write one line, always all 16 cells
    pub async fn print(&mut self, text: &str, line: Line) -> Result<(), Error<P::Error>> {
        if self.slave.is_none() {
            return Err(Error::NotInitialized);
        }
        self.lcd_byte(line as u8, Mode::Command).await?;
        for code in encode_line(text) {
            self.lcd_byte(code, Mode::Data).await?;
        }
        Ok(())
    }

    /// Blank the display
    pub async fn clear(&mut self) -> Result<(), Error<P::Error>> {
        self.lcd_byte(cmd::CLEAR, Mode::Command).await?;
        self.delay.delay_ms(self.config.clear_settle_ms).await;
        Ok(())
    }

    /// Send a raw byte to the instruction or data register
    pub async fn lcd_byte(&mut self, byte: u8, mode: Mode) -> Result<(), Error<P::Error>> {
        for nibble in nibbles(byte, mode) {
            let slave = self.slave.as_mut().ok_or(Error::NotInitialized)?;
            transport::write_byte(slave, nibble).await?;
            self.toggle_enable(nibble).await?;
        }
        Ok(())
    }

    async fn toggle_enable(&mut self, nibble: u8) -> Result<(), Error<P::Error>> {
        let hold_us = self.config.enable_pulse_us;
        let slave = self.slave.as_mut().ok_or(Error::NotInitialized)?;

        self.delay.delay_us(hold_us).await;
        transport::write_byte(slave, nibble | bits::ENABLE).await?;
        self.delay.delay_us(hold_us).await;
        transport::write_byte(slave, nibble & !bits::ENABLE).await?;
        self.delay.delay_us(hold_us).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{ms, Event, MockBus, MockDelay, MockError};
    use embassy_futures::block_on;

    const ADDR: u8 = 0x27;

    fn lcd(bus: &MockBus) -> Lcd1602<MockBus, MockDelay> {
        Lcd1602::new(bus.clone(), bus.delay(), LcdConfig::default())
    }

    fn ready(bus: &MockBus) -> Lcd1602<MockBus, MockDelay> {
        let mut l = lcd(bus);
        block_on(l.init()).unwrap();
        bus.clear_events();
        l
    }

    /// Reassemble `(rs, byte)` from the writes latched with E high
    fn latched(bus: &MockBus) -> Vec<(u8, u8)> {
        let strobes: Vec<u8> = bus
            .writes()
            .iter()
            .map(|w| w[0])
            .filter(|b| b & bits::ENABLE != 0)
            .collect();
        strobes
            .chunks(2)
            .map(|pair| (pair[0] & 0x01, (pair[0] & 0xF0) | (pair[1] >> 4)))
            .collect()
    }

    #[test]
    fn test_nibble_encoding() {
        assert_eq!(nibbles(0x33, Mode::Command), [0x38, 0x38]);
        assert_eq!(nibbles(0x28, Mode::Command), [0x28, 0x88]);
        assert_eq!(nibbles(b'A', Mode::Data), [0x49, 0x19]);
    }

    #[test]
    fn test_byte_handshake() {
        let bus = MockBus::new(&[ADDR]);
        let mut l = ready(&bus);

        block_on(l.lcd_byte(b'A', Mode::Data)).unwrap();

        let half_ms = Event::Delay(500_000);
        assert_eq!(
            bus.events(),
            vec![
                Event::Write(ADDR, vec![0x49]),
                half_ms.clone(),
                Event::Write(ADDR, vec![0x4D]),
                half_ms.clone(),
                Event::Write(ADDR, vec![0x49]),
                half_ms.clone(),
                Event::Write(ADDR, vec![0x19]),
                half_ms.clone(),
                Event::Write(ADDR, vec![0x1D]),
                half_ms.clone(),
                Event::Write(ADDR, vec![0x19]),
                half_ms,
            ]
        );
    }

    #[test]
    fn test_init_sequence() {
        let bus = MockBus::new(&[ADDR]);
        let mut l = lcd(&bus);
        block_on(l.init()).unwrap();

        let events = bus.events();
        assert_eq!(events.first(), Some(&Event::Open(ADDR)));
        assert_eq!(events.last(), Some(&ms(2)));
        assert_eq!(
            latched(&bus),
            vec![(0, 0x33), (0, 0x32), (0, 0x06), (0, 0x0C), (0, 0x28), (0, 0x01)]
        );
    }

    #[test]
    fn test_init_fails_without_device() {
        let bus = MockBus::new(&[]);
        let mut l = lcd(&bus);

        assert_eq!(block_on(l.init()), Err(Error::BusOpen(MockError::Nack(ADDR))));
        assert!(!l.is_initialized());
    }

    #[test]
    fn test_failed_init_leaves_driver_unusable() {
        let bus = MockBus::new(&[ADDR]);
        let mut l = lcd(&bus);

        bus.fail_io(true);
        assert_eq!(block_on(l.init()), Err(Error::BusIo(MockError::Io)));
        bus.fail_io(false);

        assert!(!l.is_initialized());
        assert_eq!(block_on(l.print("hi", Line::One)), Err(Error::NotInitialized));
        assert!(bus.writes().is_empty());

        // A later init succeeds normally
        block_on(l.init()).unwrap();
        assert!(l.is_initialized());
    }

    #[test]
    fn test_print_before_init() {
        let bus = MockBus::new(&[ADDR]);
        let mut l = lcd(&bus);

        assert_eq!(block_on(l.print("hi", Line::One)), Err(Error::NotInitialized));
        assert_eq!(block_on(l.clear()), Err(Error::NotInitialized));
        assert!(bus.events().is_empty());
    }

    #[test]
    fn test_print_pads_line() {
        let bus = MockBus::new(&[ADDR]);
        let mut l = ready(&bus);

        block_on(l.print("Hello", Line::One)).unwrap();

        let bytes = latched(&bus);
        assert_eq!(bytes.len(), 17);
        assert_eq!(bytes[0], (0, 0x80));
        assert!(bytes[1..].iter().all(|&(rs, _)| rs == 1));
        let data: Vec<u8> = bytes[1..].iter().map(|&(_, b)| b).collect();
        assert_eq!(data, b"Hello           ");
    }

    #[test]
    fn test_print_truncates_second_line() {
        let bus = MockBus::new(&[ADDR]);
        let mut l = ready(&bus);

        block_on(l.print("The quick brown fox", Line::Two)).unwrap();

        let bytes = latched(&bus);
        assert_eq!(bytes[0], (0, 0xC0));
        let data: Vec<u8> = bytes[1..].iter().map(|&(_, b)| b).collect();
        assert_eq!(data, b"The quick brown ");
    }

    #[test]
    fn test_print_marked_kana_uses_two_cells() {
        let bus = MockBus::new(&[ADDR]);
        let mut l = ready(&bus);

        block_on(l.print("データ", Line::One)).unwrap();

        let data: Vec<u8> = latched(&bus)[1..].iter().map(|&(_, b)| b).collect();
        assert_eq!(data.len(), 16);
        assert_eq!(data[..4], [0xC3, 0xDE, 0xB0, 0xC0]);
        assert!(data[4..].iter().all(|&b| b == b' '));
    }

    #[test]
    fn test_clear() {
        let bus = MockBus::new(&[ADDR]);
        let mut l = ready(&bus);

        block_on(l.clear()).unwrap();

        assert_eq!(latched(&bus), vec![(0, 0x01)]);
        assert_eq!(bus.events().last(), Some(&ms(2)));
    }

    #[test]
    fn test_io_error_stops_print() {
        let bus = MockBus::new(&[ADDR]);
        let mut l = ready(&bus);

        bus.fail_io(true);
        assert_eq!(
            block_on(l.print("x", Line::One)),
            Err(Error::BusIo(MockError::Io))
        );
        assert!(bus.writes().is_empty());
    }
}
