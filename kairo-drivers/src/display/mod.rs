//! Character display drivers
//!
//! - LCD1602: HD44780 16x2 character LCD behind a PCF8574 I2C expander

pub mod lcd1602;

pub use lcd1602::{Lcd1602, Line, Mode};
