//! Peripheral driver implementations
//!
//! This crate provides async drivers for discrete I2C parts, written
//! against the bus capability in kairo-hal:
//!
//! - ADC: MCP3424 18-bit delta-sigma converter
//! - Scale: M5Stack Mini Scales (HX711 behind an STM32 register bank)
//! - PWM: PCA9685 16-channel servo/PWM controller
//! - Display: HD44780 16x2 character LCD on a PCF8574 backpack
//!
//! Every driver follows the same discipline: `init()` opens exactly one bus
//! slave, each operation is a complete command / settle delay / response
//! sequence, and nothing is retried. Calls on one driver must not overlap;
//! `&mut self` enforces that within a task.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

// Must come first so the logging macros are visible to every module
#[macro_use]
mod fmt;

pub mod adc;
pub mod display;
pub mod pwm;
pub mod scale;

mod transport;

#[cfg(test)]
mod mock;
