//! Board-agnostic core logic for the Kairo peripheral drivers
//!
//! This crate contains everything the drivers need that does not touch a
//! bus:
//!
//! - The driver error taxonomy
//! - Servo pulse and raw duty tick math (PCA9685 timing base)
//! - Load-cell calibration math (two-point gap, software calibration)
//! - Character LCD glyph mapping
//! - Configuration type definitions and board description parsing

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod calibration;
pub mod charset;
pub mod config;
pub mod error;
pub mod servo;

pub use error::{Error, Result};
