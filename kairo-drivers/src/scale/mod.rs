//! Load-cell scale drivers
//!
//! - M5Stack Mini Scales: HX711 front end behind an STM32 that exposes a
//!   command-addressed register bank with on-board calibration

pub mod mini_scales;

pub use mini_scales::{CalibrationPhase, CalibrationPrompt, MiniScale, Rgb, ScaleReading};
