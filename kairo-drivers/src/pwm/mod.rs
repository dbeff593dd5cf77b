//! PWM controller drivers
//!
//! - PCA9685: 16-channel 12-bit PWM, run at a fixed 61 Hz for hobby servos

pub mod pca9685;

pub use pca9685::{channel_register, Pca9685};
