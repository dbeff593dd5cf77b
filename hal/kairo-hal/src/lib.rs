//! Kairo Hardware Abstraction Layer
//!
//! This crate defines the bus capability that every Kairo driver is written
//! against. A driver never touches a concrete I2C peripheral; it receives a
//! [`BusPort`], opens one [`BusSlave`] for its peripheral address during
//! `init()`, and performs byte-level transactions through it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application (owns drivers, sets pace)  │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  kairo-drivers (MCP3424, PCA9685, ...)  │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  kairo-hal (this crate - traits)        │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  any embedded-hal-async I2C master      │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`bus::BusPort`] - Opens a session to one slave address
//! - [`bus::BusSlave`] - Byte-level writes and reads on that session
//!
//! [`shared::SharedI2cPort`] implements both on top of an
//! `embedded_hal_async::i2c::I2c` bus guarded by an `embassy-sync` mutex, so
//! several drivers can share one physical bus.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod bus;
pub mod shared;

// Re-export key traits at crate root for convenience
pub use bus::{is_valid_address, BusPort, BusSlave, MAX_ADDRESS};
pub use shared::{BusError, SharedI2cPort, SharedI2cSlave};
