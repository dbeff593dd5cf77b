//! Configuration types
//!
//! Per-peripheral settings with sensible defaults, and a board description
//! that lists which peripherals are fitted. The board description can be
//! parsed from TOML with the `toml` feature.

pub mod board;
pub mod devices;

pub use board::*;
pub use devices::*;
