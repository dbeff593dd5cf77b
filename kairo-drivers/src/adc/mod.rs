//! ADC drivers
//!
//! - MCP3424: 4-channel 18-bit delta-sigma ADC with PGA

pub mod mcp3424;

pub use mcp3424::{command_byte, decode_raw, Mcp3424, RAW_MAX};
