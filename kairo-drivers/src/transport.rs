//! Transaction helpers shared by the drivers
//!
//! Thin wrappers over [`BusSlave`] that map bus errors into the driver
//! taxonomy and enforce exact response lengths.

use kairo_core::Error;
use kairo_hal::{BusPort, BusSlave};

/// Open a slave, mapping failure to [`Error::BusOpen`]
pub(crate) async fn open<P: BusPort>(port: &P, address: u8) -> Result<P::Slave, Error<P::Error>> {
    port.open(address).await.map_err(Error::open)
}

/// Write one byte
pub(crate) async fn write_byte<S: BusSlave>(slave: &mut S, byte: u8) -> Result<(), Error<S::Error>> {
    slave.write_byte(byte).await.map_err(Error::io)
}

/// Write a block in one transaction
pub(crate) async fn write_bytes<S: BusSlave>(
    slave: &mut S,
    bytes: &[u8],
) -> Result<(), Error<S::Error>> {
    slave.write_bytes(bytes).await.map_err(Error::io)
}

/// Write a register
pub(crate) async fn write8<S: BusSlave>(
    slave: &mut S,
    register: u8,
    value: u8,
) -> Result<(), Error<S::Error>> {
    slave.write8(register, value).await.map_err(Error::io)
}

/// Read exactly `N` bytes
///
/// A short response is a [`Error::Protocol`] error.
pub(crate) async fn read_exact<S: BusSlave, const N: usize>(
    slave: &mut S,
) -> Result<[u8; N], Error<S::Error>> {
    let mut buf = [0u8; N];
    let n = slave.read_bytes(&mut buf).await.map_err(Error::io)?;
    Error::check_len(N, n)?;
    Ok(buf)
}
