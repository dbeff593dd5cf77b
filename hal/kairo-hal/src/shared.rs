//! Shared I2C bus port
//!
//! Wraps any `embedded_hal_async::i2c::I2c` master in an `embassy-sync`
//! mutex. Each [`SharedI2cSlave`] locks the bus for exactly one transaction
//! (one write or one read), so drivers for different peripherals on the same
//! wires can interleave their calls. A driver's multi-step sequence (command,
//! settle delay, read) is not atomic with respect to other slaves; the
//! peripherals latch their own state between transactions.

use core::fmt;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::Mutex;
use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
use embedded_hal_async::i2c::I2c;

use crate::bus::{is_valid_address, BusPort, BusSlave};

/// Error from the shared bus port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError<E> {
    /// Address does not fit in 7 bits
    InvalidAddress(u8),
    /// Error reported by the underlying I2C master
    I2c(E),
}

impl<E: embedded_hal::i2c::Error> BusError<E> {
    /// Check whether the peripheral failed to acknowledge
    pub fn is_nack(&self) -> bool {
        match self {
            BusError::InvalidAddress(_) => false,
            BusError::I2c(e) => matches!(e.kind(), ErrorKind::NoAcknowledge(_)),
        }
    }

    /// Check whether the address itself was not acknowledged
    pub fn is_address_nack(&self) -> bool {
        match self {
            BusError::InvalidAddress(_) => false,
            BusError::I2c(e) => matches!(
                e.kind(),
                ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
            ),
        }
    }
}

impl<E: fmt::Debug> fmt::Display for BusError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusError::InvalidAddress(addr) => write!(f, "invalid 7-bit address 0x{:02X}", addr),
            BusError::I2c(e) => write!(f, "i2c error: {:?}", e),
        }
    }
}

impl<E: fmt::Debug> core::error::Error for BusError<E> {}

/// [`BusPort`] over a mutex-guarded I2C master
pub struct SharedI2cPort<'a, M: RawMutex, BUS> {
    bus: &'a Mutex<M, BUS>,
}

impl<'a, M: RawMutex, BUS> SharedI2cPort<'a, M, BUS> {
    /// Create a port over a shared bus
    pub const fn new(bus: &'a Mutex<M, BUS>) -> Self {
        Self { bus }
    }
}

impl<M: RawMutex, BUS> Clone for SharedI2cPort<'_, M, BUS> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M: RawMutex, BUS> Copy for SharedI2cPort<'_, M, BUS> {}

impl<'a, M: RawMutex, BUS: I2c> BusPort for SharedI2cPort<'a, M, BUS> {
    type Error = BusError<BUS::Error>;
    type Slave = SharedI2cSlave<'a, M, BUS>;

    async fn open(&self, address: u8) -> Result<Self::Slave, Self::Error> {
        if !is_valid_address(address) {
            return Err(BusError::InvalidAddress(address));
        }

        // Empty write: address phase only, the peripheral must ACK
        let mut bus = self.bus.lock().await;
        bus.write(address, &[]).await.map_err(BusError::I2c)?;

        Ok(SharedI2cSlave {
            bus: self.bus,
            address,
        })
    }
}

/// Session to one peripheral on a shared bus
pub struct SharedI2cSlave<'a, M: RawMutex, BUS> {
    bus: &'a Mutex<M, BUS>,
    address: u8,
}

impl<M: RawMutex, BUS: I2c> BusSlave for SharedI2cSlave<'_, M, BUS> {
    type Error = BusError<BUS::Error>;

    fn address(&self) -> u8 {
        self.address
    }

    async fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        let mut bus = self.bus.lock().await;
        bus.write(self.address, bytes).await.map_err(BusError::I2c)
    }

    async fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut bus = self.bus.lock().await;
        bus.read(self.address, buf).await.map_err(BusError::I2c)?;
        // An I2C master read either fills the buffer or errors
        Ok(buf.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use embedded_hal_async::i2c::{ErrorType, Operation};

    /// Fake I2C master with a single responding address
    struct FakeBus {
        present: u8,
        written: [u8; 8],
        written_len: usize,
        reply: [u8; 4],
    }

    impl FakeBus {
        fn new(present: u8) -> Self {
            Self {
                present,
                written: [0; 8],
                written_len: 0,
                reply: [0xDE, 0xAD, 0xBE, 0xEF],
            }
        }
    }

    impl ErrorType for FakeBus {
        type Error = ErrorKind;
    }

    impl I2c for FakeBus {
        async fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            if address != self.present {
                return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
            }
            for op in operations {
                match op {
                    Operation::Write(data) => {
                        self.written[..data.len()].copy_from_slice(&data[..]);
                        self.written_len = data.len();
                    }
                    Operation::Read(buf) => {
                        let n = buf.len();
                        buf.copy_from_slice(&self.reply[..n]);
                    }
                }
            }
            Ok(())
        }
    }

    async fn open_generic<P: BusPort>(port: P, address: u8) -> Result<P::Slave, P::Error> {
        port.open(address).await
    }

    #[test]
    fn test_open_present_address() {
        let bus = Mutex::<NoopRawMutex, _>::new(FakeBus::new(0x40));
        let port = SharedI2cPort::new(&bus);

        let slave = block_on(port.open(0x40)).unwrap();
        assert_eq!(slave.address(), 0x40);
    }

    #[test]
    fn test_open_absent_address_is_nack() {
        let bus = Mutex::<NoopRawMutex, _>::new(FakeBus::new(0x40));
        let port = SharedI2cPort::new(&bus);

        let err = block_on(port.open(0x41)).err().unwrap();
        assert!(err.is_nack());
        assert!(err.is_address_nack());
    }

    #[test]
    fn test_open_rejects_8bit_address() {
        let bus = Mutex::<NoopRawMutex, _>::new(FakeBus::new(0x40));
        let port = SharedI2cPort::new(&bus);

        let err = block_on(port.open(0x80)).err().unwrap();
        assert_eq!(err, BusError::InvalidAddress(0x80));
        assert!(!err.is_nack());
    }

    #[test]
    fn test_slave_write_and_read() {
        let bus = Mutex::<NoopRawMutex, _>::new(FakeBus::new(0x26));
        let port = SharedI2cPort::new(&bus);

        block_on(async {
            let mut slave = port.open(0x26).await.unwrap();
            slave.write8(0x80, 0x01).await.unwrap();

            let mut buf = [0u8; 3];
            let n = slave.read_bytes(&mut buf).await.unwrap();
            assert_eq!(n, 3);
            assert_eq!(buf, [0xDE, 0xAD, 0xBE]);
        });

        let fake = bus.try_lock().unwrap();
        assert_eq!(&fake.written[..fake.written_len], &[0x80, 0x01]);
    }

    #[test]
    fn test_port_shared_by_reference() {
        let bus = Mutex::<NoopRawMutex, _>::new(FakeBus::new(0x27));
        let port = SharedI2cPort::new(&bus);

        let mut slave = block_on(open_generic(&port, 0x27)).unwrap();
        block_on(slave.write_byte(0x08)).unwrap();

        let fake = bus.try_lock().unwrap();
        assert_eq!(&fake.written[..fake.written_len], &[0x08]);
    }
}
