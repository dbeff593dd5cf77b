//! Bus capability traits
//!
//! A [`BusPort`] is the shared physical bus; a [`BusSlave`] is an open
//! session to one peripheral on it. Every call may suspend. Calls on one
//! slave never overlap (`&mut self`), which is the only ordering guarantee
//! the drivers rely on.

/// Highest valid 7-bit slave address
pub const MAX_ADDRESS: u8 = 0x7F;

/// Check that an address fits in 7 bits
pub const fn is_valid_address(address: u8) -> bool {
    address <= MAX_ADDRESS
}

/// Bus master able to open sessions to slave addresses
///
/// Implemented for shared references too, so one port can be handed to
/// several drivers:
///
/// ```ignore
/// let port = SharedI2cPort::new(&bus);
/// let mut adc = Mcp3424::new(port, delay, Mcp3424Config::default());
/// let mut lcd = Lcd1602::new(port, delay, LcdConfig::default());
/// ```
#[allow(async_fn_in_trait)]
pub trait BusPort {
    /// Error type shared by the port and its slaves
    type Error;

    /// Session type returned by [`BusPort::open`]
    type Slave: BusSlave<Error = Self::Error>;

    /// Open a session to the peripheral at `address`
    ///
    /// Fails if the address is not a 7-bit address or nothing answers there.
    async fn open(&self, address: u8) -> Result<Self::Slave, Self::Error>;
}

/// Open session to one peripheral
#[allow(async_fn_in_trait)]
pub trait BusSlave {
    /// Error type for bus transactions
    type Error;

    /// The address this session talks to
    fn address(&self) -> u8;

    /// Write a single byte
    async fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error> {
        self.write_bytes(&[byte]).await
    }

    /// Write a block of bytes in one transaction
    async fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Write `value` to `register`
    async fn write8(&mut self, register: u8, value: u8) -> Result<(), Self::Error> {
        self.write_bytes(&[register, value]).await
    }

    /// Read up to `buf.len()` bytes
    ///
    /// Returns the number of bytes the transport actually delivered. Drivers
    /// treat anything short of `buf.len()` as a protocol error.
    async fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

impl<T: BusPort> BusPort for &T {
    type Error = T::Error;
    type Slave = T::Slave;

    async fn open(&self, address: u8) -> Result<Self::Slave, Self::Error> {
        T::open(*self, address).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_range() {
        assert!(is_valid_address(0x00));
        assert!(is_valid_address(0x27));
        assert!(is_valid_address(0x7F));
        assert!(!is_valid_address(0x80));
        assert!(!is_valid_address(0xFF));
    }
}
