//! Driver error taxonomy
//!
//! Every driver operation returns [`Error<E>`] where `E` is the error type of
//! the bus the driver runs on. Drivers fail fast: nothing here is retried.

use core::fmt;

/// Result alias used by all drivers
pub type Result<T, E> = core::result::Result<T, Error<E>>;

/// Errors surfaced by the drivers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Operation issued before `init()` completed
    NotInitialized,
    /// Parameter out of range where clamping is not appropriate
    InvalidArgument,
    /// Calibrated read requested before calibration data exists
    NotCalibrated,
    /// Re-initialization would overwrite fixed calibration parameters
    AlreadyConfigured,
    /// Opening the slave failed (no device, bad address)
    BusOpen(E),
    /// Transaction failed on an open slave
    BusIo(E),
    /// Response length differs from what the protocol mandates
    Protocol {
        /// Bytes the protocol requires
        expected: usize,
        /// Bytes actually delivered
        actual: usize,
    },
}

impl<E> Error<E> {
    /// Wrap an error from `BusPort::open`
    pub fn open(e: E) -> Self {
        Error::BusOpen(e)
    }

    /// Wrap an error from a slave transaction
    pub fn io(e: E) -> Self {
        Error::BusIo(e)
    }

    /// Check that a response had exactly the mandated length
    pub fn check_len(expected: usize, actual: usize) -> Result<(), E> {
        if expected == actual {
            Ok(())
        } else {
            Err(Error::Protocol { expected, actual })
        }
    }

    /// Whether this error came from the bus collaborator
    pub fn is_bus(&self) -> bool {
        matches!(self, Error::BusOpen(_) | Error::BusIo(_))
    }

    /// Convert the bus error type
    pub fn map_bus<F, E2>(self, f: F) -> Error<E2>
    where
        F: FnOnce(E) -> E2,
    {
        match self {
            Error::NotInitialized => Error::NotInitialized,
            Error::InvalidArgument => Error::InvalidArgument,
            Error::NotCalibrated => Error::NotCalibrated,
            Error::AlreadyConfigured => Error::AlreadyConfigured,
            Error::BusOpen(e) => Error::BusOpen(f(e)),
            Error::BusIo(e) => Error::BusIo(f(e)),
            Error::Protocol { expected, actual } => Error::Protocol { expected, actual },
        }
    }
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotInitialized => f.write_str("driver not initialized"),
            Error::InvalidArgument => f.write_str("invalid argument"),
            Error::NotCalibrated => f.write_str("no calibration data"),
            Error::AlreadyConfigured => f.write_str("calibration parameters already set"),
            Error::BusOpen(e) => write!(f, "failed to open bus slave: {:?}", e),
            Error::BusIo(e) => write!(f, "bus transaction failed: {:?}", e),
            Error::Protocol { expected, actual } => write!(
                f,
                "protocol error: expected {} bytes, got {}",
                expected, actual
            ),
        }
    }
}

impl<E: fmt::Debug> core::error::Error for Error<E> {}
