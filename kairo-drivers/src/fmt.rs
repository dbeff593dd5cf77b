//! Logging shims
//!
//! Forwards to `defmt` or `log` depending on the enabled feature and
//! compiles to nothing (while still borrowing the arguments) otherwise.
//! Format strings must stay within the subset both backends accept:
//! `{}`, `{:?}` and `{:#x}`.

#![allow(unused_macros)]

macro_rules! log_event {
    ($level:ident, $s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt")]
            ::defmt::$level!($s $(, $x)*);
            #[cfg(feature = "log")]
            ::log::$level!($s $(, $x)*);
            #[cfg(not(any(feature = "defmt", feature = "log")))]
            let _ = ($( & $x ),*);
        }
    };
}

macro_rules! trace {
    ($($arg:tt)*) => { log_event!(trace, $($arg)*) };
}

macro_rules! debug {
    ($($arg:tt)*) => { log_event!(debug, $($arg)*) };
}

macro_rules! info {
    ($($arg:tt)*) => { log_event!(info, $($arg)*) };
}

macro_rules! warn {
    ($($arg:tt)*) => { log_event!(warn, $($arg)*) };
}

macro_rules! error {
    ($($arg:tt)*) => { log_event!(error, $($arg)*) };
}
