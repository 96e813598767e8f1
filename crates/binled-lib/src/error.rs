//! Unified error type for the binled-lib crate.
//!
//! [`BinledError`] wraps the bus error type ([`BusError`]) alongside the
//! validation failures raised by address resolution and mask encoding.
//! `From` impls allow `?` to propagate across module boundaries.

use std::fmt;

use crate::bus::BusError;

/// Unified error type for binled-lib operations.
#[derive(Debug)]
pub enum BinledError {
    /// The (category, store) pair is not on the grid and is not the reserved overflow bin.
    /// Carries the caller's raw, un-normalized input.
    UnknownAddress { category: String, store: String },
    /// A device index (or the highest set bit of a mask) does not fit the LED array.
    IndexOutOfRange { index: u64, led_count: usize },
    /// A raw frame could not be unpacked (wrong length, stray padding bits).
    Frame(String),
    /// Bus transport error.
    Bus(BusError),
    /// Standard I/O error (config persistence, worker thread spawn).
    Io(std::io::Error),
    /// Configuration validation error.
    Config(String),
}

impl BinledError {
    /// True for the index/mask range family of errors.
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, BinledError::IndexOutOfRange { .. })
    }
}

impl fmt::Display for BinledError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinledError::UnknownAddress { category, store } => {
                write!(f, "Unknown store/category: store={store}, category={category}")
            }
            BinledError::IndexOutOfRange { index, led_count } => {
                write!(f, "Index {index} is out of range (array has {led_count} LEDs)")
            }
            BinledError::Frame(e) => write!(f, "Frame error: {e}"),
            BinledError::Bus(e) => write!(f, "{e}"),
            BinledError::Io(e) => write!(f, "I/O error: {e}"),
            BinledError::Config(e) => write!(f, "Config error: {e}"),
        }
    }
}

impl std::error::Error for BinledError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BinledError::Bus(e) => Some(e),
            BinledError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<BusError> for BinledError {
    fn from(e: BusError) -> Self {
        BinledError::Bus(e)
    }
}

impl From<std::io::Error> for BinledError {
    fn from(e: std::io::Error) -> Self {
        BinledError::Io(e)
    }
}

/// Crate-level Result alias using [`BinledError`].
pub type Result<T> = std::result::Result<T, BinledError>;
