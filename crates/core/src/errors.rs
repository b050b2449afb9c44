use core::fmt::Display;

use displaydoc::Display;
use serde::{Deserialize, Serialize};

/// A specialized result type for the LED matrix.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors that can occur when driving the LED matrix.
///
/// None of them is fatal: the scheduling core reports them and keeps running.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display, Debug, Serialize, Deserialize)]
#[repr(u16)]
pub enum Error {
    /// The row, column or device identifier is out of the matrix bounds.
    InvalidAddress = 1,
    /// The selection does not contain any device of the matrix.
    EmptySelection = 2,
    /// The task has already been fired or cancelled.
    AlreadyFired = 3,
    /// There is no task with the given identifier.
    TaskNotFound = 4,
    /// The output sink rejected a duty write.
    SinkWrite = 5,
    /// The pattern dimensions do not match the matrix dimensions.
    PatternDimensions = 6,
    /// The matrix configuration is invalid.
    InvalidConfig = 7,
    /// The name does not match any known variant.
    UnknownName = 8,
}

impl Error {
    /// Creates a new sink write error.
    pub fn sink_write<E>(_: E) -> Self
    where
        E: Display,
    {
        Self::SinkWrite
    }
}

impl std::error::Error for Error {}
