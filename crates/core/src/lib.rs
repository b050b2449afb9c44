//! LED matrix core
//!
//! Addressable matrix of dimmable LEDs and the output sink abstraction it drives.

// Linter configuration
#![warn(unsafe_code, clippy::pedantic, clippy::use_self)]
// Too many false positives.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::missing_const_for_fn,
    clippy::must_use_candidate
)]

use core::time::Duration;

pub use crate::{
    config::Configuration,
    device::{Device, DeviceId},
    errors::{Error, Result},
    matrix::Matrix,
    sink::{shared, OutputSink, SharedSink, SinkProvider},
};

pub mod config;
pub mod device;
pub mod errors;
pub mod matrix;
pub mod sink;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

/// Maximum brightness level.
pub const MAX_BRIGHTNESS: u8 = 100;
/// Maximum hardware duty value (16-bit PWM).
pub const MAX_DUTY: u16 = 0xFFFF;
/// Number of channels on a single output sink.
pub const CHANNELS_PER_SINK: u8 = 16;
/// Number of output sinks on a fully populated board.
pub const MAX_SINKS: usize = 4;
pub const DEFAULT_ROWS: usize = 6;
pub const DEFAULT_COLS: usize = 9;

/// A 2-D grid of brightness values, row by row.
pub type Grid = Vec<Vec<u8>>;

/// Converts a brightness level into the hardware duty value, `round(brightness / 100 * MAX_DUTY)`.
pub fn brightness_to_duty(brightness: u8) -> u16 {
    let brightness = u32::from(brightness.min(MAX_BRIGHTNESS));
    let duty = (brightness * u32::from(MAX_DUTY) + u32::from(MAX_BRIGHTNESS) / 2)
        / u32::from(MAX_BRIGHTNESS);
    u16::try_from(duty).unwrap_or(MAX_DUTY)
}

/// Converts a number of time units into a real delay, saturating at [`Duration::MAX`].
///
/// Timers armed with a saturated delay stay pending until they are cancelled.
pub fn time_units(time_unit: Duration, units: u32) -> Duration {
    time_unit.checked_mul(units).unwrap_or(Duration::MAX)
}
