//! Output sink abstraction.
//!
//! The matrix talks to the hardware only through these traits, so the same code runs against
//! a PWM driver board or an in-memory mock.

use std::sync::{Arc, Mutex};

use crate::Result;

/// A PWM-like output with a fixed number of channels.
///
/// # Implementations
///
/// - Hardware drivers exposing `CHANNELS_PER_SINK` duty cycle channels.
/// - [`MemorySink`](crate::test_utils::MemorySink) for tests.
pub trait OutputSink: Send {
    /// Writes a duty value in `0..=MAX_DUTY` to the given channel.
    ///
    /// Must not fail for valid ranges; any reported error is treated as non-fatal by callers.
    fn set_channel_duty(&mut self, channel: u8, duty: u16) -> Result<()>;
}

impl<T: ?Sized + OutputSink> OutputSink for Box<T> {
    fn set_channel_duty(&mut self, channel: u8, duty: u16) -> Result<()> {
        T::set_channel_duty(self, channel, duty)
    }
}

/// An output sink shared between all devices bound to its channels.
pub type SharedSink = Arc<Mutex<dyn OutputSink>>;

/// Wraps an output sink into a shareable handle.
pub fn shared<S: OutputSink + 'static>(sink: S) -> SharedSink {
    Arc::new(Mutex::new(sink))
}

/// Construction-time source of output sinks.
pub trait SinkProvider {
    /// Returns the ordered sequence of sinks.
    ///
    /// This method brings the sinks ownership to the caller and yields nothing on the next
    /// invocations.
    fn take_sinks(&mut self) -> Vec<SharedSink>;
}

impl SinkProvider for Vec<SharedSink> {
    fn take_sinks(&mut self) -> Vec<SharedSink> {
        core::mem::take(self)
    }
}
