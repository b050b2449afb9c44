//! A single dimmable output of the matrix.

use std::{
    fmt::Display,
    sync::{Mutex, PoisonError},
};

use crate::{brightness_to_duty, sink::SharedSink, MAX_BRIGHTNESS};

/// Linear device identifier, `row * cols + col`.
pub type DeviceId = usize;

struct Binding {
    sink: SharedSink,
    channel: u8,
}

/// An independently dimmable LED.
///
/// Brightness is kept on the `0..=100` scale. Writes to the same device are serialized by an
/// internal lock, which is also held while the duty value is forwarded to the sink, so the
/// hardware always receives writes in the same order as the stored brightness changes.
pub struct Device {
    id: DeviceId,
    binding: Option<Binding>,
    brightness: Mutex<u8>,
}

impl Device {
    /// Creates an unbound device, brightness changes are only kept in memory.
    pub fn unbound(id: DeviceId) -> Self {
        log::debug!("LED {id} initialized without output");
        Self {
            id,
            binding: None,
            brightness: Mutex::new(0),
        }
    }

    /// Creates a device bound to the given sink channel.
    pub fn bound(id: DeviceId, sink: SharedSink, channel: u8) -> Self {
        log::debug!("LED {id} initialized on channel {channel}");
        Self {
            id,
            binding: Some(Binding { sink, channel }),
            brightness: Mutex::new(0),
        }
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    /// Returns the sink channel this device is bound to.
    pub fn channel(&self) -> Option<u8> {
        self.binding.as_ref().map(|binding| binding.channel)
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    /// Returns the current brightness level in `0..=100`.
    pub fn brightness(&self) -> u8 {
        *self.brightness.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets the brightness level, values above 100 are clamped.
    ///
    /// The new level is stored even if the sink rejects the write, the failure is only logged.
    pub fn set_brightness(&self, value: u8) {
        let value = value.min(MAX_BRIGHTNESS);

        let mut brightness = self.brightness.lock().unwrap_or_else(PoisonError::into_inner);
        *brightness = value;

        let Some(binding) = &self.binding else {
            return;
        };

        let duty = brightness_to_duty(value);
        let result = binding
            .sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .set_channel_duty(binding.channel, duty);
        match result {
            Ok(()) => log::debug!("LED {} brightness set to {value}%", self.id),
            Err(err) => log::error!("Error setting brightness for LED {}: {err}", self.id),
        }
    }

    /// Turns the device on at the given brightness.
    pub fn on(&self, brightness: u8) {
        self.set_brightness(brightness);
    }

    pub fn off(&self) {
        self.set_brightness(0);
    }

    /// Returns true if the device has any non-zero brightness.
    pub fn is_on(&self) -> bool {
        self.brightness() > 0
    }
}

impl Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LED(id={}, brightness={})", self.id, self.brightness())
    }
}
