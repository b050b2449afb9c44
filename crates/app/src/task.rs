//! Scheduled brightness tasks.

use std::{
    fmt::Display,
    sync::{
        atomic::{AtomicU8, Ordering},
        Mutex, PoisonError,
    },
};

use ledgrid_core::{DeviceId, Error, Matrix, Result, MAX_BRIGHTNESS};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

/// Unique task identifier, assigned in increasing order by the registry.
#[derive(
    Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Debug, PartialOrd, Ord, Hash, Default,
)]
pub struct TaskId(pub u32);

impl Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Task lifecycle: `Pending -> Fired -> Completed` or `Pending -> Cancelled`.
#[repr(u8)]
#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Debug)]
pub enum TaskStatus {
    /// Waiting for the activation timer.
    Pending = 0,
    /// Devices are lit, waiting for the restore timer.
    Fired = 1,
    /// Devices have been restored.
    Completed = 2,
    /// Cancelled before activation.
    Cancelled = 3,
}

impl TaskStatus {
    fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Pending,
            1 => Self::Fired,
            2 => Self::Completed,
            _ => Self::Cancelled,
        }
    }

    /// Returns true if the task has neither completed nor been cancelled.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Fired)
    }
}

/// Timing and brightness parameters of a task.
///
/// Offsets and durations are expressed in time units, see
/// [`Configuration::time_unit`](ledgrid_core::Configuration::time_unit).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// Delay before the devices are turned on.
    pub start: u32,
    /// How long the devices stay on.
    pub duration: u32,
    /// Target brightness.
    pub brightness: u8,
    /// Restore the brightness captured at scheduling time instead of turning the devices off.
    pub restore_original: bool,
}

impl Schedule {
    /// Full brightness with restoring of the original state.
    pub fn new(start: u32, duration: u32) -> Self {
        Self {
            start,
            duration,
            brightness: MAX_BRIGHTNESS,
            restore_original: true,
        }
    }

    #[must_use]
    pub fn with_brightness(mut self, brightness: u8) -> Self {
        self.brightness = brightness;
        self
    }

    #[must_use]
    pub fn with_restore(mut self, restore_original: bool) -> Self {
        self.restore_original = restore_original;
        self
    }
}

#[derive(Default)]
struct Timers {
    activate: Option<JoinHandle<()>>,
    restore: Option<JoinHandle<()>>,
}

/// Deferred brightness change of a set of devices.
pub(crate) struct ScheduledTask {
    id: TaskId,
    devices: Vec<DeviceId>,
    schedule: Schedule,
    /// Brightness of every target device captured when the task was created.
    snapshot: Vec<u8>,
    status: AtomicU8,
    timers: Mutex<Timers>,
}

impl ScheduledTask {
    /// Creates a pending task and captures the current brightness of its devices.
    pub(crate) fn new(
        id: TaskId,
        matrix: &Matrix,
        devices: Vec<DeviceId>,
        schedule: Schedule,
    ) -> Self {
        let snapshot = devices
            .iter()
            .map(|&id| matrix.device(id).map_or(0, ledgrid_core::Device::brightness))
            .collect();
        Self {
            id,
            devices,
            schedule,
            snapshot,
            status: AtomicU8::new(TaskStatus::Pending as u8),
            timers: Mutex::default(),
        }
    }

    pub(crate) fn id(&self) -> TaskId {
        self.id
    }

    pub(crate) fn schedule(&self) -> Schedule {
        self.schedule
    }

    pub(crate) fn devices(&self) -> &[DeviceId] {
        &self.devices
    }

    pub(crate) fn status(&self) -> TaskStatus {
        TaskStatus::from_code(self.status.load(Ordering::Acquire))
    }

    /// Single compare-and-swap transition, closes the race between firing and cancelling.
    fn transition(&self, from: TaskStatus, to: TaskStatus) -> bool {
        self.status
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn timers(&self) -> std::sync::MutexGuard<'_, Timers> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_activate_timer(&self, handle: JoinHandle<()>) {
        if self.status() == TaskStatus::Cancelled {
            handle.abort();
        }
        self.timers().activate = Some(handle);
    }

    pub(crate) fn set_restore_timer(&self, handle: JoinHandle<()>) {
        self.timers().restore = Some(handle);
    }

    /// Turns the target devices on.
    ///
    /// Returns false without touching the devices if the task has already been fired or
    /// cancelled.
    pub(crate) fn activate(&self, matrix: &Matrix) -> bool {
        if !self.transition(TaskStatus::Pending, TaskStatus::Fired) {
            return false;
        }

        for device in self.devices.iter().filter_map(|&id| matrix.device(id)) {
            device.on(self.schedule.brightness);
        }
        log::debug!("Executed task {} for LEDs {:?}", self.id, self.devices);
        true
    }

    /// Restores the snapshot, or turns the devices off, and completes the task.
    pub(crate) fn restore(&self, matrix: &Matrix) {
        for (&id, &original) in self.devices.iter().zip(&self.snapshot) {
            let Some(device) = matrix.device(id) else {
                continue;
            };

            if self.schedule.restore_original && original > 0 {
                device.set_brightness(original);
            } else {
                device.off();
            }
        }
        self.status
            .store(TaskStatus::Completed as u8, Ordering::Release);
        log::debug!("Completed task {} for LEDs {:?}", self.id, self.devices);
    }

    /// Cancels the task if it has not been fired yet.
    pub(crate) fn cancel(&self) -> Result<()> {
        if !self.transition(TaskStatus::Pending, TaskStatus::Cancelled) {
            log::warn!("Task {} already executed", self.id);
            return Err(Error::AlreadyFired);
        }

        if let Some(handle) = self.timers().activate.take() {
            handle.abort();
        }
        log::debug!("Cancelled task {} for LEDs {:?}", self.id, self.devices);
        Ok(())
    }

    /// Aborts every armed timer without touching the task status.
    pub(crate) fn abort_timers(&self) {
        let mut timers = self.timers();
        for handle in [timers.activate.take(), timers.restore.take()]
            .into_iter()
            .flatten()
        {
            handle.abort();
        }
    }
}
