//! Task registry, the owner of every scheduled task.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use ledgrid_core::{time_units, DeviceId, Error, Matrix, Result};
use tokio::runtime::Handle;

use crate::task::{Schedule, ScheduledTask, TaskId, TaskStatus};

#[derive(Default)]
struct TaskTable {
    next_id: u32,
    tasks: BTreeMap<TaskId, Arc<ScheduledTask>>,
}

/// Schedules deferred brightness changes on the matrix devices.
///
/// Each task runs in two phases driven by tokio timers: the activation timer turns the devices
/// on after `start` time units and arms the restore timer, which brings the devices back after
/// `duration` time units. None of the methods block, so the registry can be used from any
/// thread, inside or outside of the runtime.
///
/// Finished and cancelled tasks are kept in the registry until [`TaskRegistry::compact`] is
/// called. Dropping the registry aborts all armed timers.
pub struct TaskRegistry {
    matrix: Arc<Matrix>,
    time_unit: Duration,
    runtime: Handle,
    table: Mutex<TaskTable>,
}

impl TaskRegistry {
    /// Creates a registry that arms its timers on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn new(matrix: Arc<Matrix>, time_unit: Duration) -> Self {
        Self::with_runtime(matrix, time_unit, Handle::current())
    }

    /// Creates a registry that arms its timers on the given runtime.
    pub fn with_runtime(matrix: Arc<Matrix>, time_unit: Duration, runtime: Handle) -> Self {
        Self {
            matrix,
            time_unit,
            runtime,
            table: Mutex::default(),
        }
    }

    pub fn matrix(&self) -> &Arc<Matrix> {
        &self.matrix
    }

    pub fn time_unit(&self) -> Duration {
        self.time_unit
    }

    fn table(&self) -> MutexGuard<'_, TaskTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Schedules the devices to be turned on together.
    ///
    /// Unknown identifiers are skipped; if none of them belongs to the matrix nothing is
    /// scheduled and [`Error::EmptySelection`] is returned.
    pub fn schedule_devices<I>(&self, ids: I, schedule: Schedule) -> Result<TaskId>
    where
        I: IntoIterator<Item = DeviceId>,
    {
        let mut seen = vec![false; self.matrix.len()];
        let devices: Vec<DeviceId> = ids
            .into_iter()
            .filter(|&id| id < seen.len() && !std::mem::replace(&mut seen[id], true))
            .collect();

        if devices.is_empty() {
            log::error!("No valid LEDs to schedule");
            return Err(Error::EmptySelection);
        }

        let task = {
            let mut table = self.table();
            let id = TaskId(table.next_id);
            table.next_id += 1;

            let task = Arc::new(ScheduledTask::new(id, &self.matrix, devices, schedule));
            table.tasks.insert(id, task.clone());
            task
        };

        let handle = self.runtime.spawn(activation(
            task.clone(),
            self.matrix.clone(),
            self.time_unit,
        ));
        task.set_activate_timer(handle);

        log::debug!(
            "Scheduled task {} for LEDs {:?}: start={}, duration={}, brightness={}",
            task.id(),
            task.devices(),
            schedule.start,
            schedule.duration,
            schedule.brightness
        );
        Ok(task.id())
    }

    /// Schedules a single device.
    pub fn schedule_device(&self, id: DeviceId, schedule: Schedule) -> Result<TaskId> {
        self.schedule_devices([id], schedule)
    }

    /// Schedules every device in the row.
    pub fn schedule_row(&self, row: usize, schedule: Schedule) -> Result<TaskId> {
        let Some(ids) = self.matrix.row_ids(row) else {
            log::error!("Row {row} is out of bounds");
            return Err(Error::InvalidAddress);
        };
        self.schedule_devices(ids, schedule)
    }

    /// Schedules every device in the column.
    pub fn schedule_column(&self, col: usize, schedule: Schedule) -> Result<TaskId> {
        let Some(ids) = self.matrix.column_ids(col) else {
            log::error!("Column {col} is out of bounds");
            return Err(Error::InvalidAddress);
        };
        self.schedule_devices(ids, schedule)
    }

    /// Schedules the whole matrix.
    pub fn schedule_all(&self, schedule: Schedule) -> Result<TaskId> {
        self.schedule_devices(0..self.matrix.len(), schedule)
    }

    /// Cancels a task which has not been fired yet.
    ///
    /// Returns false if the task is unknown, already fired or already cancelled.
    pub fn cancel(&self, id: TaskId) -> bool {
        self.try_cancel(id).is_ok()
    }

    /// Same as [`TaskRegistry::cancel`], but reports the reason of a failure.
    pub fn try_cancel(&self, id: TaskId) -> Result<()> {
        let task = self.table().tasks.get(&id).cloned();
        let Some(task) = task else {
            log::error!("Task {id} not found");
            return Err(Error::TaskNotFound);
        };
        task.cancel()
    }

    /// Returns the current status of the task.
    pub fn task_status(&self, id: TaskId) -> Option<TaskStatus> {
        self.table().tasks.get(&id).map(|task| task.status())
    }

    /// Returns the number of tasks that have neither completed nor been cancelled.
    pub fn active_task_count(&self) -> usize {
        self.table()
            .tasks
            .values()
            .filter(|task| task.status().is_active())
            .count()
    }

    /// Returns the number of tasks kept in the registry, including finished ones.
    pub fn task_count(&self) -> usize {
        self.table().tasks.len()
    }

    /// Removes completed and cancelled tasks, returns how many were removed.
    pub fn compact(&self) -> usize {
        let mut table = self.table();
        let before = table.tasks.len();
        table.tasks.retain(|_, task| task.status().is_active());
        let removed = before - table.tasks.len();
        log::debug!("Removed {removed} finished tasks");
        removed
    }
}

impl Drop for TaskRegistry {
    fn drop(&mut self) {
        for task in self.table().tasks.values() {
            task.abort_timers();
        }
    }
}

/// Activation phase, arms the restore phase as an independent timer.
async fn activation(task: Arc<ScheduledTask>, matrix: Arc<Matrix>, time_unit: Duration) {
    let schedule = task.schedule();
    tokio::time::sleep(time_units(time_unit, schedule.start)).await;

    if !task.activate(&matrix) {
        return;
    }

    let restore_task = task.clone();
    let handle = tokio::spawn(async move {
        tokio::time::sleep(time_units(time_unit, schedule.duration)).await;
        restore_task.restore(&matrix);
    });
    task.set_restore_timer(handle);
}
