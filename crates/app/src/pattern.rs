//! Scheduling of whole brightness grids.

use ledgrid_core::DeviceId;

use crate::{
    registry::TaskRegistry,
    task::{Schedule, TaskId},
};

/// Groups lit cells of the grid by their brightness.
///
/// Only the part of the grid that overlaps the `rows x cols` matrix is considered and cells
/// with zero brightness are skipped. Groups are returned in order of the first occurrence of
/// their brightness, devices within a group in row-major order.
pub fn group_by_brightness<R: AsRef<[u8]>>(
    grid: &[R],
    rows: usize,
    cols: usize,
) -> Vec<(u8, Vec<DeviceId>)> {
    let mut groups: Vec<(u8, Vec<DeviceId>)> = Vec::new();

    for (row, values) in grid.iter().take(rows).enumerate() {
        for (col, &brightness) in values.as_ref().iter().take(cols).enumerate() {
            if brightness == 0 {
                continue;
            }

            let id = row * cols + col;
            match groups.iter_mut().find(|(level, _)| *level == brightness) {
                Some((_, ids)) => ids.push(id),
                None => groups.push((brightness, vec![id])),
            }
        }
    }
    groups
}

impl TaskRegistry {
    /// Schedules a brightness grid to appear for the given duration.
    ///
    /// Devices sharing the same brightness are merged into one task, so the number of tasks is
    /// the number of distinct non-zero brightness levels. Devices with zero brightness in the
    /// grid are not scheduled at all.
    pub fn schedule_pattern<R: AsRef<[u8]>>(
        &self,
        grid: &[R],
        start: u32,
        duration: u32,
        restore_original: bool,
    ) -> Vec<TaskId> {
        let matrix = self.matrix();
        group_by_brightness(grid, matrix.rows(), matrix.cols())
            .into_iter()
            .filter_map(|(brightness, ids)| {
                let schedule = Schedule::new(start, duration)
                    .with_brightness(brightness)
                    .with_restore(restore_original);
                self.schedule_devices(ids, schedule).ok()
            })
            .collect()
    }
}
