//! Sequences of brightness grids played one after another.

use ledgrid_core::{Error, Grid, Result};

use crate::{registry::TaskRegistry, task::TaskId};

/// A single grid of the sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternStep {
    pub grid: Grid,
    /// How long the grid is shown, in time units.
    pub duration: u32,
    /// Pause after the grid before the next step starts, in time units.
    pub transition_time: u32,
}

/// Named lighting pattern made of consecutive steps.
///
/// Running the sequence turns every step into pattern tasks with accumulating start offsets,
/// so the whole animation is handed to the registry up front.
pub struct PatternSequence<'a> {
    registry: &'a TaskRegistry,
    name: String,
    steps: Vec<PatternStep>,
}

impl<'a> PatternSequence<'a> {
    pub fn new(registry: &'a TaskRegistry, name: impl Into<String>) -> Self {
        Self {
            registry,
            name: name.into(),
            steps: Vec::new(),
        }
    }

    pub fn registry(&self) -> &'a TaskRegistry {
        self.registry
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[PatternStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Returns the time of a single run, including transitions.
    ///
    /// Saturates at `u32::MAX` if the run does not fit into the time unit range.
    pub fn total_duration(&self) -> u32 {
        self.checked_total_duration().unwrap_or(u32::MAX)
    }

    fn checked_total_duration(&self) -> Option<u32> {
        self.steps.iter().try_fold(0_u32, |total, step| {
            total
                .checked_add(step.duration)?
                .checked_add(step.transition_time)
        })
    }

    /// Appends a step, the grid must match the matrix dimensions exactly.
    pub fn add_step(&mut self, grid: Grid, duration: u32, transition_time: u32) -> Result<()> {
        let matrix = self.registry.matrix();
        if grid.len() != matrix.rows() || grid.iter().any(|row| row.len() != matrix.cols()) {
            log::error!(
                "Pattern dimensions must match matrix dimensions ({}x{})",
                matrix.rows(),
                matrix.cols()
            );
            return Err(Error::PatternDimensions);
        }

        self.steps.push(PatternStep {
            grid,
            duration,
            transition_time,
        });
        log::debug!(
            "Added step to pattern '{}' with duration {duration}",
            self.name
        );
        Ok(())
    }

    /// Appends consecutive frames without transitions.
    pub fn add_frames<I>(&mut self, frames: I, duration_per_step: u32) -> Result<()>
    where
        I: IntoIterator<Item = Grid>,
    {
        for grid in frames {
            self.add_step(grid, duration_per_step, 0)?;
        }
        Ok(())
    }

    fn blank_grid(&self) -> Grid {
        let matrix = self.registry.matrix();
        vec![vec![0; matrix.cols()]; matrix.rows()]
    }

    /// Appends a step that lights up a single row.
    pub fn add_row_step(
        &mut self,
        row: usize,
        brightness: u8,
        duration: u32,
        transition_time: u32,
    ) -> Result<()> {
        let mut grid = self.blank_grid();
        let line = grid.get_mut(row).ok_or(Error::InvalidAddress)?;
        line.fill(brightness);
        self.add_step(grid, duration, transition_time)
    }

    /// Appends a step that lights up a single column.
    pub fn add_column_step(
        &mut self,
        col: usize,
        brightness: u8,
        duration: u32,
        transition_time: u32,
    ) -> Result<()> {
        if col >= self.registry.matrix().cols() {
            return Err(Error::InvalidAddress);
        }

        let mut grid = self.blank_grid();
        for line in &mut grid {
            line[col] = brightness;
        }
        self.add_step(grid, duration, transition_time)
    }

    pub fn clear(&mut self) {
        self.steps.clear();
        log::debug!("Cleared pattern sequence for '{}'", self.name);
    }

    /// Schedules every step once, returns identifiers of the created tasks.
    ///
    /// Steps whose start offset does not fit into the time unit range are not scheduled.
    pub fn run_once(&self, start_delay: u32) -> Vec<TaskId> {
        if self.steps.is_empty() {
            log::warn!("No steps in pattern '{}'", self.name);
            return Vec::new();
        }

        let mut task_ids = Vec::new();
        let mut offset = Some(start_delay);
        for (index, step) in self.steps.iter().enumerate() {
            let Some(start) = offset else {
                log::warn!(
                    "Pattern '{}' is too long, skipped {} of {} steps",
                    self.name,
                    self.steps.len() - index,
                    self.steps.len()
                );
                break;
            };

            task_ids.extend(
                self.registry
                    .schedule_pattern(&step.grid, start, step.duration, true),
            );
            offset = start
                .checked_add(step.duration)
                .and_then(|offset| offset.checked_add(step.transition_time));
        }

        log::info!(
            "Scheduled pattern '{}' with {} steps",
            self.name,
            self.steps.len()
        );
        task_ids
    }

    /// Schedules the sequence several times back to back.
    ///
    /// Repetitions that would start beyond the time unit range are not scheduled.
    pub fn run_loop(&self, repetitions: u32, start_delay: u32) -> Vec<TaskId> {
        let total_duration = self.checked_total_duration();

        let mut task_ids = Vec::new();
        for i in 0..repetitions {
            let start = match (i, total_duration) {
                (0, _) => Some(start_delay),
                (_, Some(total)) => total
                    .checked_mul(i)
                    .and_then(|offset| offset.checked_add(start_delay)),
                (_, None) => None,
            };
            let Some(start) = start else {
                log::warn!(
                    "Pattern '{}' is too long, skipped {} of {repetitions} repetitions",
                    self.name,
                    repetitions - i
                );
                break;
            };
            task_ids.extend(self.run_once(start));
        }
        task_ids
    }

    /// Cancels tasks of a running sequence, steps that already fired are left to finish.
    pub fn stop(&self, task_ids: &[TaskId]) {
        for &id in task_ids {
            self.registry.cancel(id);
        }
        log::info!("Stopped pattern '{}'", self.name);
    }
}
