//! Named pattern builders.
//!
//! Builders are pure frame generators over the matrix dimensions; the frames are played by a
//! [`PatternSequence`].

use std::{fmt::Display, str::FromStr};

use ledgrid_core::{time_units, Error, Grid, Matrix, Result, MAX_BRIGHTNESS};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::sequence::PatternSequence;

/// Movement direction of the chase and wave patterns.
#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Debug, Default)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    #[default]
    Right,
    Up,
    Down,
}

impl Direction {
    fn is_horizontal(self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }

    /// Right and down walk indices forward, left and up backward.
    fn index(self, i: usize, len: usize) -> usize {
        match self {
            Self::Right | Self::Down => i,
            Self::Left | Self::Up => len - 1 - i,
        }
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            _ => Err(Error::UnknownName),
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Up => "up",
            Self::Down => "down",
        })
    }
}

fn blank(rows: usize, cols: usize) -> Grid {
    vec![vec![0; cols]; rows]
}

fn column_frame(rows: usize, cols: usize, lit: impl Fn(usize) -> bool, brightness: u8) -> Grid {
    let mut grid = blank(rows, cols);
    for line in &mut grid {
        for (col, cell) in line.iter_mut().enumerate() {
            if lit(col) {
                *cell = brightness;
            }
        }
    }
    grid
}

fn row_frame(rows: usize, cols: usize, lit: impl Fn(usize) -> bool, brightness: u8) -> Grid {
    let mut grid = blank(rows, cols);
    for (row, line) in grid.iter_mut().enumerate() {
        if lit(row) {
            line.fill(brightness);
        }
    }
    grid
}

/// One lit column (or row) moving across the matrix.
pub fn chase(rows: usize, cols: usize, brightness: u8, direction: Direction) -> Vec<Grid> {
    if direction.is_horizontal() {
        (0..cols)
            .map(|i| {
                let col = direction.index(i, cols);
                column_frame(rows, cols, |c| c == col, brightness)
            })
            .collect()
    } else {
        (0..rows)
            .map(|i| {
                let row = direction.index(i, rows);
                row_frame(rows, cols, |r| r == row, brightness)
            })
            .collect()
    }
}

/// A band `width` lines wide sweeping across the matrix, entering and leaving it partially.
pub fn wave(
    rows: usize,
    cols: usize,
    brightness: u8,
    direction: Direction,
    width: usize,
) -> Vec<Grid> {
    let width = width.max(1);
    let len = if direction.is_horizontal() { cols } else { rows };

    // The band leading edge goes from `-(width - 1)` to `len - 1`.
    (0..len + width - 1)
        .map(|shift| {
            let lit = |i: usize| {
                let pos = direction.index(i, len);
                pos + width > shift && pos <= shift
            };
            if direction.is_horizontal() {
                column_frame(rows, cols, lit, brightness)
            } else {
                row_frame(rows, cols, lit, brightness)
            }
        })
        .collect()
}

/// The whole matrix fading up from `min` to `max` and back down.
///
/// Levels are rounded towards negative infinity. A single step shows `max` once in each
/// direction.
pub fn pulse(rows: usize, cols: usize, max: u8, min: u8, steps: usize) -> Vec<Grid> {
    let (max, min) = (i64::from(max), i64::from(min));
    let last = i64::try_from(steps.saturating_sub(1)).unwrap_or(i64::MAX);
    let delta = |i: usize| -> Option<i64> {
        if last == 0 {
            return None;
        }
        let i = i64::try_from(i).unwrap_or(last);
        Some(((max - min) * i).div_euclid(last))
    };
    let frame = |brightness: i64| {
        let brightness = u8::try_from(brightness.clamp(0, i64::from(MAX_BRIGHTNESS)))
            .unwrap_or(MAX_BRIGHTNESS);
        vec![vec![brightness; cols]; rows]
    };

    let fade_up = (0..steps).map(|i| frame(delta(i).map_or(max, |d| min + d)));
    let fade_down = (0..steps).map(|i| frame(delta(i).map_or(max, |d| max - d)));
    fade_up.chain(fade_down).collect()
}

/// Positions along the matrix perimeter, spiralling clockwise towards the center.
fn spiral_coordinates(rows: usize, cols: usize) -> Vec<(usize, usize)> {
    let mut coordinates = Vec::with_capacity(rows * cols);

    // Bottom and right bounds are exclusive.
    let (mut top, mut bottom) = (0, rows);
    let (mut left, mut right) = (0, cols);
    while top < bottom && left < right {
        for col in left..right {
            coordinates.push((top, col));
        }
        top += 1;

        for row in top..bottom {
            coordinates.push((row, right - 1));
        }
        right -= 1;

        if top < bottom {
            for col in (left..right).rev() {
                coordinates.push((bottom - 1, col));
            }
            bottom -= 1;
        }

        if left < right {
            for row in (top..bottom).rev() {
                coordinates.push((row, left));
            }
            left += 1;
        }
    }
    coordinates
}

/// A single lit cell walking along a spiral from the outside to the center.
pub fn spiral(rows: usize, cols: usize, brightness: u8, clockwise: bool) -> Vec<Grid> {
    let mut coordinates = spiral_coordinates(rows, cols);
    if !clockwise {
        coordinates.reverse();
    }

    coordinates
        .into_iter()
        .map(|(row, col)| {
            let mut grid = blank(rows, cols);
            grid[row][col] = brightness;
            grid
        })
        .collect()
}

/// Random distinct cells lit on every step.
pub fn sparkle<R: Rng + ?Sized>(
    rows: usize,
    cols: usize,
    max_active: usize,
    brightness: u8,
    steps: usize,
    rng: &mut R,
) -> Vec<Grid> {
    let total = rows * cols;
    (0..steps)
        .map(|_| {
            let mut grid = blank(rows, cols);
            for id in rand::seq::index::sample(&mut *rng, total, max_active.min(total)) {
                grid[id / cols][id % cols] = brightness;
            }
            grid
        })
        .collect()
}

/// Parameters shared by the named patterns; each pattern reads only the ones it needs.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct PatternOptions {
    pub brightness: u8,
    /// Lower brightness bound of the pulse.
    pub min_brightness: u8,
    pub direction: Direction,
    /// Band width of the wave.
    pub width: usize,
    /// Fade steps of the pulse, or number of frames of the sparkle.
    pub steps: usize,
    /// Spiral turning direction.
    pub clockwise: bool,
    /// Number of cells lit at once by the sparkle.
    pub max_active: usize,
    /// Duration of every frame, in time units.
    pub duration_per_step: u32,
}

impl Default for PatternOptions {
    fn default() -> Self {
        Self {
            brightness: MAX_BRIGHTNESS,
            min_brightness: 0,
            direction: Direction::Right,
            width: 2,
            steps: 10,
            clockwise: true,
            max_active: 3,
            duration_per_step: 5,
        }
    }
}

/// Named pattern builders, resolved by name.
#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Debug)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    Chase,
    Wave,
    Pulse,
    Spiral,
    Sparkle,
}

impl PatternKind {
    pub const ALL: [Self; 5] = [
        Self::Chase,
        Self::Wave,
        Self::Pulse,
        Self::Spiral,
        Self::Sparkle,
    ];

    /// Returns the options this pattern plays with unless told otherwise.
    pub fn default_options(self) -> PatternOptions {
        let base = PatternOptions::default();
        match self {
            Self::Chase | Self::Wave => base,
            Self::Pulse => PatternOptions {
                duration_per_step: 2,
                ..base
            },
            Self::Spiral => PatternOptions {
                duration_per_step: 3,
                ..base
            },
            Self::Sparkle => PatternOptions {
                steps: 20,
                duration_per_step: 2,
                ..base
            },
        }
    }

    /// Builds the frames of this pattern for the matrix with the given dimensions.
    pub fn frames<R: Rng + ?Sized>(
        self,
        rows: usize,
        cols: usize,
        options: &PatternOptions,
        rng: &mut R,
    ) -> Vec<Grid> {
        match self {
            Self::Chase => chase(rows, cols, options.brightness, options.direction),
            Self::Wave => wave(
                rows,
                cols,
                options.brightness,
                options.direction,
                options.width,
            ),
            Self::Pulse => pulse(
                rows,
                cols,
                options.brightness,
                options.min_brightness,
                options.steps,
            ),
            Self::Spiral => spiral(rows, cols, options.brightness, options.clockwise),
            Self::Sparkle => sparkle(
                rows,
                cols,
                options.max_active,
                options.brightness,
                options.steps,
                rng,
            ),
        }
    }

    /// Appends the frames of this pattern to the sequence.
    pub fn extend<R: Rng + ?Sized>(
        self,
        sequence: &mut PatternSequence<'_>,
        options: &PatternOptions,
        rng: &mut R,
    ) -> Result<()> {
        let matrix = sequence.registry().matrix();
        let (rows, cols) = (matrix.rows(), matrix.cols());
        let frames = self.frames(rows, cols, options, rng);
        sequence.add_frames(frames, options.duration_per_step)
    }
}

impl FromStr for PatternKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.to_string() == s)
            .ok_or(Error::UnknownName)
    }
}

impl Display for PatternKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Chase => "chase",
            Self::Wave => "wave",
            Self::Pulse => "pulse",
            Self::Spiral => "spiral",
            Self::Sparkle => "sparkle",
        })
    }
}

/// Lights every device in order for `delay` time units, with everything else turned off.
pub async fn blink_sequence(matrix: &Matrix, time_unit: std::time::Duration, delay: u32) {
    matrix.all_off();
    for device in matrix.devices() {
        device.on(MAX_BRIGHTNESS);
        tokio::time::sleep(time_units(time_unit, delay)).await;
        device.off();
    }
    log::debug!("Blink sequence completed with delay {delay}");
}
