//! LED matrix scheduling engine
//!
//! Deferred brightness tasks on top of the [`ledgrid_core::Matrix`], whole-grid patterns and
//! animated pattern sequences.

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

pub use ledgrid_core as core;
pub use ledgrid_core::{Configuration, Error, Matrix, Result};

pub use crate::{
    pattern::group_by_brightness,
    patterns::{blink_sequence, Direction, PatternKind, PatternOptions},
    registry::TaskRegistry,
    sequence::{PatternSequence, PatternStep},
    task::{Schedule, TaskId, TaskStatus},
};

pub mod pattern;
pub mod patterns;
pub mod registry;
pub mod sequence;
pub mod task;
