//! Test helpers

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, PoisonError},
};

use crate::{
    sink::{shared, OutputSink, SharedSink, SinkProvider},
    Error, Result,
};

#[derive(Default)]
struct MemorySinkState {
    duties: BTreeMap<u8, u16>,
    write_count: usize,
    fail_next_write: bool,
}

/// In-memory output sink.
///
/// Clones share the same state, so a test can keep a clone and observe the writes made through
/// the copy handed to the matrix.
#[derive(Clone, Default)]
pub struct MemorySink(Arc<Mutex<MemorySinkState>>);

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MemorySinkState) -> T) -> T {
        f(&mut self.0.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Returns the last duty value written to the channel.
    pub fn duty(&self, channel: u8) -> Option<u16> {
        self.with_state(|state| state.duties.get(&channel).copied())
    }

    /// Returns the number of successful writes.
    pub fn write_count(&self) -> usize {
        self.with_state(|state| state.write_count)
    }

    /// Makes the next write fail with [`Error::SinkWrite`].
    pub fn fail_next_write(&self) {
        self.with_state(|state| state.fail_next_write = true);
    }
}

impl OutputSink for MemorySink {
    fn set_channel_duty(&mut self, channel: u8, duty: u16) -> Result<()> {
        self.with_state(|state| {
            if state.fail_next_write {
                state.fail_next_write = false;
                return Err(Error::sink_write("simulated failure"));
            }

            state.duties.insert(channel, duty);
            state.write_count += 1;
            Ok(())
        })
    }
}

/// A bank of in-memory sinks.
#[derive(Clone)]
pub struct MemorySinkBank {
    sinks: Vec<MemorySink>,
    taken: bool,
}

impl MemorySinkBank {
    /// Creates a bank with the given number of sinks.
    #[must_use]
    pub fn new(count: usize) -> Self {
        Self {
            sinks: (0..count).map(|_| MemorySink::new()).collect(),
            taken: false,
        }
    }

    /// Returns the sink with the given index.
    pub fn sink(&self, index: usize) -> Option<&MemorySink> {
        self.sinks.get(index)
    }
}

impl SinkProvider for MemorySinkBank {
    fn take_sinks(&mut self) -> Vec<SharedSink> {
        if std::mem::replace(&mut self.taken, true) {
            return Vec::new();
        }
        self.sinks.iter().cloned().map(shared).collect()
    }
}

#[test]
fn test_memory_sink_records_writes() {
    let sink = MemorySink::new();
    let mut handle = sink.clone();

    handle.set_channel_duty(3, 1000).unwrap();
    handle.set_channel_duty(3, 2000).unwrap();

    assert_eq!(sink.duty(3), Some(2000));
    assert_eq!(sink.duty(4), None);
    assert_eq!(sink.write_count(), 2);
}

#[test]
fn test_memory_sink_fails_once() {
    let mut sink = MemorySink::new();
    sink.fail_next_write();

    assert_eq!(sink.set_channel_duty(0, 1), Err(Error::SinkWrite));
    assert_eq!(sink.set_channel_duty(0, 1), Ok(()));
}

#[test]
fn test_memory_sink_bank_is_taken_once() {
    let mut bank = MemorySinkBank::new(2);
    assert_eq!(bank.take_sinks().len(), 2);
    assert!(bank.take_sinks().is_empty());
}
