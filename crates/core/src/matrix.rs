//! LED matrix addressing and immediate bulk writes.

use std::fmt::Display;

use crate::{
    device::{Device, DeviceId},
    sink::SinkProvider,
    Configuration, Error, Grid, Result,
};

/// A fixed-size matrix of LEDs arranged in rows and columns.
///
/// Devices are stored in row-major order, so the device identifier is `row * cols + col`.
///
/// All writes here are immediate and are not coordinated with scheduled tasks, so they may
/// interleave with task activations targeting the same devices.
pub struct Matrix {
    rows: usize,
    cols: usize,
    devices: Vec<Device>,
}

impl Matrix {
    /// Creates a matrix of unbound devices.
    pub fn new(rows: usize, cols: usize) -> Self {
        let devices = (0..rows * cols).map(Device::unbound).collect();
        Self::from_devices(rows, cols, devices)
    }

    /// Creates a matrix whose devices are bound to the sinks yielded by the provider.
    ///
    /// Device `id` is bound to the channel `id % channels_per_sink` of the sink with index
    /// `id / channels_per_sink`. Devices beyond the last sink stay unbound.
    pub fn with_sinks<P>(rows: usize, cols: usize, channels_per_sink: u8, provider: &mut P) -> Self
    where
        P: SinkProvider + ?Sized,
    {
        let sinks = provider.take_sinks();
        let channels = usize::from(channels_per_sink.max(1));

        let devices = (0..rows * cols)
            .map(|id| {
                let channel = u8::try_from(id % channels).unwrap_or_default();
                match sinks.get(id / channels) {
                    Some(sink) => Device::bound(id, sink.clone(), channel),
                    None => {
                        if !sinks.is_empty() {
                            log::warn!("Not enough output sinks for LED {id}");
                        }
                        Device::unbound(id)
                    }
                }
            })
            .collect();
        Self::from_devices(rows, cols, devices)
    }

    /// Creates a matrix from the validated configuration.
    pub fn from_config<P>(config: &Configuration, provider: &mut P) -> Result<Self>
    where
        P: SinkProvider + ?Sized,
    {
        config.validate()?;
        Ok(Self::with_sinks(
            config.rows,
            config.cols,
            config.channels_per_sink,
            provider,
        ))
    }

    fn from_devices(rows: usize, cols: usize, devices: Vec<Device>) -> Self {
        log::info!(
            "Created LED matrix with {rows} rows and {cols} columns ({} LEDs total)",
            devices.len()
        );
        Self {
            rows,
            cols,
            devices,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns the total number of devices.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// Returns the device with the given identifier.
    pub fn device(&self, id: DeviceId) -> Option<&Device> {
        self.devices.get(id)
    }

    /// Returns the identifier of the device at the given position.
    pub fn device_id_at(&self, row: usize, col: usize) -> Option<DeviceId> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        Some(row * self.cols + col)
    }

    /// Returns the device at the given position, or `None` if it is out of bounds.
    pub fn device_at(&self, row: usize, col: usize) -> Option<&Device> {
        let Some(id) = self.device_id_at(row, col) else {
            log::error!("Position ({row}, {col}) is out of bounds");
            return None;
        };
        self.devices.get(id)
    }

    /// Returns the `(row, col)` position of the device, or `None` for an unknown identifier.
    pub fn position_of(&self, id: DeviceId) -> Option<(usize, usize)> {
        if id >= self.devices.len() {
            log::error!("LED ID {id} is out of bounds");
            return None;
        }
        Some((id / self.cols, id % self.cols))
    }

    /// Returns identifiers of all devices in the row.
    pub fn row_ids(&self, row: usize) -> Option<Vec<DeviceId>> {
        (row < self.rows).then(|| (0..self.cols).map(|col| row * self.cols + col).collect())
    }

    /// Returns identifiers of all devices in the column.
    pub fn column_ids(&self, col: usize) -> Option<Vec<DeviceId>> {
        (col < self.cols).then(|| (0..self.rows).map(|row| row * self.cols + col).collect())
    }

    pub fn all_off(&self) {
        for device in &self.devices {
            device.off();
        }
        log::debug!("All LEDs turned off");
    }

    /// Turns all devices on at the given brightness.
    pub fn all_on(&self, brightness: u8) {
        for device in &self.devices {
            device.on(brightness);
        }
        log::debug!("All LEDs turned on at brightness {brightness}");
    }

    /// Turns on all devices in the row.
    pub fn set_row(&self, row: usize, brightness: u8) -> Result<()> {
        let Some(ids) = self.row_ids(row) else {
            log::error!("Row {row} is out of bounds");
            return Err(Error::InvalidAddress);
        };
        for id in ids {
            self.devices[id].on(brightness);
        }
        log::debug!("Row {row} turned on at brightness {brightness}");
        Ok(())
    }

    /// Turns on all devices in the column.
    pub fn set_column(&self, col: usize, brightness: u8) -> Result<()> {
        let Some(ids) = self.column_ids(col) else {
            log::error!("Column {col} is out of bounds");
            return Err(Error::InvalidAddress);
        };
        for id in ids {
            self.devices[id].on(brightness);
        }
        log::debug!("Column {col} turned on at brightness {brightness}");
        Ok(())
    }

    /// Applies a grid of brightness values immediately.
    ///
    /// Cells outside of the matrix dimensions are ignored.
    pub fn apply_pattern<R: AsRef<[u8]>>(&self, grid: &[R]) {
        for (row, values) in grid.iter().take(self.rows).enumerate() {
            for (col, &brightness) in values.as_ref().iter().take(self.cols).enumerate() {
                self.devices[row * self.cols + col].set_brightness(brightness);
            }
        }
        log::debug!("Pattern set on LED matrix");
    }

    /// Returns the current brightness of every device, row by row.
    pub fn brightness_grid(&self) -> Grid {
        self.devices
            .chunks(self.cols.max(1))
            .map(|row| row.iter().map(Device::brightness).collect())
            .collect()
    }
}

impl Display for Matrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "LEDMatrix({}x{}, {} LEDs)",
            self.rows,
            self.cols,
            self.devices.len()
        )
    }
}
