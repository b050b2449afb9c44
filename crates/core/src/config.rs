//! Matrix configuration.

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result, CHANNELS_PER_SINK, DEFAULT_COLS, DEFAULT_ROWS};

/// Default duration of a single time unit in milliseconds.
pub const DEFAULT_TIME_UNIT_MS: u64 = 100;

/// A global matrix configuration.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct Configuration {
    /// The number of rows in the matrix.
    pub rows: usize,
    /// The number of columns in the matrix.
    pub cols: usize,
    /// Real duration of a single scheduling time unit, in milliseconds.
    pub time_unit_ms: u64,
    /// The number of channels exposed by each output sink.
    pub channels_per_sink: u8,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
            time_unit_ms: DEFAULT_TIME_UNIT_MS,
            channels_per_sink: CHANNELS_PER_SINK,
        }
    }
}

impl Configuration {
    /// Creates a configuration for the matrix with the given dimensions.
    pub fn with_dimensions(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            ..Self::default()
        }
    }

    /// Returns the real duration of a single time unit.
    pub fn time_unit(&self) -> Duration {
        Duration::from_millis(self.time_unit_ms)
    }

    /// Checks that the configuration describes a usable matrix.
    pub fn validate(&self) -> Result<()> {
        if self.rows == 0 || self.cols == 0 {
            log::error!("Matrix dimensions {}x{} are empty", self.rows, self.cols);
            return Err(Error::InvalidConfig);
        }
        if self.time_unit_ms == 0 {
            log::error!("Time unit must be greater than zero");
            return Err(Error::InvalidConfig);
        }
        if self.channels_per_sink == 0 {
            log::error!("Output sinks must expose at least one channel");
            return Err(Error::InvalidConfig);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use core::time::Duration;

    use super::Configuration;
    use crate::Error;

    #[test]
    fn test_default_config() {
        let config = Configuration::default();
        assert_eq!((config.rows, config.cols), (6, 9));
        assert_eq!(config.time_unit(), Duration::from_millis(100));
        assert_eq!(config.channels_per_sink, 16);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_invalid_config() {
        assert_eq!(
            Configuration::with_dimensions(0, 4).validate(),
            Err(Error::InvalidConfig)
        );

        let config = Configuration {
            time_unit_ms: 0,
            ..Configuration::default()
        };
        assert_eq!(config.validate(), Err(Error::InvalidConfig));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Configuration = serde_json::from_str(r#"{"rows": 2, "cols": 3}"#).unwrap();
        assert_eq!(config, Configuration::with_dimensions(2, 3));
    }
}
