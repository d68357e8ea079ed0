//! Static configuration snapshot, read once per (re)start.
//!
//! ## Keys (TOML file and `SLEEP_*` environment overrides)
//!
//! | Key                         | Default      | Description                          |
//! |-----------------------------|--------------|--------------------------------------|
//! | `counter`                   | `percentage` | `absolute` or `percentage`           |
//! | `absolute_needed`           | `1`          | Fixed number of sleepers             |
//! | `percentage_needed`         | `50`         | Percent of eligible players          |
//! | `mode`                      | `smooth`     | `setter` (instant) or `smooth`       |
//! | `smooth_duration_ticks`     | `100`        | Length of a smooth sunrise           |
//! | `evaluation_interval_ticks` | `20`         | Scheduled threshold check cadence    |
//! | `day_time`                  | `0`          | Clock value a skipped night ends on  |
//! | `progress_messages`         | `true`       | Broadcast "N more needed" on bed use |
//! | `overworld_only`            | `true`       | Only track overworld dimensions      |

use crate::error::SettingsError;
use crate::types::DAY_LENGTH_TICKS;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable prefix for overrides, e.g. `SLEEP_COUNTER=absolute`.
pub const ENV_PREFIX: &str = "SLEEP";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CounterMode {
    Absolute,
    #[default]
    Percentage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SkipMode {
    /// Jump straight to day.
    Setter,
    /// Ramp the clock forward over `smooth_duration_ticks`.
    #[default]
    Smooth,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SleepSettings {
    pub counter: CounterMode,
    /// Signed so a negative value in a config file is reported, not wrapped.
    pub absolute_needed: i64,
    pub percentage_needed: i64,
    pub mode: SkipMode,
    pub smooth_duration_ticks: u32,
    pub evaluation_interval_ticks: u32,
    pub day_time: u64,
    pub progress_messages: bool,
    pub overworld_only: bool,
}

impl Default for SleepSettings {
    fn default() -> Self {
        Self {
            counter: CounterMode::Percentage,
            absolute_needed: 1,
            percentage_needed: 50,
            mode: SkipMode::Smooth,
            smooth_duration_ticks: 100,
            evaluation_interval_ticks: 20,
            day_time: 0,
            progress_messages: true,
            overworld_only: true,
        }
    }
}

impl SleepSettings {
    /// Layer an optional TOML file and `SLEEP_*` environment variables over
    /// the defaults, then validate.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        let settings: SleepSettings = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.absolute_needed < 0 {
            return Err(SettingsError::NegativeCount(self.absolute_needed));
        }
        if !(0..=100).contains(&self.percentage_needed) {
            return Err(SettingsError::PercentageOutOfRange(self.percentage_needed));
        }
        if self.smooth_duration_ticks == 0 {
            return Err(SettingsError::ZeroTicks {
                field: "smooth_duration_ticks",
            });
        }
        if self.evaluation_interval_ticks == 0 {
            return Err(SettingsError::ZeroTicks {
                field: "evaluation_interval_ticks",
            });
        }
        if self.day_time >= DAY_LENGTH_TICKS {
            return Err(SettingsError::DayTimeOutOfRange {
                value: self.day_time,
                day_length: DAY_LENGTH_TICKS,
            });
        }
        Ok(())
    }
}
