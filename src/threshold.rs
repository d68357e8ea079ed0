//! Required-sleeper calculators.

use crate::error::SettingsError;
use crate::settings::{CounterMode, SleepSettings};
use crate::types::PopulationSnapshot;

/// Decides how many sleepers a world needs before night is skipped.
///
/// Percentages round **up**: 50% of 3 eligible players needs 2 sleepers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdCalculator {
    /// A fixed count, regardless of population.
    Absolute { needed: u32 },
    /// A share (0..=100) of the online players that are not bypassed.
    Percentage { percent: u8 },
}

impl ThresholdCalculator {
    pub fn absolute(needed: i64) -> Result<Self, SettingsError> {
        if needed < 0 {
            return Err(SettingsError::NegativeCount(needed));
        }
        let needed = u32::try_from(needed).unwrap_or(u32::MAX);
        Ok(Self::Absolute { needed })
    }

    pub fn percentage(percent: i64) -> Result<Self, SettingsError> {
        let percent =
            u8::try_from(percent).map_err(|_| SettingsError::PercentageOutOfRange(percent))?;
        if percent > 100 {
            return Err(SettingsError::PercentageOutOfRange(i64::from(percent)));
        }
        Ok(Self::Percentage { percent })
    }

    pub fn from_settings(settings: &SleepSettings) -> Result<Self, SettingsError> {
        match settings.counter {
            CounterMode::Absolute => Self::absolute(settings.absolute_needed),
            CounterMode::Percentage => Self::percentage(settings.percentage_needed),
        }
    }

    /// Number of sleepers needed for the given population.
    pub fn required(&self, snapshot: &PopulationSnapshot) -> u32 {
        match *self {
            Self::Absolute { needed } => needed,
            Self::Percentage { percent } => {
                let scaled = u64::from(percent) * u64::from(snapshot.eligible());
                // percent <= 100, so the result never exceeds `eligible`.
                scaled.div_ceil(100) as u32
            }
        }
    }
}

impl std::fmt::Display for ThresholdCalculator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Absolute { needed } => write!(f, "absolute ({needed} players)"),
            Self::Percentage { percent } => write!(f, "percentage ({percent}% of players)"),
        }
    }
}
