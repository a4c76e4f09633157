use thiserror::Error;

use crate::data::ClassIndex;

/// A single class description that cannot be reduced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassSpecError {
    #[error("expected a non-zero multiple of {per_offering} period time values, found {found}")]
    PeriodTimeCount { per_offering: usize, found: usize },

    #[error("expected {expected} durations, found {found}")]
    DurationCount { expected: usize, found: usize },

    #[error("day {0} is not a weekday between 1 (Monday) and 5 (Friday)")]
    InvalidDay(f64),

    #[error("hour {0} is outside 0..24")]
    InvalidHour(f64),

    #[error("duration {0} must be a positive number of hours")]
    InvalidDuration(f64),

    #[error("offering {offering} splits periods across days while offering 0 keeps them on one day")]
    MixedConsecutivePeriods { offering: usize },
}

/// Anything wrong with a request before a model is built for it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("class {index} is malformed: {source}")]
    Class {
        index: ClassIndex,
        #[source]
        source: ClassSpecError,
    },

    #[error("at least one allowed day is required")]
    NoAllowedDays,

    #[error("allowed day {0} is not a weekday between 1 (Monday) and 5 (Friday)")]
    InvalidAllowedDay(u8),

    #[error("{field} hour {hour} is outside 0..=24")]
    InvalidPreferenceHour { field: &'static str, hour: u32 },
}

impl InputError {
    pub fn class(index: ClassIndex, source: ClassSpecError) -> Self {
        InputError::Class { index, source }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid value {value:?} for {key}")]
    InvalidEnv { key: &'static str, value: String },
}
