//! Settings: defaults, then an optional TOML file, then environment overrides.

use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

pub const CONFIG_PATH_ENV: &str = "AUTOTIMETABLER_CONFIG";
const HOST_ENV: &str = "AUTOTIMETABLER_HOST";
const PORT_ENV: &str = "AUTOTIMETABLER_PORT";
const MAX_UNSATISFIED_ENV: &str = "AUTOTIMETABLER_MAX_UNSATISFIED";
const TIME_LIMIT_ENV: &str = "AUTOTIMETABLER_TIME_LIMIT_SECS";

/// Objective weight earned by each kind of honoured preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PreferenceWeights {
    pub earliest_start: u32,
    pub latest_end: u32,
    /// A class shares its day with the limited set of chosen days.
    pub shared_day: u32,
    /// A class falls on one of the allowed days.
    pub allowed_day: u32,
}

impl Default for PreferenceWeights {
    fn default() -> Self {
        Self {
            earliest_start: 1,
            latest_end: 1,
            shared_day: 1,
            allowed_day: 2,
        }
    }
}

/// How a solved timetable is judged.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SolvePolicy {
    /// Largest unsatisfied preference weight a timetable may have and still
    /// be returned.
    pub max_unsatisfied: u32,
    pub weights: PreferenceWeights,
    pub time_limit_secs: Option<f64>,
}

impl Default for SolvePolicy {
    fn default() -> Self {
        Self {
            max_unsatisfied: 3,
            weights: PreferenceWeights::default(),
            time_limit_secs: None,
        }
    }
}

impl SolvePolicy {
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_secs
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map(Duration::from_secs_f64)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub policy: SolvePolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            policy: SolvePolicy::default(),
        }
    }
}

impl Settings {
    /// Loads settings from the file named by `AUTOTIMETABLER_CONFIG` (if any)
    /// and applies environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        settings.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        debug!("Reading settings from {}", path.as_ref().display());
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Applies overrides looked up through `lookup`, which maps a variable
    /// name to its value.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(HOST_ENV) {
            self.host = host;
        }
        if let Some(port) = lookup(PORT_ENV) {
            self.port = parse_env(PORT_ENV, port)?;
        }
        if let Some(max) = lookup(MAX_UNSATISFIED_ENV) {
            self.policy.max_unsatisfied = parse_env(MAX_UNSATISFIED_ENV, max)?;
        }
        if let Some(secs) = lookup(TIME_LIMIT_ENV) {
            self.policy.time_limit_secs = Some(parse_env(TIME_LIMIT_ENV, secs)?);
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_env<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { key, value })
}
