use super::{clamp_ratio, FaultConfig, HedgingConfig, RetryConfig};
use crate::hedging::{Cancellation, Schedule};

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    hedging: Option<HedgingSection>,
    faults: Option<FaultSection>,
    retry: Option<RetrySection>,
}

/// Durations are in milliseconds except `shutdown_timeout`, which is in seconds.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct HedgingSection {
    pub delays: Vec<u64>,
    pub shutdown_timeout: Option<u64>,
    pub cancellation: Option<Cancellation>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FaultSection {
    #[serde(default)]
    pub enabled: bool,
    pub seed: Option<u64>,
    pub put_throttle_ratio: Option<f64>,
    pub read_delay_ratio: Option<f64>,
    pub read_delay: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RetrySection {
    pub max_retries: Option<u32>,
    pub base_delay: Option<u64>,
    pub max_delay: Option<u64>,
}

impl ConfigFile {
    pub fn new<P: AsRef<Path>>(path: Option<P>) -> Self {
        path.map(read_config).unwrap_or_default()
    }

    pub fn hedging(&self) -> HedgingConfig {
        let default = HedgingConfig::default();

        match self.hedging.clone() {
            Some(section) => HedgingConfig {
                schedule: Schedule::from_millis(section.delays),
                shutdown_timeout: section
                    .shutdown_timeout
                    .map(Duration::from_secs)
                    .unwrap_or(default.shutdown_timeout),
                cancellation: section.cancellation.unwrap_or(default.cancellation),
            },
            None => default,
        }
    }

    pub fn faults(&self) -> FaultConfig {
        let default = FaultConfig::default();

        match self.faults.clone() {
            Some(section) => FaultConfig {
                enabled: section.enabled,
                seed: section.seed.unwrap_or(default.seed),
                put_throttle_ratio: section
                    .put_throttle_ratio
                    .map(|r| clamp_ratio("put_throttle_ratio", r))
                    .unwrap_or(default.put_throttle_ratio),
                read_delay_ratio: section
                    .read_delay_ratio
                    .map(|r| clamp_ratio("read_delay_ratio", r))
                    .unwrap_or(default.read_delay_ratio),
                read_delay: section
                    .read_delay
                    .map(Duration::from_millis)
                    .unwrap_or(default.read_delay),
            },
            None => default,
        }
    }

    pub fn retry(&self) -> RetryConfig {
        let default = RetryConfig::default();

        match self.retry.clone() {
            Some(section) => RetryConfig {
                max_retries: section.max_retries.unwrap_or(default.max_retries),
                base_delay: section
                    .base_delay
                    .map(Duration::from_millis)
                    .unwrap_or(default.base_delay),
                max_delay: section
                    .max_delay
                    .map(Duration::from_millis)
                    .unwrap_or(default.max_delay),
            },
            None => default,
        }
    }
}

fn read_config<P: AsRef<Path>>(path: P) -> ConfigFile {
    _read_config(path).unwrap_or_else(|err| {
        warn!("{err}");
        warn!("Skip reading config file.");
        ConfigFile::default()
    })
}

fn _read_config<P: AsRef<Path>>(path: P) -> Result<ConfigFile, String> {
    let content = fs::read_to_string(&path)
        .map_err(|err| format!("Failed to read: {}. {err}", path.as_ref().to_string_lossy()))?;
    serde_yaml::from_str(&content)
        .map_err(|err| format!("Failed to deserialize config file: {err}"))
}
