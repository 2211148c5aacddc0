use crate::{hedging::Cancellation, hedging::Schedule, ENV_CONFIG_PATH, ENV_DYNAMODB_ENDPOINT_URL};

use std::env;
use std::time::Duration;
use tracing::warn;

mod file;

use file::ConfigFile;

#[derive(Debug, Clone, PartialEq)]
pub struct HedgingConfig {
    pub schedule: Schedule,
    pub shutdown_timeout: Duration,
    pub cancellation: Cancellation,
}

impl Default for HedgingConfig {
    fn default() -> Self {
        Self {
            schedule: Schedule::from_millis([50]),
            shutdown_timeout: Duration::from_secs(5),
            cancellation: Cancellation::Abort,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FaultConfig {
    pub enabled: bool,
    pub seed: u64,
    /// Share of `put_item` calls failed with a throttling error.
    pub put_throttle_ratio: f64,
    /// Share of reads delayed by `read_delay`.
    pub read_delay_ratio: f64,
    pub read_delay: Duration,
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            seed: 1234,
            put_throttle_ratio: 0.5,
            read_delay_ratio: 0.5,
            read_delay: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(20),
        }
    }
}

#[derive(Debug)]
pub struct Config {
    endpoint_url: Option<String>,
    hedging: HedgingConfig,
    faults: FaultConfig,
    retry: RetryConfig,
}

impl Config {
    pub fn new() -> Self {
        let endpoint_url = env::var(ENV_DYNAMODB_ENDPOINT_URL).ok();

        let conf_path = env::var(ENV_CONFIG_PATH).ok();
        let file = ConfigFile::new(conf_path);

        Self {
            endpoint_url,
            hedging: file.hedging(),
            faults: file.faults(),
            retry: file.retry(),
        }
    }

    pub fn endpoint_url(&self) -> Option<String> {
        self.endpoint_url.clone()
    }

    pub fn hedging(&self) -> HedgingConfig {
        self.hedging.clone()
    }

    pub fn faults(&self) -> FaultConfig {
        self.faults.clone()
    }

    pub fn retry(&self) -> RetryConfig {
        self.retry.clone()
    }
}

impl Default for Config {
    fn default() -> Config {
        Config::new()
    }
}

pub(crate) fn clamp_ratio(name: &str, ratio: f64) -> f64 {
    if (0.0..=1.0).contains(&ratio) {
        ratio
    } else {
        let clamped = if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) };
        warn!("`{name}` must be between 0 and 1 but got {ratio}. Using {clamped}.");
        clamped
    }
}
