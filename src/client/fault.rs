use super::{
    Client, GetItemOutput, Item, QueryInput, QueryOutput, Result, ScanInput, ScanOutput, TableKeys,
};
use crate::config::{clamp_ratio, FaultConfig};
use crate::error::ClientError;

use async_trait::async_trait;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::fmt;
use std::sync::{Mutex, PoisonError};
use tokio::time::sleep;
use tracing::info;

/// Rewrites an item returned by `get_item`. Returns `true` when it changed the item.
pub type ItemRewrite = Box<dyn Fn(&mut Item) -> bool + Send + Sync>;

/// Wraps a client and injects throttling errors into writes and latency into reads.
/// Draws come from a seeded RNG so a run can be replayed.
pub struct FaultInjectingClient<C> {
    inner: C,
    config: FaultConfig,
    rng: Mutex<StdRng>,
    rewrite: Option<ItemRewrite>,
}

impl<C: Client> FaultInjectingClient<C> {
    pub fn new(inner: C, config: FaultConfig) -> Self {
        let config = FaultConfig {
            put_throttle_ratio: clamp_ratio("put_throttle_ratio", config.put_throttle_ratio),
            read_delay_ratio: clamp_ratio("read_delay_ratio", config.read_delay_ratio),
            ..config
        };

        Self {
            inner,
            rng: Mutex::new(StdRng::seed_from_u64(config.seed)),
            config,
            rewrite: None,
        }
    }

    /// Tamper with `get_item` responses. A rewritten response is also delayed by `read_delay`.
    pub fn with_item_rewrite<F>(self, rewrite: F) -> Self
    where
        F: Fn(&mut Item) -> bool + Send + Sync + 'static,
    {
        Self {
            rewrite: Some(Box::new(rewrite)),
            ..self
        }
    }

    fn draw(&self, ratio: f64) -> bool {
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen_bool(ratio)
    }

    async fn maybe_delay(&self) {
        if self.draw(self.config.read_delay_ratio) {
            info!("Injecting {:?} delay", self.config.read_delay);
            sleep(self.config.read_delay).await;
        }
    }

    async fn tamper(&self, output: &mut GetItemOutput) {
        let (Some(rewrite), Some(item)) = (self.rewrite.as_ref(), output.item.as_mut()) else {
            return;
        };
        if rewrite(item) {
            info!("Altered GetItem response. Injecting {:?} delay", self.config.read_delay);
            sleep(self.config.read_delay).await;
        }
    }
}

fn inspect<T>(result: Result<T>) -> Result<T> {
    if let Err(err) = result.as_ref() {
        info!("Error: {err}");
    }
    result
}

impl<C: fmt::Debug> fmt::Debug for FaultInjectingClient<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaultInjectingClient")
            .field("inner", &self.inner)
            .field("config", &self.config)
            .field("rewrite", &self.rewrite.is_some())
            .finish()
    }
}

#[async_trait]
impl<C: Client> Client for FaultInjectingClient<C> {
    async fn query(&self, input: QueryInput) -> Result<QueryOutput> {
        self.maybe_delay().await;
        inspect(self.inner.query(input).await)
    }

    async fn get_item(&self, table_name: &str, key: Item) -> Result<GetItemOutput> {
        self.maybe_delay().await;
        let mut output = inspect(self.inner.get_item(table_name, key).await)?;
        self.tamper(&mut output).await;
        Ok(output)
    }

    async fn put_item(&self, table_name: &str, item: Item) -> Result<()> {
        if self.draw(self.config.put_throttle_ratio) {
            info!("Injecting ProvisionedThroughputExceededException");
            return Err(ClientError::throttled("Injected Error"));
        }
        inspect(self.inner.put_item(table_name, item).await)
    }

    async fn scan(&self, input: ScanInput) -> Result<ScanOutput> {
        inspect(self.inner.scan(input).await)
    }

    async fn describe_keys(&self, table_name: &str) -> Result<TableKeys> {
        inspect(self.inner.describe_keys(table_name).await)
    }
}
