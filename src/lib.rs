mod client;
pub mod config;
mod error;
pub mod hedging;
mod partition;
mod query;
mod retry;

pub use client::{
    Client, DynamodbClient, DynamodbClientBuilder, FaultInjectingClient, GetItemOutput, Item,
    QueryInput, QueryOutput, ScanInput, ScanOutput, SortKey, TableKeys,
};
pub use config::Config;
pub use error::{classify, ClientError, ErrorKind};
pub use hedging::{HedgeError, Hedged, HedgingDispatcher, RaceHandle, Schedule};
pub use partition::{distinct_partition_keys, max_sort_key_value, MAX_NUMBER};
pub use query::HedgedQuery;
pub use retry::RetryPolicy;

pub const ENV_DYNAMODB_ENDPOINT_URL: &str = "DYNAMODB_ENDPOINT_URL";
pub const ENV_CONFIG_PATH: &str = "HEDGING_CONFIG_PATH";
