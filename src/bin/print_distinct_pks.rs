use dynamo_hedging::{distinct_partition_keys, Config, DynamodbClient, RetryPolicy};
use std::env;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

const ENV_TABLE_NAME: &str = "TABLE_NAME";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::new();
    tracing::subscriber::set_global_default(subscriber)?;

    let table = env::var(ENV_TABLE_NAME)
        .map_err(|err| anyhow::anyhow!("env {ENV_TABLE_NAME} is required. {err}"))?;

    let config = Config::new();
    let client = DynamodbClient::builder()
        .await
        .endpoint_url(config.endpoint_url())
        .build();
    let retry = RetryPolicy::from(&config.retry());

    match distinct_partition_keys(&client, &table, &retry).await {
        Ok(keys) => info!("Found {} distinct partition key(s) in {table}", keys.len()),
        Err(err) => {
            error!("{err}");
            return Err(err.into());
        }
    }
    Ok(())
}
