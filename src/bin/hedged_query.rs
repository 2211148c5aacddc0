use dynamo_hedging::{Client, Config, DynamodbClient, FaultInjectingClient, HedgedQuery};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

const TABLE: &str = "Music";
const PK: &str = "Artist";
const PK_VALUE: &str = "Acme Band";
const ITERATIONS: usize = 10;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::new();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::new();
    let hedging = config.hedging();
    let faults = config.faults();

    let db = DynamodbClient::builder()
        .await
        .endpoint_url(config.endpoint_url())
        .build();
    let client: Arc<dyn Client> = if faults.enabled {
        info!("Injecting read delays with ratio {}", faults.read_delay_ratio);
        Arc::new(FaultInjectingClient::new(db, faults))
    } else {
        Arc::new(db)
    };

    info!("Hedging delays: {:?}", hedging.schedule.delays());
    let query = HedgedQuery::from_config(client, &hedging);

    for i in 0..ITERATIONS {
        match query.query_with_hedging(TABLE, PK, PK_VALUE).await {
            Ok(hedged) => info!(
                "Iteration {i}: {} item(s) from request #{} in {:?}",
                hedged.value.count, hedged.attempt, hedged.elapsed
            ),
            Err(err) => error!("Iteration {i}: {err}"),
        }
    }

    query.close(hedging.shutdown_timeout).await;
    Ok(())
}
