use aws_sdk_dynamodb::types::AttributeValue;
use dynamo_hedging::{Client, ClientError, Config, DynamodbClient, FaultInjectingClient, Item};
use tokio::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::FmtSubscriber;
use ulid::Ulid;

const TABLE: &str = "People";
const PK: &str = "Id";
const NAME: &str = "name";
const ITEMS: usize = 10;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::new();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::new();
    let db = DynamodbClient::builder()
        .await
        .endpoint_url(config.endpoint_url())
        .build();
    // Faults are always on here, whatever `enabled` says.
    let client = FaultInjectingClient::new(db, config.faults()).with_item_rewrite(|item| {
        if item.get(NAME) != Some(&AttributeValue::S("Airplane".into())) {
            return false;
        }
        item.insert(NAME.into(), AttributeValue::S("newAirplane".into()));
        item.insert("new attr".into(), AttributeValue::S("new attr".into()));
        true
    });

    for i in 0..ITEMS {
        let id = AttributeValue::S(Ulid::new().to_string());
        let key: Item = [(PK.to_string(), id)].into();
        let name = if i % 2 == 0 { "Airplane" } else { "Boat" };
        let mut item = key.clone();
        item.insert(NAME.into(), AttributeValue::S(name.into()));

        match client.put_item(TABLE, item).await {
            Ok(()) => info!("Put item {:?}", key[PK]),
            Err(err) => {
                report("put_item", &err);
                continue;
            }
        }

        let started = Instant::now();
        match client.get_item(TABLE, key).await {
            Ok(output) => info!("Got item {:?} in {:?}", output.item, started.elapsed()),
            Err(err) => report("get_item", &err),
        }
    }
    Ok(())
}

fn report(operation: &str, err: &ClientError) {
    warn!("{operation} failed with {}: {}", err.kind(), err.message());
    warn!("{}", err.kind().advice());
}
