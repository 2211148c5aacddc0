use crate::client::{Client, QueryInput, QueryOutput};
use crate::config::HedgingConfig;
use crate::error::ClientError;
use crate::hedging::{HedgingDispatcher, RaceHandle, Schedule};

use aws_sdk_dynamodb::types::AttributeValue;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const PK_NAME: &str = "#pk";
const PK_VALUE: &str = ":pkValue";

/// Runs partition key queries through a hedging dispatcher.
pub struct HedgedQuery {
    client: Arc<dyn Client>,
    dispatcher: HedgingDispatcher,
    schedule: Schedule,
}

impl HedgedQuery {
    pub fn new(client: Arc<dyn Client>, dispatcher: HedgingDispatcher, schedule: Schedule) -> Self {
        Self {
            client,
            dispatcher,
            schedule,
        }
    }

    /// Build the dispatcher from config on the current tokio runtime.
    pub fn from_config(client: Arc<dyn Client>, config: &HedgingConfig) -> Self {
        let dispatcher = HedgingDispatcher::new().set_cancellation(config.cancellation);
        Self::new(client, dispatcher, config.schedule.clone())
    }

    pub fn query_with_hedging(
        &self,
        table_name: &str,
        partition_key_name: &str,
        partition_key_value: &str,
    ) -> RaceHandle<QueryOutput, ClientError> {
        let input = QueryInput {
            table_name: table_name.into(),
            key_condition_expression: format!("{PK_NAME} = {PK_VALUE}"),
            expression_attribute_names: [(PK_NAME.to_string(), partition_key_name.to_string())]
                .into(),
            expression_attribute_values: [(
                PK_VALUE.to_string(),
                AttributeValue::S(partition_key_value.into()),
            )]
            .into(),
        };

        let client = Arc::clone(&self.client);
        self.dispatcher.race(
            move || {
                let client = Arc::clone(&client);
                let input = input.clone();
                async move { client.query(input).await }
            },
            &self.schedule,
        )
    }

    pub async fn close(&self, timeout: Duration) {
        info!("Closing hedged query.");
        self.dispatcher.shutdown(timeout).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{MockClient, MockStep as Step};
    use crate::error::ErrorKind;
    use crate::hedging::HedgeError;

    const TABLE: &str = "hedging-demo-102";
    const PK: &str = "PK";
    const PK_VALUE_1: &str = "7343-K7Ws6YE0MTfJwQn";

    fn client() -> Arc<MockClient> {
        let client = MockClient::new(TABLE, PK);
        client.push_item([
            (PK, AttributeValue::S(PK_VALUE_1.into())),
            ("Name", AttributeValue::S("a".into())),
        ]);
        client.push_item([
            (PK, AttributeValue::S("other".into())),
            ("Name", AttributeValue::S("b".into())),
        ]);
        Arc::new(client)
    }

    fn hedged_query(client: Arc<MockClient>) -> HedgedQuery {
        HedgedQuery::new(client, HedgingDispatcher::new(), Schedule::from_millis([50]))
    }

    #[tokio::test(start_paused = true)]
    async fn it_builds_a_key_condition_query() {
        let client = client();
        let query = hedged_query(Arc::clone(&client));

        let hedged = query.query_with_hedging(TABLE, PK, PK_VALUE_1).await.unwrap();
        assert_eq!(hedged.attempt, 1);
        assert_eq!(hedged.value.count, 1);

        let queries = client.queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].key_condition_expression, "#pk = :pkValue");
        assert_eq!(queries[0].expression_attribute_names.get("#pk").unwrap(), PK);
        assert_eq!(
            queries[0].expression_attribute_values.get(":pkValue"),
            Some(&AttributeValue::S(PK_VALUE_1.into()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn a_slow_query_is_hedged() {
        let client = client();
        client.push_query_step(Step::Respond(200));
        client.push_query_step(Step::Respond(10));
        let query = hedged_query(Arc::clone(&client));

        let hedged = query.query_with_hedging(TABLE, PK, PK_VALUE_1).await.unwrap();
        assert_eq!(hedged.attempt, 2);
        assert_eq!(hedged.value.count, 1);
        assert!(hedged.elapsed < Duration::from_millis(70));
        assert_eq!(client.calls("query"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn it_reports_the_last_error_when_every_query_fails() {
        let client = client();
        client.push_query_step(Step::Fail(5, ClientError::new(ErrorKind::Transient, "first")));
        client.push_query_step(Step::Fail(5, ClientError::throttled("second")));
        let query = hedged_query(Arc::clone(&client));

        let err = query
            .query_with_hedging(TABLE, PK, PK_VALUE_1)
            .await
            .unwrap_err();
        assert!(matches!(err, HedgeError::AllAttemptsFailed(_)));

        let last = err.into_last_error().unwrap();
        assert_eq!(last.kind(), ErrorKind::Throttled);
        assert_eq!(last.message(), "second");
    }

    #[tokio::test(start_paused = true)]
    async fn it_rejects_queries_after_close() {
        let client = client();
        let query = hedged_query(Arc::clone(&client));
        query.close(Duration::from_secs(5)).await;

        let result = query.query_with_hedging(TABLE, PK, PK_VALUE_1).await;
        assert!(matches!(result, Err(HedgeError::Stopped)));
        assert_eq!(client.calls("query"), 0);
    }
}
