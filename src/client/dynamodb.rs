use super::{
    Client, GetItemOutput, Item, QueryInput, QueryOutput, Result, ScanInput, ScanOutput, SortKey,
    TableKeys,
};
use crate::error::{ClientError, ErrorKind};

use async_trait::async_trait;
use aws_sdk_dynamodb::{config::Builder as DbConfigBuilder, types::KeyType, Client as DbClient};

const PROJECTION_NAME: &str = "#p";

#[derive(Debug, Clone)]
pub struct DynamodbClient {
    client: DbClient,
}

#[async_trait]
impl Client for DynamodbClient {
    async fn query(&self, input: QueryInput) -> Result<QueryOutput> {
        let output = self
            .client
            .query()
            .table_name(input.table_name)
            .key_condition_expression(input.key_condition_expression)
            .set_expression_attribute_names(Some(input.expression_attribute_names))
            .set_expression_attribute_values(Some(input.expression_attribute_values))
            .send()
            .await?;

        Ok(QueryOutput {
            count: output.count(),
            items: output.items.unwrap_or_default(),
        })
    }

    async fn get_item(&self, table_name: &str, key: Item) -> Result<GetItemOutput> {
        self.client
            .get_item()
            .table_name(table_name)
            .set_key(Some(key))
            .send()
            .await
            .map(|output| GetItemOutput { item: output.item })
            .map_err(ClientError::from)
    }

    async fn put_item(&self, table_name: &str, item: Item) -> Result<()> {
        self.client
            .put_item()
            .table_name(table_name)
            .set_item(Some(item))
            .send()
            .await
            .map(drop)
            .map_err(ClientError::from)
    }

    async fn scan(&self, input: ScanInput) -> Result<ScanOutput> {
        let mut builder = self
            .client
            .scan()
            .table_name(input.table_name)
            .set_limit(input.limit)
            .set_exclusive_start_key(input.exclusive_start_key);

        if let Some(attribute) = input.projection {
            builder = builder
                .projection_expression(PROJECTION_NAME)
                .expression_attribute_names(PROJECTION_NAME, attribute);
        }

        let output = builder.send().await?;

        Ok(ScanOutput {
            items: output.items.unwrap_or_default(),
            last_evaluated_key: output.last_evaluated_key,
        })
    }

    async fn describe_keys(&self, table_name: &str) -> Result<TableKeys> {
        let table = self
            .client
            .describe_table()
            .table_name(table_name)
            .send()
            .await?
            .table
            .ok_or(missing("`table` is None in `DescribeTableOutput`"))?;

        let key_schema = table.key_schema.unwrap_or_default();
        let definitions = table.attribute_definitions.unwrap_or_default();

        let partition_key = key_schema
            .iter()
            .find(|element| element.key_type == KeyType::Hash)
            .map(|element| element.attribute_name.clone())
            .ok_or(missing("No HASH key in `key_schema`"))?;

        let sort_key = match key_schema
            .iter()
            .find(|element| element.key_type == KeyType::Range)
        {
            Some(element) => {
                let attribute_type = definitions
                    .iter()
                    .find(|definition| definition.attribute_name == element.attribute_name)
                    .map(|definition| definition.attribute_type.clone())
                    .ok_or(missing("RANGE key has no attribute definition"))?;

                Some(SortKey {
                    name: element.attribute_name.clone(),
                    attribute_type,
                })
            }
            None => None,
        };

        Ok(TableKeys {
            partition_key,
            sort_key,
        })
    }
}

fn missing(message: &str) -> ClientError {
    ClientError::new(ErrorKind::Unknown, message)
}

impl DynamodbClient {
    pub async fn builder() -> DynamodbClientBuilder {
        DynamodbClientBuilder::new().await
    }
}

#[derive(Debug)]
pub struct DynamodbClientBuilder {
    db_builder: DbConfigBuilder,
}

impl DynamodbClientBuilder {
    pub async fn new() -> Self {
        let config = aws_config::load_from_env().await;
        let db_builder = DbConfigBuilder::from(&config);

        Self { db_builder }
    }

    pub fn endpoint_url(self, url: Option<String>) -> Self {
        match url {
            Some(url) => Self {
                db_builder: self.db_builder.endpoint_url(url),
            },
            None => self,
        }
    }

    pub fn build(self) -> DynamodbClient {
        let db_config = self.db_builder.build();

        DynamodbClient {
            client: DbClient::from_conf(db_config),
        }
    }
}
