mod dynamodb;
mod fault;
#[cfg(test)]
mod mock;

use crate::error::ClientError;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, ScalarAttributeType};
use std::collections::HashMap;

pub type Item = HashMap<String, AttributeValue>;
pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryInput {
    pub table_name: String,
    pub key_condition_expression: String,
    pub expression_attribute_names: HashMap<String, String>,
    pub expression_attribute_values: Item,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutput {
    pub items: Vec<Item>,
    pub count: i32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetItemOutput {
    pub item: Option<Item>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanInput {
    pub table_name: String,
    pub limit: Option<i32>,
    pub exclusive_start_key: Option<Item>,
    /// Attribute to project. Sent through an expression attribute name.
    pub projection: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanOutput {
    pub items: Vec<Item>,
    pub last_evaluated_key: Option<Item>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub name: String,
    pub attribute_type: ScalarAttributeType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableKeys {
    pub partition_key: String,
    pub sort_key: Option<SortKey>,
}

#[async_trait]
pub trait Client: Send + Sync {
    async fn query(&self, input: QueryInput) -> Result<QueryOutput>;
    async fn get_item(&self, table_name: &str, key: Item) -> Result<GetItemOutput>;
    async fn put_item(&self, table_name: &str, item: Item) -> Result<()>;
    async fn scan(&self, input: ScanInput) -> Result<ScanOutput>;
    async fn describe_keys(&self, table_name: &str) -> Result<TableKeys>;
}

pub use dynamodb::{DynamodbClient, DynamodbClientBuilder};
pub use fault::{FaultInjectingClient, ItemRewrite};
#[cfg(test)]
pub use mock::{MockClient, Step as MockStep};
