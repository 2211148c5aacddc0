//! Distinct partition keys of a table, found without reading every item.
//!
//! Each scan page holds a single item. The scan then restarts right after the largest
//! possible sort key of that item's partition, which jumps to the next partition.

use crate::client::{Client, Result, ScanInput};
use crate::error::{ClientError, ErrorKind};
use crate::retry::RetryPolicy;

use aws_sdk_dynamodb::{
    primitives::Blob,
    types::{AttributeValue, ScalarAttributeType},
};
use tracing::info;

/// Largest number DynamoDB can store.
pub const MAX_NUMBER: &str = "9.9999999999999999999999999999999999999E+125";
const MAX_KEY_BYTES: usize = 1024;
// 4 bytes in UTF-8, so 256 of them fill a key.
const MAX_CHAR: char = '\u{10FFFF}';

/// The value that sorts after every other sort key of the given type.
pub fn max_sort_key_value(attribute_type: &ScalarAttributeType) -> Result<AttributeValue> {
    match attribute_type {
        ScalarAttributeType::S => Ok(AttributeValue::S(
            MAX_CHAR.to_string().repeat(MAX_KEY_BYTES / MAX_CHAR.len_utf8()),
        )),
        ScalarAttributeType::N => Ok(AttributeValue::N(MAX_NUMBER.into())),
        ScalarAttributeType::B => Ok(AttributeValue::B(Blob::new(vec![0xFF; MAX_KEY_BYTES]))),
        other => Err(ClientError::new(
            ErrorKind::Unknown,
            format!("Unsupported sort key type: {other:?}"),
        )),
    }
}

pub async fn distinct_partition_keys(
    client: &dyn Client,
    table_name: &str,
    retry: &RetryPolicy,
) -> Result<Vec<AttributeValue>> {
    let keys = retry.run(|| client.describe_keys(table_name)).await?;
    let partition_key = keys.partition_key;
    let sentinel = match keys.sort_key {
        Some(sort_key) => Some((sort_key.name, max_sort_key_value(&sort_key.attribute_type)?)),
        None => None,
    };

    let mut partition_keys: Vec<AttributeValue> = vec![];
    let mut exclusive_start_key = None;

    loop {
        let input = ScanInput {
            table_name: table_name.into(),
            limit: Some(1),
            exclusive_start_key: exclusive_start_key.take(),
            projection: Some(partition_key.clone()),
        };
        let output = retry.run(|| client.scan(input.clone())).await?;

        if let Some(value) = output
            .items
            .first()
            .and_then(|item| item.get(&partition_key))
        {
            info!("{value:?}");
            partition_keys.push(value.clone());
        }

        match output.last_evaluated_key {
            Some(mut key) => {
                if let Some((name, max)) = sentinel.as_ref() {
                    key.insert(name.clone(), max.clone());
                }
                exclusive_start_key = Some(key);
            }
            None => break,
        }
    }

    Ok(partition_keys)
}
