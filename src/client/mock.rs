use super::{
    Client, GetItemOutput, Item, QueryInput, QueryOutput, Result, ScanInput, ScanOutput, SortKey,
    TableKeys,
};
use crate::error::ClientError;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, ScalarAttributeType};
use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tokio::time::{sleep, Duration};

#[derive(Debug, Clone)]
pub enum Step {
    Respond(u64),
    Fail(u64, ClientError),
}

/// In-memory single table. Queries and scans can be scripted with delays and failures.
#[derive(Debug)]
pub struct MockClient {
    table_name: String,
    keys: TableKeys,
    items: Mutex<Vec<Item>>,
    query_steps: Mutex<VecDeque<Step>>,
    scan_failures: Mutex<VecDeque<ClientError>>,
    queries: Mutex<Vec<QueryInput>>,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl MockClient {
    pub fn new(table_name: &str, partition_key: &str) -> Self {
        Self {
            table_name: table_name.into(),
            keys: TableKeys {
                partition_key: partition_key.into(),
                sort_key: None,
            },
            items: Mutex::new(vec![]),
            query_steps: Mutex::new(VecDeque::new()),
            scan_failures: Mutex::new(VecDeque::new()),
            queries: Mutex::new(vec![]),
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_sort_key(self, name: &str, attribute_type: ScalarAttributeType) -> Self {
        Self {
            keys: TableKeys {
                sort_key: Some(SortKey {
                    name: name.into(),
                    attribute_type,
                }),
                ..self.keys
            },
            ..self
        }
    }

    pub fn push_item<I, K>(&self, item: I)
    where
        I: IntoIterator<Item = (K, AttributeValue)>,
        K: Into<String>,
    {
        let item: Item = item.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self.items.lock().unwrap().push(item);
    }

    pub fn push_query_step(&self, step: Step) {
        self.query_steps.lock().unwrap().push_back(step);
    }

    pub fn push_scan_failure(&self, error: ClientError) {
        self.scan_failures.lock().unwrap().push_back(error);
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(operation)
            .copied()
            .unwrap_or_default()
    }

    pub fn queries(&self) -> Vec<QueryInput> {
        self.queries.lock().unwrap().clone()
    }

    fn count(&self, operation: &'static str) {
        *self.calls.lock().unwrap().entry(operation).or_default() += 1;
    }

    fn assert_table(&self, table_name: &str) {
        assert_eq!(self.table_name.as_str(), table_name);
    }

    fn key_of(&self, item: &Item) -> Item {
        let mut names = vec![self.keys.partition_key.as_str()];
        if let Some(sort_key) = self.keys.sort_key.as_ref() {
            names.push(sort_key.name.as_str());
        }

        names
            .into_iter()
            .filter_map(|name| item.get(name).map(|v| (name.to_string(), v.clone())))
            .collect()
    }

    fn compare_keys(&self, a: &Item, b: &Item) -> Ordering {
        let pk = self.keys.partition_key.as_str();
        let ordering = compare(a.get(pk), b.get(pk));

        match (ordering, self.keys.sort_key.as_ref()) {
            (Ordering::Equal, Some(sort_key)) => {
                compare(a.get(&sort_key.name), b.get(&sort_key.name))
            }
            (ordering, _) => ordering,
        }
    }
}

#[async_trait]
impl Client for MockClient {
    async fn query(&self, input: QueryInput) -> Result<QueryOutput> {
        self.count("query");
        self.assert_table(&input.table_name);
        self.queries.lock().unwrap().push(input.clone());

        let step = self.query_steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Respond(ms)) => sleep(Duration::from_millis(ms)).await,
            Some(Step::Fail(ms, error)) => {
                sleep(Duration::from_millis(ms)).await;
                return Err(error);
            }
            None => {}
        }

        let pk = self.keys.partition_key.as_str();
        let value = input.expression_attribute_values.values().next().cloned();
        let items: Vec<Item> = self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|item| item.get(pk) == value.as_ref())
            .cloned()
            .collect();

        Ok(QueryOutput {
            count: items.len() as i32,
            items,
        })
    }

    async fn get_item(&self, table_name: &str, key: Item) -> Result<GetItemOutput> {
        self.count("get_item");
        self.assert_table(table_name);

        let item = self
            .items
            .lock()
            .unwrap()
            .iter()
            .find(|item| self.key_of(item) == key)
            .cloned();
        Ok(GetItemOutput { item })
    }

    async fn put_item(&self, table_name: &str, item: Item) -> Result<()> {
        self.count("put_item");
        self.assert_table(table_name);

        let key = self.key_of(&item);
        let mut items = self.items.lock().unwrap();
        items.retain(|i| self.key_of(i) != key);
        items.push(item);
        Ok(())
    }

    async fn scan(&self, input: ScanInput) -> Result<ScanOutput> {
        self.count("scan");
        self.assert_table(&input.table_name);

        if let Some(error) = self.scan_failures.lock().unwrap().pop_front() {
            return Err(error);
        }

        let mut items = self.items.lock().unwrap().clone();
        items.sort_by(|a, b| self.compare_keys(a, b));

        let mut page: Vec<Item> = items
            .into_iter()
            .filter(|item| match input.exclusive_start_key.as_ref() {
                Some(start) => self.compare_keys(item, start) == Ordering::Greater,
                None => true,
            })
            .collect();

        let mut last_evaluated_key = None;
        if let Some(limit) = input.limit {
            let limit = limit as usize;
            if page.len() >= limit {
                page.truncate(limit);
                last_evaluated_key = page.last().map(|item| self.key_of(item));
            }
        }

        if let Some(attribute) = input.projection.as_ref() {
            page = page
                .into_iter()
                .map(|item| item.into_iter().filter(|(k, _)| k == attribute).collect())
                .collect();
        }

        Ok(ScanOutput {
            items: page,
            last_evaluated_key,
        })
    }

    async fn describe_keys(&self, table_name: &str) -> Result<TableKeys> {
        self.count("describe_keys");
        self.assert_table(table_name);
        Ok(self.keys.clone())
    }
}

fn compare(a: Option<&AttributeValue>, b: Option<&AttributeValue>) -> Ordering {
    match (a, b) {
        (Some(AttributeValue::S(a)), Some(AttributeValue::S(b))) => a.cmp(b),
        (Some(AttributeValue::N(a)), Some(AttributeValue::N(b))) => {
            let a = a.parse::<f64>().unwrap();
            let b = b.parse::<f64>().unwrap();
            a.partial_cmp(&b).unwrap()
        }
        (Some(AttributeValue::B(a)), Some(AttributeValue::B(b))) => {
            a.as_ref().cmp(b.as_ref())
        }
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (a, b) => unreachable!("Cannot compare {a:?} with {b:?}"),
    }
}

#[test]
fn mock_scan_pages_by_key_order() {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();

    let client = MockClient::new("Music", "pk").with_sort_key("sk", ScalarAttributeType::N);
    for (pk, sk) in [("b", "2"), ("a", "10"), ("a", "9")] {
        client.push_item([
            ("pk", AttributeValue::S(pk.into())),
            ("sk", AttributeValue::N(sk.into())),
        ]);
    }

    let input = ScanInput {
        table_name: "Music".into(),
        limit: Some(1),
        ..ScanInput::default()
    };
    let first = rt.block_on(client.scan(input.clone())).unwrap();
    assert_eq!(first.items.len(), 1);
    assert_eq!(first.items[0].get("sk"), Some(&AttributeValue::N("9".into())));

    let next = ScanInput {
        exclusive_start_key: first.last_evaluated_key,
        ..input
    };
    let second = rt.block_on(client.scan(next)).unwrap();
    assert_eq!(second.items[0].get("sk"), Some(&AttributeValue::N("10".into())));
}
