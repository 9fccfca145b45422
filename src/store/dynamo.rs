use std::collections::HashMap;

use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_dynamodb::{
    config::{Builder as DynamoConfigBuilder, Region},
    error::DisplayErrorContext,
    types::AttributeValue,
    Client,
};
use serde_json::{Number, Value};
use tracing::{debug, instrument};

use super::{Item, ItemKey, KvStore, StoreError, Table};

type Attributes = HashMap<String, AttributeValue>;

#[derive(Clone, Debug)]
pub struct DynamoStore {
    client: Client,
}

impl DynamoStore {
    /// `endpoint` points the client at a local DynamoDB; static credentials are
    /// only needed in that case, otherwise the default provider chain applies.
    pub async fn new(
        region: &str,
        endpoint: Option<&str>,
        credentials: Option<(&str, &str)>,
    ) -> anyhow::Result<Self> {
        let mut loader = defaults(BehaviorVersion::latest()).region(Region::new(region.to_string()));
        if let Some((access_key, secret_key)) = credentials {
            loader = loader.credentials_provider(Credentials::new(
                access_key, secret_key, None, None, "static",
            ));
        }
        if let Some(endpoint) = endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let shared = loader.load().await;

        let conf = DynamoConfigBuilder::from(&shared).build();
        Ok(Self::from_client(Client::from_conf(conf)))
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

fn backend<E: std::error::Error>(e: E) -> StoreError {
    StoreError::Backend(DisplayErrorContext(e).to_string())
}

fn key_attributes(table: &Table, key: &ItemKey) -> Attributes {
    let mut attrs = HashMap::new();
    attrs.insert(
        table.partition_key.to_string(),
        AttributeValue::S(key.partition.clone()),
    );
    if let (Some(name), Some(value)) = (table.sort_key, key.sort.as_ref()) {
        attrs.insert(name.to_string(), AttributeValue::S(value.clone()));
    }
    attrs
}

#[async_trait]
impl KvStore for DynamoStore {
    #[instrument(skip(self, table), fields(table = %table.name))]
    async fn get_item(&self, table: &Table, key: &ItemKey) -> Result<Option<Item>, StoreError> {
        let output = self
            .client
            .get_item()
            .table_name(&table.name)
            .set_key(Some(key_attributes(table, key)))
            .send()
            .await
            .map_err(backend)?;

        match output.item {
            Some(attrs) if !attrs.is_empty() => Ok(Some(to_item(attrs))),
            _ => Ok(None),
        }
    }

    #[instrument(skip(self, table, item), fields(table = %table.name))]
    async fn put_item(&self, table: &Table, item: Item) -> Result<(), StoreError> {
        // Reject keyless items before they reach the service.
        table.key_of(&item)?;
        self.client
            .put_item()
            .table_name(&table.name)
            .set_item(Some(to_attributes(item)))
            .send()
            .await
            .map_err(backend)?;
        Ok(())
    }

    #[instrument(skip(self, table), fields(table = %table.name))]
    async fn query(&self, table: &Table, partition: &str) -> Result<Vec<Item>, StoreError> {
        let mut items = Vec::new();
        let mut start_key: Option<Attributes> = None;
        loop {
            let output = self
                .client
                .query()
                .table_name(&table.name)
                .key_condition_expression("#pk = :pk")
                .expression_attribute_names("#pk", table.partition_key)
                .expression_attribute_values(":pk", AttributeValue::S(partition.to_string()))
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(backend)?;

            items.extend(output.items.unwrap_or_default().into_iter().map(to_item));
            match output.last_evaluated_key {
                Some(next) if !next.is_empty() => {
                    debug!(fetched = items.len(), "query page boundary");
                    start_key = Some(next);
                }
                _ => break,
            }
        }
        Ok(items)
    }
}

fn to_attributes(item: Item) -> Attributes {
    item.into_iter()
        .map(|(name, value)| (name, to_attribute(value)))
        .collect()
}

fn to_item(attrs: Attributes) -> Item {
    attrs
        .into_iter()
        .map(|(name, attr)| (name, from_attribute(attr)))
        .collect()
}

fn to_attribute(value: Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s),
        Value::Array(values) => AttributeValue::L(values.into_iter().map(to_attribute).collect()),
        Value::Object(map) => AttributeValue::M(to_attributes(map)),
    }
}

fn from_attribute(attr: AttributeValue) -> Value {
    match attr {
        AttributeValue::S(s) => Value::String(s),
        AttributeValue::N(n) => parse_number(n),
        AttributeValue::Bool(b) => Value::Bool(b),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::L(values) => Value::Array(values.into_iter().map(from_attribute).collect()),
        AttributeValue::M(map) => Value::Object(to_item(map)),
        AttributeValue::Ss(values) => Value::Array(values.into_iter().map(Value::String).collect()),
        AttributeValue::Ns(values) => Value::Array(values.into_iter().map(parse_number).collect()),
        // binary attributes are never written by this service
        _ => Value::Null,
    }
}

fn parse_number(n: String) -> Value {
    match n.parse::<Number>() {
        Ok(number) => Value::Number(number),
        Err(_) => Value::String(n),
    }
}
