//! Narrow key-value contract the user and session stores are written against.
//!
//! Backends only need to answer three calls: fetch one item by its full key,
//! write one item, and list every item sharing a partition key.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::config::StoreConfig;

pub mod dynamo;
pub mod memory;
pub mod postgres;

pub use dynamo::DynamoStore;
pub use memory::MemoryStore;
pub use postgres::PgStore;

/// A stored record: a JSON object whose key attributes are strings.
pub type Item = serde_json::Map<String, Value>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("store backend error: {0}")]
    Backend(String),
    #[error("record could not be encoded or decoded: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("item is missing string key attribute `{0}`")]
    MissingKey(String),
}

/// Table name plus the attribute names that make up its primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    pub partition_key: &'static str,
    pub sort_key: Option<&'static str>,
}

impl Table {
    pub fn new(name: impl Into<String>, partition_key: &'static str) -> Self {
        Self {
            name: name.into(),
            partition_key,
            sort_key: None,
        }
    }

    pub fn with_sort_key(mut self, sort_key: &'static str) -> Self {
        self.sort_key = Some(sort_key);
        self
    }

    /// Pulls the primary key values out of an item.
    pub fn key_of(&self, item: &Item) -> Result<ItemKey, StoreError> {
        let partition = string_attr(item, self.partition_key)?;
        let sort = match self.sort_key {
            Some(name) => Some(string_attr(item, name)?),
            None => None,
        };
        Ok(ItemKey { partition, sort })
    }
}

fn string_attr(item: &Item, name: &str) -> Result<String, StoreError> {
    match item.get(name) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        _ => Err(StoreError::MissingKey(name.to_string())),
    }
}

/// Values of a table's primary key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemKey {
    pub partition: String,
    pub sort: Option<String>,
}

impl ItemKey {
    pub fn partition(value: impl Into<String>) -> Self {
        Self {
            partition: value.into(),
            sort: None,
        }
    }

    pub fn composite(partition: impl Into<String>, sort: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            sort: Some(sort.into()),
        }
    }
}

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get_item(&self, table: &Table, key: &ItemKey) -> Result<Option<Item>, StoreError>;
    async fn put_item(&self, table: &Table, item: Item) -> Result<(), StoreError>;
    /// Every item whose partition key equals `partition`, in backend order.
    async fn query(&self, table: &Table, partition: &str) -> Result<Vec<Item>, StoreError>;
}

pub fn to_item<T: Serialize>(record: &T) -> Result<Item, StoreError> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Backend(format!(
            "record did not serialise to an object: {other}"
        ))),
    }
}

pub fn from_item<T: DeserializeOwned>(item: Item) -> Result<T, StoreError> {
    Ok(serde_json::from_value(Value::Object(item))?)
}

/// Builds the backend selected by configuration.
pub async fn connect(config: &StoreConfig) -> anyhow::Result<Arc<dyn KvStore>> {
    let store: Arc<dyn KvStore> = match config {
        StoreConfig::Memory => {
            tracing::warn!("using in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
        StoreConfig::Dynamodb {
            region,
            endpoint,
            access_key,
            secret_key,
        } => Arc::new(
            DynamoStore::new(
                region,
                endpoint.as_deref(),
                access_key.as_deref().zip(secret_key.as_deref()),
            )
            .await?,
        ),
        StoreConfig::Postgres { database_url } => Arc::new(PgStore::connect(database_url).await?),
    };
    Ok(store)
}
