use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Item, ItemKey, KvStore, StoreError, Table};

/// Process-local backend. Items are kept per table, ordered by key.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, BTreeMap<ItemKey, Item>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get_item(&self, table: &Table, key: &ItemKey) -> Result<Option<Item>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(&table.name)
            .and_then(|rows| rows.get(key))
            .cloned())
    }

    async fn put_item(&self, table: &Table, item: Item) -> Result<(), StoreError> {
        let key = table.key_of(&item)?;
        let mut tables = self.tables.write().await;
        tables
            .entry(table.name.clone())
            .or_default()
            .insert(key, item);
        Ok(())
    }

    async fn query(&self, table: &Table, partition: &str) -> Result<Vec<Item>, StoreError> {
        let tables = self.tables.read().await;
        let Some(rows) = tables.get(&table.name) else {
            return Ok(Vec::new());
        };
        Ok(rows
            .iter()
            .filter(|(key, _)| key.partition == partition)
            .map(|(_, item)| item.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn item(value: Value) -> Item {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn put_then_get_by_full_key() {
        let store = MemoryStore::new();
        let table = Table::new("sessions", "email").with_sort_key("id");
        store
            .put_item(&table, item(json!({"email": "a@x.com", "id": "1", "name": "one"})))
            .await
            .unwrap();

        let hit = store
            .get_item(&table, &ItemKey::composite("a@x.com", "1"))
            .await
            .unwrap()
            .expect("stored item");
        assert_eq!(hit["name"], "one");

        let miss = store
            .get_item(&table, &ItemKey::composite("b@x.com", "1"))
            .await
            .unwrap();
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn put_overwrites_same_key() {
        let store = MemoryStore::new();
        let table = Table::new("users", "email");
        store
            .put_item(&table, item(json!({"email": "a@x.com", "name": "first"})))
            .await
            .unwrap();
        store
            .put_item(&table, item(json!({"email": "a@x.com", "name": "second"})))
            .await
            .unwrap();
        let got = store
            .get_item(&table, &ItemKey::partition("a@x.com"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got["name"], "second");
    }

    #[tokio::test]
    async fn query_is_scoped_to_partition() {
        let store = MemoryStore::new();
        let table = Table::new("sessions", "email").with_sort_key("id");
        for (email, id) in [("a@x.com", "1"), ("a@x.com", "2"), ("b@x.com", "3")] {
            store
                .put_item(&table, item(json!({"email": email, "id": id})))
                .await
                .unwrap();
        }
        assert_eq!(store.query(&table, "a@x.com").await.unwrap().len(), 2);
        assert_eq!(store.query(&table, "b@x.com").await.unwrap().len(), 1);
        assert!(store.query(&table, "c@x.com").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn query_on_unknown_table_is_empty() {
        let store = MemoryStore::new();
        let table = Table::new("nothing-here", "email");
        assert!(store.query(&table, "a@x.com").await.unwrap().is_empty());
    }
}
