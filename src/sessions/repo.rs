use time::OffsetDateTime;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::meta::Meta;
use crate::sessions::repo_types::Session;
use crate::store::{from_item, to_item, ItemKey, KvStore, StoreError};

impl Session {
    async fn fetch(
        store: &dyn KvStore,
        table: &str,
        id: &str,
        email: &str,
    ) -> Result<Option<Session>, StoreError> {
        store
            .get_item(&Session::table(table), &ItemKey::composite(email, id))
            .await?
            .map(from_item)
            .transpose()
    }

    /// Exact lookup by session id and owner email.
    #[instrument(skip(store))]
    pub async fn find_by_id(
        store: &dyn KvStore,
        table: &str,
        id: &str,
        email: &str,
    ) -> Result<Session, StoreError> {
        Self::fetch(store, table, id, email)
            .await?
            .ok_or(StoreError::NotFound)
    }

    /// All sessions owned by `email`, in backend order. No sessions is an empty list.
    #[instrument(skip(store))]
    pub async fn list_by_owner(
        store: &dyn KvStore,
        table: &str,
        email: &str,
    ) -> Result<Vec<Session>, StoreError> {
        let items = store.query(&Session::table(table), email).await?;
        debug!(count = items.len(), "sessions fetched");
        items.into_iter().map(from_item).collect()
    }

    /// Insert or update a session.
    ///
    /// Without an id a fresh one is generated and the metadata is stamped from
    /// scratch. With an id the first `created_at` is kept (stored record
    /// first, then whatever the caller sent) and `updated_at` is advanced.
    /// Concurrent writers to the same key: last write wins.
    #[instrument(skip(store, session), fields(id = ?session.id, email = %session.email))]
    pub async fn upsert(
        store: &dyn KvStore,
        table: &str,
        mut session: Session,
    ) -> Result<Session, StoreError> {
        let now = OffsetDateTime::now_utc();
        let meta = match session.existing_id().map(str::to_owned) {
            None => {
                session.id = Some(Uuid::new_v4().to_string());
                Meta::fresh(now)
            }
            Some(id) => {
                let stored = Self::fetch(store, table, &id, &session.email)
                    .await?
                    .and_then(|s| s.meta);
                Meta::touched(stored.or(session.meta), now)
            }
        };
        session.meta = Some(meta);

        store
            .put_item(&Session::table(table), to_item(&session)?)
            .await?;
        info!(id = ?session.id, "session saved");
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::collections::HashSet;
    use time::macros::datetime;

    fn draft(email: &str, name: &str) -> Session {
        Session {
            id: None,
            email: email.to_string(),
            name: name.to_string(),
            description: Some("notes".into()),
            session_start_date: datetime!(2024-05-01 09:00 UTC),
            session_end_date: None,
            status: "open".into(),
            meta: None,
        }
    }

    #[tokio::test]
    async fn new_session_gets_id_and_fresh_meta() {
        let store = MemoryStore::new();
        let saved = Session::upsert(&store, "sessions", draft("a@x.com", "one"))
            .await
            .unwrap();
        let id = saved.existing_id().expect("generated id");
        assert!(!id.is_empty());
        let meta = saved.meta.expect("meta stamped");
        assert_eq!(meta.created_at, meta.updated_at);
        assert!(meta.is_active);
    }

    #[tokio::test]
    async fn blank_id_is_treated_as_new() {
        let store = MemoryStore::new();
        let mut s = draft("a@x.com", "one");
        s.id = Some("  ".to_string());
        let saved = Session::upsert(&store, "sessions", s).await.unwrap();
        assert!(saved.existing_id().is_some());
    }

    #[tokio::test]
    async fn generated_ids_are_unique() {
        let store = MemoryStore::new();
        let mut ids = HashSet::new();
        for i in 0..20 {
            let saved = Session::upsert(&store, "sessions", draft("a@x.com", &format!("s{i}")))
                .await
                .unwrap();
            assert!(ids.insert(saved.id.unwrap()));
        }
        assert_eq!(
            Session::list_by_owner(&store, "sessions", "a@x.com")
                .await
                .unwrap()
                .len(),
            20
        );
    }

    #[tokio::test]
    async fn second_upsert_keeps_created_at_and_advances_updated_at() {
        let store = MemoryStore::new();
        let first = Session::upsert(&store, "sessions", draft("a@x.com", "one"))
            .await
            .unwrap();
        let first_meta = first.meta.unwrap();

        let mut edit = first.clone();
        edit.name = "renamed".into();
        edit.status = "closed".into();
        let second = Session::upsert(&store, "sessions", edit).await.unwrap();
        let second_meta = second.meta.unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second_meta.created_at, first_meta.created_at);
        assert!(second_meta.updated_at > first_meta.updated_at);

        let stored = Session::find_by_id(&store, "sessions", first.existing_id().unwrap(), "a@x.com")
            .await
            .unwrap();
        assert_eq!(stored.name, "renamed");
        assert_eq!(stored.meta, Some(second_meta));
    }

    #[tokio::test]
    async fn update_without_meta_recovers_created_at_from_store() {
        let store = MemoryStore::new();
        let first = Session::upsert(&store, "sessions", draft("a@x.com", "one"))
            .await
            .unwrap();

        let mut edit = first.clone();
        edit.meta = None;
        let second = Session::upsert(&store, "sessions", edit).await.unwrap();
        assert_eq!(
            second.meta.unwrap().created_at,
            first.meta.unwrap().created_at
        );
    }

    #[tokio::test]
    async fn stored_created_at_wins_over_caller_supplied_meta() {
        let store = MemoryStore::new();
        let first = Session::upsert(&store, "sessions", draft("a@x.com", "one"))
            .await
            .unwrap();

        let mut edit = first.clone();
        edit.meta = Some(Meta::fresh(datetime!(2000-01-01 00:00 UTC)));
        let second = Session::upsert(&store, "sessions", edit).await.unwrap();
        assert_eq!(
            second.meta.unwrap().created_at,
            first.meta.unwrap().created_at
        );
    }

    #[tokio::test]
    async fn find_requires_matching_owner() {
        let store = MemoryStore::new();
        let saved = Session::upsert(&store, "sessions", draft("a@x.com", "one"))
            .await
            .unwrap();
        let id = saved.existing_id().unwrap();

        assert!(Session::find_by_id(&store, "sessions", id, "a@x.com").await.is_ok());
        let err = Session::find_by_id(&store, "sessions", id, "b@x.com")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn list_for_owner_without_sessions_is_empty() {
        let store = MemoryStore::new();
        Session::upsert(&store, "sessions", draft("a@x.com", "one"))
            .await
            .unwrap();
        let none = Session::list_by_owner(&store, "sessions", "b@x.com")
            .await
            .unwrap();
        assert!(none.is_empty());
    }
}
