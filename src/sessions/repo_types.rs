use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::meta::Meta;
use crate::store::Table;

/// Session record as persisted. Keyed by owner `email` (partition) and `id`
/// (sort), so listing an owner's sessions is a single partition query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>, // assigned on first save
    pub email: String, // owner
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub session_start_date: OffsetDateTime,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub session_end_date: Option<OffsetDateTime>,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl Session {
    pub fn table(name: &str) -> Table {
        Table::new(name, "email").with_sort_key("id")
    }

    /// The identifier, unless it is missing or blank.
    pub fn existing_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.trim().is_empty())
    }
}
