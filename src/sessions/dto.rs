use serde::Deserialize;
use time::OffsetDateTime;

use crate::sessions::repo_types::Session;

/// Body of `PUT /sessions`. The owner is taken from the bearer token, never
/// from the body.
#[derive(Debug, Deserialize)]
pub struct SessionInput {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub session_start_date: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub session_end_date: Option<OffsetDateTime>,
    pub status: String,
}

impl SessionInput {
    pub fn into_session(self, owner: String) -> Session {
        Session {
            id: self.id,
            email: owner,
            name: self.name,
            description: self.description,
            session_start_date: self.session_start_date,
            session_end_date: self.session_end_date,
            status: self.status,
            meta: None,
        }
    }
}
