use serde::{Deserialize, Serialize};

use crate::meta::Meta;
use crate::store::Table;

/// User record as persisted; `pwd` holds the Argon2 hash, never the plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub email: String, // unique identifier, immutable once written
    pub pwd: String,
    pub name: String,
    pub role: String,
    pub meta: Meta,
}

impl User {
    pub fn table(name: &str) -> Table {
        Table::new(name, "email")
    }
}
