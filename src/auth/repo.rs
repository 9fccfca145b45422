use time::OffsetDateTime;
use tracing::{info, instrument};

use crate::auth::password::{hash_password, HashingError};
use crate::auth::repo_types::User;
use crate::meta::Meta;
use crate::store::{from_item, to_item, ItemKey, KvStore, StoreError};

/// Failures of the registration path. `User::create` only ever yields the
/// `Hashing` and `Store` variants; the rest come from `services::register`.
#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    #[error("Invalid email")]
    InvalidEmail,
    #[error("Password is required")]
    MissingPassword,
    #[error("Email already registered")]
    AlreadyRegistered,
    #[error(transparent)]
    Hashing(#[from] HashingError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl User {
    /// Find a user by email. A miss is `StoreError::NotFound`.
    #[instrument(skip(store))]
    pub async fn find_by_email(
        store: &dyn KvStore,
        table: &str,
        email: &str,
    ) -> Result<User, StoreError> {
        let item = store
            .get_item(&User::table(table), &ItemKey::partition(email))
            .await?
            .ok_or(StoreError::NotFound)?;
        from_item(item)
    }

    /// Create a user with a hashed password.
    ///
    /// The write is unconditional: an existing record with the same email is
    /// replaced. Callers that need uniqueness check with `find_by_email` first.
    #[instrument(skip(store, plain_pwd))]
    pub async fn create(
        store: &dyn KvStore,
        table: &str,
        email: &str,
        plain_pwd: &str,
        name: &str,
        role: &str,
    ) -> Result<User, RegisterError> {
        let user = User {
            email: email.to_string(),
            pwd: hash_password(plain_pwd)?,
            name: name.to_string(),
            role: role.to_string(),
            meta: Meta::fresh(OffsetDateTime::now_utc()),
        };
        store.put_item(&User::table(table), to_item(&user)?).await?;
        info!(email = %user.email, role = %user.role, "user stored");
        Ok(user)
    }
}
