use std::sync::Arc;

use crate::config::AppConfig;
use crate::store::{self, KvStore};

/// Everything a handler needs, passed in explicitly; nothing is read from
/// globals after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn KvStore>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let store = store::connect(&config.store).await?;
        tracing::info!(
            users = %config.tables.users,
            sessions = %config.tables.sessions,
            backend = config.store.kind(),
            "state initialised"
        );
        Ok(Self { config, store })
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::config::{JwtConfig, StoreConfig, TablesConfig};
        use crate::store::MemoryStore;

        let config = Arc::new(AppConfig {
            jwt: JwtConfig {
                secret: "test".into(),
                ttl_minutes: 5,
            },
            tables: TablesConfig {
                users: "users".into(),
                sessions: "sessions".into(),
            },
            store: StoreConfig::Memory,
        });
        Self {
            config,
            store: Arc::new(MemoryStore::new()),
        }
    }
}
