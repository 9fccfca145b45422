use std::fmt;

use anyhow::Context;
use serde::Deserialize;

const DEFAULT_TTL_MINUTES: i64 = 60;
/// One year.
const MAX_TTL_MINUTES: i64 = 525_600;

#[derive(Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_minutes: i64,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("ttl_minutes", &self.ttl_minutes)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TablesConfig {
    pub users: String,
    pub sessions: String,
}

/// Which key-value backend the stores talk to.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreConfig {
    Memory,
    Dynamodb {
        region: String,
        endpoint: Option<String>,
        access_key: Option<String>,
        secret_key: Option<String>,
    },
    Postgres {
        database_url: String,
    },
}

impl StoreConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            StoreConfig::Memory => "memory",
            StoreConfig::Dynamodb { .. } => "dynamodb",
            StoreConfig::Postgres { .. } => "postgres",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub jwt: JwtConfig,
    pub tables: TablesConfig,
    pub store: StoreConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let ttl_minutes = match var("JWT_TTL_MINUTES").or_else(|| var("TOKEN_EXPIRY_MIN")) {
            None => DEFAULT_TTL_MINUTES,
            Some(raw) => parse_ttl(&raw)?,
        };
        let jwt = JwtConfig {
            secret: var("JWT_SECRET").context("JWT_SECRET is not set")?,
            ttl_minutes,
        };

        let tables = TablesConfig {
            users: var("USERS_TABLE_NAME").unwrap_or_else(|| "users".into()),
            sessions: var("SESSIONS_TABLE_NAME").unwrap_or_else(|| "sessions".into()),
        };

        let backend = var("STORE_BACKEND").unwrap_or_else(|| "memory".into());
        let store = match backend.to_lowercase().as_str() {
            "memory" => StoreConfig::Memory,
            "dynamodb" | "dynamo" => StoreConfig::Dynamodb {
                region: var("AWS_REGION").unwrap_or_else(|| "us-west-2".into()),
                endpoint: var("DYNAMODB_ENDPOINT"),
                access_key: var("AWS_ACCESS_KEY_ID"),
                secret_key: var("AWS_SECRET_ACCESS_KEY"),
            },
            "postgres" => StoreConfig::Postgres {
                database_url: var("DATABASE_URL")
                    .context("DATABASE_URL is required for the postgres backend")?,
            },
            other => anyhow::bail!("unknown STORE_BACKEND `{other}`"),
        };

        Ok(Self { jwt, tables, store })
    }
}

fn parse_ttl(raw: &str) -> anyhow::Result<i64> {
    let minutes: i64 = raw
        .trim()
        .parse()
        .with_context(|| format!("token lifetime `{raw}` is not a whole number of minutes"))?;
    if !(1..=MAX_TTL_MINUTES).contains(&minutes) {
        anyhow::bail!("token lifetime must be between 1 and {MAX_TTL_MINUTES} minutes, got {minutes}");
    }
    Ok(minutes)
}
