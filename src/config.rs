//! Connection settings.
//!
//! Resolution order: defaults, then a JSON document or the `NEO4J_*`
//! environment variables on top.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const ENV_URI: &str = "NEO4J_URI";
pub const ENV_USER: &str = "NEO4J_USER";
pub const ENV_PASSWORD: &str = "NEO4J_PASSWORD";
pub const ENV_DATABASE: &str = "NEO4J_DATABASE";

/// Where and how to reach the database.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// e.g. `neo4j://localhost:7687` or `bolt://db.internal:7687`
    pub uri: String,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
    /// Target database; `None` uses the server default.
    pub database: Option<String>,
    pub max_connections: usize,
    pub fetch_size: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            uri: "neo4j://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: String::new(),
            database: None,
            max_connections: 16,
            fetch_size: 200,
        }
    }
}

impl ConnectionConfig {
    pub fn new(uri: impl Into<String>, user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            user: user.into(),
            password: password.into(),
            ..Self::default()
        }
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Defaults overridden by whichever `NEO4J_*` variables are set.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(uri) = lookup(ENV_URI) {
            config.uri = uri;
        }
        if let Some(user) = lookup(ENV_USER) {
            config.user = user;
        }
        if let Some(password) = lookup(ENV_PASSWORD) {
            config.password = password;
        }
        if let Some(db) = lookup(ENV_DATABASE).filter(|d| !d.is_empty()) {
            config.database = Some(db);
        }
        config
    }

    /// Parse a JSON document; missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.uri.trim().is_empty() {
            return Err(Error::Config("uri must not be empty".into()));
        }
        if self.max_connections == 0 {
            return Err(Error::Config("max_connections must be at least 1".into()));
        }
        Ok(())
    }
}
