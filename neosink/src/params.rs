use serde::Deserialize;

use crate::error::{Neo4jSinkError, Result};

/// Connection settings for a Neo4j server reached over its HTTP API.
#[derive(Debug, Deserialize, Clone)]
pub struct Neo4jParams {
    pub url: String,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

fn default_database() -> String {
    "neo4j".to_string()
}

impl Neo4jParams {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            database: default_database(),
            username: None,
            password: None,
        }
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(Neo4jSinkError::InvalidParam(format!(
                "url must be an http(s) address, got '{}'",
                self.url
            )));
        }
        if self.database.trim().is_empty() {
            return Err(Neo4jSinkError::InvalidParam(
                "database must not be empty".into(),
            ));
        }
        if self.password.is_some() && self.username.is_none() {
            return Err(Neo4jSinkError::InvalidParam(
                "password given without a username".into(),
            ));
        }
        Ok(())
    }

    /// Auto-commit transaction endpoint: `<url>/db/<database>/tx/commit`.
    pub fn commit_url(&self) -> String {
        format!(
            "{}/db/{}/tx/commit",
            self.url.trim_end_matches('/'),
            self.database
        )
    }
}
