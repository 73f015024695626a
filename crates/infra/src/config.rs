//! Database connection configuration.
//!
//! Either a full `DATABASE_URL`, or the TiDB parts (`TIDB_USER`,
//! `TIDB_PASSWORD`, `TIDB_HOST`, `TIDB_PORT`, `TIDB_DB`, optional
//! `TIDB_SSL_CA_PATH`) assembled into a `mysql://` URL.

use reqwest::Url;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing database setting: {0}")]
    Missing(&'static str),

    #[error("invalid database setting: {0}")]
    Invalid(String),
}

/// TiDB / MySQL connection parts.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct DatabaseParts {
    pub user: Option<String>,
    pub password: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub ssl_ca: Option<String>,
}

impl std::fmt::Debug for DatabaseParts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseParts")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("ssl_ca", &self.ssl_ca)
            .finish()
    }
}

/// Where the book store lives.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct DatabaseConfig {
    /// Takes precedence over `parts` when set.
    pub url: Option<String>,
    pub parts: DatabaseParts,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url.as_ref().map(|_| "***"))
            .field("parts", &self.parts)
            .finish()
    }
}

impl DatabaseConfig {
    /// `true` when neither a URL nor a host was given.
    pub fn is_unset(&self) -> bool {
        self.url.as_deref().is_none_or(str::is_empty) && self.parts.host.is_none()
    }

    /// Connection URL for sqlx.
    pub fn connection_url(&self) -> Result<String, ConfigError> {
        if let Some(url) = self.url.as_deref().filter(|u| !u.is_empty()) {
            return Ok(url.to_string());
        }
        let parts = &self.parts;
        let host = parts.host.as_deref().ok_or(ConfigError::Missing("TIDB_HOST"))?;
        let user = parts.user.as_deref().ok_or(ConfigError::Missing("TIDB_USER"))?;
        let database = parts.database.as_deref().ok_or(ConfigError::Missing("TIDB_DB"))?;
        let port = parts.port.unwrap_or(4000);

        let mut url = Url::parse(&format!("mysql://{host}:{port}/{database}"))
            .map_err(|e| ConfigError::Invalid(format!("{host}:{port}/{database}: {e}")))?;
        url.set_username(user)
            .map_err(|_| ConfigError::Invalid("user".to_string()))?;
        if let Some(password) = parts.password.as_deref() {
            url.set_password(Some(password))
                .map_err(|_| ConfigError::Invalid("password".to_string()))?;
        }
        if let Some(ca) = parts.ssl_ca.as_deref() {
            url.query_pairs_mut()
                .append_pair("ssl-mode", "VERIFY_IDENTITY")
                .append_pair("ssl-ca", ca);
        }
        Ok(url.to_string())
    }
}
