//! `[repository]` and `[postgres]` sections of `blog.toml`.
//!
//! They share the file located by [`crate::config::locate_config_file`]
//! with the site settings:
//!
//! ```toml
//! [repository]
//! type = "postgres"
//!
//! [postgres]
//! database_url = "postgres://blog@localhost/fleetcrew"
//! max_connections = 20
//! ```
//!
//! A file without `[repository] type` leaves the choice to the
//! environment. Unset pool keys keep the [`PostgresConfig`] defaults.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::factory::RepositoryType;
use super::repository::{RepositoryError, RepositoryResult};
use crate::config::locate_config_file;
use crate::db::PostgresConfig;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepositoryConfig {
    #[serde(default)]
    pub repository: RepositorySection,
    #[serde(default)]
    pub postgres: PostgresSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepositorySection {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostgresSection {
    pub database_url: Option<String>,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub connect_timeout: Option<u64>,
    pub idle_timeout: Option<u64>,
    pub max_retries: Option<u32>,
    pub retry_delay_ms: Option<u64>,
}

impl RepositoryConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> RepositoryResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            RepositoryError::configuration(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        toml::from_str(&content).map_err(|e| {
            RepositoryError::configuration(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Repository sections of the shared `blog.toml`, `None` when there is no file.
    pub fn from_default_location() -> RepositoryResult<Option<Self>> {
        locate_config_file()
            .map(|path| {
                log::info!("Loading repository configuration from {}", path.display());
                Self::from_file(path)
            })
            .transpose()
    }

    /// The backend named by the file, `None` when it names none.
    pub fn repository_type(&self) -> RepositoryResult<Option<RepositoryType>> {
        self.repository
            .kind
            .as_deref()
            .map(|kind| {
                kind.parse::<RepositoryType>().map_err(|e| {
                    RepositoryError::configuration(format!("Invalid repository type: {}", e))
                })
            })
            .transpose()
    }

    #[cfg(feature = "postgres-repo")]
    pub fn to_postgres_config(&self) -> RepositoryResult<Option<PostgresConfig>> {
        if self.repository_type()? != Some(RepositoryType::Postgres) {
            return Ok(None);
        }

        let pg = &self.postgres;
        let database_url = pg
            .database_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                RepositoryError::configuration(
                    "Postgres repository requires 'postgres.database_url' setting",
                )
            })?;

        let defaults = PostgresConfig::default();
        Ok(Some(PostgresConfig {
            database_url: database_url.to_string(),
            max_pool_size: pg.max_connections.unwrap_or(defaults.max_pool_size),
            min_pool_size: pg.min_connections.unwrap_or(defaults.min_pool_size),
            connection_timeout_sec: pg.connect_timeout.unwrap_or(defaults.connection_timeout_sec),
            idle_timeout_sec: pg.idle_timeout.unwrap_or(defaults.idle_timeout_sec),
            max_retries: pg.max_retries.unwrap_or(defaults.max_retries),
            retry_delay_ms: pg.retry_delay_ms.unwrap_or(defaults.retry_delay_ms),
        }))
    }

    #[cfg(not(feature = "postgres-repo"))]
    pub fn to_postgres_config(&self) -> RepositoryResult<Option<PostgresConfig>> {
        match self.repository_type()? {
            Some(RepositoryType::Postgres) => Err(RepositoryError::configuration(
                "Postgres repository feature not enabled",
            )),
            _ => Ok(None),
        }
    }
}
