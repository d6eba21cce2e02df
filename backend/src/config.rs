//! Server and site configuration.
//!
//! Values come from an optional `blog.toml` file and from the environment;
//! an environment variable always wins over the file. The same file may
//! carry `[repository]` and `[postgres]` sections, read by
//! [`crate::db::RepositoryConfig`].
//!
//! ```toml
//! [site]
//! url = "https://blog.fleetcrew.ca"
//! language = "fr-CA"
//! rss_item_limit = 20
//!
//! [auth]
//! jwt_secret = "..."
//! owner_open_id = "..."
//!
//! [images]
//! url = "https://images.internal/generate"
//! api_key = "..."
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_SITE_TITLE: &str = "FleetCrew Blog - Gestion de Flottes au Québec";
pub const DEFAULT_SITE_DESCRIPTION: &str = "Blog spécialisé en gestion de flottes au Québec. Articles sur la mécanique, technologies, IA, maintenance préventive et conformité SAAQ.";
pub const DEFAULT_SITE_LANGUAGE: &str = "fr-CA";
pub const DEFAULT_RSS_ITEM_LIMIT: i64 = 20;

pub const CONFIG_PATH_ENV: &str = "BLOG_CONFIG";
const CONFIG_SEARCH_PATHS: [&str; 3] = ["blog.toml", "backend/blog.toml", "../blog.toml"];

/// Contents of `blog.toml`. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub site: SiteSection,
    #[serde(default)]
    pub auth: AuthSection,
    #[serde(default)]
    pub images: ImagesSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SiteSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub language: Option<String>,
    pub rss_item_limit: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthSection {
    pub jwt_secret: Option<String>,
    pub scheduled_task_api_key: Option<String>,
    pub owner_open_id: Option<String>,
    pub owner_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImagesSection {
    pub url: Option<String>,
    pub api_key: Option<String>,
}

impl FileConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// The first `blog.toml` found in the standard locations, if any.
    pub fn from_default_location() -> Result<Option<Self>> {
        locate_config_file()
            .map(|path| {
                log::info!("Loading site configuration from {}", path.display());
                Self::from_file(path)
            })
            .transpose()
    }
}

/// Path of the `blog.toml` shared by the site and repository settings.
///
/// `BLOG_CONFIG` names an explicit path and is returned even when the file
/// is missing, so that loading it reports the error. Otherwise the current
/// directory, `backend/` and the parent directory are searched in order.
pub fn locate_config_file() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return Some(PathBuf::from(path));
    }
    CONFIG_SEARCH_PATHS
        .into_iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

/// Credentials of the external cover-image service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageGeneratorConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
}

/// Immutable application configuration shared by every handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Public base URL without trailing slash. When absent, feeds derive
    /// it from the request's `Host` header.
    pub site_url: Option<String>,
    pub site_title: String,
    pub site_description: String,
    pub site_language: String,
    pub rss_item_limit: i64,
    /// Secret used to sign session tokens. Without it no session verifies.
    pub jwt_secret: Option<String>,
    pub scheduled_task_api_key: Option<String>,
    pub owner_open_id: Option<String>,
    pub owner_name: Option<String>,
    pub image_generator: Option<ImageGeneratorConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_sources(FileConfig::default(), |_| None)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl AppConfig {
    /// Load `blog.toml` (when present) and overlay the process environment.
    pub fn load() -> Result<Self> {
        let file = FileConfig::from_default_location()?.unwrap_or_default();
        Ok(Self::from_sources(file, |key| std::env::var(key).ok()))
    }

    /// Configuration from the environment only.
    pub fn from_env() -> Self {
        Self::from_sources(FileConfig::default(), |key| std::env::var(key).ok())
    }

    /// Merge a parsed file with an environment lookup; `env` wins.
    pub fn from_sources(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        let env = |key: &str| non_empty(env(key));
        let FileConfig { site, auth, images } = file;

        let host = env("HOST")
            .or(non_empty(site.host))
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = env("PORT")
            .and_then(|p| p.parse().ok())
            .or(site.port)
            .unwrap_or(DEFAULT_PORT);
        let site_url = env("SITE_URL")
            .or(non_empty(site.url))
            .map(|u| u.trim_end_matches('/').to_string());
        let rss_item_limit = env("RSS_ITEM_LIMIT")
            .and_then(|l| l.parse().ok())
            .or(site.rss_item_limit)
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_RSS_ITEM_LIMIT);

        let jwt_secret = env("JWT_SECRET").or(non_empty(auth.jwt_secret));
        let scheduled_task_api_key = env("SCHEDULED_TASK_API_KEY")
            .or(non_empty(auth.scheduled_task_api_key))
            .or_else(|| jwt_secret.clone());

        let image_generator = env("IMAGE_GENERATOR_URL")
            .or(non_empty(images.url))
            .map(|endpoint| ImageGeneratorConfig {
                endpoint,
                api_key: env("IMAGE_GENERATOR_API_KEY").or(non_empty(images.api_key)),
            });

        Self {
            host,
            port,
            site_url,
            site_title: env("SITE_TITLE")
                .or(non_empty(site.title))
                .unwrap_or_else(|| DEFAULT_SITE_TITLE.to_string()),
            site_description: env("SITE_DESCRIPTION")
                .or(non_empty(site.description))
                .unwrap_or_else(|| DEFAULT_SITE_DESCRIPTION.to_string()),
            site_language: env("SITE_LANGUAGE")
                .or(non_empty(site.language))
                .unwrap_or_else(|| DEFAULT_SITE_LANGUAGE.to_string()),
            rss_item_limit,
            jwt_secret,
            scheduled_task_api_key,
            owner_open_id: env("OWNER_OPEN_ID").or(non_empty(auth.owner_open_id)),
            owner_name: env("OWNER_NAME").or(non_empty(auth.owner_name)),
            image_generator,
        }
    }

    /// Socket address string for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
        assert_eq!(config.site_language, "fr-CA");
        assert_eq!(config.rss_item_limit, 20);
        assert!(config.site_url.is_none());
        assert!(config.scheduled_task_api_key.is_none());
        assert!(config.image_generator.is_none());
    }

    #[test]
    fn test_api_key_falls_back_to_session_secret() {
        let config = AppConfig::from_sources(FileConfig::default(), lookup(&[("JWT_SECRET", "s3cret")]));
        assert_eq!(config.scheduled_task_api_key.as_deref(), Some("s3cret"));

        let config = AppConfig::from_sources(
            FileConfig::default(),
            lookup(&[("JWT_SECRET", "s3cret"), ("SCHEDULED_TASK_API_KEY", "task")]),
        );
        assert_eq!(config.scheduled_task_api_key.as_deref(), Some("task"));
    }

    #[test]
    fn test_env_wins_over_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[site]\nurl = \"https://file.example/\"\nport = 4000\nrss_item_limit = 5\n\n[images]\nurl = \"https://img.example\""
        )
        .unwrap();
        let parsed = FileConfig::from_file(file.path()).unwrap();

        let config = AppConfig::from_sources(parsed, lookup(&[("PORT", "8081")]));
        assert_eq!(config.port, 8081);
        assert_eq!(config.site_url.as_deref(), Some("https://file.example"));
        assert_eq!(config.rss_item_limit, 5);
        assert_eq!(
            config.image_generator.map(|i| i.endpoint).as_deref(),
            Some("https://img.example")
        );
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let config = AppConfig::from_sources(
            FileConfig::default(),
            lookup(&[("SITE_URL", "  "), ("RSS_ITEM_LIMIT", "0")]),
        );
        assert!(config.site_url.is_none());
        assert_eq!(config.rss_item_limit, DEFAULT_RSS_ITEM_LIMIT);
    }
}
