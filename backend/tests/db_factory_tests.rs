//! Tests for repository selection and configuration loading.

mod support;

use std::io::Write;
use std::str::FromStr;

use fleetcrew_blog::config::AppConfig;
use fleetcrew_blog::db::factory::{RepositoryBuilder, RepositoryFactory, RepositoryType};
use fleetcrew_blog::db::RepositoryError;

#[test]
fn test_repository_type_from_str() {
    assert_eq!(RepositoryType::from_str("POSTGRES").unwrap(), RepositoryType::Postgres);
    assert_eq!(RepositoryType::from_str("pg").unwrap(), RepositoryType::Postgres);
    assert_eq!(RepositoryType::from_str("Local").unwrap(), RepositoryType::Local);

    let result = RepositoryType::from_str("sqlite");
    assert!(result.unwrap_err().contains("Unknown repository type"));
}

#[test]
fn test_repository_type_from_env_default() {
    support::with_scoped_env(
        &[
            ("REPOSITORY_TYPE", None),
            ("DATABASE_URL", None),
            ("PG_DATABASE_URL", None),
        ],
        || assert_eq!(RepositoryType::from_env(), RepositoryType::Local),
    );
}

#[test]
fn test_repository_type_from_env_with_database_url() {
    support::with_scoped_env(
        &[
            ("REPOSITORY_TYPE", None),
            ("DATABASE_URL", Some("postgres://localhost/blog")),
        ],
        || assert_eq!(RepositoryType::from_env(), RepositoryType::Postgres),
    );
}

#[test]
fn test_repository_type_explicit_wins_over_database_url() {
    support::with_scoped_env(
        &[
            ("REPOSITORY_TYPE", Some("local")),
            ("DATABASE_URL", Some("postgres://localhost/blog")),
        ],
        || assert_eq!(RepositoryType::from_env(), RepositoryType::Local),
    );
}

#[test]
fn test_repository_type_invalid_defaults_to_local() {
    support::with_scoped_env(&[("REPOSITORY_TYPE", Some("invalid"))], || {
        assert_eq!(RepositoryType::from_env(), RepositoryType::Local)
    });
}

#[tokio::test]
async fn test_create_local_via_factory() {
    let repo = RepositoryFactory::create(RepositoryType::Local, None).await.unwrap();
    assert!(repo.health_check().await.unwrap());
}

#[tokio::test]
async fn test_create_postgres_without_config_fails() {
    let result = RepositoryFactory::create(RepositoryType::Postgres, None).await;
    assert!(matches!(result, Err(RepositoryError::ConfigurationError { .. })));
}

#[tokio::test]
async fn test_builder_from_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[repository]\ntype = \"local\"").unwrap();

    let repo = RepositoryBuilder::new()
        .from_config_file(file.path())
        .unwrap()
        .build()
        .await
        .unwrap();
    assert!(repo.health_check().await.unwrap());
}

#[test]
fn test_builder_rejects_unknown_type_in_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[repository]\ntype = \"mongo\"").unwrap();

    let result = RepositoryBuilder::new().from_config_file(file.path());
    assert!(matches!(result, Err(RepositoryError::ConfigurationError { .. })));
}

#[test]
fn test_app_config_reads_explicit_file_and_env() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[site]\ntitle = \"Blogue\"\n\n[auth]\njwt_secret = \"from-file\"\nowner_open_id = \"owner-1\""
    )
    .unwrap();
    let path = file.path().to_str().unwrap().to_string();

    support::with_scoped_env(
        &[
            ("BLOG_CONFIG", Some(path.as_str())),
            ("JWT_SECRET", Some("from-env")),
            ("SCHEDULED_TASK_API_KEY", None),
            ("SITE_TITLE", None),
            ("OWNER_OPEN_ID", None),
        ],
        || {
            let config = AppConfig::load().unwrap();
            assert_eq!(config.site_title, "Blogue");
            assert_eq!(config.jwt_secret.as_deref(), Some("from-env"));
            assert_eq!(config.scheduled_task_api_key.as_deref(), Some("from-env"));
            assert_eq!(config.owner_open_id.as_deref(), Some("owner-1"));
        },
    );
}

#[test]
fn test_app_config_missing_explicit_file_is_error() {
    support::with_scoped_env(&[("BLOG_CONFIG", Some("/nonexistent/blog.toml"))], || {
        assert!(AppConfig::load().is_err());
    });
}

#[tokio::test]
async fn test_builder_reads_repository_section_of_blog_config() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[site]\ntitle = \"Blogue\"\n\n[repository]\ntype = \"local\""
    )
    .unwrap();
    let path = file.path().to_str().unwrap().to_string();

    let builder = support::with_scoped_env(
        &[
            ("BLOG_CONFIG", Some(path.as_str())),
            ("DATABASE_URL", Some("postgres://ignored@db/fleetcrew")),
            ("REPOSITORY_TYPE", None),
        ],
        || RepositoryBuilder::new().from_default_config(),
    )
    .unwrap();
    assert!(builder.build().await.unwrap().health_check().await.unwrap());
}

#[test]
fn test_builder_missing_explicit_blog_config_is_error() {
    support::with_scoped_env(&[("BLOG_CONFIG", Some("/nonexistent/blog.toml"))], || {
        let result = RepositoryBuilder::new().from_default_config();
        assert!(matches!(result, Err(RepositoryError::ConfigurationError { .. })));
    });
}
