//! Shared helpers for integration tests.
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;

use fleetcrew_blog::api::{UpsertUser, User, UserRole};
use fleetcrew_blog::auth::issue_session_token;
use fleetcrew_blog::config::AppConfig;
use fleetcrew_blog::db::repositories::LocalRepository;
use fleetcrew_blog::db::repository::UserRepository;

static ENV_LOCK: Mutex<()> = Mutex::new(());

pub const TEST_SECRET: &str = "test-session-secret";
pub const TEST_API_KEY: &str = "test-task-key";

/// Runs `f` with environment variables temporarily modified.
///
/// Restores variables on unwind and serializes access to process-global
/// env vars, since Rust runs tests in parallel.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

/// Configuration with a session secret and automation key, served at a fixed URL.
pub fn test_config() -> AppConfig {
    AppConfig {
        site_url: Some("https://blog.test".to_string()),
        jwt_secret: Some(TEST_SECRET.to_string()),
        scheduled_task_api_key: Some(TEST_API_KEY.to_string()),
        owner_open_id: Some("owner".to_string()),
        ..AppConfig::default()
    }
}

pub async fn create_user(repo: &LocalRepository, open_id: &str, role: UserRole) -> User {
    repo.upsert_user(UpsertUser {
        open_id: open_id.to_string(),
        name: Some(open_id.to_string()),
        role: Some(role),
        ..Default::default()
    })
    .await
    .unwrap()
}

/// `Cookie` header value carrying a session for `open_id`.
pub fn session_cookie(open_id: &str) -> String {
    format!("app_session_id={}", issue_session_token(TEST_SECRET, open_id))
}
