//! Postgres repository implementation using Diesel.
//!
//! This module implements the repository traits against a Postgres database
//! following the schema embedded in `migrations/`.
//!
//! ## Features
//!
//! - Connection pooling with r2d2
//! - Automatic retry for transient failures
//! - Connection health monitoring
//! - Automatic migration execution
//! - Counter mutations (`record_view`, `toggle_like`) run inside one
//!   transaction that locks the article row, with a unique index on
//!   `article_likes (article_id, visitor_id)`
//!
//! ## Configuration
//!
//! Environment variables:
//! - `DATABASE_URL` or `PG_DATABASE_URL`: Connection string (required)
//! - `PG_POOL_MAX`: Maximum pool size (default: 10)
//! - `PG_POOL_MIN`: Minimum pool size (default: 1)
//! - `PG_CONN_TIMEOUT_SEC`: Connection timeout in seconds (default: 30)
//! - `PG_IDLE_TIMEOUT_SEC`: Idle connection timeout in seconds (default: 600)
//! - `PG_MAX_RETRIES`: Maximum retry attempts for transient failures (default: 3)
//! - `PG_RETRY_DELAY_MS`: Initial retry delay in milliseconds (default: 100)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::dsl::{count, count_star, sum};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_query;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task;

use crate::api::*;
use crate::db::repository::{
    AnalyticsRepository, ArticleRepository, AudienceRepository, ErrorContext, RepositoryError,
    RepositoryResult, TaxonomyRepository, UserRepository,
};

mod models;
mod schema;

use models::*;
use schema::*;

type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/db/repositories/postgres/migrations");

const PUBLISHED: &str = "published";

/// Configuration for connecting to Postgres.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub database_url: String,
    /// Maximum number of connections in the pool
    pub max_pool_size: u32,
    /// Minimum number of connections in the pool
    pub min_pool_size: u32,
    /// Connection timeout in seconds
    pub connection_timeout_sec: u64,
    /// Idle connection timeout in seconds
    pub idle_timeout_sec: u64,
    /// Maximum number of retry attempts for transient failures
    pub max_retries: u32,
    /// Initial retry delay in milliseconds (doubles with each retry)
    pub retry_delay_ms: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_pool_size: 10,
            min_pool_size: 1,
            connection_timeout_sec: 30,
            idle_timeout_sec: 600,
            max_retries: 3,
            retry_delay_ms: 100,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl PostgresConfig {
    /// Create configuration from environment variables.
    ///
    /// See the module documentation for the recognised variables.
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("PG_DATABASE_URL"))
            .map_err(|_| "DATABASE_URL or PG_DATABASE_URL must be set".to_string())?;

        let defaults = Self::default();
        Ok(Self {
            database_url,
            max_pool_size: env_or("PG_POOL_MAX", defaults.max_pool_size),
            min_pool_size: env_or("PG_POOL_MIN", defaults.min_pool_size),
            connection_timeout_sec: env_or("PG_CONN_TIMEOUT_SEC", defaults.connection_timeout_sec),
            idle_timeout_sec: env_or("PG_IDLE_TIMEOUT_SEC", defaults.idle_timeout_sec),
            max_retries: env_or("PG_MAX_RETRIES", defaults.max_retries),
            retry_delay_ms: env_or("PG_RETRY_DELAY_MS", defaults.retry_delay_ms),
        })
    }

    /// Create a new configuration with a database URL.
    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }
}

/// Pool health statistics.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Number of connections currently in use
    pub connections_in_use: u32,
    /// Number of idle connections
    pub idle_connections: u32,
    /// Total number of connections in the pool
    pub total_connections: u32,
    /// Maximum pool size
    pub max_size: u32,
    /// Total successful queries executed
    pub total_queries: u64,
    /// Total failed queries
    pub failed_queries: u64,
    /// Total retried operations
    pub retried_operations: u64,
}

/// Diesel-backed repository for Postgres.
#[derive(Clone, Debug)]
pub struct PostgresRepository {
    pool: PgPool,
    config: PostgresConfig,
    // Metrics counters
    total_queries: Arc<AtomicU64>,
    failed_queries: Arc<AtomicU64>,
    retried_operations: Arc<AtomicU64>,
}

impl PostgresRepository {
    /// Create a new repository and run pending migrations.
    ///
    /// # Returns
    /// * `Ok(PostgresRepository)` on success
    /// * `Err(RepositoryError)` if connection or migration fails
    pub fn new(config: PostgresConfig) -> RepositoryResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(Some(config.min_pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_sec)))
            .test_on_check_out(true)
            .build(manager)
            .map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("create_pool")
                        .with_details(format!("max_size={}", config.max_pool_size)),
                )
            })?;

        {
            let mut conn = pool.get().map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("get_connection_for_migrations"),
                )
            })?;
            Self::run_migrations(&mut conn)?;
        }

        Ok(Self {
            pool,
            config,
            total_queries: Arc::new(AtomicU64::new(0)),
            failed_queries: Arc::new(AtomicU64::new(0)),
            retried_operations: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Run pending database migrations.
    fn run_migrations(conn: &mut PgConnection) -> RepositoryResult<()> {
        conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Migration failed: {}", e),
                ErrorContext::new("run_migrations"),
            )
        })?;

        Ok(())
    }

    /// Execute a database operation with automatic retry for transient failures.
    ///
    /// This method will retry the operation up to `max_retries` times if a
    /// retryable error occurs (connection errors, timeouts, serialization failures).
    async fn with_conn<T, F>(&self, f: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static + Clone,
    {
        let pool = self.pool.clone();
        let max_retries = self.config.max_retries;
        let retry_delay_ms = self.config.retry_delay_ms;
        let total_queries = self.total_queries.clone();
        let failed_queries = self.failed_queries.clone();
        let retried_operations = self.retried_operations.clone();

        task::spawn_blocking(move || {
            let mut last_error = None;
            let mut retry_delay = Duration::from_millis(retry_delay_ms);

            for attempt in 0..=max_retries {
                if attempt > 0 {
                    retried_operations.fetch_add(1, Ordering::Relaxed);
                    std::thread::sleep(retry_delay);
                    retry_delay *= 2; // Exponential backoff
                }

                let mut conn = match pool.get() {
                    Ok(c) => c,
                    Err(e) => {
                        let err = RepositoryError::connection_with_context(
                            e.to_string(),
                            ErrorContext::new("get_connection")
                                .with_details(format!("attempt={}", attempt + 1)),
                        );
                        if attempt < max_retries {
                            last_error = Some(err);
                            continue;
                        }
                        failed_queries.fetch_add(1, Ordering::Relaxed);
                        return Err(err);
                    }
                };

                total_queries.fetch_add(1, Ordering::Relaxed);
                match f.clone()(&mut conn) {
                    Ok(result) => return Ok(result),
                    Err(e) if e.is_retryable() && attempt < max_retries => {
                        log::debug!("Retrying after transient error: {}", e);
                        last_error = Some(e);
                        continue;
                    }
                    Err(e) => {
                        failed_queries.fetch_add(1, Ordering::Relaxed);
                        return Err(e);
                    }
                }
            }

            failed_queries.fetch_add(1, Ordering::Relaxed);
            Err(last_error.unwrap_or_else(|| {
                RepositoryError::internal("Max retries exceeded with no error captured")
            }))
        })
        .await
        .map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Task join error: {}", e),
                ErrorContext::new("spawn_blocking"),
            )
        })?
    }

    /// Get pool health statistics.
    pub fn get_pool_stats(&self) -> PoolStats {
        let state = self.pool.state();
        PoolStats {
            connections_in_use: state.connections - state.idle_connections,
            idle_connections: state.idle_connections,
            total_connections: state.connections,
            max_size: self.config.max_pool_size,
            total_queries: self.total_queries.load(Ordering::Relaxed),
            failed_queries: self.failed_queries.load(Ordering::Relaxed),
            retried_operations: self.retried_operations.load(Ordering::Relaxed),
        }
    }

    /// Check if the database connection is healthy.
    pub async fn is_healthy(&self) -> bool {
        self.health_check().await.unwrap_or(false)
    }

    /// Get detailed health information.
    ///
    /// Returns a tuple of (is_healthy, latency_ms, error_message).
    pub async fn health_check_detailed(&self) -> (bool, Option<u64>, Option<String>) {
        let start = Instant::now();
        match self.health_check().await {
            Ok(true) => (true, Some(start.elapsed().as_millis() as u64), None),
            Ok(false) => (
                false,
                Some(start.elapsed().as_millis() as u64),
                Some("Health check returned false".to_string()),
            ),
            Err(e) => (
                false,
                Some(start.elapsed().as_millis() as u64),
                Some(e.to_string()),
            ),
        }
    }
}

fn not_found(entity: &str, id: impl ToString, operation: &str) -> RepositoryError {
    let id = id.to_string();
    RepositoryError::not_found_with_context(
        format!("{} {} not found", entity, id),
        ErrorContext::new(operation)
            .with_entity(entity)
            .with_entity_id(id),
    )
}

/// `%term%` for ILIKE with the pattern metacharacters escaped.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn rounded_mean(total: Option<i64>, count: i64) -> i64 {
    match total {
        Some(total) if count > 0 => (total as f64 / count as f64).round() as i64,
        _ => 0,
    }
}

/// Lock the article row for the rest of the transaction.
fn lock_article(
    conn: &mut PgConnection,
    article_id: ArticleId,
    operation: &str,
) -> RepositoryResult<()> {
    articles::table
        .find(article_id.0)
        .select(articles::id)
        .for_update()
        .first::<i64>(conn)
        .optional()?
        .map(|_| ())
        .ok_or_else(|| not_found("article", article_id, operation))
}

// ==================== Article Repository ====================

#[async_trait]
impl ArticleRepository for PostgresRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.with_conn(|conn| {
            sql_query("SELECT 1")
                .execute(conn)
                .map(|_| true)
                .map_err(RepositoryError::from)
        })
        .await
    }

    async fn create_article(&self, article: NewArticle) -> RepositoryResult<Article> {
        let row = NewArticleRow::from(article);
        self.with_conn(move |conn| {
            let inserted: ArticleRow = diesel::insert_into(articles::table)
                .values(&row)
                .returning(ArticleRow::as_returning())
                .get_result(conn)
                .map_err(|e| RepositoryError::from(e).with_operation("create_article"))?;
            Article::try_from(inserted)
        })
        .await
    }

    async fn update_article(
        &self,
        article_id: ArticleId,
        update: ArticleUpdate,
    ) -> RepositoryResult<Article> {
        let changeset = ArticleChangeset::from(update);
        self.with_conn(move |conn| {
            let updated: Option<ArticleRow> = diesel::update(articles::table.find(article_id.0))
                .set(&changeset)
                .returning(ArticleRow::as_returning())
                .get_result(conn)
                .optional()
                .map_err(|e| RepositoryError::from(e).with_operation("update_article"))?;
            updated
                .ok_or_else(|| not_found("article", article_id, "update_article"))
                .and_then(Article::try_from)
        })
        .await
    }

    async fn delete_article(&self, article_id: ArticleId) -> RepositoryResult<bool> {
        // Tag links, views and likes go with the row through ON DELETE CASCADE.
        self.with_conn(move |conn| {
            let deleted = diesel::delete(articles::table.find(article_id.0)).execute(conn)?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn get_article(&self, article_id: ArticleId) -> RepositoryResult<Option<Article>> {
        self.with_conn(move |conn| {
            articles::table
                .find(article_id.0)
                .select(ArticleRow::as_select())
                .first::<ArticleRow>(conn)
                .optional()?
                .map(Article::try_from)
                .transpose()
        })
        .await
    }

    async fn get_article_by_slug(&self, slug: &str) -> RepositoryResult<Option<Article>> {
        let slug = slug.to_string();
        self.with_conn(move |conn| {
            articles::table
                .filter(articles::slug.eq(&slug))
                .select(ArticleRow::as_select())
                .first::<ArticleRow>(conn)
                .optional()?
                .map(Article::try_from)
                .transpose()
        })
        .await
    }

    async fn list_published_articles(
        &self,
        query: &ArticleQuery,
    ) -> RepositoryResult<Vec<Article>> {
        let query = query.clone();
        self.with_conn(move |conn| {
            let mut q = articles::table
                .filter(articles::status.eq(PUBLISHED))
                .into_boxed();

            if let Some(category_id) = query.category_id {
                q = q.filter(articles::category_id.eq(category_id.0));
            }
            if let Some(tag_id) = query.tag_id {
                q = q.filter(
                    articles::id.eq_any(
                        article_tags::table
                            .filter(article_tags::tag_id.eq(tag_id.0))
                            .select(article_tags::article_id),
                    ),
                );
            }
            if let Some(term) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
                q = q.filter(articles::title.ilike(like_pattern(term)));
            }
            if let Some(limit) = query.limit {
                q = q.limit(limit);
            }
            if let Some(offset) = query.offset {
                q = q.offset(offset);
            }

            let rows = q
                .order((articles::published_at.desc().nulls_last(), articles::id.desc()))
                .select(ArticleRow::as_select())
                .load::<ArticleRow>(conn)?;
            rows_to_articles(rows)
        })
        .await
    }

    async fn list_featured_articles(&self, limit: i64) -> RepositoryResult<Vec<Article>> {
        self.with_conn(move |conn| {
            let rows = articles::table
                .filter(articles::status.eq(PUBLISHED))
                .filter(articles::featured.eq(true))
                .order((articles::published_at.desc().nulls_last(), articles::id.desc()))
                .limit(limit)
                .select(ArticleRow::as_select())
                .load::<ArticleRow>(conn)?;
            rows_to_articles(rows)
        })
        .await
    }

    async fn list_all_articles(
        &self,
        status: Option<ArticleStatus>,
    ) -> RepositoryResult<Vec<Article>> {
        self.with_conn(move |conn| {
            let mut q = articles::table.into_boxed();
            if let Some(status) = status {
                q = q.filter(articles::status.eq(status.as_str()));
            }
            let rows = q
                .order((articles::created_at.desc(), articles::id.desc()))
                .select(ArticleRow::as_select())
                .load::<ArticleRow>(conn)?;
            rows_to_articles(rows)
        })
        .await
    }

    async fn list_articles_by_tag(&self, tag_id: TagId) -> RepositoryResult<Vec<Article>> {
        self.with_conn(move |conn| {
            let rows = articles::table
                .filter(articles::status.eq(PUBLISHED))
                .filter(
                    articles::id.eq_any(
                        article_tags::table
                            .filter(article_tags::tag_id.eq(tag_id.0))
                            .select(article_tags::article_id),
                    ),
                )
                .order((articles::published_at.desc().nulls_last(), articles::id.desc()))
                .select(ArticleRow::as_select())
                .load::<ArticleRow>(conn)?;
            rows_to_articles(rows)
        })
        .await
    }

    async fn set_article_tags(
        &self,
        article_id: ArticleId,
        tag_ids: &[TagId],
    ) -> RepositoryResult<()> {
        let mut ids: Vec<i64> = tag_ids.iter().map(|t| t.0).collect();
        ids.sort_unstable();
        ids.dedup();
        self.with_conn(move |conn| {
            conn.transaction::<_, RepositoryError, _>(|tx| {
                lock_article(tx, article_id, "set_article_tags")?;

                let known: i64 = tags::table
                    .filter(tags::id.eq_any(ids.clone()))
                    .count()
                    .get_result(tx)?;
                if known != ids.len() as i64 {
                    return Err(RepositoryError::not_found_with_context(
                        "One or more tags do not exist",
                        ErrorContext::new("set_article_tags")
                            .with_entity("tag")
                            .with_details(format!("requested={:?}", ids)),
                    ));
                }

                diesel::delete(article_tags::table.filter(article_tags::article_id.eq(article_id.0)))
                    .execute(tx)?;
                let links: Vec<_> = ids
                    .iter()
                    .map(|tag_id| {
                        (
                            article_tags::article_id.eq(article_id.0),
                            article_tags::tag_id.eq(*tag_id),
                        )
                    })
                    .collect();
                if !links.is_empty() {
                    diesel::insert_into(article_tags::table)
                        .values(&links)
                        .execute(tx)?;
                }
                Ok(())
            })
        })
        .await
    }

    async fn get_article_tags(&self, article_id: ArticleId) -> RepositoryResult<Vec<Tag>> {
        self.with_conn(move |conn| {
            let rows = tags::table
                .filter(
                    tags::id.eq_any(
                        article_tags::table
                            .filter(article_tags::article_id.eq(article_id.0))
                            .select(article_tags::tag_id),
                    ),
                )
                .order(tags::name.asc())
                .select(TagRow::as_select())
                .load::<TagRow>(conn)?;
            Ok(rows.into_iter().map(Tag::from).collect())
        })
        .await
    }
}

// ==================== Taxonomy Repository ====================

#[async_trait]
impl TaxonomyRepository for PostgresRepository {
    async fn list_categories(&self) -> RepositoryResult<Vec<Category>> {
        self.with_conn(|conn| {
            let rows = categories::table
                .order(categories::name.asc())
                .select(CategoryRow::as_select())
                .load::<CategoryRow>(conn)?;
            Ok(rows.into_iter().map(Category::from).collect())
        })
        .await
    }

    async fn get_category(&self, category_id: CategoryId) -> RepositoryResult<Option<Category>> {
        self.with_conn(move |conn| {
            Ok(categories::table
                .find(category_id.0)
                .select(CategoryRow::as_select())
                .first::<CategoryRow>(conn)
                .optional()?
                .map(Category::from))
        })
        .await
    }

    async fn get_category_by_slug(&self, slug: &str) -> RepositoryResult<Option<Category>> {
        let slug = slug.to_string();
        self.with_conn(move |conn| {
            Ok(categories::table
                .filter(categories::slug.eq(&slug))
                .select(CategoryRow::as_select())
                .first::<CategoryRow>(conn)
                .optional()?
                .map(Category::from))
        })
        .await
    }

    async fn create_category(&self, category: NewCategory) -> RepositoryResult<Category> {
        let row = NewCategoryRow::from(category);
        self.with_conn(move |conn| {
            let inserted: CategoryRow = diesel::insert_into(categories::table)
                .values(&row)
                .returning(CategoryRow::as_returning())
                .get_result(conn)
                .map_err(|e| RepositoryError::from(e).with_operation("create_category"))?;
            Ok(inserted.into())
        })
        .await
    }

    async fn update_category(
        &self,
        category_id: CategoryId,
        update: CategoryUpdate,
    ) -> RepositoryResult<Category> {
        let changeset = CategoryChangeset::from(update);
        self.with_conn(move |conn| {
            let row: Option<CategoryRow> = if changeset.is_empty() {
                categories::table
                    .find(category_id.0)
                    .select(CategoryRow::as_select())
                    .first(conn)
                    .optional()?
            } else {
                diesel::update(categories::table.find(category_id.0))
                    .set(&changeset)
                    .returning(CategoryRow::as_returning())
                    .get_result(conn)
                    .optional()
                    .map_err(|e| RepositoryError::from(e).with_operation("update_category"))?
            };
            row.map(Category::from)
                .ok_or_else(|| not_found("category", category_id, "update_category"))
        })
        .await
    }

    async fn delete_category(&self, category_id: CategoryId) -> RepositoryResult<bool> {
        self.with_conn(move |conn| {
            let deleted = diesel::delete(categories::table.find(category_id.0)).execute(conn)?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn list_tags(&self) -> RepositoryResult<Vec<Tag>> {
        self.with_conn(|conn| {
            let rows = tags::table
                .order(tags::name.asc())
                .select(TagRow::as_select())
                .load::<TagRow>(conn)?;
            Ok(rows.into_iter().map(Tag::from).collect())
        })
        .await
    }

    async fn get_tag_by_slug(&self, slug: &str) -> RepositoryResult<Option<Tag>> {
        let slug = slug.to_string();
        self.with_conn(move |conn| {
            Ok(tags::table
                .filter(tags::slug.eq(&slug))
                .select(TagRow::as_select())
                .first::<TagRow>(conn)
                .optional()?
                .map(Tag::from))
        })
        .await
    }

    async fn get_tag_by_name(&self, name: &str) -> RepositoryResult<Option<Tag>> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            Ok(tags::table
                .filter(tags::name.eq(&name))
                .select(TagRow::as_select())
                .first::<TagRow>(conn)
                .optional()?
                .map(Tag::from))
        })
        .await
    }

    async fn create_tag(&self, tag: NewTag) -> RepositoryResult<Tag> {
        let row = NewTagRow {
            name: tag.name,
            slug: tag.slug,
        };
        self.with_conn(move |conn| {
            let inserted: TagRow = diesel::insert_into(tags::table)
                .values(&row)
                .returning(TagRow::as_returning())
                .get_result(conn)
                .map_err(|e| RepositoryError::from(e).with_operation("create_tag"))?;
            Ok(inserted.into())
        })
        .await
    }

    async fn delete_tag(&self, tag_id: TagId) -> RepositoryResult<bool> {
        self.with_conn(move |conn| {
            let deleted = diesel::delete(tags::table.find(tag_id.0)).execute(conn)?;
            Ok(deleted > 0)
        })
        .await
    }
}

// ==================== Audience Repository ====================

#[async_trait]
impl AudienceRepository for PostgresRepository {
    async fn subscribe(
        &self,
        email: &str,
        name: Option<&str>,
    ) -> RepositoryResult<NewsletterSubscriber> {
        let row = NewSubscriberRow {
            email: email.to_string(),
            name: name.map(str::to_string),
        };
        self.with_conn(move |conn| {
            let stored: SubscriberRow = diesel::insert_into(newsletter_subscribers::table)
                .values(&row)
                .on_conflict(newsletter_subscribers::email)
                .do_update()
                .set((
                    newsletter_subscribers::is_active.eq(true),
                    newsletter_subscribers::unsubscribed_at.eq(None::<DateTime<Utc>>),
                ))
                .returning(SubscriberRow::as_returning())
                .get_result(conn)?;
            Ok(stored.into())
        })
        .await
    }

    async fn unsubscribe(&self, email: &str) -> RepositoryResult<bool> {
        let email = email.to_string();
        self.with_conn(move |conn| {
            let updated = diesel::update(
                newsletter_subscribers::table.filter(newsletter_subscribers::email.eq(&email)),
            )
            .set((
                newsletter_subscribers::is_active.eq(false),
                newsletter_subscribers::unsubscribed_at.eq(Some(Utc::now())),
            ))
            .execute(conn)?;
            Ok(updated > 0)
        })
        .await
    }

    async fn list_subscribers(
        &self,
        active_only: bool,
    ) -> RepositoryResult<Vec<NewsletterSubscriber>> {
        self.with_conn(move |conn| {
            let mut q = newsletter_subscribers::table.into_boxed();
            if active_only {
                q = q.filter(newsletter_subscribers::is_active.eq(true));
            }
            let rows = q
                .order((
                    newsletter_subscribers::subscribed_at.desc(),
                    newsletter_subscribers::id.desc(),
                ))
                .select(SubscriberRow::as_select())
                .load::<SubscriberRow>(conn)?;
            Ok(rows.into_iter().map(NewsletterSubscriber::from).collect())
        })
        .await
    }

    async fn count_active_subscribers(&self) -> RepositoryResult<i64> {
        self.with_conn(|conn| {
            Ok(newsletter_subscribers::table
                .filter(newsletter_subscribers::is_active.eq(true))
                .count()
                .get_result(conn)?)
        })
        .await
    }

    async fn create_contact_message(
        &self,
        message: NewContactMessage,
    ) -> RepositoryResult<ContactMessage> {
        let row = NewContactMessageRow::from(message);
        self.with_conn(move |conn| {
            let inserted: ContactMessageRow = diesel::insert_into(contact_messages::table)
                .values(&row)
                .returning(ContactMessageRow::as_returning())
                .get_result(conn)?;
            ContactMessage::try_from(inserted)
        })
        .await
    }

    async fn list_contact_messages(&self) -> RepositoryResult<Vec<ContactMessage>> {
        self.with_conn(|conn| {
            let rows = contact_messages::table
                .order((contact_messages::created_at.desc(), contact_messages::id.desc()))
                .select(ContactMessageRow::as_select())
                .load::<ContactMessageRow>(conn)?;
            rows.into_iter().map(ContactMessage::try_from).collect()
        })
        .await
    }

    async fn update_contact_status(
        &self,
        message_id: ContactMessageId,
        status: ContactStatus,
    ) -> RepositoryResult<ContactMessage> {
        self.with_conn(move |conn| {
            let updated: Option<ContactMessageRow> =
                diesel::update(contact_messages::table.find(message_id.0))
                    .set(contact_messages::status.eq(status.as_str()))
                    .returning(ContactMessageRow::as_returning())
                    .get_result(conn)
                    .optional()?;
            updated
                .ok_or_else(|| not_found("contact_message", message_id, "update_contact_status"))
                .and_then(ContactMessage::try_from)
        })
        .await
    }

    async fn count_new_contact_messages(&self) -> RepositoryResult<i64> {
        self.with_conn(|conn| {
            Ok(contact_messages::table
                .filter(contact_messages::status.eq(ContactStatus::Nouveau.as_str()))
                .count()
                .get_result(conn)?)
        })
        .await
    }
}

// ==================== Analytics Repository ====================

#[async_trait]
impl AnalyticsRepository for PostgresRepository {
    async fn record_view(&self, view: NewArticleView) -> RepositoryResult<ArticleView> {
        let row = NewArticleViewRow::from(view);
        self.with_conn(move |conn| {
            conn.transaction::<_, RepositoryError, _>(|tx| {
                let article_id = ArticleId(row.article_id);
                let bumped = diesel::update(articles::table.find(row.article_id))
                    .set(articles::view_count.eq(articles::view_count + 1))
                    .execute(tx)?;
                if bumped == 0 {
                    return Err(not_found("article", article_id, "record_view"));
                }

                let inserted: ArticleViewRow = diesel::insert_into(article_views::table)
                    .values(&row)
                    .returning(ArticleViewRow::as_returning())
                    .get_result(tx)?;
                Ok(inserted.into())
            })
        })
        .await
    }

    async fn update_view_progress(
        &self,
        view_id: ViewId,
        progress: ViewProgress,
    ) -> RepositoryResult<ArticleView> {
        self.with_conn(move |conn| {
            conn.transaction::<_, RepositoryError, _>(|tx| {
                let current: ArticleViewRow = article_views::table
                    .find(view_id.0)
                    .select(ArticleViewRow::as_select())
                    .for_update()
                    .first(tx)
                    .optional()?
                    .ok_or_else(|| not_found("article_view", view_id, "update_view_progress"))?;

                let read_time = progress
                    .read_time
                    .map_or(current.read_time, |r| r.max(current.read_time));
                let scroll_depth = progress
                    .scroll_depth
                    .map_or(current.scroll_depth, |s| s.max(current.scroll_depth));

                let updated: ArticleViewRow = diesel::update(article_views::table.find(view_id.0))
                    .set((
                        article_views::read_time.eq(read_time),
                        article_views::scroll_depth.eq(scroll_depth),
                    ))
                    .returning(ArticleViewRow::as_returning())
                    .get_result(tx)?;
                Ok(updated.into())
            })
        })
        .await
    }

    async fn toggle_like(
        &self,
        article_id: ArticleId,
        visitor_id: &str,
        user_id: Option<UserId>,
    ) -> RepositoryResult<LikeToggle> {
        let visitor_id = visitor_id.to_string();
        self.with_conn(move |conn| {
            conn.transaction::<_, RepositoryError, _>(|tx| {
                // Serializes concurrent toggles on the same article.
                lock_article(tx, article_id, "toggle_like")?;

                let removed = diesel::delete(
                    article_likes::table
                        .filter(article_likes::article_id.eq(article_id.0))
                        .filter(article_likes::visitor_id.eq(&visitor_id)),
                )
                .execute(tx)?;

                let liked = if removed > 0 {
                    diesel::update(
                        articles::table
                            .find(article_id.0)
                            .filter(articles::like_count.gt(0)),
                    )
                    .set(articles::like_count.eq(articles::like_count - 1))
                    .execute(tx)?;
                    false
                } else {
                    let inserted = diesel::insert_into(article_likes::table)
                        .values(&NewArticleLikeRow {
                            article_id: article_id.0,
                            visitor_id: visitor_id.clone(),
                            user_id: user_id.map(|u| u.0),
                        })
                        .on_conflict((article_likes::article_id, article_likes::visitor_id))
                        .do_nothing()
                        .execute(tx)?;
                    if inserted > 0 {
                        diesel::update(articles::table.find(article_id.0))
                            .set(articles::like_count.eq(articles::like_count + 1))
                            .execute(tx)?;
                    }
                    true
                };

                let like_count: i64 = articles::table
                    .find(article_id.0)
                    .select(articles::like_count)
                    .first(tx)?;
                Ok(LikeToggle { liked, like_count })
            })
        })
        .await
    }

    async fn has_liked(&self, article_id: ArticleId, visitor_id: &str) -> RepositoryResult<bool> {
        let visitor_id = visitor_id.to_string();
        self.with_conn(move |conn| {
            let found = diesel::select(diesel::dsl::exists(
                article_likes::table
                    .filter(article_likes::article_id.eq(article_id.0))
                    .filter(article_likes::visitor_id.eq(&visitor_id)),
            ))
            .get_result::<bool>(conn)?;
            Ok(found)
        })
        .await
    }

    async fn article_stats(&self, article_id: ArticleId) -> RepositoryResult<ArticleStats> {
        self.with_conn(move |conn| {
            let (views, unique_visitors, read_total, scroll_total) = article_views::table
                .filter(article_views::article_id.eq(article_id.0))
                .select((
                    count_star(),
                    count(article_views::visitor_id).aggregate_distinct(),
                    sum(article_views::read_time),
                    sum(article_views::scroll_depth),
                ))
                .first::<(i64, i64, Option<i64>, Option<i64>)>(conn)?;

            Ok(ArticleStats {
                views,
                unique_visitors,
                avg_read_time: rounded_mean(read_total, views),
                avg_scroll_depth: rounded_mean(scroll_total, views),
            })
        })
        .await
    }

    async fn site_stats(&self) -> RepositoryResult<SiteStats> {
        self.with_conn(|conn| {
            let row: SiteStatsRow = sql_query(
                "SELECT \
                    COALESCE(SUM(view_count), 0)::BIGINT AS total_views, \
                    COALESCE(SUM(like_count), 0)::BIGINT AS total_likes, \
                    COUNT(*) FILTER (WHERE status = 'published') AS published_articles, \
                    (SELECT COUNT(*) FROM newsletter_subscribers WHERE is_active) \
                        AS active_subscribers \
                 FROM articles",
            )
            .get_result(conn)?;
            Ok(row.into())
        })
        .await
    }

    async fn popular_articles(&self, limit: i64) -> RepositoryResult<Vec<Article>> {
        self.with_conn(move |conn| {
            let rows = articles::table
                .filter(articles::status.eq(PUBLISHED))
                .order((
                    articles::view_count.desc(),
                    articles::published_at.desc().nulls_last(),
                    articles::id.asc(),
                ))
                .limit(limit)
                .select(ArticleRow::as_select())
                .load::<ArticleRow>(conn)?;
            rows_to_articles(rows)
        })
        .await
    }
}

// ==================== User Repository ====================

#[async_trait]
impl UserRepository for PostgresRepository {
    async fn upsert_user(&self, user: UpsertUser) -> RepositoryResult<User> {
        let now = Utc::now();
        let signed_in = user.last_signed_in.unwrap_or(now);
        let insert = NewUserRow {
            open_id: user.open_id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            login_method: user.login_method.clone(),
            role: user.role.unwrap_or_default().as_str().to_string(),
            last_signed_in: signed_in,
        };
        let changeset = UserChangeset {
            name: user.name,
            email: user.email,
            login_method: user.login_method,
            role: user.role.map(|r| r.as_str().to_string()),
            last_signed_in: signed_in,
            updated_at: now,
        };
        self.with_conn(move |conn| {
            let row: UserRow = diesel::insert_into(users::table)
                .values(&insert)
                .on_conflict(users::open_id)
                .do_update()
                .set(&changeset)
                .returning(UserRow::as_returning())
                .get_result(conn)?;
            User::try_from(row)
        })
        .await
    }

    async fn get_user(&self, user_id: UserId) -> RepositoryResult<Option<User>> {
        self.with_conn(move |conn| {
            users::table
                .find(user_id.0)
                .select(UserRow::as_select())
                .first::<UserRow>(conn)
                .optional()?
                .map(User::try_from)
                .transpose()
        })
        .await
    }

    async fn get_user_by_open_id(&self, open_id: &str) -> RepositoryResult<Option<User>> {
        let open_id = open_id.to_string();
        self.with_conn(move |conn| {
            users::table
                .filter(users::open_id.eq(&open_id))
                .select(UserRow::as_select())
                .first::<UserRow>(conn)
                .optional()?
                .map(User::try_from)
                .transpose()
        })
        .await
    }
}
