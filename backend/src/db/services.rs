//! High-level database service layer.
//!
//! This module provides repository-agnostic operations that work with any
//! implementation of the repository traits. Business rules live here so
//! they hold regardless of the storage backend:
//!
//! - input validation (length bounds, email format, pagination bounds)
//! - publish-date bookkeeping on first publication
//! - tag get-or-create and owner-user provisioning
//! - read degradation: public reads answer empty/absent when the store is
//!   unreachable, writes always propagate
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  HTTP layer (axum handlers, feeds, automation endpoint) │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Service Layer (services.rs) - Business Logic           │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Repository Traits (repository/) - Abstract Interface    │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//!     ┌───────────────┴────────────────┐
//!     │                                 │
//! ┌───▼──────────────┐     ┌──────────▼──────────────┐
//! │ Postgres (Diesel)│     │ Local Repository        │
//! └──────────────────┘     └─────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use fleetcrew_blog::db::{services, repositories::LocalRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let repo = LocalRepository::new();
//!     let categories = services::list_categories(&repo).await?;
//!     println!("Found {} categories", categories.len());
//!     Ok(())
//! }
//! ```

use std::sync::OnceLock;

use chrono::Utc;
use log::{debug, info, warn};
use regex::Regex;

use super::hashing::hash_ip;
use super::repository::{ErrorContext, FullRepository, RepositoryError, RepositoryResult};
use crate::api::*;
use crate::content::{estimate_read_time, extract_headings, slugify};
use crate::images::CoverImageGenerator;

/// Page size of the public article listing when none is requested.
pub const DEFAULT_PAGE_SIZE: i64 = 10;
/// Largest page size accepted by the public listing.
pub const MAX_PAGE_SIZE: i64 = 50;
pub const DEFAULT_FEATURED_LIMIT: i64 = 3;
pub const MAX_FEATURED_LIMIT: i64 = 10;
pub const DEFAULT_POPULAR_LIMIT: i64 = 5;
pub const MAX_POPULAR_LIMIT: i64 = 50;
/// Read time stored when an admin does not provide one.
pub const DEFAULT_READ_TIME: i32 = 5;
pub const MIN_CONTACT_MESSAGE_CHARS: usize = 10;
pub const MAX_VISITOR_ID_CHARS: usize = 64;
pub const MAX_HEADER_CHARS: usize = 500;

// ==================== Validation helpers ====================

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"))
}

fn invalid(field: &str, message: impl Into<String>) -> RepositoryError {
    RepositoryError::validation_with_context(
        message,
        ErrorContext::default().with_details(format!("field={}", field)),
    )
}

fn require_len(field: &str, value: &str, min: usize, max: usize) -> RepositoryResult<()> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(invalid(
            field,
            format!("{} must be between {} and {} characters", field, min, max),
        ));
    }
    Ok(())
}

fn require_email(email: &str) -> RepositoryResult<()> {
    if !email_regex().is_match(email) {
        return Err(invalid("email", "Invalid email address"));
    }
    Ok(())
}

fn normalize_email(email: &str) -> RepositoryResult<String> {
    let email = email.trim().to_lowercase();
    require_email(&email)?;
    Ok(email)
}

fn require_visitor(visitor_id: &str) -> RepositoryResult<()> {
    require_len("visitorId", visitor_id.trim(), 1, MAX_VISITOR_ID_CHARS)
}

fn truncate_chars(value: Option<String>, max: usize) -> Option<String> {
    value
        .filter(|v| !v.is_empty())
        .map(|v| v.chars().take(max).collect())
}

/// Reject a limit outside `1..=max`, defaulting when absent.
fn bounded_limit(limit: Option<i64>, default: i64, max: i64) -> RepositoryResult<i64> {
    let limit = limit.unwrap_or(default);
    if !(1..=max).contains(&limit) {
        return Err(invalid("limit", format!("limit must be between 1 and {}", max)));
    }
    Ok(limit)
}

/// Answer `fallback` when the store is unreachable; propagate anything else.
fn degrade<T>(
    operation: &str,
    result: RepositoryResult<T>,
    fallback: impl FnOnce() -> T,
) -> RepositoryResult<T> {
    match result {
        Err(e) if e.is_unavailable() => {
            warn!("{}: database unavailable, serving empty result: {}", operation, e);
            Ok(fallback())
        }
        other => other,
    }
}

// ==================== Health ====================

/// Check if the database connection is healthy.
pub async fn health_check<R: FullRepository + ?Sized>(repo: &R) -> RepositoryResult<bool> {
    repo.health_check().await
}

// ==================== Users ====================

/// Record a sign-in from the OAuth layer.
///
/// The user is created on first sign-in. When `open_id` matches the
/// configured owner the user is promoted to admin.
pub async fn sign_in<R: FullRepository + ?Sized>(
    repo: &R,
    open_id: &str,
    name: Option<String>,
    email: Option<String>,
    login_method: Option<String>,
    owner_open_id: Option<&str>,
) -> RepositoryResult<User> {
    if open_id.trim().is_empty() {
        return Err(invalid("openId", "openId is required"));
    }
    let role = (owner_open_id == Some(open_id)).then_some(UserRole::Admin);
    let user = repo
        .upsert_user(UpsertUser {
            open_id: open_id.to_string(),
            name,
            email,
            login_method,
            role,
            last_signed_in: Some(Utc::now()),
        })
        .await?;
    info!("User {} signed in (role={})", user.id, user.role);
    Ok(user)
}

/// Resolve a session's open id to a user; absent when unknown or unreachable.
pub async fn find_user<R: FullRepository + ?Sized>(
    repo: &R,
    open_id: &str,
) -> RepositoryResult<Option<User>> {
    degrade(
        "find_user",
        repo.get_user_by_open_id(open_id).await,
        || None,
    )
}

/// The site owner's user row, created as admin on first use.
pub async fn ensure_owner<R: FullRepository + ?Sized>(
    repo: &R,
    owner_open_id: &str,
    owner_name: Option<&str>,
) -> RepositoryResult<User> {
    if let Some(user) = repo.get_user_by_open_id(owner_open_id).await? {
        return Ok(user);
    }
    info!("Provisioning owner user {}", owner_open_id);
    repo.upsert_user(UpsertUser {
        open_id: owner_open_id.to_string(),
        name: owner_name.map(str::to_string),
        role: Some(UserRole::Admin),
        ..Default::default()
    })
    .await
}

// ==================== Categories ====================

pub async fn list_categories<R: FullRepository + ?Sized>(repo: &R) -> RepositoryResult<Vec<Category>> {
    degrade("list_categories", repo.list_categories().await, Vec::new)
}

pub async fn get_category_by_slug<R: FullRepository + ?Sized>(
    repo: &R,
    slug: &str,
) -> RepositoryResult<Option<Category>> {
    degrade(
        "get_category_by_slug",
        repo.get_category_by_slug(slug).await,
        || None,
    )
}

pub async fn create_category<R: FullRepository + ?Sized>(
    repo: &R,
    category: NewCategory,
) -> RepositoryResult<Category> {
    require_len("name", &category.name, 1, 100)?;
    require_len("slug", &category.slug, 1, 100)?;
    let created = repo.create_category(category).await?;
    info!("Created category {} ({})", created.id, created.slug);
    Ok(created)
}

pub async fn update_category<R: FullRepository + ?Sized>(
    repo: &R,
    category_id: CategoryId,
    update: CategoryUpdate,
) -> RepositoryResult<Category> {
    if let Some(ref name) = update.name {
        require_len("name", name, 1, 100)?;
    }
    repo.update_category(category_id, update).await
}

pub async fn delete_category<R: FullRepository + ?Sized>(
    repo: &R,
    category_id: CategoryId,
) -> RepositoryResult<bool> {
    repo.delete_category(category_id).await
}

// ==================== Tags ====================

pub async fn list_tags<R: FullRepository + ?Sized>(repo: &R) -> RepositoryResult<Vec<Tag>> {
    degrade("list_tags", repo.list_tags().await, Vec::new)
}

pub async fn get_tag_by_slug<R: FullRepository + ?Sized>(
    repo: &R,
    slug: &str,
) -> RepositoryResult<Option<Tag>> {
    degrade("get_tag_by_slug", repo.get_tag_by_slug(slug).await, || None)
}

pub async fn create_tag<R: FullRepository + ?Sized>(repo: &R, tag: NewTag) -> RepositoryResult<Tag> {
    require_len("name", &tag.name, 1, 50)?;
    require_len("slug", &tag.slug, 1, 50)?;
    repo.create_tag(tag).await
}

pub async fn delete_tag<R: FullRepository + ?Sized>(repo: &R, tag_id: TagId) -> RepositoryResult<bool> {
    repo.delete_tag(tag_id).await
}

/// Look a tag up by the slug of `name`, creating it when missing.
pub async fn get_or_create_tag<R: FullRepository + ?Sized>(
    repo: &R,
    name: &str,
) -> RepositoryResult<Tag> {
    let name = name.trim();
    let slug = slugify(name);
    if slug.is_empty() {
        return Err(invalid("tag", format!("Tag '{}' has no usable slug", name)));
    }
    if let Some(tag) = repo.get_tag_by_slug(&slug).await? {
        return Ok(tag);
    }
    match repo
        .create_tag(NewTag {
            name: name.to_string(),
            slug: slug.clone(),
        })
        .await
    {
        Ok(tag) => Ok(tag),
        // Lost a race with a concurrent creator, or the name is taken under another slug.
        Err(RepositoryError::Conflict { .. }) => {
            if let Some(tag) = repo.get_tag_by_slug(&slug).await? {
                return Ok(tag);
            }
            repo.get_tag_by_name(name).await?.ok_or_else(|| {
                RepositoryError::conflict(format!("Tag name '{}' already exists", name))
            })
        }
        Err(e) => Err(e),
    }
}

// ==================== Articles ====================

/// Published articles for the public listing.
///
/// `limit` defaults to [`DEFAULT_PAGE_SIZE`] and must lie in `1..=MAX_PAGE_SIZE`;
/// `offset` must not be negative.
pub async fn list_articles<R: FullRepository + ?Sized>(
    repo: &R,
    query: ArticleQuery,
) -> RepositoryResult<Vec<Article>> {
    let limit = bounded_limit(query.limit, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE)?;
    let offset = query.offset.unwrap_or(0);
    if offset < 0 {
        return Err(invalid("offset", "offset must not be negative"));
    }
    let query = ArticleQuery {
        limit: Some(limit),
        offset: Some(offset),
        ..query
    };
    degrade(
        "list_articles",
        repo.list_published_articles(&query).await,
        Vec::new,
    )
}

pub async fn featured_articles<R: FullRepository + ?Sized>(
    repo: &R,
    limit: Option<i64>,
) -> RepositoryResult<Vec<Article>> {
    let limit = bounded_limit(limit, DEFAULT_FEATURED_LIMIT, MAX_FEATURED_LIMIT)?;
    degrade(
        "featured_articles",
        repo.list_featured_articles(limit).await,
        Vec::new,
    )
}

pub async fn articles_by_tag<R: FullRepository + ?Sized>(
    repo: &R,
    tag_id: TagId,
) -> RepositoryResult<Vec<Article>> {
    degrade(
        "articles_by_tag",
        repo.list_articles_by_tag(tag_id).await,
        Vec::new,
    )
}

async fn build_detail<R: FullRepository + ?Sized>(
    repo: &R,
    article: Article,
) -> RepositoryResult<ArticleDetail> {
    let tags = repo.get_article_tags(article.id).await?;
    let category = repo.get_category(article.category_id).await?;
    let author = repo
        .get_user(article.author_id)
        .await?
        .map(|u| AuthorSummary {
            id: u.id,
            name: u.name,
        });
    let headings = extract_headings(&article.content);
    Ok(ArticleDetail {
        article,
        tags,
        category,
        author,
        headings,
    })
}

/// A published article with its tags, category, author and headings.
///
/// Drafts and archived articles are not visible through this lookup.
pub async fn get_article_detail<R: FullRepository + ?Sized>(
    repo: &R,
    slug: &str,
) -> RepositoryResult<Option<ArticleDetail>> {
    let lookup = async {
        match repo.get_article_by_slug(slug).await? {
            Some(article) if article.is_published() => {
                build_detail(repo, article).await.map(Some)
            }
            _ => Ok(None),
        }
    };
    degrade("get_article_detail", lookup.await, || None)
}

/// Any article by id, for the editor.
pub async fn get_article_for_admin<R: FullRepository + ?Sized>(
    repo: &R,
    article_id: ArticleId,
) -> RepositoryResult<Option<ArticleDetail>> {
    match repo.get_article(article_id).await? {
        Some(article) => build_detail(repo, article).await.map(Some),
        None => Ok(None),
    }
}

pub async fn list_all_articles<R: FullRepository + ?Sized>(
    repo: &R,
    status: Option<ArticleStatus>,
) -> RepositoryResult<Vec<Article>> {
    repo.list_all_articles(status).await
}

fn validate_article_fields(
    title: Option<&str>,
    slug: Option<&str>,
    content: Option<&str>,
    read_time: Option<i32>,
) -> RepositoryResult<()> {
    if let Some(title) = title {
        require_len("title", title, 1, 255)?;
    }
    if let Some(slug) = slug {
        require_len("slug", slug, 1, 255)?;
    }
    if let Some(content) = content {
        if content.trim().is_empty() {
            return Err(invalid("content", "content must not be empty"));
        }
    }
    if let Some(read_time) = read_time {
        if read_time < 1 {
            return Err(invalid("readTime", "readTime must be at least 1"));
        }
    }
    Ok(())
}

async fn require_category<R: FullRepository + ?Sized>(
    repo: &R,
    category_id: CategoryId,
) -> RepositoryResult<()> {
    if repo.get_category(category_id).await?.is_none() {
        return Err(invalid(
            "categoryId",
            format!("Category {} does not exist", category_id),
        ));
    }
    Ok(())
}

/// Create an article authored by `author_id`.
///
/// Publishing on creation stamps `published_at` with the current time.
pub async fn create_article<R: FullRepository + ?Sized>(
    repo: &R,
    request: CreateArticleRequest,
    author_id: UserId,
) -> RepositoryResult<Article> {
    validate_article_fields(
        Some(&request.title),
        Some(&request.slug),
        Some(&request.content),
        request.read_time,
    )?;
    require_category(repo, request.category_id).await?;

    let published_at = (request.status == ArticleStatus::Published).then(Utc::now);
    let article = repo
        .create_article(NewArticle {
            title: request.title,
            slug: request.slug,
            excerpt: request.excerpt,
            content: request.content,
            cover_image: request.cover_image,
            category_id: request.category_id,
            author_id,
            status: request.status,
            featured: request.featured,
            read_time: request.read_time.unwrap_or(DEFAULT_READ_TIME),
            published_at,
            scheduled_at: request.scheduled_at,
        })
        .await?;

    if let Some(tag_ids) = request.tag_ids.filter(|t| !t.is_empty()) {
        repo.set_article_tags(article.id, &tag_ids).await?;
    }
    info!(
        "Created article {} '{}' (status={})",
        article.id, article.slug, article.status
    );
    Ok(article)
}

/// Apply an admin edit.
///
/// The first transition to `published` stamps `published_at`; later edits
/// never move it.
pub async fn update_article<R: FullRepository + ?Sized>(
    repo: &R,
    article_id: ArticleId,
    request: UpdateArticleRequest,
) -> RepositoryResult<Article> {
    validate_article_fields(
        request.title.as_deref(),
        request.slug.as_deref(),
        request.content.as_deref(),
        request.read_time,
    )?;
    let existing = repo.get_article(article_id).await?.ok_or_else(|| {
        RepositoryError::not_found_with_context(
            format!("Article {} not found", article_id),
            ErrorContext::new("update_article")
                .with_entity("article")
                .with_entity_id(article_id),
        )
    })?;
    if let Some(category_id) = request.category_id {
        require_category(repo, category_id).await?;
    }

    let published_at = (request.status == Some(ArticleStatus::Published)
        && existing.published_at.is_none())
    .then(Utc::now);

    let article = repo
        .update_article(
            article_id,
            ArticleUpdate {
                title: request.title,
                slug: request.slug,
                excerpt: request.excerpt,
                content: request.content,
                cover_image: request.cover_image,
                category_id: request.category_id,
                status: request.status,
                featured: request.featured,
                read_time: request.read_time,
                published_at,
                scheduled_at: request.scheduled_at,
            },
        )
        .await?;

    if let Some(tag_ids) = request.tag_ids {
        repo.set_article_tags(article_id, &tag_ids).await?;
    }
    Ok(article)
}

pub async fn delete_article<R: FullRepository + ?Sized>(
    repo: &R,
    article_id: ArticleId,
) -> RepositoryResult<bool> {
    let deleted = repo.delete_article(article_id).await?;
    if deleted {
        info!("Deleted article {}", article_id);
    }
    Ok(deleted)
}

/// Create an article on behalf of the scheduled publishing task.
///
/// The category must exist; tags are created on demand; slug and read
/// time are derived from the title and content when omitted. When
/// `generate_cover_image` is set and no cover is given, `images` is asked
/// for one and a failure only costs the cover.
pub async fn create_automated_article<R: FullRepository + ?Sized>(
    repo: &R,
    request: AutomatedArticleRequest,
    author_id: UserId,
    images: Option<&dyn CoverImageGenerator>,
) -> RepositoryResult<Article> {
    let slug = request
        .slug
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| slugify(&request.title));
    validate_article_fields(
        Some(&request.title),
        Some(&slug),
        Some(&request.content),
        request.read_time,
    )?;

    let category = repo
        .get_category_by_slug(&request.category_slug)
        .await?
        .ok_or_else(|| {
            invalid(
                "categorySlug",
                format!("Category '{}' does not exist", request.category_slug),
            )
        })?;

    let mut tag_ids = Vec::new();
    for tag_slug in request.tag_slugs.iter().flatten() {
        if tag_slug.trim().is_empty() {
            continue;
        }
        tag_ids.push(get_or_create_tag(repo, tag_slug).await?.id);
    }

    let mut cover_image = request.cover_image.filter(|c| !c.trim().is_empty());
    if cover_image.is_none() && request.generate_cover_image {
        match images {
            Some(generator) => {
                match generator
                    .generate_cover(&request.title, request.excerpt.as_deref())
                    .await
                {
                    Ok(url) => cover_image = Some(url),
                    Err(e) => warn!("Cover image generation failed for '{}': {:#}", slug, e),
                }
            }
            None => debug!("Cover image requested but no generator is configured"),
        }
    }

    let status = request.status.unwrap_or(ArticleStatus::Published);
    let read_time = request
        .read_time
        .unwrap_or_else(|| estimate_read_time(&request.content));
    let article = repo
        .create_article(NewArticle {
            title: request.title,
            slug,
            excerpt: request.excerpt,
            content: request.content,
            cover_image,
            category_id: category.id,
            author_id,
            status,
            featured: request.featured.unwrap_or(false),
            read_time,
            published_at: (status == ArticleStatus::Published).then(Utc::now),
            scheduled_at: None,
        })
        .await?;

    if !tag_ids.is_empty() {
        repo.set_article_tags(article.id, &tag_ids).await?;
    }
    info!(
        "Automated article {} '{}' created in category '{}'",
        article.id, article.slug, category.slug
    );
    Ok(article)
}

// ==================== Newsletter ====================

/// Subscribe an address, reactivating a previous subscription.
pub async fn subscribe<R: FullRepository + ?Sized>(
    repo: &R,
    email: &str,
    name: Option<&str>,
) -> RepositoryResult<NewsletterSubscriber> {
    let email = normalize_email(email)?;
    let name = name.map(str::trim).filter(|n| !n.is_empty());
    repo.subscribe(&email, name).await
}

/// Unsubscribe an address. Unknown addresses are not an error.
pub async fn unsubscribe<R: FullRepository + ?Sized>(repo: &R, email: &str) -> RepositoryResult<bool> {
    let email = normalize_email(email)?;
    repo.unsubscribe(&email).await
}

pub async fn list_subscribers<R: FullRepository + ?Sized>(
    repo: &R,
    active_only: bool,
) -> RepositoryResult<Vec<NewsletterSubscriber>> {
    repo.list_subscribers(active_only).await
}

pub async fn subscriber_count<R: FullRepository + ?Sized>(repo: &R) -> RepositoryResult<i64> {
    repo.count_active_subscribers().await
}

// ==================== Contact ====================

pub async fn submit_contact<R: FullRepository + ?Sized>(
    repo: &R,
    message: NewContactMessage,
) -> RepositoryResult<ContactMessage> {
    require_len("name", message.name.trim(), 1, 100)?;
    require_email(message.email.trim())?;
    require_len("subject", message.subject.trim(), 1, 255)?;
    if message.message.trim().chars().count() < MIN_CONTACT_MESSAGE_CHARS {
        return Err(invalid(
            "message",
            format!(
                "message must be at least {} characters",
                MIN_CONTACT_MESSAGE_CHARS
            ),
        ));
    }
    let stored = repo
        .create_contact_message(NewContactMessage {
            name: message.name.trim().to_string(),
            email: message.email.trim().to_string(),
            subject: message.subject.trim().to_string(),
            message: message.message,
            kind: message.kind,
        })
        .await?;
    info!("Contact message {} received ({})", stored.id, stored.kind);
    Ok(stored)
}

pub async fn list_contact_messages<R: FullRepository + ?Sized>(
    repo: &R,
) -> RepositoryResult<Vec<ContactMessage>> {
    repo.list_contact_messages().await
}

pub async fn update_contact_status<R: FullRepository + ?Sized>(
    repo: &R,
    message_id: ContactMessageId,
    status: ContactStatus,
) -> RepositoryResult<ContactMessage> {
    repo.update_contact_status(message_id, status).await
}

pub async fn new_contact_count<R: FullRepository + ?Sized>(repo: &R) -> RepositoryResult<i64> {
    repo.count_new_contact_messages().await
}

// ==================== Analytics ====================

/// Record a page view and return the stored row.
///
/// The client's IP is kept only as a SHA-256 digest; user agent and
/// referrer are cut to [`MAX_HEADER_CHARS`].
pub async fn record_view<R: FullRepository + ?Sized>(
    repo: &R,
    request: RecordViewRequest,
    user_id: Option<UserId>,
    ip: Option<&str>,
) -> RepositoryResult<ArticleView> {
    require_visitor(&request.visitor_id)?;
    let view = repo
        .record_view(NewArticleView {
            article_id: request.article_id,
            visitor_id: request.visitor_id.trim().to_string(),
            user_id,
            ip_hash: ip.map(str::trim).filter(|i| !i.is_empty()).map(hash_ip),
            user_agent: truncate_chars(request.user_agent, MAX_HEADER_CHARS),
            referrer: truncate_chars(request.referrer, MAX_HEADER_CHARS),
        })
        .await?;
    debug!("Recorded view {} on article {}", view.id, view.article_id);
    Ok(view)
}

/// Raise the progress samples of a view; inputs are clamped first.
pub async fn update_view_progress<R: FullRepository + ?Sized>(
    repo: &R,
    view_id: ViewId,
    progress: ViewProgress,
) -> RepositoryResult<ArticleView> {
    let progress = ViewProgress {
        read_time: progress.read_time.map(|r| r.max(0)),
        scroll_depth: progress.scroll_depth.map(|s| s.clamp(0, 100)),
    };
    repo.update_view_progress(view_id, progress).await
}

pub async fn toggle_like<R: FullRepository + ?Sized>(
    repo: &R,
    article_id: ArticleId,
    visitor_id: &str,
    user_id: Option<UserId>,
) -> RepositoryResult<LikeToggle> {
    require_visitor(visitor_id)?;
    repo.toggle_like(article_id, visitor_id.trim(), user_id).await
}

pub async fn has_liked<R: FullRepository + ?Sized>(
    repo: &R,
    article_id: ArticleId,
    visitor_id: &str,
) -> RepositoryResult<bool> {
    require_visitor(visitor_id)?;
    degrade(
        "has_liked",
        repo.has_liked(article_id, visitor_id.trim()).await,
        || false,
    )
}

/// Per-article stats when an id is given, site-wide stats otherwise.
pub async fn stats<R: FullRepository + ?Sized>(
    repo: &R,
    article_id: Option<ArticleId>,
) -> RepositoryResult<Stats> {
    match article_id {
        Some(id) => repo.article_stats(id).await.map(Stats::Article),
        None => repo.site_stats().await.map(Stats::Site),
    }
}

/// Most viewed published articles; `limit` defaults to 5 and is clamped to `1..=50`.
pub async fn popular_articles<R: FullRepository + ?Sized>(
    repo: &R,
    limit: Option<i64>,
) -> RepositoryResult<Vec<Article>> {
    let limit = limit
        .unwrap_or(DEFAULT_POPULAR_LIMIT)
        .clamp(1, MAX_POPULAR_LIMIT);
    degrade(
        "popular_articles",
        repo.popular_articles(limit).await,
        Vec::new,
    )
}

// ==================== Feeds ====================

/// Most recently published articles for the RSS feed.
pub async fn feed_articles<R: FullRepository + ?Sized>(
    repo: &R,
    limit: i64,
) -> RepositoryResult<Vec<Article>> {
    let query = ArticleQuery {
        limit: Some(limit.max(1)),
        ..Default::default()
    };
    degrade(
        "feed_articles",
        repo.list_published_articles(&query).await,
        Vec::new,
    )
}

/// Categories and every published article, for the sitemap.
pub async fn sitemap_content<R: FullRepository + ?Sized>(
    repo: &R,
) -> RepositoryResult<(Vec<Category>, Vec<Article>)> {
    let categories = list_categories(repo).await?;
    let articles = degrade(
        "sitemap_content",
        repo.list_published_articles(&ArticleQuery::default()).await,
        Vec::new,
    )?;
    Ok((categories, articles))
}
