//! In-memory local repository implementation.
//!
//! This module provides a local implementation of all repository traits
//! suitable for unit testing and local development. All data is stored in
//! ordered maps behind a single lock, giving deterministic iteration order
//! and isolated execution.
//!
//! Counter operations (`record_view`, `toggle_like`) hold one write guard
//! across both the row mutation and the counter mutation, so concurrent
//! callers can never observe or produce a counter that disagrees with the
//! rows it summarizes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use crate::api::*;
use crate::db::repository::*;

/// In-memory local repository.
///
/// # Example
/// ```
/// use fleetcrew_blog::db::repositories::LocalRepository;
/// use fleetcrew_blog::db::repository::AudienceRepository;
///
/// # tokio_test_block(async {
/// let repo = LocalRepository::new();
/// repo.subscribe("reader@example.com", None).await.unwrap();
/// assert_eq!(repo.count_active_subscribers().await.unwrap(), 1);
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Runtime::new().unwrap().block_on(f)
/// # }
/// ```
#[derive(Clone)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
}

struct LocalData {
    users: BTreeMap<UserId, User>,
    categories: BTreeMap<CategoryId, Category>,
    tags: BTreeMap<TagId, Tag>,
    articles: BTreeMap<ArticleId, Article>,
    article_tags: BTreeSet<(ArticleId, TagId)>,
    subscribers: BTreeMap<SubscriberId, NewsletterSubscriber>,
    contact_messages: BTreeMap<ContactMessageId, ContactMessage>,
    views: BTreeMap<ViewId, ArticleView>,
    // Keyed by the (article, visitor) pair, so a second like row cannot exist.
    likes: BTreeMap<(ArticleId, String), ArticleLike>,

    // ID counter shared by every table
    next_id: i64,

    // Connection health
    is_healthy: bool,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            users: BTreeMap::new(),
            categories: BTreeMap::new(),
            tags: BTreeMap::new(),
            articles: BTreeMap::new(),
            article_tags: BTreeSet::new(),
            subscribers: BTreeMap::new(),
            contact_messages: BTreeMap::new(),
            views: BTreeMap::new(),
            likes: BTreeMap::new(),
            next_id: 1,
            is_healthy: true,
        }
    }
}

impl LocalData {
    fn allocate_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn article_mut(
        &mut self,
        article_id: ArticleId,
        operation: &str,
    ) -> RepositoryResult<&mut Article> {
        self.articles
            .get_mut(&article_id)
            .ok_or_else(|| not_found("article", article_id, operation))
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

fn conflict(entity: &str, field: &str, value: &str, operation: &str) -> RepositoryError {
    RepositoryError::conflict_with_context(
        format!("{} with {} '{}' already exists", entity, field, value),
        ErrorContext::new(operation)
            .with_entity(entity)
            .with_details(format!("field={}", field)),
    )
}

/// Descending `published_at` (unpublished last), then descending id.
fn newest_published_first(a: &Article, b: &Article) -> Ordering {
    b.published_at
        .cmp(&a.published_at)
        .then_with(|| b.id.cmp(&a.id))
}

fn rounded_mean(total: i64, count: i64) -> i64 {
    if count == 0 {
        0
    } else {
        (total as f64 / count as f64).round() as i64
    }
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(LocalData::default())),
        }
    }

    /// Set the health status for testing connection failures.
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().is_healthy = healthy;
    }

    /// Clear all data from the repository.
    pub fn clear(&self) {
        let mut data = self.data.write();
        *data = LocalData {
            is_healthy: data.is_healthy,
            ..Default::default()
        };
    }

    /// Number of like rows stored for an article.
    pub fn like_row_count(&self, article_id: ArticleId) -> usize {
        self.data
            .read()
            .likes
            .keys()
            .filter(|(id, _)| *id == article_id)
            .count()
    }

    /// Number of view rows stored for an article.
    pub fn view_row_count(&self, article_id: ArticleId) -> usize {
        self.data
            .read()
            .views
            .values()
            .filter(|v| v.article_id == article_id)
            .count()
    }

    /// Acquire the read guard, failing like a dropped connection when unhealthy.
    fn read(&self) -> RepositoryResult<RwLockReadGuard<'_, LocalData>> {
        let data = self.data.read();
        if !data.is_healthy {
            return Err(RepositoryError::connection("Database is not healthy"));
        }
        Ok(data)
    }

    fn write(&self) -> RepositoryResult<RwLockWriteGuard<'_, LocalData>> {
        let data = self.data.write();
        if !data.is_healthy {
            return Err(RepositoryError::connection("Database is not healthy"));
        }
        Ok(data)
    }
}

impl Default for LocalRepository {
    fn default() -> Self {
        Self::new()
    }
}

// ==================== Article Repository ====================

#[async_trait]
impl ArticleRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(self.data.read().is_healthy)
    }

    async fn create_article(&self, article: NewArticle) -> RepositoryResult<Article> {
        let mut data = self.write()?;
        if data.articles.values().any(|a| a.slug == article.slug) {
            return Err(conflict("article", "slug", &article.slug, "create_article"));
        }

        let now = Utc::now();
        let id = ArticleId(data.allocate_id());
        let stored = Article {
            id,
            title: article.title,
            slug: article.slug,
            excerpt: article.excerpt,
            content: article.content,
            cover_image: article.cover_image,
            category_id: article.category_id,
            author_id: article.author_id,
            status: article.status,
            featured: article.featured,
            read_time: article.read_time,
            view_count: 0,
            like_count: 0,
            published_at: article.published_at,
            scheduled_at: article.scheduled_at,
            created_at: now,
            updated_at: now,
        };
        data.articles.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update_article(
        &self,
        article_id: ArticleId,
        update: ArticleUpdate,
    ) -> RepositoryResult<Article> {
        let mut data = self.write()?;
        if let Some(ref slug) = update.slug {
            if data
                .articles
                .values()
                .any(|a| a.id != article_id && &a.slug == slug)
            {
                return Err(conflict("article", "slug", slug, "update_article"));
            }
        }

        let article = data.article_mut(article_id, "update_article")?;
        if let Some(title) = update.title {
            article.title = title;
        }
        if let Some(slug) = update.slug {
            article.slug = slug;
        }
        if let Some(excerpt) = update.excerpt {
            article.excerpt = Some(excerpt);
        }
        if let Some(content) = update.content {
            article.content = content;
        }
        if let Some(cover_image) = update.cover_image {
            article.cover_image = Some(cover_image);
        }
        if let Some(category_id) = update.category_id {
            article.category_id = category_id;
        }
        if let Some(status) = update.status {
            article.status = status;
        }
        if let Some(featured) = update.featured {
            article.featured = featured;
        }
        if let Some(read_time) = update.read_time {
            article.read_time = read_time;
        }
        if let Some(published_at) = update.published_at {
            article.published_at = Some(published_at);
        }
        if let Some(scheduled_at) = update.scheduled_at {
            article.scheduled_at = Some(scheduled_at);
        }
        article.updated_at = Utc::now();
        Ok(article.clone())
    }

    async fn delete_article(&self, article_id: ArticleId) -> RepositoryResult<bool> {
        let mut data = self.write()?;
        if data.articles.remove(&article_id).is_none() {
            return Ok(false);
        }
        data.article_tags.retain(|(a, _)| *a != article_id);
        data.views.retain(|_, v| v.article_id != article_id);
        data.likes.retain(|(a, _), _| *a != article_id);
        Ok(true)
    }

    async fn get_article(&self, article_id: ArticleId) -> RepositoryResult<Option<Article>> {
        Ok(self.read()?.articles.get(&article_id).cloned())
    }

    async fn get_article_by_slug(&self, slug: &str) -> RepositoryResult<Option<Article>> {
        Ok(self
            .read()?
            .articles
            .values()
            .find(|a| a.slug == slug)
            .cloned())
    }

    async fn list_published_articles(
        &self,
        query: &ArticleQuery,
    ) -> RepositoryResult<Vec<Article>> {
        let data = self.read()?;
        let needle = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let mut articles: Vec<Article> = data
            .articles
            .values()
            .filter(|a| a.is_published())
            .filter(|a| query.category_id.map_or(true, |c| a.category_id == c))
            .filter(|a| {
                query
                    .tag_id
                    .map_or(true, |t| data.article_tags.contains(&(a.id, t)))
            })
            .filter(|a| {
                needle
                    .as_ref()
                    .map_or(true, |n| a.title.to_lowercase().contains(n))
            })
            .cloned()
            .collect();
        articles.sort_by(newest_published_first);

        let offset = query.offset.unwrap_or(0).max(0) as usize;
        let limit = query.limit.map_or(usize::MAX, |l| l.max(0) as usize);
        Ok(articles.into_iter().skip(offset).take(limit).collect())
    }

    async fn list_featured_articles(&self, limit: i64) -> RepositoryResult<Vec<Article>> {
        let data = self.read()?;
        let mut articles: Vec<Article> = data
            .articles
            .values()
            .filter(|a| a.is_published() && a.featured)
            .cloned()
            .collect();
        articles.sort_by(newest_published_first);
        articles.truncate(limit.max(0) as usize);
        Ok(articles)
    }

    async fn list_all_articles(
        &self,
        status: Option<ArticleStatus>,
    ) -> RepositoryResult<Vec<Article>> {
        let data = self.read()?;
        let mut articles: Vec<Article> = data
            .articles
            .values()
            .filter(|a| status.map_or(true, |s| a.status == s))
            .cloned()
            .collect();
        articles.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(articles)
    }

    async fn list_articles_by_tag(&self, tag_id: TagId) -> RepositoryResult<Vec<Article>> {
        let data = self.read()?;
        let mut articles: Vec<Article> = data
            .article_tags
            .iter()
            .filter(|(_, t)| *t == tag_id)
            .filter_map(|(a, _)| data.articles.get(a))
            .filter(|a| a.is_published())
            .cloned()
            .collect();
        articles.sort_by(newest_published_first);
        Ok(articles)
    }

    async fn set_article_tags(
        &self,
        article_id: ArticleId,
        tag_ids: &[TagId],
    ) -> RepositoryResult<()> {
        let mut data = self.write()?;
        data.article_mut(article_id, "set_article_tags")?;
        if let Some(missing) = tag_ids.iter().find(|t| !data.tags.contains_key(t)) {
            return Err(not_found("tag", missing, "set_article_tags"));
        }
        data.article_tags.retain(|(a, _)| *a != article_id);
        for tag_id in tag_ids {
            data.article_tags.insert((article_id, *tag_id));
        }
        Ok(())
    }

    async fn get_article_tags(&self, article_id: ArticleId) -> RepositoryResult<Vec<Tag>> {
        let data = self.read()?;
        let mut tags: Vec<Tag> = data
            .article_tags
            .iter()
            .filter(|(a, _)| *a == article_id)
            .filter_map(|(_, t)| data.tags.get(t))
            .cloned()
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }
}

// ==================== Taxonomy Repository ====================

#[async_trait]
impl TaxonomyRepository for LocalRepository {
    async fn list_categories(&self) -> RepositoryResult<Vec<Category>> {
        let mut categories: Vec<Category> = self.read()?.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn get_category(&self, category_id: CategoryId) -> RepositoryResult<Option<Category>> {
        Ok(self.read()?.categories.get(&category_id).cloned())
    }

    async fn get_category_by_slug(&self, slug: &str) -> RepositoryResult<Option<Category>> {
        Ok(self
            .read()?
            .categories
            .values()
            .find(|c| c.slug == slug)
            .cloned())
    }

    async fn create_category(&self, category: NewCategory) -> RepositoryResult<Category> {
        let mut data = self.write()?;
        for existing in data.categories.values() {
            if existing.name == category.name {
                return Err(conflict("category", "name", &category.name, "create_category"));
            }
            if existing.slug == category.slug {
                return Err(conflict("category", "slug", &category.slug, "create_category"));
            }
        }

        let id = CategoryId(data.allocate_id());
        let stored = Category {
            id,
            name: category.name,
            slug: category.slug,
            description: category.description,
            icon: category.icon,
            color: category.color,
            created_at: Utc::now(),
        };
        data.categories.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update_category(
        &self,
        category_id: CategoryId,
        update: CategoryUpdate,
    ) -> RepositoryResult<Category> {
        let mut data = self.write()?;
        if let Some(ref name) = update.name {
            if data
                .categories
                .values()
                .any(|c| c.id != category_id && &c.name == name)
            {
                return Err(conflict("category", "name", name, "update_category"));
            }
        }

        let category = data
            .categories
            .get_mut(&category_id)
            .ok_or_else(|| not_found("category", category_id, "update_category"))?;
        if let Some(name) = update.name {
            category.name = name;
        }
        if let Some(description) = update.description {
            category.description = Some(description);
        }
        if let Some(icon) = update.icon {
            category.icon = Some(icon);
        }
        if let Some(color) = update.color {
            category.color = Some(color);
        }
        Ok(category.clone())
    }

    async fn delete_category(&self, category_id: CategoryId) -> RepositoryResult<bool> {
        Ok(self.write()?.categories.remove(&category_id).is_some())
    }

    async fn list_tags(&self) -> RepositoryResult<Vec<Tag>> {
        let mut tags: Vec<Tag> = self.read()?.tags.values().cloned().collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn get_tag_by_slug(&self, slug: &str) -> RepositoryResult<Option<Tag>> {
        Ok(self.read()?.tags.values().find(|t| t.slug == slug).cloned())
    }

    async fn get_tag_by_name(&self, name: &str) -> RepositoryResult<Option<Tag>> {
        Ok(self.read()?.tags.values().find(|t| t.name == name).cloned())
    }

    async fn create_tag(&self, tag: NewTag) -> RepositoryResult<Tag> {
        let mut data = self.write()?;
        for existing in data.tags.values() {
            if existing.name == tag.name {
                return Err(conflict("tag", "name", &tag.name, "create_tag"));
            }
            if existing.slug == tag.slug {
                return Err(conflict("tag", "slug", &tag.slug, "create_tag"));
            }
        }

        let id = TagId(data.allocate_id());
        let stored = Tag {
            id,
            name: tag.name,
            slug: tag.slug,
            created_at: Utc::now(),
        };
        data.tags.insert(id, stored.clone());
        Ok(stored)
    }

    async fn delete_tag(&self, tag_id: TagId) -> RepositoryResult<bool> {
        let mut data = self.write()?;
        if data.tags.remove(&tag_id).is_none() {
            return Ok(false);
        }
        data.article_tags.retain(|(_, t)| *t != tag_id);
        Ok(true)
    }
}

// ==================== Audience Repository ====================

#[async_trait]
impl AudienceRepository for LocalRepository {
    async fn subscribe(
        &self,
        email: &str,
        name: Option<&str>,
    ) -> RepositoryResult<NewsletterSubscriber> {
        let mut data = self.write()?;
        if let Some(existing) = data.subscribers.values_mut().find(|s| s.email == email) {
            if !existing.is_active {
                existing.is_active = true;
                existing.unsubscribed_at = None;
            }
            return Ok(existing.clone());
        }

        let id = SubscriberId(data.allocate_id());
        let stored = NewsletterSubscriber {
            id,
            email: email.to_string(),
            name: name.map(str::to_string),
            is_active: true,
            subscribed_at: Utc::now(),
            unsubscribed_at: None,
        };
        data.subscribers.insert(id, stored.clone());
        Ok(stored)
    }

    async fn unsubscribe(&self, email: &str) -> RepositoryResult<bool> {
        let mut data = self.write()?;
        match data.subscribers.values_mut().find(|s| s.email == email) {
            Some(subscriber) => {
                subscriber.is_active = false;
                subscriber.unsubscribed_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_subscribers(
        &self,
        active_only: bool,
    ) -> RepositoryResult<Vec<NewsletterSubscriber>> {
        let data = self.read()?;
        let mut subscribers: Vec<NewsletterSubscriber> = data
            .subscribers
            .values()
            .filter(|s| !active_only || s.is_active)
            .cloned()
            .collect();
        subscribers.sort_by(|a, b| {
            b.subscribed_at
                .cmp(&a.subscribed_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(subscribers)
    }

    async fn count_active_subscribers(&self) -> RepositoryResult<i64> {
        Ok(self
            .read()?
            .subscribers
            .values()
            .filter(|s| s.is_active)
            .count() as i64)
    }

    async fn create_contact_message(
        &self,
        message: NewContactMessage,
    ) -> RepositoryResult<ContactMessage> {
        let mut data = self.write()?;
        let id = ContactMessageId(data.allocate_id());
        let stored = ContactMessage {
            id,
            name: message.name,
            email: message.email,
            subject: message.subject,
            message: message.message,
            kind: message.kind,
            status: ContactStatus::Nouveau,
            created_at: Utc::now(),
        };
        data.contact_messages.insert(id, stored.clone());
        Ok(stored)
    }

    async fn list_contact_messages(&self) -> RepositoryResult<Vec<ContactMessage>> {
        let mut messages: Vec<ContactMessage> =
            self.read()?.contact_messages.values().cloned().collect();
        messages.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(messages)
    }

    async fn update_contact_status(
        &self,
        message_id: ContactMessageId,
        status: ContactStatus,
    ) -> RepositoryResult<ContactMessage> {
        let mut data = self.write()?;
        let message = data
            .contact_messages
            .get_mut(&message_id)
            .ok_or_else(|| not_found("contact_message", message_id, "update_contact_status"))?;
        message.status = status;
        Ok(message.clone())
    }

    async fn count_new_contact_messages(&self) -> RepositoryResult<i64> {
        Ok(self
            .read()?
            .contact_messages
            .values()
            .filter(|m| m.status == ContactStatus::Nouveau)
            .count() as i64)
    }
}

// ==================== Analytics Repository ====================

#[async_trait]
impl AnalyticsRepository for LocalRepository {
    async fn record_view(&self, view: NewArticleView) -> RepositoryResult<ArticleView> {
        let mut data = self.write()?;
        data.article_mut(view.article_id, "record_view")?.view_count += 1;

        let id = ViewId(data.allocate_id());
        let stored = ArticleView {
            id,
            article_id: view.article_id,
            visitor_id: view.visitor_id,
            user_id: view.user_id,
            ip_hash: view.ip_hash,
            user_agent: view.user_agent,
            referrer: view.referrer,
            read_time: 0,
            scroll_depth: 0,
            viewed_at: Utc::now(),
        };
        data.views.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update_view_progress(
        &self,
        view_id: ViewId,
        progress: ViewProgress,
    ) -> RepositoryResult<ArticleView> {
        let mut data = self.write()?;
        let view = data
            .views
            .get_mut(&view_id)
            .ok_or_else(|| not_found("article_view", view_id, "update_view_progress"))?;
        if let Some(read_time) = progress.read_time {
            view.read_time = view.read_time.max(read_time);
        }
        if let Some(scroll_depth) = progress.scroll_depth {
            view.scroll_depth = view.scroll_depth.max(scroll_depth);
        }
        Ok(view.clone())
    }

    async fn toggle_like(
        &self,
        article_id: ArticleId,
        visitor_id: &str,
        user_id: Option<UserId>,
    ) -> RepositoryResult<LikeToggle> {
        let mut data = self.write()?;
        data.article_mut(article_id, "toggle_like")?;

        let key = (article_id, visitor_id.to_string());
        let liked = if data.likes.remove(&key).is_some() {
            false
        } else {
            let id = data.allocate_id();
            data.likes.insert(
                key,
                ArticleLike {
                    id,
                    article_id,
                    visitor_id: visitor_id.to_string(),
                    user_id,
                    created_at: Utc::now(),
                },
            );
            true
        };

        let article = data.article_mut(article_id, "toggle_like")?;
        article.like_count = if liked {
            article.like_count + 1
        } else {
            (article.like_count - 1).max(0)
        };
        Ok(LikeToggle {
            liked,
            like_count: article.like_count,
        })
    }

    async fn has_liked(&self, article_id: ArticleId, visitor_id: &str) -> RepositoryResult<bool> {
        Ok(self
            .read()?
            .likes
            .contains_key(&(article_id, visitor_id.to_string())))
    }

    async fn article_stats(&self, article_id: ArticleId) -> RepositoryResult<ArticleStats> {
        let data = self.read()?;
        let mut views = 0i64;
        let mut read_total = 0i64;
        let mut scroll_total = 0i64;
        let mut visitors = HashSet::new();
        for view in data.views.values().filter(|v| v.article_id == article_id) {
            views += 1;
            read_total += i64::from(view.read_time);
            scroll_total += i64::from(view.scroll_depth);
            visitors.insert(view.visitor_id.as_str());
        }

        Ok(ArticleStats {
            views,
            unique_visitors: visitors.len() as i64,
            avg_read_time: rounded_mean(read_total, views),
            avg_scroll_depth: rounded_mean(scroll_total, views),
        })
    }

    async fn site_stats(&self) -> RepositoryResult<SiteStats> {
        let data = self.read()?;
        Ok(SiteStats {
            total_views: data.articles.values().map(|a| a.view_count).sum(),
            total_likes: data.articles.values().map(|a| a.like_count).sum(),
            published_articles: data.articles.values().filter(|a| a.is_published()).count()
                as i64,
            active_subscribers: data.subscribers.values().filter(|s| s.is_active).count() as i64,
        })
    }

    async fn popular_articles(&self, limit: i64) -> RepositoryResult<Vec<Article>> {
        let data = self.read()?;
        let mut articles: Vec<Article> = data
            .articles
            .values()
            .filter(|a| a.is_published())
            .cloned()
            .collect();
        articles.sort_by(|a, b| {
            b.view_count
                .cmp(&a.view_count)
                .then_with(|| b.published_at.cmp(&a.published_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        articles.truncate(limit.max(0) as usize);
        Ok(articles)
    }
}

// ==================== User Repository ====================

#[async_trait]
impl UserRepository for LocalRepository {
    async fn upsert_user(&self, user: UpsertUser) -> RepositoryResult<User> {
        let mut data = self.write()?;
        let now = Utc::now();
        let signed_in: DateTime<Utc> = user.last_signed_in.unwrap_or(now);

        if let Some(existing) = data.users.values_mut().find(|u| u.open_id == user.open_id) {
            if let Some(name) = user.name {
                existing.name = Some(name);
            }
            if let Some(email) = user.email {
                existing.email = Some(email);
            }
            if let Some(login_method) = user.login_method {
                existing.login_method = Some(login_method);
            }
            if let Some(role) = user.role {
                existing.role = role;
            }
            existing.last_signed_in = signed_in;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let id = UserId(data.allocate_id());
        let stored = User {
            id,
            open_id: user.open_id,
            name: user.name,
            email: user.email,
            login_method: user.login_method,
            role: user.role.unwrap_or_default(),
            created_at: now,
            updated_at: now,
            last_signed_in: signed_in,
        };
        data.users.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get_user(&self, user_id: UserId) -> RepositoryResult<Option<User>> {
        Ok(self.read()?.users.get(&user_id).cloned())
    }

    async fn get_user_by_open_id(&self, open_id: &str) -> RepositoryResult<Option<User>> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.open_id == open_id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(title: &str, slug: &str) -> NewArticle {
        NewArticle {
            title: title.to_string(),
            slug: slug.to_string(),
            excerpt: None,
            content: "Contenu de test".to_string(),
            cover_image: None,
            category_id: CategoryId(1),
            author_id: UserId(1),
            status: ArticleStatus::Draft,
            featured: false,
            read_time: 5,
            published_at: None,
            scheduled_at: None,
        }
    }

    fn published(title: &str, slug: &str, days_ago: i64) -> NewArticle {
        NewArticle {
            status: ArticleStatus::Published,
            published_at: Some(Utc::now() - chrono::Duration::days(days_ago)),
            ..draft(title, slug)
        }
    }

    fn view(article_id: ArticleId, visitor: &str) -> NewArticleView {
        NewArticleView {
            article_id,
            visitor_id: visitor.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_duplicate_slug_is_conflict() {
        let repo = LocalRepository::new();
        repo.create_article(draft("One", "same")).await.unwrap();
        let result = repo.create_article(draft("Two", "same")).await;
        assert!(matches!(result, Err(RepositoryError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_record_view_increments_counter_per_row() {
        let repo = LocalRepository::new();
        let article = repo.create_article(published("A", "a", 1)).await.unwrap();

        repo.record_view(view(article.id, "v1")).await.unwrap();
        repo.record_view(view(article.id, "v1")).await.unwrap();

        let stored = repo.get_article(article.id).await.unwrap().unwrap();
        assert_eq!(stored.view_count, 2);
        assert_eq!(repo.view_row_count(article.id), 2);
    }

    #[tokio::test]
    async fn test_record_view_unknown_article() {
        let repo = LocalRepository::new();
        let result = repo.record_view(view(ArticleId(404), "v1")).await;
        assert!(matches!(result, Err(RepositoryError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_view_progress_keeps_maxima() {
        let repo = LocalRepository::new();
        let article = repo.create_article(published("A", "a", 1)).await.unwrap();
        let recorded = repo.record_view(view(article.id, "v1")).await.unwrap();

        repo.update_view_progress(
            recorded.id,
            ViewProgress {
                read_time: Some(90),
                scroll_depth: Some(60),
            },
        )
        .await
        .unwrap();
        let updated = repo
            .update_view_progress(
                recorded.id,
                ViewProgress {
                    read_time: Some(30),
                    scroll_depth: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.read_time, 90);
        assert_eq!(updated.scroll_depth, 60);
    }

    #[tokio::test]
    async fn test_toggle_like_twice_restores_state() {
        let repo = LocalRepository::new();
        let article = repo.create_article(published("A", "a", 1)).await.unwrap();

        let first = repo.toggle_like(article.id, "v1", None).await.unwrap();
        assert_eq!(
            first,
            LikeToggle {
                liked: true,
                like_count: 1
            }
        );
        assert!(repo.has_liked(article.id, "v1").await.unwrap());

        let second = repo.toggle_like(article.id, "v1", None).await.unwrap();
        assert_eq!(
            second,
            LikeToggle {
                liked: false,
                like_count: 0
            }
        );
        assert!(!repo.has_liked(article.id, "v1").await.unwrap());
        assert_eq!(repo.like_row_count(article.id), 0);
    }

    #[tokio::test]
    async fn test_like_records_signed_in_user() {
        let repo = LocalRepository::new();
        let article = repo.create_article(published("A", "a", 1)).await.unwrap();

        repo.toggle_like(article.id, "v1", Some(UserId(42))).await.unwrap();
        repo.toggle_like(article.id, "v2", None).await.unwrap();

        let data = repo.data.read();
        let user_of = |visitor: &str| data.likes[&(article.id, visitor.to_string())].user_id;
        assert_eq!(user_of("v1"), Some(UserId(42)));
        assert_eq!(user_of("v2"), None);
    }

    #[tokio::test]
    async fn test_article_stats_rounds_means() {
        let repo = LocalRepository::new();
        let article = repo.create_article(published("A", "a", 1)).await.unwrap();
        let v1 = repo.record_view(view(article.id, "v1")).await.unwrap();
        let v2 = repo.record_view(view(article.id, "v1")).await.unwrap();
        repo.record_view(view(article.id, "v2")).await.unwrap();

        for (id, read, scroll) in [(v1.id, 10, 50), (v2.id, 11, 51)] {
            repo.update_view_progress(
                id,
                ViewProgress {
                    read_time: Some(read),
                    scroll_depth: Some(scroll),
                },
            )
            .await
            .unwrap();
        }

        let stats = repo.article_stats(article.id).await.unwrap();
        assert_eq!(stats.views, 3);
        assert_eq!(stats.unique_visitors, 2);
        // (10 + 11 + 0) / 3 = 7.0, (50 + 51 + 0) / 3 = 33.67
        assert_eq!(stats.avg_read_time, 7);
        assert_eq!(stats.avg_scroll_depth, 34);
    }

    #[tokio::test]
    async fn test_article_stats_without_views_is_zero() {
        let repo = LocalRepository::new();
        let article = repo.create_article(published("A", "a", 1)).await.unwrap();
        assert_eq!(
            repo.article_stats(article.id).await.unwrap(),
            ArticleStats::default()
        );
    }

    #[tokio::test]
    async fn test_popular_articles_tie_break() {
        let repo = LocalRepository::new();
        let old = repo.create_article(published("Old", "old", 10)).await.unwrap();
        let new = repo.create_article(published("New", "new", 1)).await.unwrap();
        let hot = repo.create_article(published("Hot", "hot", 20)).await.unwrap();
        repo.create_article(draft("Draft", "draft")).await.unwrap();

        for _ in 0..3 {
            repo.record_view(view(hot.id, "v")).await.unwrap();
        }
        repo.record_view(view(old.id, "v")).await.unwrap();
        repo.record_view(view(new.id, "v")).await.unwrap();

        let ids: Vec<ArticleId> = repo
            .popular_articles(10)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec![hot.id, new.id, old.id]);
    }

    #[tokio::test]
    async fn test_list_published_filters() {
        let repo = LocalRepository::new();
        let tag = repo
            .create_tag(NewTag {
                name: "IA".into(),
                slug: "ia".into(),
            })
            .await
            .unwrap();
        let first = repo
            .create_article(published("Maintenance prédictive", "maintenance", 2))
            .await
            .unwrap();
        repo.create_article(published("Flotte électrique", "flotte", 1))
            .await
            .unwrap();
        repo.create_article(draft("Maintenance brouillon", "brouillon"))
            .await
            .unwrap();
        repo.set_article_tags(first.id, &[tag.id]).await.unwrap();

        let search = ArticleQuery {
            search: Some("MAINTENANCE".into()),
            ..Default::default()
        };
        let found = repo.list_published_articles(&search).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, first.id);

        let by_tag = ArticleQuery {
            tag_id: Some(tag.id),
            ..Default::default()
        };
        assert_eq!(repo.list_published_articles(&by_tag).await.unwrap().len(), 1);

        let all = repo
            .list_published_articles(&ArticleQuery::default())
            .await
            .unwrap();
        assert_eq!(all[0].slug, "flotte");
    }

    #[tokio::test]
    async fn test_delete_article_cascades() {
        let repo = LocalRepository::new();
        let tag = repo
            .create_tag(NewTag {
                name: "IA".into(),
                slug: "ia".into(),
            })
            .await
            .unwrap();
        let article = repo.create_article(published("A", "a", 1)).await.unwrap();
        repo.set_article_tags(article.id, &[tag.id]).await.unwrap();
        repo.record_view(view(article.id, "v1")).await.unwrap();
        repo.toggle_like(article.id, "v1", None).await.unwrap();

        assert!(repo.delete_article(article.id).await.unwrap());
        assert_eq!(repo.view_row_count(article.id), 0);
        assert_eq!(repo.like_row_count(article.id), 0);
        assert!(repo.list_articles_by_tag(tag.id).await.unwrap().is_empty());
        assert!(!repo.delete_article(article.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_tag_removes_links() {
        let repo = LocalRepository::new();
        let tag = repo
            .create_tag(NewTag {
                name: "IA".into(),
                slug: "ia".into(),
            })
            .await
            .unwrap();
        let article = repo.create_article(published("A", "a", 1)).await.unwrap();
        repo.set_article_tags(article.id, &[tag.id]).await.unwrap();

        assert!(repo.delete_tag(tag.id).await.unwrap());
        assert!(repo.get_article_tags(article.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resubscribe_reactivates_row() {
        let repo = LocalRepository::new();
        let first = repo.subscribe("a@example.com", Some("A")).await.unwrap();
        assert!(repo.unsubscribe("a@example.com").await.unwrap());
        assert_eq!(repo.count_active_subscribers().await.unwrap(), 0);

        let again = repo.subscribe("a@example.com", None).await.unwrap();
        assert_eq!(again.id, first.id);
        assert!(again.is_active);
        assert!(again.unsubscribed_at.is_none());
        assert_eq!(repo.list_subscribers(false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_user_updates_in_place() {
        let repo = LocalRepository::new();
        let created = repo
            .upsert_user(UpsertUser {
                open_id: "oid".into(),
                name: Some("Ada".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(created.role, UserRole::User);

        let updated = repo
            .upsert_user(UpsertUser {
                open_id: "oid".into(),
                role: Some(UserRole::Admin),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name.as_deref(), Some("Ada"));
        assert!(updated.is_admin());
    }

    #[tokio::test]
    async fn test_unhealthy_repository_returns_connection_error() {
        let repo = LocalRepository::new();
        repo.set_healthy(false);
        assert!(!repo.health_check().await.unwrap());

        let result = repo.list_categories().await;
        assert!(matches!(result, Err(ref e) if e.is_unavailable()));
    }
}
