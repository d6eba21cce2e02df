use chrono::{DateTime, Utc};
use diesel::prelude::*;
use std::str::FromStr;

use super::schema::{
    article_likes, article_views, articles, categories, contact_messages,
    newsletter_subscribers, tags, users,
};
use crate::api::*;
use crate::db::repository::{ErrorContext, RepositoryError, RepositoryResult};

/// Parse a text-backed enum column, reporting the table and raw value on failure.
fn parse_column<T: FromStr<Err = String>>(raw: &str, entity: &str) -> RepositoryResult<T> {
    raw.parse::<T>().map_err(|e| {
        RepositoryError::internal_with_context(
            e,
            ErrorContext::new("decode_row")
                .with_entity(entity)
                .with_details(format!("value={}", raw)),
        )
    })
}

// ==================== Users ====================

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserRow {
    pub id: i64,
    pub open_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub login_method: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_signed_in: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> RepositoryResult<Self> {
        Ok(User {
            id: UserId(row.id),
            role: parse_column(&row.role, "user")?,
            open_id: row.open_id,
            name: row.name,
            email: row.email,
            login_method: row.login_method,
            created_at: row.created_at,
            updated_at: row.updated_at,
            last_signed_in: row.last_signed_in,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub struct NewUserRow {
    pub open_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub login_method: Option<String>,
    pub role: String,
    pub last_signed_in: DateTime<Utc>,
}

/// Update half of the user upsert. `None` fields are left untouched.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = users)]
pub struct UserChangeset {
    pub name: Option<String>,
    pub email: Option<String>,
    pub login_method: Option<String>,
    pub role: Option<String>,
    pub last_signed_in: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==================== Taxonomy ====================

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = categories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CategoryRow {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: CategoryId(row.id),
            name: row.name,
            slug: row.slug,
            description: row.description,
            icon: row.icon,
            color: row.color,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = categories)]
pub struct NewCategoryRow {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
}

impl From<NewCategory> for NewCategoryRow {
    fn from(c: NewCategory) -> Self {
        Self {
            name: c.name,
            slug: c.slug,
            description: c.description,
            icon: c.icon,
            color: c.color,
        }
    }
}

#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = categories)]
pub struct CategoryChangeset {
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
}

impl CategoryChangeset {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.icon.is_none()
            && self.color.is_none()
    }
}

impl From<CategoryUpdate> for CategoryChangeset {
    fn from(u: CategoryUpdate) -> Self {
        Self {
            name: u.name,
            description: u.description,
            icon: u.icon,
            color: u.color,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tags)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TagRow {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

impl From<TagRow> for Tag {
    fn from(row: TagRow) -> Self {
        Tag {
            id: TagId(row.id),
            name: row.name,
            slug: row.slug,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = tags)]
pub struct NewTagRow {
    pub name: String,
    pub slug: String,
}

// ==================== Articles ====================

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = articles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ArticleRow {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub cover_image: Option<String>,
    pub category_id: i64,
    pub author_id: i64,
    pub status: String,
    pub featured: bool,
    pub read_time: i32,
    pub view_count: i64,
    pub like_count: i64,
    pub published_at: Option<DateTime<Utc>>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ArticleRow> for Article {
    type Error = RepositoryError;

    fn try_from(row: ArticleRow) -> RepositoryResult<Self> {
        Ok(Article {
            id: ArticleId(row.id),
            status: parse_column(&row.status, "article")?,
            title: row.title,
            slug: row.slug,
            excerpt: row.excerpt,
            content: row.content,
            cover_image: row.cover_image,
            category_id: CategoryId(row.category_id),
            author_id: UserId(row.author_id),
            featured: row.featured,
            read_time: row.read_time,
            view_count: row.view_count,
            like_count: row.like_count,
            published_at: row.published_at,
            scheduled_at: row.scheduled_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub fn rows_to_articles(rows: Vec<ArticleRow>) -> RepositoryResult<Vec<Article>> {
    rows.into_iter().map(Article::try_from).collect()
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = articles)]
pub struct NewArticleRow {
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub cover_image: Option<String>,
    pub category_id: i64,
    pub author_id: i64,
    pub status: String,
    pub featured: bool,
    pub read_time: i32,
    pub published_at: Option<DateTime<Utc>>,
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl From<NewArticle> for NewArticleRow {
    fn from(a: NewArticle) -> Self {
        Self {
            title: a.title,
            slug: a.slug,
            excerpt: a.excerpt,
            content: a.content,
            cover_image: a.cover_image,
            category_id: a.category_id.0,
            author_id: a.author_id.0,
            status: a.status.as_str().to_string(),
            featured: a.featured,
            read_time: a.read_time,
            published_at: a.published_at,
            scheduled_at: a.scheduled_at,
        }
    }
}

/// `updated_at` is always set, so the changeset is never empty.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = articles)]
pub struct ArticleChangeset {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub cover_image: Option<String>,
    pub category_id: Option<i64>,
    pub status: Option<String>,
    pub featured: Option<bool>,
    pub read_time: Option<i32>,
    pub published_at: Option<DateTime<Utc>>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl From<ArticleUpdate> for ArticleChangeset {
    fn from(u: ArticleUpdate) -> Self {
        Self {
            title: u.title,
            slug: u.slug,
            excerpt: u.excerpt,
            content: u.content,
            cover_image: u.cover_image,
            category_id: u.category_id.map(|c| c.0),
            status: u.status.map(|s| s.as_str().to_string()),
            featured: u.featured,
            read_time: u.read_time,
            published_at: u.published_at,
            scheduled_at: u.scheduled_at,
            updated_at: Utc::now(),
        }
    }
}

// ==================== Audience ====================

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = newsletter_subscribers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SubscriberRow {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    pub is_active: bool,
    pub subscribed_at: DateTime<Utc>,
    pub unsubscribed_at: Option<DateTime<Utc>>,
}

impl From<SubscriberRow> for NewsletterSubscriber {
    fn from(row: SubscriberRow) -> Self {
        NewsletterSubscriber {
            id: SubscriberId(row.id),
            email: row.email,
            name: row.name,
            is_active: row.is_active,
            subscribed_at: row.subscribed_at,
            unsubscribed_at: row.unsubscribed_at,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = newsletter_subscribers)]
pub struct NewSubscriberRow {
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = contact_messages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ContactMessageRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub kind: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ContactMessageRow> for ContactMessage {
    type Error = RepositoryError;

    fn try_from(row: ContactMessageRow) -> RepositoryResult<Self> {
        Ok(ContactMessage {
            id: ContactMessageId(row.id),
            kind: parse_column(&row.kind, "contact_message")?,
            status: parse_column(&row.status, "contact_message")?,
            name: row.name,
            email: row.email,
            subject: row.subject,
            message: row.message,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = contact_messages)]
pub struct NewContactMessageRow {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub kind: String,
}

impl From<NewContactMessage> for NewContactMessageRow {
    fn from(m: NewContactMessage) -> Self {
        Self {
            name: m.name,
            email: m.email,
            subject: m.subject,
            message: m.message,
            kind: m.kind.as_str().to_string(),
        }
    }
}

// ==================== Analytics ====================

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = article_views)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ArticleViewRow {
    pub id: i64,
    pub article_id: i64,
    pub visitor_id: String,
    pub user_id: Option<i64>,
    pub ip_hash: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    pub read_time: i32,
    pub scroll_depth: i32,
    pub viewed_at: DateTime<Utc>,
}

impl From<ArticleViewRow> for ArticleView {
    fn from(row: ArticleViewRow) -> Self {
        ArticleView {
            id: ViewId(row.id),
            article_id: ArticleId(row.article_id),
            visitor_id: row.visitor_id,
            user_id: row.user_id.map(UserId),
            ip_hash: row.ip_hash,
            user_agent: row.user_agent,
            referrer: row.referrer,
            read_time: row.read_time,
            scroll_depth: row.scroll_depth,
            viewed_at: row.viewed_at,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = article_views)]
pub struct NewArticleViewRow {
    pub article_id: i64,
    pub visitor_id: String,
    pub user_id: Option<i64>,
    pub ip_hash: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
}

impl From<NewArticleView> for NewArticleViewRow {
    fn from(v: NewArticleView) -> Self {
        Self {
            article_id: v.article_id.0,
            visitor_id: v.visitor_id,
            user_id: v.user_id.map(|u| u.0),
            ip_hash: v.ip_hash,
            user_agent: v.user_agent,
            referrer: v.referrer,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = article_likes)]
pub struct NewArticleLikeRow {
    pub article_id: i64,
    pub visitor_id: String,
    pub user_id: Option<i64>,
}

/// Cross-table aggregates read through a single raw query.
#[derive(Debug, Clone, QueryableByName)]
pub struct SiteStatsRow {
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub total_views: i64,
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub total_likes: i64,
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub published_articles: i64,
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub active_subscribers: i64,
}

impl From<SiteStatsRow> for SiteStats {
    fn from(row: SiteStatsRow) -> Self {
        SiteStats {
            total_views: row.total_views,
            total_likes: row.total_likes,
            published_articles: row.published_articles,
            active_subscribers: row.active_subscribers,
        }
    }
}
