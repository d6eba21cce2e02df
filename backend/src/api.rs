//! Public API surface for the blog backend.
//!
//! This file consolidates the domain records and the request/response
//! payloads shared by the repository, service and HTTP layers.
//! All types derive Serialize/Deserialize with camelCase field names,
//! which is the shape the single-page client consumes.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use crate::content::Heading;

crate::define_id_type!(i64, UserId);
crate::define_id_type!(i64, CategoryId);
crate::define_id_type!(i64, TagId);
crate::define_id_type!(i64, ArticleId);
crate::define_id_type!(i64, SubscriberId);
crate::define_id_type!(i64, ContactMessageId);
crate::define_id_type!(i64, ViewId);

/// Implements `as_str`, `Display` and `FromStr` for a fieldless enum stored
/// as text in the database.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(format!(
                        "Unknown {} value: {}",
                        stringify!($name),
                        other
                    )),
                }
            }
        }
    };
}

// =============================================================================
// Users
// =============================================================================

/// Role attached to an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

text_enum!(UserRole { User => "user", Admin => "admin" });

/// A user known through the external OAuth provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub open_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub login_method: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_signed_in: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Insert-or-update payload keyed by `open_id`.
///
/// `None` fields leave the stored value untouched on update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpsertUser {
    pub open_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub login_method: Option<String>,
    pub role: Option<UserRole>,
    pub last_signed_in: Option<DateTime<Utc>>,
}

/// Public projection of an article's author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorSummary {
    pub id: UserId,
    pub name: Option<String>,
}

// =============================================================================
// Taxonomy
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

/// Partial category update. The slug is immutable once created.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTag {
    pub name: String,
    pub slug: String,
}

// =============================================================================
// Articles
// =============================================================================

/// Editorial lifecycle of an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

text_enum!(ArticleStatus {
    Draft => "draft",
    Published => "published",
    Archived => "archived",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: ArticleId,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub cover_image: Option<String>,
    pub category_id: CategoryId,
    pub author_id: UserId,
    pub status: ArticleStatus,
    pub featured: bool,
    /// Estimated reading time in minutes.
    pub read_time: i32,
    pub view_count: i64,
    pub like_count: i64,
    pub published_at: Option<DateTime<Utc>>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Article {
    pub fn is_published(&self) -> bool {
        self.status == ArticleStatus::Published
    }
}

/// Fully resolved insert payload; defaults are applied by the service layer.
#[derive(Debug, Clone, PartialEq)]
pub struct NewArticle {
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub cover_image: Option<String>,
    pub category_id: CategoryId,
    pub author_id: UserId,
    pub status: ArticleStatus,
    pub featured: bool,
    pub read_time: i32,
    pub published_at: Option<DateTime<Utc>>,
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Partial article update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticleUpdate {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub cover_image: Option<String>,
    pub category_id: Option<CategoryId>,
    pub status: Option<ArticleStatus>,
    pub featured: Option<bool>,
    pub read_time: Option<i32>,
    pub published_at: Option<DateTime<Utc>>,
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Filters for the public article listing. Only published articles match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleQuery {
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    /// Case-insensitive substring match on the title.
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub tag_id: Option<TagId>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

/// Article with its related records, as served to the article page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleDetail {
    #[serde(flatten)]
    pub article: Article,
    pub tags: Vec<Tag>,
    pub category: Option<Category>,
    pub author: Option<AuthorSummary>,
    pub headings: Vec<Heading>,
}

// =============================================================================
// Audience: newsletter and contact
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsletterSubscriber {
    pub id: SubscriberId,
    pub email: String,
    pub name: Option<String>,
    pub is_active: bool,
    pub subscribed_at: DateTime<Utc>,
    pub unsubscribed_at: Option<DateTime<Utc>>,
}

/// Kind of message sent through the contact form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactKind {
    Avis,
    Commentaire,
    Demande,
    #[default]
    Autre,
}

text_enum!(ContactKind {
    Avis => "avis",
    Commentaire => "commentaire",
    Demande => "demande",
    Autre => "autre",
});

/// Triage state of a contact message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactStatus {
    #[default]
    Nouveau,
    Lu,
    Repondu,
    Archive,
}

text_enum!(ContactStatus {
    Nouveau => "nouveau",
    Lu => "lu",
    Repondu => "repondu",
    Archive => "archive",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    pub id: ContactMessageId,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: ContactKind,
    pub status: ContactStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContactMessage {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: ContactKind,
}

// =============================================================================
// Analytics
// =============================================================================

/// One recorded page view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleView {
    pub id: ViewId,
    pub article_id: ArticleId,
    pub visitor_id: String,
    pub user_id: Option<UserId>,
    pub ip_hash: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    /// Seconds spent on the page.
    pub read_time: i32,
    /// Maximum scroll depth reached, 0-100.
    pub scroll_depth: i32,
    pub viewed_at: DateTime<Utc>,
}

/// Insert payload for a page view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewArticleView {
    pub article_id: ArticleId,
    pub visitor_id: String,
    pub user_id: Option<UserId>,
    pub ip_hash: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
}

/// Reading progress samples sent after the initial view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewProgress {
    #[serde(default)]
    pub read_time: Option<i32>,
    #[serde(default)]
    pub scroll_depth: Option<i32>,
}

/// An active like for an (article, visitor) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleLike {
    pub id: i64,
    pub article_id: ArticleId,
    pub visitor_id: String,
    pub user_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a like toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeToggle {
    pub liked: bool,
    pub like_count: i64,
}

/// Per-article aggregates computed from the view log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleStats {
    pub views: i64,
    pub unique_visitors: i64,
    pub avg_read_time: i64,
    pub avg_scroll_depth: i64,
}

/// Cross-site aggregates for the admin dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteStats {
    pub total_views: i64,
    pub total_likes: i64,
    pub published_articles: i64,
    pub active_subscribers: i64,
}

/// Either per-article or cross-site statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Stats {
    Article(ArticleStats),
    Site(SiteStats),
}

// =============================================================================
// Requests
// =============================================================================

/// Admin article creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateArticleRequest {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    pub content: String,
    #[serde(default)]
    pub cover_image: Option<String>,
    pub category_id: CategoryId,
    #[serde(default)]
    pub status: ArticleStatus,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub read_time: Option<i32>,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tag_ids: Option<Vec<TagId>>,
}

/// Admin article update. `tag_ids`, when present, replaces the tag set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateArticleRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub status: Option<ArticleStatus>,
    #[serde(default)]
    pub featured: Option<bool>,
    #[serde(default)]
    pub read_time: Option<i32>,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tag_ids: Option<Vec<TagId>>,
}

/// Article pushed by the scheduled publishing task.
///
/// Category and tags are referenced by slug; tags that do not exist yet
/// are created.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomatedArticleRequest {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    pub content: String,
    pub category_slug: String,
    #[serde(default)]
    pub tag_slugs: Option<Vec<String>>,
    #[serde(default)]
    pub status: Option<ArticleStatus>,
    #[serde(default)]
    pub featured: Option<bool>,
    #[serde(default)]
    pub read_time: Option<i32>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub generate_cover_image: bool,
}

/// Page view reported by the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordViewRequest {
    pub article_id: ArticleId,
    pub visitor_id: String,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub referrer: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_text_round_trip() {
        for status in [
            ArticleStatus::Draft,
            ArticleStatus::Published,
            ArticleStatus::Archived,
        ] {
            assert_eq!(status.as_str().parse::<ArticleStatus>().unwrap(), status);
        }
        assert!("live".parse::<ArticleStatus>().is_err());
    }

    #[test]
    fn test_contact_message_serializes_kind_as_type() {
        let msg = NewContactMessage {
            name: "Test User".into(),
            email: "test@example.com".into(),
            subject: "Hello".into(),
            message: "This is a test message.".into(),
            kind: ContactKind::Demande,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "demande");
    }

    #[test]
    fn test_contact_kind_defaults_to_autre() {
        let msg: NewContactMessage = serde_json::from_str(
            r#"{"name":"a","email":"a@b.co","subject":"s","message":"long enough"}"#,
        )
        .unwrap();
        assert_eq!(msg.kind, ContactKind::Autre);
    }

    #[test]
    fn test_create_request_defaults() {
        let req: CreateArticleRequest = serde_json::from_str(
            r#"{"title":"T","slug":"t","content":"body","categoryId":1}"#,
        )
        .unwrap();
        assert_eq!(req.status, ArticleStatus::Draft);
        assert!(!req.featured);
        assert!(req.tag_ids.is_none());
    }

    #[test]
    fn test_article_query_uses_camel_case() {
        let q: ArticleQuery =
            serde_json::from_str(r#"{"categoryId":3,"tagId":4,"limit":10}"#).unwrap();
        assert_eq!(q.category_id, Some(CategoryId(3)));
        assert_eq!(q.tag_id, Some(TagId(4)));
        assert_eq!(q.offset, None);
    }
}
