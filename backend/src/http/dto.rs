//! Data Transfer Objects for HTTP API.
//!
//! Domain records from [`crate::api`] are already serde-ready; this module
//! only adds the query strings, small request bodies and acknowledgements
//! specific to the HTTP surface.

use serde::{Deserialize, Serialize};

use crate::api::{Article, ArticleId, ArticleStatus, ContactStatus, ViewId};
use crate::content::excerpt_or_fallback;

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
}

/// `{ success: true, message? }` acknowledgement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminArticlesQuery {
    pub status: Option<ArticleStatus>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribersQuery {
    #[serde(default = "default_true")]
    pub active_only: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeQuery {
    pub article_id: ArticleId,
    pub visitor_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscribeRequest {
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnsubscribeRequest {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactStatusRequest {
    pub status: ContactStatus,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleLikeRequest {
    pub article_id: ArticleId,
    pub visitor_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordViewResponse {
    pub success: bool,
    /// Id to send progress updates against.
    pub view_id: ViewId,
}

/// Entry of the JSON feed backing the RSS page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub title: String,
    pub slug: String,
    pub excerpt: String,
}

impl From<&Article> for FeedItem {
    fn from(article: &Article) -> Self {
        Self {
            title: article.title.clone(),
            slug: article.slug.clone(),
            excerpt: excerpt_or_fallback(article),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedResponse {
    pub articles: Vec<FeedItem>,
}

/// Answer of the automation endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomatedArticleResponse {
    pub success: bool,
    pub article: Article,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribers_query_defaults_to_active_only() {
        let query: SubscribersQuery = serde_json::from_str("{}").unwrap();
        assert!(query.active_only);
        let query: SubscribersQuery = serde_json::from_str(r#"{"activeOnly":false}"#).unwrap();
        assert!(!query.active_only);
    }

    #[test]
    fn test_success_response_omits_empty_message() {
        let json = serde_json::to_string(&SuccessResponse::ok()).unwrap();
        assert_eq!(json, r#"{"success":true}"#);
    }
}
