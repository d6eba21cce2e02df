//! Article repository trait.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::api::{
    Article, ArticleId, ArticleQuery, ArticleStatus, ArticleUpdate, NewArticle, Tag, TagId,
};

/// Repository trait for articles and their tag links.
///
/// Public listings only ever return published articles. Admin listings
/// see every status.
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    /// Check that the underlying store answers.
    async fn health_check(&self) -> RepositoryResult<bool>;

    /// Insert an article with zeroed counters.
    ///
    /// # Returns
    /// * `Ok(Article)` - The stored article with its assigned id
    /// * `Err(RepositoryError::Conflict)` - If the slug is already taken
    async fn create_article(&self, article: NewArticle) -> RepositoryResult<Article>;

    /// Apply a partial update and bump `updated_at`.
    ///
    /// # Returns
    /// * `Err(RepositoryError::NotFound)` - If the article does not exist
    /// * `Err(RepositoryError::Conflict)` - If a new slug collides
    async fn update_article(
        &self,
        article_id: ArticleId,
        update: ArticleUpdate,
    ) -> RepositoryResult<Article>;

    /// Delete an article together with its tag links, views and likes.
    ///
    /// Returns `true` if a row was removed.
    async fn delete_article(&self, article_id: ArticleId) -> RepositoryResult<bool>;

    async fn get_article(&self, article_id: ArticleId) -> RepositoryResult<Option<Article>>;

    async fn get_article_by_slug(&self, slug: &str) -> RepositoryResult<Option<Article>>;

    /// Published articles matching `query`, newest `published_at` first.
    ///
    /// `limit`/`offset` are applied as given; bounds are enforced by the service layer.
    async fn list_published_articles(&self, query: &ArticleQuery)
        -> RepositoryResult<Vec<Article>>;

    /// Published and featured articles, newest first.
    async fn list_featured_articles(&self, limit: i64) -> RepositoryResult<Vec<Article>>;

    /// Every article (optionally filtered by status), newest `created_at` first.
    async fn list_all_articles(
        &self,
        status: Option<ArticleStatus>,
    ) -> RepositoryResult<Vec<Article>>;

    /// Published articles linked to a tag, newest first.
    async fn list_articles_by_tag(&self, tag_id: TagId) -> RepositoryResult<Vec<Article>>;

    /// Replace the full tag set of an article.
    async fn set_article_tags(
        &self,
        article_id: ArticleId,
        tag_ids: &[TagId],
    ) -> RepositoryResult<()>;

    /// Tags linked to an article.
    async fn get_article_tags(&self, article_id: ArticleId) -> RepositoryResult<Vec<Tag>>;
}
