//! Analytics repository trait for view and like tracking.
//!
//! This trait owns the two denormalized counters on an article
//! (`view_count`, `like_count`) together with the log tables they
//! summarize. Implementations must apply the row mutation and the counter
//! mutation as one atomic unit so the counters always equal the row
//! counts, even under concurrent requests.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::api::{
    Article, ArticleId, ArticleStats, ArticleView, LikeToggle, NewArticleView, SiteStats,
    UserId, ViewId, ViewProgress,
};

/// Repository trait for analytics operations.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait AnalyticsRepository: Send + Sync {
    // ==================== Views ====================

    /// Append a view row and increment the article's view counter by one.
    ///
    /// Repeated views by the same visitor are recorded every time.
    ///
    /// # Arguments
    /// * `view` - The view to record
    ///
    /// # Returns
    /// * `Ok(ArticleView)` - The stored row
    /// * `Err(RepositoryError::NotFound)` - If the article does not exist
    async fn record_view(&self, view: NewArticleView) -> RepositoryResult<ArticleView>;

    /// Raise the read-time and scroll-depth samples of a recorded view.
    ///
    /// Values lower than the stored ones are ignored, so late or
    /// out-of-order patches never shrink a sample. Inputs are expected to
    /// be clamped by the caller.
    ///
    /// # Returns
    /// * `Ok(ArticleView)` - The updated row
    /// * `Err(RepositoryError::NotFound)` - If the view does not exist
    async fn update_view_progress(
        &self,
        view_id: ViewId,
        progress: ViewProgress,
    ) -> RepositoryResult<ArticleView>;

    // ==================== Likes ====================

    /// Flip the like state of an (article, visitor) pair.
    ///
    /// Deletes the like row and decrements the counter (never below zero)
    /// when the pair already liked the article; inserts the row and
    /// increments the counter otherwise. A new row records `user_id` when
    /// the visitor is signed in.
    ///
    /// # Returns
    /// * `Ok(LikeToggle)` - The new liked state and counter value
    /// * `Err(RepositoryError::NotFound)` - If the article does not exist
    async fn toggle_like(
        &self,
        article_id: ArticleId,
        visitor_id: &str,
        user_id: Option<UserId>,
    ) -> RepositoryResult<LikeToggle>;

    /// Whether a like row exists for the pair.
    async fn has_liked(&self, article_id: ArticleId, visitor_id: &str) -> RepositoryResult<bool>;

    // ==================== Aggregates ====================

    /// View-log aggregates for one article.
    ///
    /// Averages are means over all of the article's view rows, rounded to
    /// the nearest integer. An article without views yields all zeros.
    async fn article_stats(&self, article_id: ArticleId) -> RepositoryResult<ArticleStats>;

    /// Sum of view counters, sum of like counters, published article
    /// count and active subscriber count.
    async fn site_stats(&self) -> RepositoryResult<SiteStats>;

    /// Published articles by descending view counter.
    ///
    /// Equal counters are ordered by most recent `published_at`, then by
    /// ascending id.
    async fn popular_articles(&self, limit: i64) -> RepositoryResult<Vec<Article>>;
}
