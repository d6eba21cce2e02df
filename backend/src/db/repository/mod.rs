//! Repository trait definitions for database operations.
//!
//! This module provides a collection of focused repository traits that abstract
//! database operations. By splitting responsibilities across multiple traits,
//! implementations can be more focused and testable.
//!
//! # Module Organization
//!
//! - [`error`]: Error types for repository operations
//! - [`articles`]: Article CRUD, listings and article-tag links
//! - [`taxonomy`]: Categories and tags
//! - [`audience`]: Newsletter subscribers and contact messages
//! - [`analytics`]: View log, likes and denormalized counters
//! - [`users`]: Users resolved from the external OAuth provider
//!
//! # Convenience Trait Bound
//!
//! For functions that need all repository capabilities, use the [`FullRepository`] trait bound:
//!
//! ```ignore
//! async fn my_service<R: FullRepository + ?Sized>(repo: &R) -> RepositoryResult<()> {
//!     let article = repo.get_article_by_slug("hello").await?;
//!     repo.record_view(new_view).await?;
//!     Ok(())
//! }
//! ```

pub mod analytics;
pub mod articles;
pub mod audience;
pub mod error;
pub mod taxonomy;
pub mod users;

// Re-export error types
pub use error::{ErrorContext, RepositoryError, RepositoryResult};

// Re-export all traits
pub use analytics::AnalyticsRepository;
pub use articles::ArticleRepository;
pub use audience::AudienceRepository;
pub use taxonomy::TaxonomyRepository;
pub use users::UserRepository;

/// Composite trait bound for a complete repository implementation.
///
/// This trait is automatically implemented for any type that implements
/// all five repository traits.
pub trait FullRepository:
    ArticleRepository + TaxonomyRepository + AudienceRepository + AnalyticsRepository + UserRepository
{
}

// Blanket implementation: any type implementing all five traits automatically implements FullRepository
impl<T> FullRepository for T where
    T: ArticleRepository
        + TaxonomyRepository
        + AudienceRepository
        + AnalyticsRepository
        + UserRepository
{
}
