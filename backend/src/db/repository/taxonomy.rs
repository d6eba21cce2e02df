//! Category and tag repository trait.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::api::{Category, CategoryId, CategoryUpdate, NewCategory, NewTag, Tag, TagId};

/// Reference data: categories and tags, both ordered by name when listed.
#[async_trait]
pub trait TaxonomyRepository: Send + Sync {
    async fn list_categories(&self) -> RepositoryResult<Vec<Category>>;

    async fn get_category(&self, category_id: CategoryId) -> RepositoryResult<Option<Category>>;

    async fn get_category_by_slug(&self, slug: &str) -> RepositoryResult<Option<Category>>;

    /// Fails with `Conflict` when the name or slug already exists.
    async fn create_category(&self, category: NewCategory) -> RepositoryResult<Category>;

    async fn update_category(
        &self,
        category_id: CategoryId,
        update: CategoryUpdate,
    ) -> RepositoryResult<Category>;

    async fn delete_category(&self, category_id: CategoryId) -> RepositoryResult<bool>;

    async fn list_tags(&self) -> RepositoryResult<Vec<Tag>>;

    async fn get_tag_by_slug(&self, slug: &str) -> RepositoryResult<Option<Tag>>;

    async fn get_tag_by_name(&self, name: &str) -> RepositoryResult<Option<Tag>>;

    /// Fails with `Conflict` when the name or slug already exists.
    async fn create_tag(&self, tag: NewTag) -> RepositoryResult<Tag>;

    /// Delete a tag and every article link pointing at it.
    async fn delete_tag(&self, tag_id: TagId) -> RepositoryResult<bool>;
}
