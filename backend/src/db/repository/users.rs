//! User repository trait.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::api::{UpsertUser, User, UserId};

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user or update the one sharing `open_id`.
    ///
    /// Only the `Some` fields of `user` are written on update;
    /// `last_signed_in` defaults to now.
    async fn upsert_user(&self, user: UpsertUser) -> RepositoryResult<User>;

    async fn get_user(&self, user_id: UserId) -> RepositoryResult<Option<User>>;

    async fn get_user_by_open_id(&self, open_id: &str) -> RepositoryResult<Option<User>>;
}
