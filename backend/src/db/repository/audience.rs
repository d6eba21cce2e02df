//! Newsletter and contact-form repository trait.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::api::{
    ContactMessage, ContactMessageId, ContactStatus, NewContactMessage, NewsletterSubscriber,
};

#[async_trait]
pub trait AudienceRepository: Send + Sync {
    // ==================== Newsletter ====================

    /// Subscribe an email address.
    ///
    /// An existing inactive subscriber is reactivated (`unsubscribed_at`
    /// cleared) instead of inserting a second row. An existing active
    /// subscriber is returned unchanged.
    async fn subscribe(
        &self,
        email: &str,
        name: Option<&str>,
    ) -> RepositoryResult<NewsletterSubscriber>;

    /// Mark a subscriber inactive. Returns `false` for unknown addresses.
    async fn unsubscribe(&self, email: &str) -> RepositoryResult<bool>;

    /// Subscribers ordered by most recent subscription first.
    async fn list_subscribers(&self, active_only: bool)
        -> RepositoryResult<Vec<NewsletterSubscriber>>;

    async fn count_active_subscribers(&self) -> RepositoryResult<i64>;

    // ==================== Contact ====================

    async fn create_contact_message(
        &self,
        message: NewContactMessage,
    ) -> RepositoryResult<ContactMessage>;

    /// Messages ordered by most recent first.
    async fn list_contact_messages(&self) -> RepositoryResult<Vec<ContactMessage>>;

    async fn update_contact_status(
        &self,
        message_id: ContactMessageId,
        status: ContactStatus,
    ) -> RepositoryResult<ContactMessage>;

    /// Number of messages still in the `nouveau` state.
    async fn count_new_contact_messages(&self) -> RepositoryResult<i64>;
}
