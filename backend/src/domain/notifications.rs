//! Notification use-cases: listing an inbox and marking entries read.

use std::sync::Arc;

use async_trait::async_trait;

use super::error::Error;
use super::notification::{Notification, NotificationId};
use super::ports::ForumStore;
use super::user::UserId;

/// Driving port for notification operations.
#[async_trait]
pub trait NotificationsApi: Send + Sync {
    /// The recipient's notifications, newest first.
    async fn list(&self, recipient: &UserId) -> Result<Vec<Notification>, Error>;

    /// Mark notifications read. `ids` of `None` (or an empty list) marks every
    /// unread notification; otherwise only the listed ones that belong to the
    /// recipient and are still unread. Returns how many changed.
    async fn mark_read(
        &self,
        recipient: &UserId,
        ids: Option<Vec<NotificationId>>,
    ) -> Result<usize, Error>;
}

/// [`NotificationsApi`] implementation over a [`ForumStore`].
#[derive(Clone)]
pub struct NotificationsService<S> {
    store: Arc<S>,
}

impl<S> NotificationsService<S> {
    /// Create the service with its backing store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S> NotificationsApi for NotificationsService<S>
where
    S: ForumStore,
{
    async fn list(&self, recipient: &UserId) -> Result<Vec<Notification>, Error> {
        let mut notifications = self.store.notifications_for_recipient(recipient).await?;
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    async fn mark_read(
        &self,
        recipient: &UserId,
        ids: Option<Vec<NotificationId>>,
    ) -> Result<usize, Error> {
        // An explicit empty list means the same as no list: mark everything.
        let ids = ids.filter(|ids| !ids.is_empty());
        let changed = self
            .store
            .mark_notifications_read(recipient, ids.as_deref())
            .await?;
        Ok(changed)
    }
}

#[cfg(test)]
#[path = "notifications_tests.rs"]
mod tests;
