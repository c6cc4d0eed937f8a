//! Notification service.

use std::sync::Arc;

use async_trait::async_trait;
use fourcut_common::{AppError, AppResult, IdGenerator};
use fourcut_db::{entities::notification, repositories::NotificationRepository};
use sea_orm::Set;

/// Destination for user-facing notification messages.
///
/// Callers treat delivery as best-effort: a failed `notify` is logged and
/// never undoes the action that triggered it.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver `message` to `user_id`.
    async fn notify(&self, user_id: &str, message: &str) -> AppResult<()>;
}

/// Shared handle to a notification sink.
pub type NotificationSinkService = Arc<dyn NotificationSink>;

/// Notification service for business logic.
#[derive(Clone)]
pub struct NotificationService {
    notification_repo: NotificationRepository,
    id_gen: IdGenerator,
}

impl NotificationService {
    /// Create a new notification service.
    #[must_use]
    pub const fn new(notification_repo: NotificationRepository) -> Self {
        Self {
            notification_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Store an unread notification for a user.
    pub async fn create(&self, user_id: &str, message: &str) -> AppResult<notification::Model> {
        let model = notification::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            message: Set(message.to_string()),
            is_read: Set(false),
            created_at: Set(chrono::Utc::now().into()),
        };

        self.notification_repo.create(model).await
    }

    /// Unread notifications for a user, newest first.
    pub async fn list_unread(&self, user_id: &str) -> AppResult<Vec<notification::Model>> {
        self.notification_repo.find_unread_by_user(user_id).await
    }

    /// Mark a notification as read.
    ///
    /// Fails with `NotFound` when the notification does not exist or belongs
    /// to someone else.
    pub async fn mark_as_read(
        &self,
        notification_id: &str,
        user_id: &str,
    ) -> AppResult<notification::Model> {
        let owned = self
            .notification_repo
            .find_by_id(notification_id)
            .await?
            .filter(|n| n.user_id == user_id);

        if owned.is_none() {
            return Err(AppError::NotFound("Notification not found".to_string()));
        }

        self.notification_repo.mark_as_read(notification_id).await
    }

    /// Count unread notifications for a user.
    pub async fn count_unread(&self, user_id: &str) -> AppResult<u64> {
        self.notification_repo.count_unread(user_id).await
    }
}

#[async_trait]
impl NotificationSink for NotificationService {
    async fn notify(&self, user_id: &str, message: &str) -> AppResult<()> {
        self.create(user_id, message).await?;
        Ok(())
    }
}
