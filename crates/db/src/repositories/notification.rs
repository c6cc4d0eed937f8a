//! Notification repository.

use std::sync::Arc;

use crate::entities::{Notification, notification};
use fourcut_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Unchanged, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};

/// Notification repository for database operations.
#[derive(Clone)]
pub struct NotificationRepository {
    db: Arc<DatabaseConnection>,
}

impl NotificationRepository {
    /// Create a new notification repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a notification by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<notification::Model>> {
        Notification::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new notification.
    pub async fn create(&self, model: notification::ActiveModel) -> AppResult<notification::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get unread notifications for a user, newest first.
    pub async fn find_unread_by_user(&self, user_id: &str) -> AppResult<Vec<notification::Model>> {
        Notification::find()
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::IsRead.eq(false))
            .order_by_desc(notification::Column::CreatedAt)
            .order_by_desc(notification::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Mark a notification as read.
    pub async fn mark_as_read(&self, id: &str) -> AppResult<notification::Model> {
        let active = notification::ActiveModel {
            id: Unchanged(id.to_string()),
            is_read: Set(true),
            ..Default::default()
        };

        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count unread notifications for a user.
    pub async fn count_unread(&self, user_id: &str) -> AppResult<u64> {
        Notification::find()
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::IsRead.eq(false))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
