//! Photo repository.

use std::sync::Arc;

use crate::entities::{
    Photo,
    photo::{self, Visibility},
};
use async_trait::async_trait;
use fourcut_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Unchanged, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};

/// Persistence seam for photo metadata.
#[async_trait]
pub trait PhotoStore: Send + Sync {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<photo::Model>>;

    /// Photos owned by a user, newest first.
    async fn find_by_owner(&self, owner_id: &str) -> AppResult<Vec<photo::Model>>;

    /// Insert several rows as one unit: either all of them are stored or none.
    async fn create_all(&self, photos: Vec<photo::Model>) -> AppResult<Vec<photo::Model>>;

    async fn update_visibility(&self, id: &str, visibility: Visibility)
    -> AppResult<photo::Model>;

    async fn delete(&self, id: &str) -> AppResult<()>;

    /// Number of rows pointing at a blob.
    async fn count_by_storage_key(&self, storage_key: &str) -> AppResult<u64>;
}

/// Shared handle to a photo store.
pub type PhotoStoreService = Arc<dyn PhotoStore>;

/// Photo repository for database operations.
#[derive(Clone)]
pub struct PhotoRepository {
    db: Arc<DatabaseConnection>,
}

impl PhotoRepository {
    /// Create a new photo repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PhotoStore for PhotoRepository {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<photo::Model>> {
        Photo::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn find_by_owner(&self, owner_id: &str) -> AppResult<Vec<photo::Model>> {
        Photo::find()
            .filter(photo::Column::OwnerId.eq(owner_id))
            .order_by_desc(photo::Column::CreatedAt)
            .order_by_desc(photo::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn create_all(&self, photos: Vec<photo::Model>) -> AppResult<Vec<photo::Model>> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut created = Vec::with_capacity(photos.len());
        for photo in photos {
            let active = photo::ActiveModel {
                id: Set(photo.id),
                owner_id: Set(photo.owner_id),
                url: Set(photo.url),
                storage_key: Set(photo.storage_key),
                content_type: Set(photo.content_type),
                visibility: Set(photo.visibility),
                created_at: Set(photo.created_at),
            };
            created.push(
                active
                    .insert(&txn)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?,
            );
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(created)
    }

    async fn update_visibility(
        &self,
        id: &str,
        visibility: Visibility,
    ) -> AppResult<photo::Model> {
        let active = photo::ActiveModel {
            id: Unchanged(id.to_string()),
            visibility: Set(visibility),
            ..Default::default()
        };

        active.update(self.db.as_ref()).await.map_err(|e| match e {
            DbErr::RecordNotUpdated => AppError::NotFound("Photo not found".to_string()),
            other => AppError::Database(other.to_string()),
        })
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        Photo::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn count_by_storage_key(&self, storage_key: &str) -> AppResult<u64> {
        Photo::find()
            .filter(photo::Column::StorageKey.eq(storage_key))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
