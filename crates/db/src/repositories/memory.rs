//! In-memory implementations of the store and directory traits.
//!
//! These back the engine and service tests without a database. Each store
//! keeps its rows behind a single mutex, so check-then-write sequences are
//! atomic in the same way the database transaction makes them.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use fourcut_common::{AppError, AppResult};
use sea_orm::prelude::DateTimeWithTimeZone;
use tokio::sync::Mutex;

use super::friendship::{RelationshipFilter, RelationshipStore, conflict_for};
use super::photo::PhotoStore;
use super::user::UserDirectory;
use crate::entities::{
    friendship::{self, FriendshipStatus, Side, UserPair},
    photo::{self, Visibility},
    user,
};

/// Relationship store backed by a `HashMap`.
#[derive(Clone, Default)]
pub struct InMemoryRelationshipStore {
    records: Arc<Mutex<HashMap<String, friendship::Model>>>,
}

impl InMemoryRelationshipStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored record, in no particular order.
    pub async fn all(&self) -> Vec<friendship::Model> {
        self.records.lock().await.values().cloned().collect()
    }
}

#[async_trait]
impl RelationshipStore for InMemoryRelationshipStore {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<friendship::Model>> {
        Ok(self.records.lock().await.get(id).cloned())
    }

    async fn find_by_pair(&self, pair: &UserPair) -> AppResult<Option<friendship::Model>> {
        Ok(self
            .records
            .lock()
            .await
            .values()
            .find(|r| &r.pair() == pair)
            .cloned())
    }

    async fn find_all(
        &self,
        user_id: &str,
        filter: RelationshipFilter,
    ) -> AppResult<Vec<friendship::Model>> {
        let mut found: Vec<friendship::Model> = self
            .records
            .lock()
            .await
            .values()
            .filter(|r| filter.matches(r, user_id))
            .cloned()
            .collect();

        if filter.orders_by_request_time() {
            found.sort_by(|a, b| (b.requested_at, &b.id).cmp(&(a.requested_at, &a.id)));
        } else {
            found.sort_by(|a, b| (b.responded_at, &b.id).cmp(&(a.responded_at, &a.id)));
        }
        Ok(found)
    }

    async fn create_request(&self, record: friendship::Model) -> AppResult<friendship::Model> {
        let pair = record.pair();
        let mut records = self.records.lock().await;

        let existing = records
            .values()
            .find(|r| r.pair() == pair)
            .map(|r| (r.id.clone(), r.status));

        if let Some((existing_id, status)) = existing {
            if status.blocks_new_request() {
                return Err(conflict_for(status));
            }
            records.remove(&existing_id);
        }

        records.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn respond(
        &self,
        id: &str,
        receiver_id: &str,
        status: FriendshipStatus,
        responded_at: DateTimeWithTimeZone,
    ) -> AppResult<Option<friendship::Model>> {
        let mut records = self.records.lock().await;
        let Some(stored) = records
            .get_mut(id)
            .filter(|r| r.is_pending() && r.receiver_id == receiver_id)
        else {
            return Ok(None);
        };

        stored.status = status;
        stored.responded_at = Some(responded_at);
        Ok(Some(stored.clone()))
    }

    async fn flip_close_friend(
        &self,
        id: &str,
        side: Side,
    ) -> AppResult<Option<friendship::Model>> {
        let mut records = self.records.lock().await;
        let Some(stored) = records.get_mut(id).filter(|r| r.is_accepted()) else {
            return Ok(None);
        };

        match side {
            Side::Requester => stored.requester_close_friend = !stored.requester_close_friend,
            Side::Receiver => stored.receiver_close_friend = !stored.receiver_close_friend,
        }
        Ok(Some(stored.clone()))
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        self.records.lock().await.remove(id);
        Ok(())
    }
}

/// Wraps a relationship store and yields to the scheduler before every
/// call, so concurrent operations on a single-threaded runtime interleave
/// at each store access.
#[derive(Clone, Default)]
pub struct YieldingStore<S> {
    inner: S,
}

impl<S> YieldingStore<S> {
    #[must_use]
    pub const fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: RelationshipStore> RelationshipStore for YieldingStore<S> {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<friendship::Model>> {
        tokio::task::yield_now().await;
        self.inner.find_by_id(id).await
    }

    async fn find_by_pair(&self, pair: &UserPair) -> AppResult<Option<friendship::Model>> {
        tokio::task::yield_now().await;
        self.inner.find_by_pair(pair).await
    }

    async fn find_all(
        &self,
        user_id: &str,
        filter: RelationshipFilter,
    ) -> AppResult<Vec<friendship::Model>> {
        tokio::task::yield_now().await;
        self.inner.find_all(user_id, filter).await
    }

    async fn create_request(&self, record: friendship::Model) -> AppResult<friendship::Model> {
        tokio::task::yield_now().await;
        self.inner.create_request(record).await
    }

    async fn respond(
        &self,
        id: &str,
        receiver_id: &str,
        status: FriendshipStatus,
        responded_at: DateTimeWithTimeZone,
    ) -> AppResult<Option<friendship::Model>> {
        tokio::task::yield_now().await;
        self.inner.respond(id, receiver_id, status, responded_at).await
    }

    async fn flip_close_friend(
        &self,
        id: &str,
        side: Side,
    ) -> AppResult<Option<friendship::Model>> {
        tokio::task::yield_now().await;
        self.inner.flip_close_friend(id, side).await
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        tokio::task::yield_now().await;
        self.inner.delete(id).await
    }
}

/// User directory backed by a `Vec`.
#[derive(Clone, Default)]
pub struct InMemoryUserDirectory {
    users: Arc<Mutex<Vec<user::Model>>>,
}

impl InMemoryUserDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user with a generated email address and return it.
    pub async fn add_user(&self, id: &str, nickname: &str) -> user::Model {
        let model = user::Model {
            id: id.to_string(),
            email: format!("{}@example.com", nickname.to_lowercase()),
            nickname: nickname.to_string(),
            nickname_lower: nickname.to_lowercase(),
            profile_image_url: None,
            created_at: Utc::now().into(),
        };
        self.insert(model.clone()).await;
        model
    }

    /// Register a fully specified user.
    pub async fn insert(&self, model: user::Model) {
        self.users.lock().await.push(model);
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<user::Model>> {
        Ok(self.users.lock().await.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<user::Model>> {
        Ok(self
            .users
            .lock()
            .await
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn search(
        &self,
        query: &str,
        excluding_user_id: &str,
        limit: u64,
    ) -> AppResult<Vec<user::Model>> {
        let needle = query.to_lowercase();
        let mut found: Vec<user::Model> = self
            .users
            .lock()
            .await
            .iter()
            .filter(|u| u.id != excluding_user_id)
            .filter(|u| {
                u.nickname_lower.contains(&needle) || u.email.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();

        found.sort_by(|a, b| a.nickname_lower.cmp(&b.nickname_lower));
        found.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(found)
    }
}

/// Photo store backed by a `HashMap`.
#[derive(Clone, Default)]
pub struct InMemoryPhotoStore {
    photos: Arc<Mutex<HashMap<String, photo::Model>>>,
}

impl InMemoryPhotoStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PhotoStore for InMemoryPhotoStore {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<photo::Model>> {
        Ok(self.photos.lock().await.get(id).cloned())
    }

    async fn find_by_owner(&self, owner_id: &str) -> AppResult<Vec<photo::Model>> {
        let mut found: Vec<photo::Model> = self
            .photos
            .lock()
            .await
            .values()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| (b.created_at, &b.id).cmp(&(a.created_at, &a.id)));
        Ok(found)
    }

    async fn create_all(&self, photos: Vec<photo::Model>) -> AppResult<Vec<photo::Model>> {
        let mut stored = self.photos.lock().await;
        if photos.iter().any(|p| stored.contains_key(&p.id)) {
            return Err(AppError::Database("duplicate photo id".to_string()));
        }
        for photo in &photos {
            stored.insert(photo.id.clone(), photo.clone());
        }
        Ok(photos)
    }

    async fn update_visibility(
        &self,
        id: &str,
        visibility: Visibility,
    ) -> AppResult<photo::Model> {
        let mut photos = self.photos.lock().await;
        let stored = photos
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound("Photo not found".to_string()))?;
        stored.visibility = visibility;
        Ok(stored.clone())
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        self.photos.lock().await.remove(id);
        Ok(())
    }

    async fn count_by_storage_key(&self, storage_key: &str) -> AppResult<u64> {
        let count = self
            .photos
            .lock()
            .await
            .values()
            .filter(|p| p.storage_key == storage_key)
            .count();
        Ok(count as u64)
    }
}
