//! Shared fixtures for service tests.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use fourcut_common::{AppError, AppResult};
use fourcut_db::{
    entities::{
        friendship::{self, FriendshipStatus, UserPair},
        photo::{self, Visibility},
        user,
    },
    repositories::{
        InMemoryPhotoStore, InMemoryRelationshipStore, InMemoryUserDirectory, PhotoStore,
        RelationshipStoreService, UserDirectory, YieldingStore,
    },
};
use tokio::sync::Mutex;

use crate::services::notification::NotificationSink;
use crate::services::relationship::RelationshipEngine;

/// An engine over in-memory stores with three registered users:
/// `alice` (Alice), `bob` (Bob) and `carol` (Carol).
pub struct Fixture {
    pub engine: RelationshipEngine,
    /// The rows the engine writes, read without yielding
    pub store: InMemoryRelationshipStore,
    pub users: InMemoryUserDirectory,
}

impl Fixture {
    pub async fn new() -> Self {
        let store = InMemoryRelationshipStore::new();
        Self::build(Arc::new(store.clone()), store).await
    }

    /// Same users, but every store call yields to the scheduler first so
    /// concurrently awaited operations interleave.
    pub async fn yielding() -> Self {
        let store = InMemoryRelationshipStore::new();
        Self::build(Arc::new(YieldingStore::new(store.clone())), store).await
    }

    async fn build(handle: RelationshipStoreService, store: InMemoryRelationshipStore) -> Self {
        let users = InMemoryUserDirectory::new();
        for (id, nickname) in [("alice", "Alice"), ("bob", "Bob"), ("carol", "Carol")] {
            users.add_user(id, nickname).await;
        }

        let engine = RelationshipEngine::new(handle, Arc::new(users.clone()));
        Self {
            engine,
            store,
            users,
        }
    }

    /// Make `a` and `b` friends, `a` being the requester.
    pub async fn befriend(&self, a: &str, b: &str) -> friendship::Model {
        let request = self.engine.send_request(a, b).await.unwrap().value;
        self.engine.accept(&request.id, b).await.unwrap().value
    }
}

pub fn record(
    id: &str,
    requester_id: &str,
    receiver_id: &str,
    status: FriendshipStatus,
) -> friendship::Model {
    let pair = UserPair::new(requester_id, receiver_id).unwrap();
    let now = Utc::now();
    friendship::Model {
        id: id.to_string(),
        requester_id: requester_id.to_string(),
        receiver_id: receiver_id.to_string(),
        user_low_id: pair.low().to_string(),
        user_high_id: pair.high().to_string(),
        status,
        requester_close_friend: false,
        receiver_close_friend: false,
        requested_at: now.into(),
        responded_at: (status != FriendshipStatus::Pending).then(|| now.into()),
    }
}

pub fn sample_photo(id: &str, owner_id: &str, visibility: Visibility) -> photo::Model {
    photo::Model {
        id: id.to_string(),
        owner_id: owner_id.to_string(),
        url: format!("/files/photos/{id}.jpg"),
        storage_key: format!("photos/{id}.jpg"),
        content_type: "image/jpeg".to_string(),
        visibility,
        created_at: Utc::now().into(),
    }
}

/// Notification sink that records what it was asked to deliver.
#[derive(Default)]
pub struct RecordingSink {
    delivered: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every delivery fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub async fn delivered(&self) -> Vec<(String, String)> {
        self.delivered.lock().await.clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn notify(&self, user_id: &str, message: &str) -> AppResult<()> {
        if self.fail {
            return Err(AppError::Internal("notification backend down".to_string()));
        }
        self.delivered
            .lock()
            .await
            .push((user_id.to_string(), message.to_string()));
        Ok(())
    }
}

/// Directory whose single-user lookups fail for the listed IDs.
pub struct FlakyDirectory {
    inner: InMemoryUserDirectory,
    broken: Vec<String>,
}

impl FlakyDirectory {
    pub fn new(inner: InMemoryUserDirectory, broken: &[&str]) -> Self {
        Self {
            inner,
            broken: broken.iter().map(ToString::to_string).collect(),
        }
    }
}

#[async_trait]
impl UserDirectory for FlakyDirectory {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<user::Model>> {
        if self.broken.iter().any(|b| b == id) {
            return Err(AppError::Database("connection reset".to_string()));
        }
        self.inner.find_by_id(id).await
    }

    async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<user::Model>> {
        self.inner.find_by_ids(ids).await
    }

    async fn search(
        &self,
        query: &str,
        excluding_user_id: &str,
        limit: u64,
    ) -> AppResult<Vec<user::Model>> {
        self.inner.search(query, excluding_user_id, limit).await
    }
}

/// Photo store that refuses every insert and delegates everything else.
pub struct RejectingPhotoStore {
    inner: InMemoryPhotoStore,
}

impl RejectingPhotoStore {
    pub const fn new(inner: InMemoryPhotoStore) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl PhotoStore for RejectingPhotoStore {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<photo::Model>> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_owner(&self, owner_id: &str) -> AppResult<Vec<photo::Model>> {
        self.inner.find_by_owner(owner_id).await
    }

    async fn create_all(&self, _photos: Vec<photo::Model>) -> AppResult<Vec<photo::Model>> {
        Err(AppError::Database("insert failed".to_string()))
    }

    async fn update_visibility(
        &self,
        id: &str,
        visibility: Visibility,
    ) -> AppResult<photo::Model> {
        self.inner.update_visibility(id, visibility).await
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        self.inner.delete(id).await
    }

    async fn count_by_storage_key(&self, storage_key: &str) -> AppResult<u64> {
        self.inner.count_by_storage_key(storage_key).await
    }
}
