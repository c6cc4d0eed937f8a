//! Friendship service.
//!
//! Runs relationship transitions and then delivers the notices they produced.

use crate::services::notification::NotificationSinkService;
use crate::services::relationship::{
    FriendRequestSummary, FriendSummary, Notice, RelationshipEngine, Transition, UserSearchResult,
};
use fourcut_common::AppResult;
use fourcut_db::entities::friendship;

/// Friendship service for business logic.
#[derive(Clone)]
pub struct FriendshipService {
    engine: RelationshipEngine,
    notifier: Option<NotificationSinkService>,
}

impl FriendshipService {
    /// Create a new friendship service without notification delivery.
    #[must_use]
    pub const fn new(engine: RelationshipEngine) -> Self {
        Self {
            engine,
            notifier: None,
        }
    }

    /// Create a new friendship service that delivers notices to `notifier`.
    #[must_use]
    pub const fn with_notifier(engine: RelationshipEngine, notifier: NotificationSinkService) -> Self {
        Self {
            engine,
            notifier: Some(notifier),
        }
    }

    /// Set the notification sink.
    pub fn set_notifier(&mut self, notifier: NotificationSinkService) {
        self.notifier = Some(notifier);
    }

    /// The underlying engine.
    #[must_use]
    pub const fn engine(&self) -> &RelationshipEngine {
        &self.engine
    }

    /// Send a friend request and notify the receiver.
    pub async fn send_request(
        &self,
        requester_id: &str,
        receiver_id: &str,
    ) -> AppResult<friendship::Model> {
        let transition = self.engine.send_request(requester_id, receiver_id).await?;
        Ok(self.complete(transition).await)
    }

    /// Accept a friend request and notify both parties.
    pub async fn accept(&self, request_id: &str, user_id: &str) -> AppResult<friendship::Model> {
        let transition = self.engine.accept(request_id, user_id).await?;
        Ok(self.complete(transition).await)
    }

    /// Decline a friend request.
    pub async fn decline(&self, request_id: &str, user_id: &str) -> AppResult<()> {
        self.engine.decline(request_id, user_id).await?;
        Ok(())
    }

    /// Cancel a friend request the user sent.
    pub async fn cancel(&self, request_id: &str, user_id: &str) -> AppResult<()> {
        self.engine.cancel(request_id, user_id).await
    }

    /// Remove a friend.
    pub async fn remove(&self, user_id: &str, friend_id: &str) -> AppResult<()> {
        self.engine.remove(user_id, friend_id).await
    }

    /// Toggle the close-friend mark and return the new value.
    pub async fn toggle_close_friend(&self, user_id: &str, friend_id: &str) -> AppResult<bool> {
        self.engine.toggle_close_friend(user_id, friend_id).await
    }

    pub async fn list_friends(&self, user_id: &str) -> AppResult<Vec<FriendSummary>> {
        self.engine.list_friends(user_id).await
    }

    pub async fn list_close_friends(&self, user_id: &str) -> AppResult<Vec<FriendSummary>> {
        self.engine.list_close_friends(user_id).await
    }

    pub async fn list_pending_received(
        &self,
        user_id: &str,
    ) -> AppResult<Vec<FriendRequestSummary>> {
        self.engine.list_pending_received(user_id).await
    }

    pub async fn list_pending_sent(&self, user_id: &str) -> AppResult<Vec<FriendRequestSummary>> {
        self.engine.list_pending_sent(user_id).await
    }

    /// Search users and annotate each hit with its relationship to the caller.
    pub async fn search(&self, query: &str, user_id: &str) -> AppResult<Vec<UserSearchResult>> {
        self.engine.search(query, user_id).await
    }

    async fn complete<T>(&self, transition: Transition<T>) -> T {
        self.dispatch(transition.notices).await;
        transition.value
    }

    async fn dispatch(&self, notices: Vec<Notice>) {
        let Some(ref notifier) = self.notifier else {
            return;
        };
        for notice in notices {
            if let Err(e) = notifier.notify(&notice.user_id, &notice.message).await {
                tracing::warn!(
                    error = %e,
                    user_id = %notice.user_id,
                    "Failed to deliver friendship notification"
                );
            }
        }
    }
}
