//! Relationship engine.
//!
//! All mutations of friendship records go through [`RelationshipEngine`].
//! Operations that should notify someone return a [`Transition`] carrying
//! the notices instead of sending them; the caller dispatches them once the
//! store write has completed.

use std::collections::HashMap;

use chrono::Utc;
use fourcut_common::{AppError, AppResult, IdGenerator};
use fourcut_db::{
    entities::{
        friendship::{self, FriendshipStatus, UserPair},
        user,
    },
    repositories::{
        RelationshipFilter, RelationshipStoreService, UserDirectoryService,
        friendship::conflict_for,
    },
};
use futures::future::join_all;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::Serialize;

/// Default number of users returned by [`RelationshipEngine::search`].
pub const DEFAULT_SEARCH_LIMIT: u64 = 50;

/// A message to deliver to one user after a transition commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Recipient
    pub user_id: String,
    /// Rendered notification text
    pub message: String,
}

impl Notice {
    fn new(user_id: impl Into<String>, message: String) -> Self {
        Self {
            user_id: user_id.into(),
            message,
        }
    }
}

/// Result of a state change plus the notices it produced.
#[derive(Debug, Clone)]
pub struct Transition<T> {
    /// The stored state after the change
    pub value: T,
    /// Messages to dispatch, in order
    pub notices: Vec<Notice>,
}

/// Display fields of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    /// Display name
    pub nickname: String,
    /// Absent when the user never set an avatar
    pub profile_image_url: Option<String>,
}

impl From<&user::Model> for UserSummary {
    fn from(user: &user::Model) -> Self {
        Self {
            id: user.id.clone(),
            nickname: user.nickname.clone(),
            profile_image_url: user.profile_image_url.clone(),
        }
    }
}

/// A friend, annotated with whether the listing user marked them as close.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendSummary {
    #[serde(flatten)]
    pub user: UserSummary,
    /// Whether the listing user marked this friend as close
    pub is_close_friend: bool,
}

/// A pending request, seen from one side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequestSummary {
    /// ID of the friendship record
    pub id: String,
    /// The other party
    pub user: UserSummary,
    /// When the request was sent
    pub requested_at: DateTimeWithTimeZone,
}

/// Relationship flags between a searching user and a candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipStatus {
    /// An accepted record exists
    pub is_friend: bool,
    /// The viewer sent a request that is still pending
    pub has_sent_request: bool,
    /// The candidate sent the viewer a request that is still pending
    pub has_received_request: bool,
}

impl RelationshipStatus {
    /// Derive the flags from the pair's record, seen from `viewer_id`.
    #[must_use]
    pub fn from_record(record: Option<&friendship::Model>, viewer_id: &str) -> Self {
        match record {
            Some(r) if r.is_accepted() => Self {
                is_friend: true,
                ..Self::default()
            },
            Some(r) if r.is_pending() => Self {
                is_friend: false,
                has_sent_request: r.requester_id == viewer_id,
                has_received_request: r.receiver_id == viewer_id,
            },
            _ => Self::default(),
        }
    }
}

/// A search hit with its relationship flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSearchResult {
    /// The candidate
    #[serde(flatten)]
    pub user: UserSummary,
    /// The candidate's relationship to the searching user
    #[serde(flatten)]
    pub status: RelationshipStatus,
}

fn request_not_found() -> AppError {
    AppError::NotFound("Friend request not found".to_string())
}

fn friendship_not_found() -> AppError {
    AppError::NotFound("Friendship not found".to_string())
}

/// Friendship state machine over a [`RelationshipStore`](fourcut_db::repositories::RelationshipStore).
#[derive(Clone)]
pub struct RelationshipEngine {
    store: RelationshipStoreService,
    users: UserDirectoryService,
    id_gen: IdGenerator,
    search_limit: u64,
}

impl RelationshipEngine {
    /// Create a new relationship engine.
    #[must_use]
    pub fn new(store: RelationshipStoreService, users: UserDirectoryService) -> Self {
        Self {
            store,
            users,
            id_gen: IdGenerator::new(),
            search_limit: DEFAULT_SEARCH_LIMIT,
        }
    }

    /// Override the maximum number of search results.
    #[must_use]
    pub const fn with_search_limit(mut self, search_limit: u64) -> Self {
        self.search_limit = search_limit;
        self
    }

    /// Send a friend request from `requester_id` to `receiver_id`.
    pub async fn send_request(
        &self,
        requester_id: &str,
        receiver_id: &str,
    ) -> AppResult<Transition<friendship::Model>> {
        let pair = UserPair::new(requester_id, receiver_id).ok_or_else(|| {
            AppError::InvalidOperation("Cannot send a friend request to yourself".to_string())
        })?;

        if self.users.find_by_id(receiver_id).await?.is_none() {
            return Err(AppError::UserNotFound(receiver_id.to_string()));
        }

        // Fast path; the store re-checks atomically
        if let Some(existing) = self.store.find_by_pair(&pair).await? {
            if existing.status.blocks_new_request() {
                return Err(conflict_for(existing.status));
            }
        }

        let requester = self.nickname_of(requester_id, "Someone").await;

        let record = friendship::Model {
            id: self.id_gen.generate(),
            requester_id: requester_id.to_string(),
            receiver_id: receiver_id.to_string(),
            user_low_id: pair.low().to_string(),
            user_high_id: pair.high().to_string(),
            status: FriendshipStatus::Pending,
            requester_close_friend: false,
            receiver_close_friend: false,
            requested_at: Utc::now().into(),
            responded_at: None,
        };
        let created = self.store.create_request(record).await?;

        let notices = vec![Notice::new(
            receiver_id,
            format!("{requester} sent you a friend request."),
        )];

        tracing::debug!(
            friendship_id = %created.id,
            requester_id = %requester_id,
            receiver_id = %receiver_id,
            "Friend request sent"
        );

        Ok(Transition {
            value: created,
            notices,
        })
    }

    /// Accept a pending request addressed to `acting_user_id`.
    pub async fn accept(
        &self,
        request_id: &str,
        acting_user_id: &str,
    ) -> AppResult<Transition<friendship::Model>> {
        let record = self.pending_received(request_id, acting_user_id).await?;
        let requester = self.nickname_of(&record.requester_id, "your friend").await;
        let receiver = self.nickname_of(&record.receiver_id, "your friend").await;

        // Only succeeds if the record is still pending
        let saved = self
            .store
            .respond(
                &record.id,
                acting_user_id,
                FriendshipStatus::Accepted,
                Utc::now().into(),
            )
            .await?
            .ok_or_else(request_not_found)?;

        let notices = vec![
            Notice::new(
                saved.requester_id.clone(),
                format!("You are now friends with {receiver}."),
            ),
            Notice::new(
                saved.receiver_id.clone(),
                format!("You are now friends with {requester}."),
            ),
        ];

        tracing::debug!(friendship_id = %saved.id, "Friend request accepted");

        Ok(Transition {
            value: saved,
            notices,
        })
    }

    /// Decline a pending request addressed to `acting_user_id`.
    pub async fn decline(
        &self,
        request_id: &str,
        acting_user_id: &str,
    ) -> AppResult<friendship::Model> {
        let saved = self
            .store
            .respond(
                request_id,
                acting_user_id,
                FriendshipStatus::Rejected,
                Utc::now().into(),
            )
            .await?
            .ok_or_else(request_not_found)?;

        tracing::debug!(friendship_id = %saved.id, "Friend request declined");
        Ok(saved)
    }

    /// Withdraw a pending request sent by `acting_user_id`.
    pub async fn cancel(&self, request_id: &str, acting_user_id: &str) -> AppResult<()> {
        let record = self
            .store
            .find_by_id(request_id)
            .await?
            .filter(|r| r.is_pending() && r.requester_id == acting_user_id)
            .ok_or_else(request_not_found)?;

        self.store.delete(&record.id).await?;

        tracing::debug!(friendship_id = %record.id, "Friend request cancelled");
        Ok(())
    }

    /// End the friendship between `user_id` and `friend_id`.
    ///
    /// Deleting the record also discards both close-friend flags.
    pub async fn remove(&self, user_id: &str, friend_id: &str) -> AppResult<()> {
        let record = self
            .friendship_between(user_id, friend_id)
            .await?
            .ok_or_else(friendship_not_found)?;

        self.store.delete(&record.id).await?;

        tracing::debug!(friendship_id = %record.id, "Friendship removed");
        Ok(())
    }

    /// Flip `user_id`'s close-friend mark on `friend_id` and return the new value.
    pub async fn toggle_close_friend(&self, user_id: &str, friend_id: &str) -> AppResult<bool> {
        let record = self
            .friendship_between(user_id, friend_id)
            .await?
            .ok_or_else(friendship_not_found)?;
        let side = record.side_of(user_id).ok_or_else(friendship_not_found)?;

        // Negates one column in place so the other user's flag is never rewritten
        let is_close_friend = self
            .store
            .flip_close_friend(&record.id, side)
            .await?
            .ok_or_else(friendship_not_found)?
            .close_friend_flag(side);

        tracing::debug!(
            user_id = %user_id,
            friend_id = %friend_id,
            is_close_friend,
            "Close friend toggled"
        );
        Ok(is_close_friend)
    }

    /// The accepted record between two users, if they are friends.
    pub async fn friendship_between(
        &self,
        a: &str,
        b: &str,
    ) -> AppResult<Option<friendship::Model>> {
        let Some(pair) = UserPair::new(a, b) else {
            return Ok(None);
        };
        Ok(self
            .store
            .find_by_pair(&pair)
            .await?
            .filter(friendship::Model::is_accepted))
    }

    /// All friends of `user_id` with the caller-relative close-friend flag.
    pub async fn list_friends(&self, user_id: &str) -> AppResult<Vec<FriendSummary>> {
        self.friend_summaries(user_id, RelationshipFilter::Friends)
            .await
    }

    /// Friends that `user_id` has marked as close.
    pub async fn list_close_friends(&self, user_id: &str) -> AppResult<Vec<FriendSummary>> {
        self.friend_summaries(user_id, RelationshipFilter::CloseFriends)
            .await
    }

    /// Pending requests addressed to `user_id`, newest first.
    pub async fn list_pending_received(
        &self,
        user_id: &str,
    ) -> AppResult<Vec<FriendRequestSummary>> {
        self.request_summaries(user_id, RelationshipFilter::PendingReceived)
            .await
    }

    /// Pending requests sent by `user_id`, newest first.
    pub async fn list_pending_sent(&self, user_id: &str) -> AppResult<Vec<FriendRequestSummary>> {
        self.request_summaries(user_id, RelationshipFilter::PendingSent)
            .await
    }

    /// Search users by nickname or email and annotate each hit with its
    /// relationship to `excluding_user_id`.
    ///
    /// Results keep the directory's order.
    pub async fn search(
        &self,
        query: &str,
        excluding_user_id: &str,
    ) -> AppResult<Vec<UserSearchResult>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::Validation("Search query is empty".to_string()));
        }

        let candidates = self
            .users
            .search(query, excluding_user_id, self.search_limit)
            .await?;

        let lookups = candidates.iter().map(|candidate| async move {
            match UserPair::new(excluding_user_id, &candidate.id) {
                Some(pair) => self.store.find_by_pair(&pair).await,
                None => Ok(None),
            }
        });
        let records = join_all(lookups).await;

        candidates
            .iter()
            .zip(records)
            .map(|(candidate, record)| {
                let record = record?;
                Ok(UserSearchResult {
                    user: UserSummary::from(candidate),
                    status: RelationshipStatus::from_record(record.as_ref(), excluding_user_id),
                })
            })
            .collect()
    }

    async fn pending_received(
        &self,
        request_id: &str,
        acting_user_id: &str,
    ) -> AppResult<friendship::Model> {
        self.store
            .find_by_id(request_id)
            .await?
            .filter(|r| r.is_pending() && r.receiver_id == acting_user_id)
            .ok_or_else(request_not_found)
    }

    /// Display name for a notice. Lookup failures degrade to `fallback`.
    async fn nickname_of(&self, user_id: &str, fallback: &str) -> String {
        match self.users.find_by_id(user_id).await {
            Ok(Some(user)) => user.nickname,
            Ok(None) => fallback.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, user_id = %user_id, "Nickname lookup failed");
                fallback.to_string()
            }
        }
    }

    async fn users_by_id(
        &self,
        ids: Vec<String>,
    ) -> AppResult<HashMap<String, user::Model>> {
        Ok(self
            .users
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect())
    }

    async fn friend_summaries(
        &self,
        user_id: &str,
        filter: RelationshipFilter,
    ) -> AppResult<Vec<FriendSummary>> {
        let records = self.store.find_all(user_id, filter).await?;
        let ids = records
            .iter()
            .filter_map(|r| r.counterpart_of(user_id).map(str::to_string))
            .collect();
        let users = self.users_by_id(ids).await?;

        Ok(records
            .iter()
            .filter_map(|r| {
                let friend = users.get(r.counterpart_of(user_id)?)?;
                Some(FriendSummary {
                    user: UserSummary::from(friend),
                    is_close_friend: r.close_friend_flag_of(user_id).unwrap_or(false),
                })
            })
            .collect())
    }

    async fn request_summaries(
        &self,
        user_id: &str,
        filter: RelationshipFilter,
    ) -> AppResult<Vec<FriendRequestSummary>> {
        let records = self.store.find_all(user_id, filter).await?;
        let ids = records
            .iter()
            .filter_map(|r| r.counterpart_of(user_id).map(str::to_string))
            .collect();
        let users = self.users_by_id(ids).await?;

        Ok(records
            .iter()
            .filter_map(|r| {
                let other = users.get(r.counterpart_of(user_id)?)?;
                Some(FriendRequestSummary {
                    id: r.id.clone(),
                    user: UserSummary::from(other),
                    requested_at: r.requested_at,
                })
            })
            .collect())
    }
}
