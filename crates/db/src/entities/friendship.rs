//! Friendship entity (friend requests and their outcome).
//!
//! A row is keyed twice: by its own `id`, and by the canonical unordered
//! pair `(user_low_id, user_high_id)` which carries a unique index. The
//! directed `requester_id` / `receiver_id` columns record who asked whom.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a friend request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum FriendshipStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "accepted")]
    Accepted,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl FriendshipStatus {
    /// Pending and accepted rows block a new request for the same pair.
    #[must_use]
    pub const fn blocks_new_request(self) -> bool {
        matches!(self, Self::Pending | Self::Accepted)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "friendship")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The user who sent the request
    #[sea_orm(indexed)]
    pub requester_id: String,

    /// The user who received the request
    #[sea_orm(indexed)]
    pub receiver_id: String,

    /// `min(requester_id, receiver_id)`
    pub user_low_id: String,

    /// `max(requester_id, receiver_id)`
    pub user_high_id: String,

    pub status: FriendshipStatus,

    /// Whether the requester has marked the receiver as a close friend
    #[sea_orm(default_value = false)]
    pub requester_close_friend: bool,

    /// Whether the receiver has marked the requester as a close friend
    #[sea_orm(default_value = false)]
    pub receiver_close_friend: bool,

    pub requested_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub responded_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// The canonical pair this row is stored under.
    #[must_use]
    pub fn pair(&self) -> UserPair {
        UserPair {
            low: self.user_low_id.clone(),
            high: self.user_high_id.clone(),
        }
    }

    /// Whether `user_id` is one of the two parties.
    #[must_use]
    pub fn involves(&self, user_id: &str) -> bool {
        self.requester_id == user_id || self.receiver_id == user_id
    }

    /// The other party, seen from `user_id`.
    #[must_use]
    pub fn counterpart_of(&self, user_id: &str) -> Option<&str> {
        if self.requester_id == user_id {
            Some(&self.receiver_id)
        } else if self.receiver_id == user_id {
            Some(&self.requester_id)
        } else {
            None
        }
    }

    /// Which end of the row `user_id` is on.
    #[must_use]
    pub fn side_of(&self, user_id: &str) -> Option<Side> {
        if self.requester_id == user_id {
            Some(Side::Requester)
        } else if self.receiver_id == user_id {
            Some(Side::Receiver)
        } else {
            None
        }
    }

    /// The close-friend flag owned by `user_id`'s side of the row.
    #[must_use]
    pub fn close_friend_flag_of(&self, user_id: &str) -> Option<bool> {
        self.side_of(user_id).map(|side| self.close_friend_flag(side))
    }

    /// The close-friend flag stored on `side`.
    #[must_use]
    pub const fn close_friend_flag(&self, side: Side) -> bool {
        match side {
            Side::Requester => self.requester_close_friend,
            Side::Receiver => self.receiver_close_friend,
        }
    }

    /// Whether the two users are friends through this row.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        self.status == FriendshipStatus::Accepted
    }

    /// Whether this row is an open request.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == FriendshipStatus::Pending
    }
}

/// One end of a friendship row. Each side owns its own close-friend flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The user who sent the request.
    Requester,
    /// The user who received the request.
    Receiver,
}

/// An unordered pair of distinct users, normalised to `(min, max)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserPair {
    low: String,
    high: String,
}

impl UserPair {
    /// Build the canonical pair. Returns `None` when both IDs are the same user.
    #[must_use]
    pub fn new(a: &str, b: &str) -> Option<Self> {
        match a.cmp(b) {
            std::cmp::Ordering::Less => Some(Self {
                low: a.to_string(),
                high: b.to_string(),
            }),
            std::cmp::Ordering::Greater => Some(Self {
                low: b.to_string(),
                high: a.to_string(),
            }),
            std::cmp::Ordering::Equal => None,
        }
    }

    #[must_use]
    pub fn low(&self) -> &str {
        &self.low
    }

    #[must_use]
    pub fn high(&self) -> &str {
        &self.high
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::RequesterId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Requester,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ReceiverId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Receiver,
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn row(requester: &str, receiver: &str) -> Model {
        let pair = UserPair::new(requester, receiver).unwrap();
        Model {
            id: "f1".to_string(),
            requester_id: requester.to_string(),
            receiver_id: receiver.to_string(),
            user_low_id: pair.low().to_string(),
            user_high_id: pair.high().to_string(),
            status: FriendshipStatus::Accepted,
            requester_close_friend: true,
            receiver_close_friend: false,
            requested_at: Utc::now().into(),
            responded_at: None,
        }
    }

    #[test]
    fn test_pair_is_unordered() {
        assert_eq!(UserPair::new("a", "b"), UserPair::new("b", "a"));
        let pair = UserPair::new("zed", "amy").unwrap();
        assert_eq!(pair.low(), "amy");
        assert_eq!(pair.high(), "zed");
    }

    #[test]
    fn test_pair_rejects_self() {
        assert!(UserPair::new("a", "a").is_none());
    }

    #[test]
    fn test_counterpart_and_flags_are_caller_relative() {
        let f = row("bob", "alice");
        assert_eq!(f.counterpart_of("bob"), Some("alice"));
        assert_eq!(f.counterpart_of("alice"), Some("bob"));
        assert_eq!(f.counterpart_of("carol"), None);

        assert_eq!(f.close_friend_flag_of("bob"), Some(true));
        assert_eq!(f.close_friend_flag_of("alice"), Some(false));
        assert_eq!(f.close_friend_flag_of("carol"), None);
        assert_eq!(f.side_of("bob"), Some(Side::Requester));
        assert_eq!(f.side_of("alice"), Some(Side::Receiver));
        assert!(f.close_friend_flag(Side::Requester));
        assert_eq!(f.pair(), UserPair::new("alice", "bob").unwrap());
    }

    #[test]
    fn test_blocking_statuses() {
        assert!(FriendshipStatus::Pending.blocks_new_request());
        assert!(FriendshipStatus::Accepted.blocks_new_request());
        assert!(!FriendshipStatus::Rejected.blocks_new_request());
    }
}
