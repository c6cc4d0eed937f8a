//! Friendship repository: durable relationship records keyed by unordered pair.

use std::sync::Arc;

use crate::entities::{
    Friendship,
    friendship::{self, FriendshipStatus, Side, UserPair},
};
use async_trait::async_trait;
use fourcut_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
    prelude::DateTimeWithTimeZone, sea_query::Expr,
};

/// Which relationship records to list for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipFilter {
    /// Accepted records on either side.
    Friends,
    /// Accepted records where the user's own close-friend flag is set.
    CloseFriends,
    /// Pending records where the user is the receiver.
    PendingReceived,
    /// Pending records where the user is the requester.
    PendingSent,
}

impl RelationshipFilter {
    /// Whether `record` belongs in this listing for `user_id`.
    #[must_use]
    pub fn matches(self, record: &friendship::Model, user_id: &str) -> bool {
        match self {
            Self::Friends => record.is_accepted() && record.involves(user_id),
            Self::CloseFriends => {
                record.is_accepted() && record.close_friend_flag_of(user_id) == Some(true)
            }
            Self::PendingReceived => record.is_pending() && record.receiver_id == user_id,
            Self::PendingSent => record.is_pending() && record.requester_id == user_id,
        }
    }

    /// Pending listings are ordered by request time, friend listings by acceptance time.
    #[must_use]
    pub const fn orders_by_request_time(self) -> bool {
        matches!(self, Self::PendingReceived | Self::PendingSent)
    }
}

/// Persistence seam for relationship records.
///
/// Implementations must guarantee that at most one record exists per
/// unordered pair, and that [`RelationshipStore::create_request`] is atomic
/// with respect to concurrent requests for the same pair.
#[async_trait]
pub trait RelationshipStore: Send + Sync {
    /// Find a record by its ID.
    async fn find_by_id(&self, id: &str) -> AppResult<Option<friendship::Model>>;

    /// Find the record stored for an unordered pair, in any status.
    async fn find_by_pair(&self, pair: &UserPair) -> AppResult<Option<friendship::Model>>;

    /// List records for a user, newest first.
    async fn find_all(
        &self,
        user_id: &str,
        filter: RelationshipFilter,
    ) -> AppResult<Vec<friendship::Model>>;

    /// Insert a new pending request.
    ///
    /// Fails with [`AppError::Conflict`] when the pair already has a pending
    /// or accepted record. A rejected record for the pair is replaced.
    async fn create_request(&self, record: friendship::Model) -> AppResult<friendship::Model>;

    /// Answer a pending request addressed to `receiver_id`.
    ///
    /// The status check and the write are one atomic step. Returns `None`
    /// when the record is missing, no longer pending, or addressed to
    /// someone else.
    async fn respond(
        &self,
        id: &str,
        receiver_id: &str,
        status: FriendshipStatus,
        responded_at: DateTimeWithTimeZone,
    ) -> AppResult<Option<friendship::Model>>;

    /// Atomically negate the close-friend flag on `side` of an accepted
    /// record, leaving the other side's flag untouched. Returns `None` when
    /// the record is missing or not accepted.
    async fn flip_close_friend(&self, id: &str, side: Side)
    -> AppResult<Option<friendship::Model>>;

    /// Delete a record by ID. Deleting a missing record is not an error.
    async fn delete(&self, id: &str) -> AppResult<()>;
}

/// Shared handle to a relationship store.
pub type RelationshipStoreService = Arc<dyn RelationshipStore>;

/// Conflict error for an existing record that blocks a new request.
#[must_use]
pub fn conflict_for(status: FriendshipStatus) -> AppError {
    match status {
        FriendshipStatus::Accepted => AppError::Conflict("Already friends".to_string()),
        _ => AppError::Conflict("Friend request already exists".to_string()),
    }
}

fn map_insert_err(e: DbErr) -> AppError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("Friend request already exists".to_string())
        }
        _ => AppError::Database(e.to_string()),
    }
}

fn pair_condition(pair: &UserPair) -> Condition {
    Condition::all()
        .add(friendship::Column::UserLowId.eq(pair.low()))
        .add(friendship::Column::UserHighId.eq(pair.high()))
}

fn new_active_model(record: friendship::Model) -> friendship::ActiveModel {
    friendship::ActiveModel {
        id: Set(record.id),
        requester_id: Set(record.requester_id),
        receiver_id: Set(record.receiver_id),
        user_low_id: Set(record.user_low_id),
        user_high_id: Set(record.user_high_id),
        status: Set(record.status),
        requester_close_friend: Set(record.requester_close_friend),
        receiver_close_friend: Set(record.receiver_close_friend),
        requested_at: Set(record.requested_at),
        responded_at: Set(record.responded_at),
    }
}

/// Friendship repository for database operations.
#[derive(Clone)]
pub struct FriendshipRepository {
    db: Arc<DatabaseConnection>,
}

impl FriendshipRepository {
    /// Create a new friendship repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RelationshipStore for FriendshipRepository {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<friendship::Model>> {
        Friendship::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn find_by_pair(&self, pair: &UserPair) -> AppResult<Option<friendship::Model>> {
        Friendship::find()
            .filter(pair_condition(pair))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn find_all(
        &self,
        user_id: &str,
        filter: RelationshipFilter,
    ) -> AppResult<Vec<friendship::Model>> {
        let accepted = friendship::Column::Status.eq(FriendshipStatus::Accepted);
        let pending = friendship::Column::Status.eq(FriendshipStatus::Pending);

        let condition = match filter {
            RelationshipFilter::Friends => Condition::all().add(accepted).add(
                Condition::any()
                    .add(friendship::Column::RequesterId.eq(user_id))
                    .add(friendship::Column::ReceiverId.eq(user_id)),
            ),
            RelationshipFilter::CloseFriends => Condition::all().add(accepted).add(
                Condition::any()
                    .add(
                        Condition::all()
                            .add(friendship::Column::RequesterId.eq(user_id))
                            .add(friendship::Column::RequesterCloseFriend.eq(true)),
                    )
                    .add(
                        Condition::all()
                            .add(friendship::Column::ReceiverId.eq(user_id))
                            .add(friendship::Column::ReceiverCloseFriend.eq(true)),
                    ),
            ),
            RelationshipFilter::PendingReceived => Condition::all()
                .add(pending)
                .add(friendship::Column::ReceiverId.eq(user_id)),
            RelationshipFilter::PendingSent => Condition::all()
                .add(pending)
                .add(friendship::Column::RequesterId.eq(user_id)),
        };

        let order_column = if filter.orders_by_request_time() {
            friendship::Column::RequestedAt
        } else {
            friendship::Column::RespondedAt
        };

        Friendship::find()
            .filter(condition)
            .order_by_desc(order_column)
            .order_by_desc(friendship::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn create_request(&self, record: friendship::Model) -> AppResult<friendship::Model> {
        let pair = record.pair();

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        // Row lock so concurrent requests for the same pair queue up here
        let existing = Friendship::find()
            .filter(pair_condition(&pair))
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if let Some(existing) = existing {
            if existing.status.blocks_new_request() {
                return Err(conflict_for(existing.status));
            }
            Friendship::delete_by_id(existing.id)
                .exec(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        let created = new_active_model(record)
            .insert(&txn)
            .await
            .map_err(map_insert_err)?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(created)
    }

    async fn respond(
        &self,
        id: &str,
        receiver_id: &str,
        status: FriendshipStatus,
        responded_at: DateTimeWithTimeZone,
    ) -> AppResult<Option<friendship::Model>> {
        let updated = Friendship::update_many()
            .col_expr(friendship::Column::Status, Expr::value(status))
            .col_expr(friendship::Column::RespondedAt, Expr::value(responded_at))
            .filter(friendship::Column::Id.eq(id))
            .filter(friendship::Column::ReceiverId.eq(receiver_id))
            .filter(friendship::Column::Status.eq(FriendshipStatus::Pending))
            .exec_with_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(updated.into_iter().next())
    }

    async fn flip_close_friend(
        &self,
        id: &str,
        side: Side,
    ) -> AppResult<Option<friendship::Model>> {
        let (column, negated) = match side {
            Side::Requester => (
                friendship::Column::RequesterCloseFriend,
                "NOT requester_close_friend",
            ),
            Side::Receiver => (
                friendship::Column::ReceiverCloseFriend,
                "NOT receiver_close_friend",
            ),
        };

        let updated = Friendship::update_many()
            .col_expr(column, Expr::cust(negated))
            .filter(friendship::Column::Id.eq(id))
            .filter(friendship::Column::Status.eq(FriendshipStatus::Accepted))
            .exec_with_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(updated.into_iter().next())
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        Friendship::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_friendship(
        id: &str,
        requester_id: &str,
        receiver_id: &str,
        status: FriendshipStatus,
    ) -> friendship::Model {
        let pair = UserPair::new(requester_id, receiver_id).unwrap();
        friendship::Model {
            id: id.to_string(),
            requester_id: requester_id.to_string(),
            receiver_id: receiver_id.to_string(),
            user_low_id: pair.low().to_string(),
            user_high_id: pair.high().to_string(),
            status,
            requester_close_friend: false,
            receiver_close_friend: false,
            requested_at: Utc::now().into(),
            responded_at: None,
        }
    }

    #[test]
    fn test_filter_matches() {
        let mut record = create_test_friendship("f1", "alice", "bob", FriendshipStatus::Pending);
        assert!(RelationshipFilter::PendingReceived.matches(&record, "bob"));
        assert!(!RelationshipFilter::PendingReceived.matches(&record, "alice"));
        assert!(RelationshipFilter::PendingSent.matches(&record, "alice"));
        assert!(!RelationshipFilter::Friends.matches(&record, "alice"));

        record.status = FriendshipStatus::Accepted;
        record.receiver_close_friend = true;
        assert!(RelationshipFilter::Friends.matches(&record, "alice"));
        assert!(RelationshipFilter::Friends.matches(&record, "bob"));
        assert!(!RelationshipFilter::Friends.matches(&record, "carol"));
        assert!(RelationshipFilter::CloseFriends.matches(&record, "bob"));
        assert!(!RelationshipFilter::CloseFriends.matches(&record, "alice"));
    }

    #[tokio::test]
    async fn test_find_by_pair_found() {
        let record = create_test_friendship("f1", "bob", "alice", FriendshipStatus::Accepted);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[record.clone()]])
                .into_connection(),
        );

        let repo = FriendshipRepository::new(db);
        let pair = UserPair::new("alice", "bob").unwrap();
        let result = repo.find_by_pair(&pair).await.unwrap();

        let found = result.unwrap();
        assert_eq!(found.id, "f1");
        assert_eq!(found.requester_id, "bob");
    }

    #[tokio::test]
    async fn test_create_request_inserts_when_pair_is_free() {
        let record = create_test_friendship("f1", "alice", "bob", FriendshipStatus::Pending);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<friendship::Model>::new()])
                .append_query_results([[record.clone()]])
                .into_connection(),
        );

        let repo = FriendshipRepository::new(db);
        let created = repo.create_request(record).await.unwrap();

        assert_eq!(created.id, "f1");
        assert!(created.is_pending());
    }

    #[tokio::test]
    async fn test_create_request_conflicts_with_pending() {
        let existing = create_test_friendship("f1", "bob", "alice", FriendshipStatus::Pending);
        let record = create_test_friendship("f2", "alice", "bob", FriendshipStatus::Pending);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[existing]])
                .into_connection(),
        );

        let repo = FriendshipRepository::new(db);
        let result = repo.create_request(record).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_create_request_conflicts_with_accepted() {
        let existing = create_test_friendship("f1", "alice", "bob", FriendshipStatus::Accepted);
        let record = create_test_friendship("f2", "alice", "bob", FriendshipStatus::Pending);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[existing]])
                .into_connection(),
        );

        let repo = FriendshipRepository::new(db);
        match repo.create_request(record).await {
            Err(AppError::Conflict(msg)) => assert_eq!(msg, "Already friends"),
            other => panic!("Expected Conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_request_replaces_rejected() {
        let existing = create_test_friendship("f1", "alice", "bob", FriendshipStatus::Rejected);
        let record = create_test_friendship("f2", "alice", "bob", FriendshipStatus::Pending);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[existing]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .append_query_results([[record.clone()]])
                .into_connection(),
        );

        let repo = FriendshipRepository::new(db);
        let created = repo.create_request(record).await.unwrap();

        assert_eq!(created.id, "f2");
    }

    #[tokio::test]
    async fn test_respond_returns_updated_record() {
        let mut record = create_test_friendship("f1", "alice", "bob", FriendshipStatus::Accepted);
        record.responded_at = Some(Utc::now().into());

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[record.clone()]])
                .into_connection(),
        );

        let repo = FriendshipRepository::new(db);
        let saved = repo
            .respond("f1", "bob", FriendshipStatus::Accepted, Utc::now().into())
            .await
            .unwrap()
            .unwrap();

        assert!(saved.is_accepted());
        assert!(saved.responded_at.is_some());
    }

    #[tokio::test]
    async fn test_respond_to_answered_request_updates_nothing() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<friendship::Model>::new()])
                .into_connection(),
        );

        let repo = FriendshipRepository::new(db);
        let result = repo
            .respond("f1", "bob", FriendshipStatus::Rejected, Utc::now().into())
            .await
            .unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_flip_close_friend_negates_one_column() {
        let mut record = create_test_friendship("f1", "alice", "bob", FriendshipStatus::Accepted);
        record.receiver_close_friend = true;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[record.clone()]])
            .into_connection();
        let db = Arc::new(db);

        let repo = FriendshipRepository::new(db.clone());
        let flipped = repo
            .flip_close_friend("f1", Side::Receiver)
            .await
            .unwrap()
            .unwrap();
        assert!(flipped.receiver_close_friend);

        drop(repo);
        let Ok(conn) = Arc::try_unwrap(db) else {
            panic!("connection still shared");
        };
        let log = format!("{:?}", conn.into_transaction_log());
        assert!(log.contains("NOT receiver_close_friend"));
        assert!(!log.contains("NOT requester_close_friend"));
    }

    #[tokio::test]
    async fn test_delete() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = FriendshipRepository::new(db);
        assert!(repo.delete("f1").await.is_ok());
    }
}
