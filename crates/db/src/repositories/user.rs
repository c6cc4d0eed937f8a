//! User repository and the read-only user directory seam.

use std::sync::Arc;

use crate::entities::{User, user};
use async_trait::async_trait;
use fourcut_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect,
    sea_query::{Expr, Func},
};

/// Read-only view of the user base used by the relationship engine.
///
/// The engine validates that users exist and decorates its results with
/// display fields, but never writes user data.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Find a user by ID.
    async fn find_by_id(&self, id: &str) -> AppResult<Option<user::Model>>;

    /// Find several users by ID. Missing IDs are skipped; order is unspecified.
    async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<user::Model>>;

    /// Case-insensitive substring search over nickname and email,
    /// never returning `excluding_user_id`.
    async fn search(
        &self,
        query: &str,
        excluding_user_id: &str,
        limit: u64,
    ) -> AppResult<Vec<user::Model>>;
}

/// Shared handle to a user directory.
pub type UserDirectoryService = Arc<dyn UserDirectory>;

/// Build a `LIKE` pattern matching `query` anywhere, with wildcards escaped.
#[must_use]
pub fn contains_pattern(query: &str) -> String {
    let escaped = query
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// User repository for database operations.
#[derive(Clone)]
pub struct UserRepository {
    db: Arc<DatabaseConnection>,
}

impl UserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a user by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<user::Model>> {
        User::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find users by IDs.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<user::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        User::find()
            .filter(user::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new user.
    pub async fn create(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Search users by nickname or email, ignoring case on both.
    pub async fn search(
        &self,
        query: &str,
        excluding_user_id: &str,
        limit: u64,
    ) -> AppResult<Vec<user::Model>> {
        let pattern = contains_pattern(query);

        let condition = Condition::all()
            .add(user::Column::Id.ne(excluding_user_id))
            .add(
                Condition::any()
                    .add(user::Column::NicknameLower.like(&pattern))
                    .add(
                        Expr::expr(Func::lower(Expr::col(user::Column::Email)))
                            .like(&pattern),
                    ),
            );

        User::find()
            .filter(condition)
            .order_by_asc(user::Column::NicknameLower)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[async_trait]
impl UserDirectory for UserRepository {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<user::Model>> {
        Self::find_by_id(self, id).await
    }

    async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<user::Model>> {
        Self::find_by_ids(self, ids).await
    }

    async fn search(
        &self,
        query: &str,
        excluding_user_id: &str,
        limit: u64,
    ) -> AppResult<Vec<user::Model>> {
        Self::search(self, query, excluding_user_id, limit).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, Set};
    use std::sync::Arc;

    fn create_test_user(id: &str, nickname: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            email: format!("{}@example.com", nickname.to_lowercase()),
            nickname: nickname.to_string(),
            nickname_lower: nickname.to_lowercase(),
            profile_image_url: None,
            created_at: Utc::now().into(),
        }
    }

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("Bob"), "%bob%");
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(contains_pattern("a\\b"), "%a\\\\b%");
    }

    #[tokio::test]
    async fn test_find_by_id_found() {
        let user = create_test_user("user1", "Alice");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user.clone()]])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let result = repo.find_by_id("user1").await.unwrap();

        assert!(result.is_some());
        let found_user = result.unwrap();
        assert_eq!(found_user.id, "user1");
        assert_eq!(found_user.nickname, "Alice");
    }

    #[tokio::test]
    async fn test_find_by_ids_empty_skips_query() {
        // No query results appended: hitting the database would fail.
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = UserRepository::new(db);
        let result = repo.find_by_ids(&[]).await.unwrap();

        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_create_user() {
        let user = create_test_user("user1", "Alice");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user.clone()]])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let active = user::ActiveModel {
            id: Set("user1".to_string()),
            email: Set("alice@example.com".to_string()),
            nickname: Set("Alice".to_string()),
            nickname_lower: Set("alice".to_string()),
            profile_image_url: Set(None),
            created_at: Set(Utc::now().into()),
        };

        let result = repo.create(active).await.unwrap();
        assert_eq!(result.nickname, "Alice");
    }

    #[tokio::test]
    async fn test_search_through_directory_trait() {
        let bob = create_test_user("user2", "Bob");
        let bobby = create_test_user("user3", "Bobby");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[bob, bobby]])
                .into_connection(),
        );

        let directory: UserDirectoryService = Arc::new(UserRepository::new(db));
        let result = directory.search("bob", "user1", 50).await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].nickname, "Bob");
        assert_eq!(result[1].nickname, "Bobby");
    }

    #[tokio::test]
    async fn test_search_lowercases_stored_email() {
        let mut dee = create_test_user("user4", "Dee");
        dee.email = "Dee@Example.COM".to_string();

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[dee]])
                .into_connection(),
        );

        let repo = UserRepository::new(db.clone());
        let result = repo.search("DEE@example", "user1", 50).await.unwrap();
        assert_eq!(result.len(), 1);

        drop(repo);
        let Ok(conn) = Arc::try_unwrap(db) else {
            panic!("connection still shared");
        };
        let log = format!("{:?}", conn.into_transaction_log());
        assert!(log.contains("LOWER("));
        assert!(log.contains("%dee@example%"));
    }
}
