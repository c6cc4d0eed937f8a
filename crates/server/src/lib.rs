//! Composition root for fourcut.
//!
//! Builds the repositories and services on top of a database connection and
//! installs the tracing subscriber.

use std::sync::Arc;

use fourcut_common::{Config, LocalStorage, StorageService};
use fourcut_core::{
    FriendshipService, NotificationService, NotificationSinkService, PhotoService,
    RelationshipEngine, VisibilityResolver,
};
use fourcut_db::repositories::{
    FriendshipRepository, NotificationRepository, PhotoRepository, UserDirectoryService,
    UserRepository,
};
use sea_orm::DatabaseConnection;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Every service the application exposes, wired together.
#[derive(Clone)]
pub struct AppServices {
    /// Friend requests, close friends and user search.
    pub friendships: FriendshipService,
    /// Photo albums gated by visibility.
    pub photos: PhotoService,
    /// Stored notifications.
    pub notifications: NotificationService,
    /// User lookups.
    pub users: UserRepository,
}

impl AppServices {
    /// Wire repositories and services over `db`.
    ///
    /// Friendship and tag notifications are stored through the notification
    /// service; photo blobs go to local storage.
    #[must_use]
    pub fn build(db: Arc<DatabaseConnection>, config: &Config) -> Self {
        let users = UserRepository::new(db.clone());
        let directory: UserDirectoryService = Arc::new(users.clone());

        let engine = RelationshipEngine::new(
            Arc::new(FriendshipRepository::new(db.clone())),
            directory.clone(),
        )
        .with_search_limit(config.friendship.search_limit);

        let notifications = NotificationService::new(NotificationRepository::new(db.clone()));
        let notifier: NotificationSinkService = Arc::new(notifications.clone());

        let storage: StorageService = Arc::new(LocalStorage::from_settings(&config.storage));
        let mut photos = PhotoService::new(
            Arc::new(PhotoRepository::new(db)),
            storage,
            directory,
            VisibilityResolver::new(engine.clone()),
        );
        photos.set_notifier(notifier.clone());

        Self {
            friendships: FriendshipService::with_notifier(engine, notifier),
            photos,
            notifications,
            users,
        }
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_build_wires_search_limit_and_validation() {
        let config: Config = serde_json::from_value(serde_json::json!({
            "database": { "url": "postgres://localhost/fourcut" },
            "friendship": { "search_limit": 5 }
        }))
        .unwrap();
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let services = AppServices::build(Arc::new(db), &config);

        // Blank queries are rejected before any database access.
        let result = services.friendships.search("  ", "alice").await;
        assert!(result.is_err());
    }
}
