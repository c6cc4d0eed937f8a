//! Database repositories.

pub mod friendship;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod notification;
pub mod photo;
pub mod user;

pub use friendship::{
    FriendshipRepository, RelationshipFilter, RelationshipStore, RelationshipStoreService,
};
#[cfg(any(test, feature = "test-utils"))]
pub use memory::{
    InMemoryPhotoStore, InMemoryRelationshipStore, InMemoryUserDirectory, YieldingStore,
};
pub use notification::NotificationRepository;
pub use photo::{PhotoRepository, PhotoStore, PhotoStoreService};
pub use user::{UserDirectory, UserDirectoryService, UserRepository};
