//! Business logic services.

#![allow(missing_docs)]

pub mod friendship;
pub mod notification;
pub mod photo;
pub mod relationship;
pub mod visibility;

pub use friendship::FriendshipService;
pub use notification::{NotificationService, NotificationSink, NotificationSinkService};
pub use photo::{PhotoService, UploadPhotoInput};
pub use relationship::{
    FriendRequestSummary, FriendSummary, Notice, RelationshipEngine, RelationshipStatus,
    Transition, UserSearchResult, UserSummary,
};
pub use visibility::{ViewerRelation, VisibilityResolver, can_view, can_view_tier};
