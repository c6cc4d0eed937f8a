//! Database entities.

pub mod friendship;
pub mod notification;
pub mod photo;
pub mod user;

pub use friendship::Entity as Friendship;
pub use notification::Entity as Notification;
pub use photo::Entity as Photo;
pub use user::Entity as User;
