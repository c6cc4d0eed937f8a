//! Photo entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Who besides the owner may see a photo.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Visibility {
    /// Owner only
    #[sea_orm(string_value = "PRIVATE")]
    Private,
    /// Accepted friends the owner has marked as close
    #[sea_orm(string_value = "CLOSE_FRIENDS")]
    CloseFriends,
    /// Every accepted friend
    #[default]
    #[sea_orm(string_value = "ALL_FRIENDS")]
    AllFriends,
}

impl Visibility {
    /// Parse a tier name as stored or sent by clients.
    ///
    /// Returns `None` for anything that is not one of the three known tiers.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PRIVATE" => Some(Self::Private),
            "CLOSE_FRIENDS" => Some(Self::CloseFriends),
            "ALL_FRIENDS" => Some(Self::AllFriends),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Private => "PRIVATE",
            Self::CloseFriends => "CLOSE_FRIENDS",
            Self::AllFriends => "ALL_FRIENDS",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "photo")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Album owner. Tagged copies are owned by the tagged user.
    #[sea_orm(indexed)]
    pub owner_id: String,

    /// Public address of the blob
    #[sea_orm(column_type = "Text")]
    pub url: String,

    /// Storage key, shared between an upload and its tagged copies
    #[sea_orm(indexed)]
    pub storage_key: String,

    pub content_type: String,

    pub visibility: Visibility,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OwnerId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Owner,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility_parse() {
        assert_eq!(Visibility::parse("PRIVATE"), Some(Visibility::Private));
        assert_eq!(
            Visibility::parse("CLOSE_FRIENDS"),
            Some(Visibility::CloseFriends)
        );
        assert_eq!(Visibility::parse("ALL_FRIENDS"), Some(Visibility::AllFriends));
        assert_eq!(Visibility::parse("all_friends"), None);
        assert_eq!(Visibility::parse("PUBLIC"), None);
    }

    #[test]
    fn test_visibility_default_and_names() {
        assert_eq!(Visibility::default(), Visibility::AllFriends);
        assert_eq!(Visibility::CloseFriends.as_str(), "CLOSE_FRIENDS");
        assert_eq!(
            serde_json::to_string(&Visibility::CloseFriends).ok().as_deref(),
            Some("\"CLOSE_FRIENDS\"")
        );
    }
}
