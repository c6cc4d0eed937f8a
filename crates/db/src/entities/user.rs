//! User entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Login identifier, stored lowercased
    #[sea_orm(unique)]
    pub email: String,

    /// Display name shown to friends
    #[sea_orm(unique)]
    pub nickname: String,

    /// Lowercased nickname for case-insensitive search
    pub nickname_lower: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub profile_image_url: Option<String>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
