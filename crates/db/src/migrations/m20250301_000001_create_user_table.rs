//! Create user table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(User::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(User::Email).string_len(320).not_null())
                    .col(ColumnDef::new(User::Nickname).string_len(64).not_null())
                    .col(ColumnDef::new(User::NicknameLower).string_len(64).not_null())
                    .col(ColumnDef::new(User::ProfileImageUrl).text())
                    .col(
                        ColumnDef::new(User::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: email
        manager
            .create_index(
                Index::create()
                    .name("idx_user_email")
                    .table(User::Table)
                    .col(User::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Unique index: nickname
        manager
            .create_index(
                Index::create()
                    .name("idx_user_nickname")
                    .table(User::Table)
                    .col(User::Nickname)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: nickname_lower (for search)
        manager
            .create_index(
                Index::create()
                    .name("idx_user_nickname_lower")
                    .table(User::Table)
                    .col(User::NicknameLower)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum User {
    Table,
    Id,
    Email,
    Nickname,
    NicknameLower,
    ProfileImageUrl,
    CreatedAt,
}
