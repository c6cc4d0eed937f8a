//! Create photo table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Photo::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Photo::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Photo::OwnerId).string_len(32).not_null())
                    .col(ColumnDef::new(Photo::Url).text().not_null())
                    .col(ColumnDef::new(Photo::StorageKey).string_len(512).not_null())
                    .col(ColumnDef::new(Photo::ContentType).string_len(128).not_null())
                    .col(
                        ColumnDef::new(Photo::Visibility)
                            .string_len(16)
                            .not_null()
                            .default("ALL_FRIENDS"),
                    )
                    .col(
                        ColumnDef::new(Photo::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_photo_owner")
                            .from(Photo::Table, Photo::OwnerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (owner_id, created_at) for album listings
        manager
            .create_index(
                Index::create()
                    .name("idx_photo_owner_created_at")
                    .table(Photo::Table)
                    .col(Photo::OwnerId)
                    .col(Photo::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Index: storage_key (shared blob reference counting)
        manager
            .create_index(
                Index::create()
                    .name("idx_photo_storage_key")
                    .table(Photo::Table)
                    .col(Photo::StorageKey)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Photo::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Photo {
    Table,
    Id,
    OwnerId,
    Url,
    StorageKey,
    ContentType,
    Visibility,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
