//! Create friendship table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Friendship::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Friendship::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Friendship::RequesterId).string_len(32).not_null())
                    .col(ColumnDef::new(Friendship::ReceiverId).string_len(32).not_null())
                    .col(ColumnDef::new(Friendship::UserLowId).string_len(32).not_null())
                    .col(ColumnDef::new(Friendship::UserHighId).string_len(32).not_null())
                    .col(ColumnDef::new(Friendship::Status).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Friendship::RequesterCloseFriend)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Friendship::ReceiverCloseFriend)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Friendship::RequestedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Friendship::RespondedAt).timestamp_with_time_zone())
                    .check(Expr::col(Friendship::RequesterId).ne(Expr::col(Friendship::ReceiverId)))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_friendship_requester")
                            .from(Friendship::Table, Friendship::RequesterId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_friendship_receiver")
                            .from(Friendship::Table, Friendship::ReceiverId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (user_low_id, user_high_id) - one row per unordered pair
        manager
            .create_index(
                Index::create()
                    .name("idx_friendship_pair")
                    .table(Friendship::Table)
                    .col(Friendship::UserLowId)
                    .col(Friendship::UserHighId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: (receiver_id, status) for pending-received listings
        manager
            .create_index(
                Index::create()
                    .name("idx_friendship_receiver_status")
                    .table(Friendship::Table)
                    .col(Friendship::ReceiverId)
                    .col(Friendship::Status)
                    .to_owned(),
            )
            .await?;

        // Index: (requester_id, status) for pending-sent listings
        manager
            .create_index(
                Index::create()
                    .name("idx_friendship_requester_status")
                    .table(Friendship::Table)
                    .col(Friendship::RequesterId)
                    .col(Friendship::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Friendship::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Friendship {
    Table,
    Id,
    RequesterId,
    ReceiverId,
    UserLowId,
    UserHighId,
    Status,
    RequesterCloseFriend,
    ReceiverCloseFriend,
    RequestedAt,
    RespondedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
