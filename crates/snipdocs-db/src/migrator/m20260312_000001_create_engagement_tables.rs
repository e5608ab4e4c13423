//! Likes and bookmarks
//!
//! The unique indexes on (user, target id, target type) are what keep a
//! toggle from ever producing a second row for the same pair.

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Likes::Table)
                    .if_not_exists()
                    .col(uuid(Likes::Id).primary_key())
                    .col(uuid(Likes::UserId).not_null())
                    .col(uuid(Likes::LikeableId).not_null())
                    .col(
                        string_len(Likes::LikeableType, 16)
                            .not_null()
                            .default("document"),
                    )
                    .col(
                        timestamp_with_time_zone(Likes::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_likes_user_id")
                            .from(Likes::Table, Likes::UserId)
                            .to(Identities::Table, Identities::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_likes_user_target")
                    .table(Likes::Table)
                    .col(Likes::UserId)
                    .col(Likes::LikeableId)
                    .col(Likes::LikeableType)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_likes_target")
                    .table(Likes::Table)
                    .col(Likes::LikeableId)
                    .col(Likes::LikeableType)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Bookmarks::Table)
                    .if_not_exists()
                    .col(uuid(Bookmarks::Id).primary_key())
                    .col(uuid(Bookmarks::UserId).not_null())
                    .col(uuid(Bookmarks::BookmarkableId).not_null())
                    .col(
                        string_len(Bookmarks::BookmarkableType, 16)
                            .not_null()
                            .default("document"),
                    )
                    .col(string_len_null(Bookmarks::Notes, 500))
                    .col(
                        timestamp_with_time_zone(Bookmarks::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bookmarks_user_id")
                            .from(Bookmarks::Table, Bookmarks::UserId)
                            .to(Identities::Table, Identities::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_bookmarks_user_target")
                    .table(Bookmarks::Table)
                    .col(Bookmarks::UserId)
                    .col(Bookmarks::BookmarkableId)
                    .col(Bookmarks::BookmarkableType)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_bookmarks_target")
                    .table(Bookmarks::Table)
                    .col(Bookmarks::BookmarkableId)
                    .col(Bookmarks::BookmarkableType)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Bookmarks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Likes::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Identities {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Likes {
    Table,
    Id,
    UserId,
    LikeableId,
    LikeableType,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Bookmarks {
    Table,
    Id,
    UserId,
    BookmarkableId,
    BookmarkableType,
    Notes,
    CreatedAt,
}
