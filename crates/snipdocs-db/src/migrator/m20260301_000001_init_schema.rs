//! Initial schema: identities, profiles, categories, documents and tags

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ============================================================
        // 1. identities
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Identity::Table)
                    .if_not_exists()
                    .col(uuid(Identity::Id).primary_key())
                    .col(string_len(Identity::Email, 255).not_null().unique_key())
                    .col(string_len_null(Identity::PasswordHash, 255))
                    .col(text(Identity::Metadata).not_null().default("{}"))
                    .col(timestamp_with_time_zone_null(Identity::EmailConfirmedAt))
                    .col(timestamp_with_time_zone_null(Identity::LastSignInAt))
                    .col(
                        timestamp_with_time_zone(Identity::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Identity::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // 2. one_time_tokens
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(OneTimeToken::Table)
                    .if_not_exists()
                    .col(uuid(OneTimeToken::Id).primary_key())
                    .col(uuid(OneTimeToken::IdentityId).not_null())
                    .col(string_len(OneTimeToken::Kind, 32).not_null())
                    .col(
                        string_len(OneTimeToken::TokenHash, 64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(timestamp_with_time_zone(OneTimeToken::ExpiresAt).not_null())
                    .col(timestamp_with_time_zone_null(OneTimeToken::ConsumedAt))
                    .col(
                        timestamp_with_time_zone(OneTimeToken::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_one_time_tokens_identity_id")
                            .from(OneTimeToken::Table, OneTimeToken::IdentityId)
                            .to(Identity::Table, Identity::Id)
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
                    .name("idx_one_time_tokens_identity_id")
                    .table(OneTimeToken::Table)
                    .col(OneTimeToken::IdentityId)
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // 3. profiles (one per identity)
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Profile::Table)
                    .if_not_exists()
                    .col(uuid(Profile::Id).primary_key())
                    .col(string_len(Profile::Username, 64).not_null().unique_key())
                    .col(string_len_null(Profile::FullName, 255))
                    .col(text_null(Profile::AvatarUrl))
                    .col(text_null(Profile::Bio))
                    .col(text_null(Profile::Website))
                    .col(text_null(Profile::GithubUrl))
                    .col(text_null(Profile::TwitterUrl))
                    .col(text_null(Profile::LinkedinUrl))
                    .col(string_len(Profile::Role, 32).not_null().default("creator"))
                    .col(boolean(Profile::IsVerified).not_null().default(false))
                    .col(integer(Profile::DocsCount).not_null().default(0))
                    .col(integer(Profile::SnippetsCount).not_null().default(0))
                    .col(
                        timestamp_with_time_zone(Profile::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Profile::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_profiles_id")
                            .from(Profile::Table, Profile::Id)
                            .to(Identity::Table, Identity::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // 4. categories
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Category::Table)
                    .if_not_exists()
                    .col(uuid(Category::Id).primary_key())
                    .col(string_len(Category::Name, 50).not_null())
                    .col(string_len(Category::Slug, 50).not_null().unique_key())
                    .col(string_len_null(Category::Description, 200))
                    .col(string_len_null(Category::Icon, 50))
                    .col(string_len_null(Category::Color, 7))
                    .col(boolean(Category::IsActive).not_null().default(true))
                    .col(integer(Category::SortOrder).not_null().default(0))
                    .col(integer(Category::DocsCount).not_null().default(0))
                    .col(
                        timestamp_with_time_zone(Category::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Category::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // 5. documents
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Document::Table)
                    .if_not_exists()
                    .col(uuid(Document::Id).primary_key())
                    .col(uuid(Document::AuthorId).not_null())
                    .col(string_len(Document::Title, 200).not_null())
                    .col(string_len(Document::Slug, 255).not_null().unique_key())
                    .col(text(Document::Content).not_null())
                    .col(text_null(Document::Excerpt))
                    .col(uuid_null(Document::CategoryId))
                    .col(
                        string_len(Document::Difficulty, 16)
                            .not_null()
                            .default("beginner"),
                    )
                    .col(string_len(Document::Status, 16).not_null().default("draft"))
                    .col(
                        string_len(Document::Visibility, 16)
                            .not_null()
                            .default("private"),
                    )
                    .col(integer(Document::ReadingTime).not_null().default(1))
                    .col(integer(Document::ViewCount).not_null().default(0))
                    .col(integer(Document::LikeCount).not_null().default(0))
                    .col(integer(Document::BookmarkCount).not_null().default(0))
                    .col(integer(Document::CommentCount).not_null().default(0))
                    .col(string_len_null(Document::MetaTitle, 60))
                    .col(string_len_null(Document::MetaDescription, 160))
                    .col(text_null(Document::MetaKeywords))
                    .col(text_null(Document::ThumbnailUrl))
                    .col(timestamp_with_time_zone_null(Document::PublishedAt))
                    .col(
                        timestamp_with_time_zone(Document::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Document::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_documents_author_id")
                            .from(Document::Table, Document::AuthorId)
                            .to(Identity::Table, Identity::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_documents_category_id")
                            .from(Document::Table, Document::CategoryId)
                            .to(Category::Table, Category::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_documents_author_id")
                    .table(Document::Table)
                    .col(Document::AuthorId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_documents_listing")
                    .table(Document::Table)
                    .col(Document::Status)
                    .col(Document::Visibility)
                    .col(Document::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // 6. tags
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Tag::Table)
                    .if_not_exists()
                    .col(uuid(Tag::Id).primary_key())
                    .col(string_len(Tag::Name, 100).not_null())
                    .col(string_len(Tag::Slug, 100).not_null().unique_key())
                    .col(integer(Tag::UsageCount).not_null().default(0))
                    .col(
                        timestamp_with_time_zone(Tag::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // 7. document_tags junction table
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(DocumentTag::Table)
                    .if_not_exists()
                    .col(uuid(DocumentTag::DocumentId).not_null())
                    .col(uuid(DocumentTag::TagId).not_null())
                    .col(
                        timestamp_with_time_zone(DocumentTag::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(DocumentTag::DocumentId)
                            .col(DocumentTag::TagId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_document_tags_document_id")
                            .from(DocumentTag::Table, DocumentTag::DocumentId)
                            .to(Document::Table, Document::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_document_tags_tag_id")
                            .from(DocumentTag::Table, DocumentTag::TagId)
                            .to(Tag::Table, Tag::Id)
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
                    .name("idx_document_tags_tag_id")
                    .table(DocumentTag::Table)
                    .col(DocumentTag::TagId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DocumentTag::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tag::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Document::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Category::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Profile::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OneTimeToken::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Identity::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Identity {
    #[sea_orm(iden = "identities")]
    Table,
    Id,
    Email,
    PasswordHash,
    Metadata,
    EmailConfirmedAt,
    LastSignInAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum OneTimeToken {
    #[sea_orm(iden = "one_time_tokens")]
    Table,
    Id,
    IdentityId,
    Kind,
    TokenHash,
    ExpiresAt,
    ConsumedAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Profile {
    #[sea_orm(iden = "profiles")]
    Table,
    Id,
    Username,
    FullName,
    AvatarUrl,
    Bio,
    Website,
    GithubUrl,
    TwitterUrl,
    LinkedinUrl,
    Role,
    IsVerified,
    DocsCount,
    SnippetsCount,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Category {
    #[sea_orm(iden = "categories")]
    Table,
    Id,
    Name,
    Slug,
    Description,
    Icon,
    Color,
    IsActive,
    SortOrder,
    DocsCount,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Document {
    #[sea_orm(iden = "documents")]
    Table,
    Id,
    AuthorId,
    Title,
    Slug,
    Content,
    Excerpt,
    CategoryId,
    Difficulty,
    Status,
    Visibility,
    ReadingTime,
    ViewCount,
    LikeCount,
    BookmarkCount,
    CommentCount,
    MetaTitle,
    MetaDescription,
    MetaKeywords,
    ThumbnailUrl,
    PublishedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Tag {
    #[sea_orm(iden = "tags")]
    Table,
    Id,
    Name,
    Slug,
    UsageCount,
    CreatedAt,
}

#[derive(DeriveIden)]
enum DocumentTag {
    #[sea_orm(iden = "document_tags")]
    Table,
    DocumentId,
    TagId,
    CreatedAt,
}
