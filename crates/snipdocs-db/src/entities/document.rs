//! Document entity: a snippet or article authored by a single user

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum Difficulty {
    #[sea_orm(string_value = "beginner")]
    Beginner,

    #[sea_orm(string_value = "intermediate")]
    Intermediate,

    #[sea_orm(string_value = "advanced")]
    Advanced,
}

/// Publication status
///
/// `published_at` is non-null exactly when the status is `Published`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum DocumentStatus {
    #[sea_orm(string_value = "draft")]
    Draft,

    #[sea_orm(string_value = "published")]
    Published,

    #[sea_orm(string_value = "archived")]
    Archived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum Visibility {
    #[sea_orm(string_value = "public")]
    Public,

    #[sea_orm(string_value = "private")]
    Private,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "documents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning identity, fixed at creation
    pub author_id: Uuid,

    pub title: String,

    /// URL slug (unique, never rewritten after creation)
    #[sea_orm(unique)]
    pub slug: String,

    #[sea_orm(column_type = "Text")]
    pub content: String,

    pub excerpt: Option<String>,

    pub category_id: Option<Uuid>,

    pub difficulty: Difficulty,

    pub status: DocumentStatus,

    pub visibility: Visibility,

    /// Estimated reading time in minutes
    pub reading_time: i32,

    pub view_count: i32,

    pub like_count: i32,

    pub bookmark_count: i32,

    pub comment_count: i32,

    pub meta_title: Option<String>,

    pub meta_description: Option<String>,

    /// JSON array of keywords
    pub meta_keywords: Option<String>,

    pub thumbnail_url: Option<String>,

    pub published_at: Option<ChronoDateTimeUtc>,

    pub created_at: ChronoDateTimeUtc,

    pub updated_at: ChronoDateTimeUtc,
}

impl Model {
    /// Decoded `meta_keywords`, empty when unset or unreadable
    pub fn keywords(&self) -> Vec<String> {
        self.meta_keywords
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::identity::Entity",
        from = "Column::AuthorId",
        to = "super::identity::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Author,

    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id",
        on_update = "Cascade",
        on_delete = "SetNull"
    )]
    Category,

    #[sea_orm(has_many = "super::document_tag::Entity")]
    DocumentTags,
}

impl Related<super::identity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::document_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DocumentTags.def()
    }
}

impl Related<super::tag::Entity> for Entity {
    fn to() -> RelationDef {
        super::document_tag::Relation::Tag.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::document_tag::Relation::Document.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
