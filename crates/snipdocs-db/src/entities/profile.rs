//! Profile entity: the public-facing user record

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role of a profile in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum ProfileRole {
    /// Default role for accounts that publish documents
    #[sea_orm(string_value = "creator")]
    Creator,

    /// Reader account without publishing history
    #[sea_orm(string_value = "user")]
    User,

    /// Administrator (may manage categories)
    #[sea_orm(string_value = "admin")]
    Admin,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    /// Same UUID as the owning identity
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(unique)]
    pub username: String,

    pub full_name: Option<String>,

    pub avatar_url: Option<String>,

    pub bio: Option<String>,

    pub website: Option<String>,

    pub github_url: Option<String>,

    pub twitter_url: Option<String>,

    pub linkedin_url: Option<String>,

    pub role: ProfileRole,

    pub is_verified: bool,

    pub docs_count: i32,

    pub snippets_count: i32,

    pub created_at: ChronoDateTimeUtc,

    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::identity::Entity",
        from = "Column::Id",
        to = "super::identity::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Identity,
}

impl Related<super::identity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Identity.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
