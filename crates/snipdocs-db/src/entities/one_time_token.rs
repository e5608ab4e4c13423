//! Single-use tokens for email verification, password recovery and code exchange

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// What a one-time token may be redeemed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum TokenKind {
    #[sea_orm(string_value = "signup")]
    Signup,

    #[sea_orm(string_value = "recovery")]
    Recovery,

    #[sea_orm(string_value = "magiclink")]
    #[serde(rename = "magiclink")]
    MagicLink,

    #[sea_orm(string_value = "email_change")]
    EmailChange,

    /// Short-lived code handed back on redirects, exchanged for a session
    #[sea_orm(string_value = "auth_code")]
    AuthCode,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "one_time_tokens")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub identity_id: Uuid,

    pub kind: TokenKind,

    /// SHA-256 of the token handed to the user (hex)
    #[sea_orm(unique)]
    pub token_hash: String,

    pub expires_at: ChronoDateTimeUtc,

    /// Set once the token has been redeemed
    pub consumed_at: Option<ChronoDateTimeUtc>,

    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::identity::Entity",
        from = "Column::IdentityId",
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
