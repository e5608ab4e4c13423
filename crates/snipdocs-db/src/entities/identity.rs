//! Identity entity: the account record owned by the identity provider

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "identities")]
pub struct Model {
    /// Identity UUID (primary key, shared with the profile)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Login email (unique, stored lowercase)
    #[sea_orm(unique)]
    pub email: String,

    /// Argon2id password hash, absent for accounts without a password
    pub password_hash: Option<String>,

    /// Provider metadata as a JSON object (username, full_name, avatar_url, ...)
    pub metadata: String,

    /// When the email address was confirmed
    pub email_confirmed_at: Option<ChronoDateTimeUtc>,

    /// Last successful sign-in
    pub last_sign_in_at: Option<ChronoDateTimeUtc>,

    pub created_at: ChronoDateTimeUtc,

    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::profile::Entity")]
    Profile,

    #[sea_orm(has_many = "super::one_time_token::Entity")]
    OneTimeTokens,

    #[sea_orm(has_many = "super::document::Entity")]
    Documents,
}

impl Related<super::profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Profile.def()
    }
}

impl Related<super::one_time_token::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OneTimeTokens.def()
    }
}

impl Related<super::document::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Documents.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
