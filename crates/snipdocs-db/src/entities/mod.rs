//! Database entities

pub mod bookmark;
pub mod category;
pub mod document;
pub mod document_tag;
pub mod identity;
pub mod like;
pub mod one_time_token;
pub mod profile;
pub mod tag;

pub use bookmark::Entity as Bookmark;
pub use category::Entity as Category;
pub use document::Entity as Document;
pub use document_tag::Entity as DocumentTag;
pub use identity::Entity as Identity;
pub use like::Entity as Like;
pub use one_time_token::Entity as OneTimeToken;
pub use profile::Entity as Profile;
pub use tag::Entity as Tag;

pub use document::{Difficulty, DocumentStatus, Visibility};
pub use like::TargetType;
pub use one_time_token::TokenKind;
pub use profile::ProfileRole;

pub mod prelude {
    pub use super::bookmark::Entity as Bookmark;
    pub use super::category::Entity as Category;
    pub use super::document::Entity as Document;
    pub use super::document_tag::Entity as DocumentTag;
    pub use super::identity::Entity as Identity;
    pub use super::like::Entity as Like;
    pub use super::one_time_token::Entity as OneTimeToken;
    pub use super::profile::Entity as Profile;
    pub use super::tag::Entity as Tag;
}
