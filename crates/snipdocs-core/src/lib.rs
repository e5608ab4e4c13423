//! Snipdocs domain services
//!
//! Profile provisioning, the document publish pipeline with tag
//! reconciliation, like/bookmark toggles, read-side listings and a
//! database-backed identity provider. Every function takes the database
//! connection explicitly; there is no global state.

pub mod accounts;
pub mod categories;
pub mod documents;
pub mod engagement;
pub mod error;
pub mod identity;
pub mod profiles;
pub mod queries;
pub mod tags;
pub mod text;
mod validation;

pub use accounts::{
    complete_callback, register, sign_in, CallbackOutcome, CallbackParams, RegistrationForm,
};
pub use categories::{create_category, list_categories, seed_default_categories, CategoryForm};
pub use documents::{
    create_document, delete_document, get_own_document, get_published_by_slug, record_view,
    update_document, DocumentDetail, DocumentForm, DocumentPatch,
};
pub use engagement::{
    engagement_state, reconcile_counters, toggle_bookmark, toggle_like, update_bookmark_notes,
    EngagementState, EngagementTarget,
};
pub use error::{FieldErrors, ServiceError, ServiceResult};
pub use identity::{LocalIdentityConfig, LocalIdentityProvider};
pub use profiles::{
    ensure_profile, ensure_profile_best_effort, get_profile, get_profile_by_username, is_admin,
    update_profile, username_taken, ProfilePatch,
};
pub use queries::{
    author_dashboard, bookmarked_documents, explore, liked_documents, list_own_documents,
    AuthorDashboard, DashboardStats, DocumentCard, ExploreQuery, Page, PageQuery, SavedDocument,
    SortOrder,
};
pub use tags::{list_popular_tags, reconcile_tags};
