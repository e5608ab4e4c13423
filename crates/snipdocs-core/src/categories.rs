//! Document categories

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use snipdocs_db::entities::category;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ServiceError, ServiceResult};
use crate::profiles::is_admin;
use crate::text::non_blank;
use crate::validation::{hex_color, slug_format};

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CategoryForm {
    #[validate(length(min = 2, max = 50, message = "Category name must be between 2 and 50 characters"))]
    pub name: String,

    #[validate(
        length(min = 2, max = 50, message = "Slug must be between 2 and 50 characters"),
        custom(function = "slug_format")
    )]
    pub slug: String,

    #[validate(length(max = 200, message = "Description must be less than 200 characters"))]
    pub description: Option<String>,

    #[validate(length(max = 50, message = "Icon name must be less than 50 characters"))]
    pub icon: Option<String>,

    #[validate(custom(function = "hex_color"))]
    pub color: Option<String>,

    pub is_active: Option<bool>,

    pub sort_order: Option<u32>,
}

/// Active categories by `sort_order`, then name
pub async fn list_categories(db: &DatabaseConnection) -> ServiceResult<Vec<category::Model>> {
    Ok(category::Entity::find()
        .filter(category::Column::IsActive.eq(true))
        .order_by_asc(category::Column::SortOrder)
        .order_by_asc(category::Column::Name)
        .all(db)
        .await?)
}

async fn insert_category(
    db: &DatabaseConnection,
    form: CategoryForm,
) -> ServiceResult<category::Model> {
    let now = Utc::now();
    let model = category::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(form.name.trim().to_string()),
        slug: Set(form.slug),
        description: Set(non_blank(form.description.as_deref())),
        icon: Set(non_blank(form.icon.as_deref())),
        color: Set(non_blank(form.color.as_deref())),
        is_active: Set(form.is_active.unwrap_or(true)),
        sort_order: Set(form.sort_order.map_or(0, |o| i32::try_from(o).unwrap_or(i32::MAX))),
        docs_count: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let created = model.insert(db).await.map_err(|err| {
        ServiceError::from_db_conflict(
            err,
            "A category with this slug already exists",
            "Choose a different slug",
        )
    })?;
    info!(category_id = %created.id, slug = %created.slug, "Created category");
    Ok(created)
}

/// Create a category; admins only
pub async fn create_category(
    db: &DatabaseConnection,
    caller: Uuid,
    form: CategoryForm,
) -> ServiceResult<category::Model> {
    if !is_admin(db, caller).await? {
        return Err(ServiceError::Forbidden);
    }
    form.validate()?;
    insert_category(db, form).await
}

/// Starter categories for a fresh install
pub fn default_categories() -> Vec<CategoryForm> {
    [
        ("Frontend", "frontend", "UI, components and the browser", "layout", "#6366f1"),
        ("Backend", "backend", "Servers, APIs and services", "server", "#10b981"),
        ("Database", "database", "Queries, schemas and storage", "database", "#f59e0b"),
        ("DevOps", "devops", "Builds, deploys and infrastructure", "cloud", "#0ea5e9"),
        ("Algorithms", "algorithms", "Data structures and problem solving", "cpu", "#ef4444"),
        ("Tooling", "tooling", "Editors, CLIs and workflow", "wrench", "#8b5cf6"),
    ]
    .into_iter()
    .enumerate()
    .map(|(i, (name, slug, description, icon, color))| CategoryForm {
        name: name.to_string(),
        slug: slug.to_string(),
        description: Some(description.to_string()),
        icon: Some(icon.to_string()),
        color: Some(color.to_string()),
        is_active: Some(true),
        sort_order: Some(i as u32 + 1),
    })
    .collect()
}

/// Insert any of [`default_categories`] whose slug is missing; returns how many were added
pub async fn seed_default_categories(db: &DatabaseConnection) -> ServiceResult<usize> {
    let mut added = 0;
    for form in default_categories() {
        let exists = category::Entity::find()
            .filter(category::Column::Slug.eq(form.slug.as_str()))
            .count(db)
            .await?
            > 0;
        if !exists {
            insert_category(db, form).await?;
            added += 1;
        }
    }
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_categories_are_valid() {
        for form in default_categories() {
            assert!(form.validate().is_ok(), "invalid seed: {}", form.slug);
        }
    }

    #[test]
    fn test_category_form_validation() {
        let form = CategoryForm {
            name: "X".into(),
            slug: "Bad Slug".into(),
            color: Some("blue".into()),
            ..Default::default()
        };
        let errors = form.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("slug"));
        assert!(fields.contains_key("color"));
    }
}
