use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use axum_login::permission_required;
use chrono::Utc;
use nanoid::nanoid;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, ModelTrait, QueryFilter,
};
use serde::Deserialize;
use tracing::warn;
use utoipa::ToSchema;

use crate::{
    AppState,
    entities::{category, post},
    login_system::{AuthBackend, Permission},
};

#[derive(Deserialize, ToSchema)]
pub struct CreateCategoryBody {
    pub category: String,
    pub description: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateCategoryBody {
    pub category: Option<String>,
    pub description: Option<String>,
}

#[utoipa::path(
    get,
    tags = ["Category"],
    description = "Get all categories",
    path = "",
    responses(
        (status = 200, description = "Categories fetched successfully", body = Vec<category::Model>),
    )
)]
pub async fn list_categories(State(state): State<AppState>) -> impl IntoResponse {
    match category::Entity::find().all(&state.db).await {
        Ok(categories) => (StatusCode::OK, Json(categories)).into_response(),
        Err(e) => {
            warn!("Failed to fetch categories: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch categories",
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    get,
    tags = ["Category"],
    description = "Get category by ID",
    path = "/{id}",
    responses(
        (status = 200, description = "Category fetched successfully", body = category::Model),
        (status = 404, description = "Category not found", body = String),
    )
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match category::Entity::find_by_id(&id).one(&state.db).await {
        Ok(Some(found)) => (StatusCode::OK, Json(found)).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "Category not found").into_response(),
        Err(e) => {
            warn!("Failed to fetch category {}: {}", id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch category",
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    post,
    tags = ["Category"],
    description = "Create a new category",
    path = "",
    request_body(content = CreateCategoryBody, content_type = "application/json"),
    responses(
        (status = 201, description = "Category created successfully", body = category::Model),
        (status = 400, description = "Category name already exists", body = String),
    )
)]
pub async fn create_category(
    State(state): State<AppState>,
    Json(body): Json<CreateCategoryBody>,
) -> impl IntoResponse {
    if body.category.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "Category name is required").into_response();
    }

    match category::Entity::find()
        .filter(category::Column::Category.eq(&body.category))
        .one(&state.db)
        .await
    {
        Ok(Some(_)) => {
            return (StatusCode::BAD_REQUEST, "Category already exists").into_response();
        }
        Ok(None) => {}
        Err(e) => {
            warn!("Failed to check category {}: {}", body.category, e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create category",
            )
                .into_response();
        }
    }

    let new_category = category::ActiveModel {
        id: Set(nanoid!()),
        category: Set(body.category.trim().to_string()),
        description: Set(body.description),
        created_at: Set(Utc::now().fixed_offset()),
    };

    match new_category.insert(&state.db).await {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(e) => {
            warn!("Failed to insert category: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create category",
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    put,
    tags = ["Category"],
    description = "Update a category by ID",
    path = "/{id}",
    request_body(content = UpdateCategoryBody, content_type = "application/json"),
    responses(
        (status = 200, description = "Category updated successfully", body = category::Model),
        (status = 404, description = "Category not found", body = String),
    )
)]
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateCategoryBody>,
) -> impl IntoResponse {
    let found = match category::Entity::find_by_id(&id).one(&state.db).await {
        Ok(Some(found)) => found,
        Ok(None) => return (StatusCode::NOT_FOUND, "Category not found").into_response(),
        Err(e) => {
            warn!("Failed to fetch category {}: {}", id, e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to update category",
            )
                .into_response();
        }
    };

    let mut ua: category::ActiveModel = found.into();
    if let Some(category) = body.category {
        ua.category = Set(category);
    }
    if let Some(description) = body.description {
        ua.description = Set(Some(description));
    }

    match ua.update(&state.db).await {
        Ok(updated) => (StatusCode::OK, Json(updated)).into_response(),
        Err(e) => {
            warn!("Failed to update category {}: {}", id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to update category",
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    delete,
    tags = ["Category"],
    description = "Delete a category by ID. Refused while posts still use it.",
    path = "/{id}",
    responses(
        (status = 200, description = "Category deleted successfully"),
        (status = 400, description = "Category still has posts", body = String),
        (status = 404, description = "Category not found", body = String),
    )
)]
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let found = match category::Entity::find_by_id(&id).one(&state.db).await {
        Ok(Some(found)) => found,
        Ok(None) => return (StatusCode::NOT_FOUND, "Category not found").into_response(),
        Err(e) => {
            warn!("Failed to fetch category {}: {}", id, e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to delete category",
            )
                .into_response();
        }
    };

    let in_use = match post::Entity::find()
        .filter(post::Column::Category.eq(&found.category))
        .one(&state.db)
        .await
    {
        Ok(first) => first.is_some(),
        Err(e) => {
            warn!("Failed to check posts for category {}: {}", id, e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to delete category",
            )
                .into_response();
        }
    };
    if in_use {
        return (
            StatusCode::BAD_REQUEST,
            "Category still has posts and cannot be deleted",
        )
            .into_response();
    }

    match found.delete(&state.db).await {
        Ok(_) => (StatusCode::OK, "Category deleted successfully").into_response(),
        Err(e) => {
            warn!("Failed to delete category {}: {}", id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to delete category",
            )
                .into_response()
        }
    }
}

pub fn category_router() -> Router<AppState> {
    let admin_only_route = Router::new()
        .route("/", post(create_category))
        .route("/{id}", put(update_category).delete(delete_category))
        .route_layer(permission_required!(AuthBackend, Permission::Admin));

    Router::new()
        .route("/", get(list_categories))
        .route("/{id}", get(get_category))
        .merge(admin_only_route)
}
