use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use axum_login::permission_required;
use chrono::Utc;
use nanoid::nanoid;
use sea_orm::{
    ActiveModelTrait,
    ActiveValue::Set,
    ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;

use crate::{
    AppState,
    entities::{category, post},
    login_system::{AuthBackend, Permission},
};

const DEFAULT_PAGE_SIZE: u64 = 10;
const RECOMMENDED_COUNT: u64 = 3;

#[derive(Deserialize)]
pub struct ListPostsQuery {
    pub category: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Deserialize)]
pub struct RecommendedQuery {
    pub category: Option<String>,
    pub current_slug: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreatePostBody {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub author: String,
    pub category: String,
    pub image_url: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdatePostBody {
    pub title: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct Pagination {
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub pages: u64,
}

#[derive(Serialize, ToSchema)]
pub struct PostListResponse {
    pub success: bool,
    pub data: Vec<post::Model>,
    pub pagination: Pagination,
}

#[derive(Serialize, ToSchema)]
pub struct PostCountResponse {
    pub success: bool,
    pub total: u64,
    pub by_category: Vec<CategoryCount>,
}

#[derive(Serialize, ToSchema)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

#[utoipa::path(
    get,
    tags = ["Post"],
    description = "List posts, newest first, optionally filtered by category",
    path = "",
    params(
        ("category" = Option<String>, Query, description = "Category name filter"),
        ("page" = Option<u64>, Query, description = "1-based page number"),
        ("limit" = Option<u64>, Query, description = "Page size, default 10"),
    ),
    responses(
        (status = 200, description = "Posts fetched successfully", body = PostListResponse),
    )
)]
pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<ListPostsQuery>,
) -> impl IntoResponse {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, 100);

    let mut find = post::Entity::find().order_by_desc(post::Column::CreatedAt);
    if let Some(category) = query.category {
        find = find.filter(post::Column::Category.eq(category));
    }

    let paginator = find.paginate(&state.db, limit);
    let total = match paginator.num_items().await {
        Ok(total) => total,
        Err(e) => {
            warn!("Failed to count posts: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch posts").into_response();
        }
    };
    let posts = match paginator.fetch_page(page - 1).await {
        Ok(posts) => posts,
        Err(e) => {
            warn!("Failed to fetch posts page {}: {}", page, e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch posts").into_response();
        }
    };

    (
        StatusCode::OK,
        Json(PostListResponse {
            success: true,
            data: posts,
            pagination: Pagination {
                total,
                page,
                limit,
                pages: total.div_ceil(limit),
            },
        }),
    )
        .into_response()
}

#[utoipa::path(
    post,
    tags = ["Post"],
    description = "Create a new post. The category must already exist.",
    path = "",
    request_body(content = CreatePostBody, content_type = "application/json"),
    responses(
        (status = 201, description = "Post created successfully", body = post::Model),
        (status = 400, description = "Category does not exist or slug taken", body = String),
    )
)]
pub async fn create_post(
    State(state): State<AppState>,
    Json(body): Json<CreatePostBody>,
) -> impl IntoResponse {
    let category_exists = match category::Entity::find()
        .filter(category::Column::Category.eq(&body.category))
        .one(&state.db)
        .await
    {
        Ok(found) => found.is_some(),
        Err(e) => {
            warn!("Failed to check category {}: {}", body.category, e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create post").into_response();
        }
    };
    if !category_exists {
        return (StatusCode::BAD_REQUEST, "Category does not exist").into_response();
    }

    match post::Entity::find()
        .filter(post::Column::Slug.eq(&body.slug))
        .one(&state.db)
        .await
    {
        Ok(Some(_)) => {
            return (StatusCode::BAD_REQUEST, "A post with this slug already exists")
                .into_response();
        }
        Ok(None) => {}
        Err(e) => {
            warn!("Failed to check slug {}: {}", body.slug, e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create post").into_response();
        }
    }

    let now = Utc::now().fixed_offset();
    let new_post = post::ActiveModel {
        id: Set(nanoid!()),
        title: Set(body.title),
        slug: Set(body.slug),
        content: Set(body.content),
        author: Set(body.author),
        category: Set(body.category),
        image_url: Set(body.image_url),
        created_at: Set(now),
        updated_at: Set(now),
    };

    match new_post.insert(&state.db).await {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(e) => {
            warn!("Failed to insert post: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create post").into_response()
        }
    }
}

#[utoipa::path(
    get,
    tags = ["Post"],
    description = "Total post count with a per-category breakdown",
    path = "/count",
    responses(
        (status = 200, description = "Counts fetched successfully", body = PostCountResponse),
    )
)]
pub async fn count_posts(State(state): State<AppState>) -> impl IntoResponse {
    let total = match post::Entity::find().count(&state.db).await {
        Ok(total) => total,
        Err(e) => {
            warn!("Failed to count posts: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to count posts").into_response();
        }
    };

    let by_category: Vec<(String, i64)> = match post::Entity::find()
        .select_only()
        .column(post::Column::Category)
        .column_as(post::Column::Id.count(), "count")
        .group_by(post::Column::Category)
        .into_tuple()
        .all(&state.db)
        .await
    {
        Ok(rows) => rows,
        Err(e) => {
            warn!("Failed to group posts by category: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to count posts").into_response();
        }
    };

    (
        StatusCode::OK,
        Json(PostCountResponse {
            success: true,
            total,
            by_category: by_category
                .into_iter()
                .map(|(category, count)| CategoryCount { category, count })
                .collect(),
        }),
    )
        .into_response()
}

#[utoipa::path(
    get,
    tags = ["Post"],
    description = "Up to 3 recommended posts, same category first, excluding the current one",
    path = "/recommended",
    params(
        ("category" = Option<String>, Query, description = "Preferred category"),
        ("current_slug" = Option<String>, Query, description = "Slug to exclude"),
    ),
    responses(
        (status = 200, description = "Recommended posts", body = Vec<post::Model>),
    )
)]
pub async fn recommended_posts(
    State(state): State<AppState>,
    Query(query): Query<RecommendedQuery>,
) -> impl IntoResponse {
    let mut find = post::Entity::find().order_by_desc(post::Column::CreatedAt);
    if let Some(ref category) = query.category {
        find = find.filter(post::Column::Category.eq(category));
    }
    if let Some(ref slug) = query.current_slug {
        find = find.filter(post::Column::Slug.ne(slug));
    }

    let mut recommended = match find.limit(RECOMMENDED_COUNT).all(&state.db).await {
        Ok(posts) => posts,
        Err(e) => {
            warn!("Failed to fetch recommended posts: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch recommended posts",
            )
                .into_response();
        }
    };

    // Backfill from other categories, skipping slugs already picked
    if (recommended.len() as u64) < RECOMMENDED_COUNT {
        let mut backfill = post::Entity::find().order_by_desc(post::Column::CreatedAt);
        if let Some(ref slug) = query.current_slug {
            backfill = backfill.filter(post::Column::Slug.ne(slug));
        }
        match backfill.limit(RECOMMENDED_COUNT).all(&state.db).await {
            Ok(extra) => {
                recommended = fill_recommended(recommended, extra, RECOMMENDED_COUNT as usize);
            }
            Err(e) => {
                warn!("Failed to backfill recommended posts: {}", e);
            }
        }
    }

    (StatusCode::OK, Json(recommended)).into_response()
}

fn fill_recommended(
    mut picked: Vec<post::Model>,
    backfill: Vec<post::Model>,
    want: usize,
) -> Vec<post::Model> {
    for p in backfill {
        if picked.len() >= want {
            break;
        }
        if picked.iter().all(|r| r.slug != p.slug) {
            picked.push(p);
        }
    }
    picked
}

#[utoipa::path(
    get,
    tags = ["Post"],
    description = "Get a post by slug",
    path = "/{slug}",
    responses(
        (status = 200, description = "Post fetched successfully", body = post::Model),
        (status = 404, description = "Post not found", body = String),
    )
)]
pub async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> impl IntoResponse {
    match post::Entity::find()
        .filter(post::Column::Slug.eq(&slug))
        .one(&state.db)
        .await
    {
        Ok(Some(found)) => (StatusCode::OK, Json(found)).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "Post not found").into_response(),
        Err(e) => {
            warn!("Failed to fetch post {}: {}", slug, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch post").into_response()
        }
    }
}

#[utoipa::path(
    put,
    tags = ["Post"],
    description = "Update a post by slug",
    path = "/{slug}",
    request_body(content = UpdatePostBody, content_type = "application/json"),
    responses(
        (status = 200, description = "Post updated successfully", body = post::Model),
        (status = 404, description = "Post not found", body = String),
    )
)]
pub async fn update_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(body): Json<UpdatePostBody>,
) -> impl IntoResponse {
    let found = match post::Entity::find()
        .filter(post::Column::Slug.eq(&slug))
        .one(&state.db)
        .await
    {
        Ok(Some(found)) => found,
        Ok(None) => return (StatusCode::NOT_FOUND, "Post not found").into_response(),
        Err(e) => {
            warn!("Failed to fetch post {}: {}", slug, e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to update post").into_response();
        }
    };

    if let Some(ref category) = body.category {
        let exists = match category::Entity::find()
            .filter(category::Column::Category.eq(category))
            .one(&state.db)
            .await
        {
            Ok(found) => found.is_some(),
            Err(e) => {
                warn!("Failed to check category {}: {}", category, e);
                return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to update post")
                    .into_response();
            }
        };
        if !exists {
            return (StatusCode::BAD_REQUEST, "Category does not exist").into_response();
        }
    }

    let mut ua: post::ActiveModel = found.into();
    if let Some(title) = body.title {
        ua.title = Set(title);
    }
    if let Some(content) = body.content {
        ua.content = Set(content);
    }
    if let Some(author) = body.author {
        ua.author = Set(author);
    }
    if let Some(category) = body.category {
        ua.category = Set(category);
    }
    if let Some(image_url) = body.image_url {
        ua.image_url = Set(Some(image_url));
    }
    ua.updated_at = Set(Utc::now().fixed_offset());

    match ua.update(&state.db).await {
        Ok(updated) => (StatusCode::OK, Json(updated)).into_response(),
        Err(e) => {
            warn!("Failed to update post {}: {}", slug, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to update post").into_response()
        }
    }
}

#[utoipa::path(
    delete,
    tags = ["Post"],
    description = "Delete a post by slug",
    path = "/{slug}",
    responses(
        (status = 200, description = "Post deleted successfully"),
        (status = 404, description = "Post not found", body = String),
    )
)]
pub async fn delete_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> impl IntoResponse {
    let found = match post::Entity::find()
        .filter(post::Column::Slug.eq(&slug))
        .one(&state.db)
        .await
    {
        Ok(Some(found)) => found,
        Ok(None) => return (StatusCode::NOT_FOUND, "Post not found").into_response(),
        Err(e) => {
            warn!("Failed to fetch post {}: {}", slug, e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete post").into_response();
        }
    };

    match found.delete(&state.db).await {
        Ok(_) => (StatusCode::OK, "Post deleted successfully").into_response(),
        Err(e) => {
            warn!("Failed to delete post {}: {}", slug, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete post").into_response()
        }
    }
}

pub fn post_router() -> Router<AppState> {
    let admin_only_route = Router::new()
        .route("/", post(create_post))
        .route("/{slug}", put(update_post).delete(delete_post))
        .route_layer(permission_required!(AuthBackend, Permission::Admin));

    Router::new()
        .route("/", get(list_posts))
        .route("/count", get(count_posts))
        .route("/recommended", get(recommended_posts))
        .route("/{slug}", get(get_post))
        .merge(admin_only_route)
}

#[cfg(test)]
mod tests {
    use super::fill_recommended;
    use crate::entities::post;
    use chrono::Utc;

    fn make_post(slug: &str) -> post::Model {
        post::Model {
            id: slug.to_string(),
            title: format!("Post {}", slug),
            slug: slug.to_string(),
            content: "body".to_string(),
            author: "Admin".to_string(),
            category: "News".to_string(),
            image_url: None,
            created_at: Utc::now().fixed_offset(),
            updated_at: Utc::now().fixed_offset(),
        }
    }

    #[test]
    fn test_backfill_skips_already_picked_slugs() {
        let picked = vec![make_post("a"), make_post("b")];
        let backfill = vec![make_post("a"), make_post("b"), make_post("c")];
        let result = fill_recommended(picked, backfill, 3);
        let slugs: Vec<&str> = result.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_backfill_stops_at_limit() {
        let picked = vec![make_post("a")];
        let backfill = vec![make_post("b"), make_post("c"), make_post("d")];
        let result = fill_recommended(picked, backfill, 3);
        let slugs: Vec<&str> = result.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_full_pick_ignores_backfill() {
        let picked = vec![make_post("a"), make_post("b"), make_post("c")];
        let backfill = vec![make_post("d")];
        let result = fill_recommended(picked, backfill, 3);
        assert_eq!(result.len(), 3);
        assert!(result.iter().all(|p| p.slug != "d"));
    }

    #[test]
    fn test_empty_pick_filled_from_backfill() {
        let result = fill_recommended(vec![], vec![make_post("a"), make_post("b")], 3);
        assert_eq!(result.len(), 2);
    }
}
