use axum::{
    Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get,
};
use axum_login::permission_required;
use chrono::{DateTime, Duration, FixedOffset, Utc};
use sea_orm::{
    ColumnTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use serde::Serialize;
use tracing::warn;
use utoipa::ToSchema;

use crate::{
    AppState,
    entities::{j1_application, post, sea_orm_active_enums::ApplicationStatus},
    login_system::{AuthBackend, Permission},
};

#[derive(Serialize, ToSchema)]
pub struct DashboardStats {
    pub total_posts: u64,
    pub recent_posts: u64,
    pub total_applications: u64,
    pub pending_applications: u64,
    pub recent_applications: u64,
    pub posts_by_category: Vec<CategoryCount>,
    pub applications_by_status: Vec<StatusCount>,
    pub recent_activity: Vec<ActivityItem>,
    pub posts_growth_rate: f64,
    pub applications_growth_rate: f64,
}

#[derive(Serialize, ToSchema)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

#[derive(Serialize, ToSchema)]
pub struct StatusCount {
    pub status: ApplicationStatus,
    pub count: i64,
}

#[derive(Serialize, ToSchema)]
pub struct ActivityItem {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub id: String,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<FixedOffset>,
    pub link: String,
}

/// Growth of the last 30 days against the 30 days before, in percent.
fn growth_rate(last: u64, previous: u64) -> f64 {
    if previous == 0 {
        if last > 0 { 100.0 } else { 0.0 }
    } else {
        (last as f64 - previous as f64) / previous as f64 * 100.0
    }
}

async fn collect_stats(state: &AppState) -> Result<DashboardStats, DbErr> {
    let now = Utc::now();
    let seven_days_ago = (now - Duration::days(7)).fixed_offset();
    let thirty_days_ago = (now - Duration::days(30)).fixed_offset();
    let sixty_days_ago = (now - Duration::days(60)).fixed_offset();

    let total_posts = post::Entity::find().count(&state.db).await?;
    let recent_posts = post::Entity::find()
        .filter(post::Column::CreatedAt.gte(seven_days_ago))
        .count(&state.db)
        .await?;

    let total_applications = j1_application::Entity::find().count(&state.db).await?;
    let pending_applications = j1_application::Entity::find()
        .filter(
            j1_application::Column::Status
                .is_in([ApplicationStatus::New, ApplicationStatus::Pending]),
        )
        .count(&state.db)
        .await?;
    let recent_applications = j1_application::Entity::find()
        .filter(j1_application::Column::CreatedAt.gte(seven_days_ago))
        .count(&state.db)
        .await?;

    let posts_by_category: Vec<(String, i64)> = post::Entity::find()
        .select_only()
        .column(post::Column::Category)
        .column_as(post::Column::Id.count(), "count")
        .group_by(post::Column::Category)
        .into_tuple()
        .all(&state.db)
        .await?;

    let applications_by_status: Vec<(ApplicationStatus, i64)> = j1_application::Entity::find()
        .select_only()
        .column(j1_application::Column::Status)
        .column_as(j1_application::Column::Id.count(), "count")
        .group_by(j1_application::Column::Status)
        .into_tuple()
        .all(&state.db)
        .await?;

    let latest_posts = post::Entity::find()
        .filter(post::Column::CreatedAt.gte(seven_days_ago))
        .order_by_desc(post::Column::CreatedAt)
        .limit(5)
        .all(&state.db)
        .await?;
    let latest_applications = j1_application::Entity::find()
        .filter(j1_application::Column::CreatedAt.gte(seven_days_ago))
        .order_by_desc(j1_application::Column::CreatedAt)
        .limit(5)
        .all(&state.db)
        .await?;

    let mut recent_activity: Vec<ActivityItem> = latest_posts
        .into_iter()
        .map(|p| ActivityItem {
            kind: "post",
            id: p.id,
            title: p.title,
            description: format!("New post by {}", p.author),
            created_at: p.created_at,
            link: format!("/blogs/{}", p.slug),
        })
        .chain(latest_applications.into_iter().map(|a| ActivityItem {
            kind: "application",
            id: a.id.clone(),
            title: format!("{} {}", a.first_name, a.last_name),
            description: format!("New J1 visa application ({:?})", a.status),
            created_at: a.created_at,
            link: format!("/dashboard/forms/{}", a.id),
        }))
        .collect();
    recent_activity.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    recent_activity.truncate(10);

    let posts_last_month = post::Entity::find()
        .filter(post::Column::CreatedAt.gte(thirty_days_ago))
        .count(&state.db)
        .await?;
    let posts_previous_month = post::Entity::find()
        .filter(post::Column::CreatedAt.gte(sixty_days_ago))
        .filter(post::Column::CreatedAt.lt(thirty_days_ago))
        .count(&state.db)
        .await?;
    let applications_last_month = j1_application::Entity::find()
        .filter(j1_application::Column::CreatedAt.gte(thirty_days_ago))
        .count(&state.db)
        .await?;
    let applications_previous_month = j1_application::Entity::find()
        .filter(j1_application::Column::CreatedAt.gte(sixty_days_ago))
        .filter(j1_application::Column::CreatedAt.lt(thirty_days_ago))
        .count(&state.db)
        .await?;

    Ok(DashboardStats {
        total_posts,
        recent_posts,
        total_applications,
        pending_applications,
        recent_applications,
        posts_by_category: posts_by_category
            .into_iter()
            .map(|(category, count)| CategoryCount { category, count })
            .collect(),
        applications_by_status: applications_by_status
            .into_iter()
            .map(|(status, count)| StatusCount { status, count })
            .collect(),
        recent_activity,
        posts_growth_rate: growth_rate(posts_last_month, posts_previous_month),
        applications_growth_rate: growth_rate(applications_last_month, applications_previous_month),
    })
}

#[utoipa::path(
    get,
    tags = ["Dashboard"],
    description = "Aggregated statistics for the admin dashboard",
    path = "",
    responses(
        (status = 200, description = "Statistics fetched successfully", body = DashboardStats),
        (status = 403, description = "Dashboard access not granted"),
    )
)]
pub async fn dashboard_stats(State(state): State<AppState>) -> impl IntoResponse {
    match collect_stats(&state).await {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(e) => {
            warn!("Failed to collect dashboard stats: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch dashboard statistics",
            )
                .into_response()
        }
    }
}

pub fn dashboard_router() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard_stats))
        .route_layer(permission_required!(AuthBackend, Permission::Dashboard))
}

#[cfg(test)]
mod tests {
    use super::growth_rate;

    #[test]
    fn test_growth_rate_against_previous_window() {
        assert_eq!(growth_rate(15, 10), 50.0);
        assert_eq!(growth_rate(5, 10), -50.0);
        assert_eq!(growth_rate(10, 10), 0.0);
    }

    #[test]
    fn test_growth_rate_from_empty_window() {
        assert_eq!(growth_rate(3, 0), 100.0);
        assert_eq!(growth_rate(0, 0), 0.0);
    }
}
