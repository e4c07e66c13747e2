use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use axum_login::permission_required;
use chrono::{Duration, Utc};
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
    entities::{j1_application, sea_orm_active_enums::ApplicationStatus},
    login_system::{AuthBackend, Permission},
    utils::{check_email, make_application_id, normalize_email},
};

const DEFAULT_PAGE_SIZE: u64 = 10;

#[derive(Deserialize, ToSchema)]
pub struct CreateApplicationBody {
    pub first_name: String,
    pub last_name: String,
    pub full_address: String,
    pub country: String,
    pub phone_number: String,
    pub email_address: String,
    pub profession: String,
    pub other_profession: Option<String>,
    pub confirm_eligibility: String,
    pub terms_and_condition: bool,
    pub resume_url: Option<String>,
    pub passport_url: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateStatusBody {
    pub status: ApplicationStatus,
}

#[derive(Deserialize)]
pub struct ListApplicationsQuery {
    pub status: Option<ApplicationStatus>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct ApplicationListResponse {
    pub success: bool,
    pub data: Vec<j1_application::Model>,
    pub total: u64,
    pub page: u64,
    pub pages: u64,
}

#[derive(Serialize, ToSchema)]
pub struct ApplicationCountResponse {
    pub success: bool,
    pub total_count: u64,
    pub pending_count: u64,
    pub recent_count: u64,
    pub status_breakdown: Vec<StatusCount>,
}

#[derive(Serialize, ToSchema)]
pub struct StatusCount {
    pub status: ApplicationStatus,
    pub count: i64,
}

/// Field checks applied before anything touches the database.
fn validate_application(body: &CreateApplicationBody) -> Result<(), &'static str> {
    let required = [
        &body.first_name,
        &body.last_name,
        &body.full_address,
        &body.country,
        &body.phone_number,
        &body.email_address,
        &body.profession,
        &body.confirm_eligibility,
    ];
    if required.iter().any(|f| f.trim().is_empty()) {
        return Err("Missing required fields");
    }

    if body.profession == "Other"
        && body
            .other_profession
            .as_deref()
            .is_none_or(|p| p.trim().is_empty())
    {
        return Err("Please specify your profession");
    }

    if !check_email(normalize_email(&body.email_address)) {
        return Err("Invalid email format");
    }

    if !body.terms_and_condition {
        return Err("Terms and conditions must be accepted");
    }

    Ok(())
}

#[utoipa::path(
    post,
    tags = ["Application"],
    description = "Submit a J1 visa application",
    path = "",
    request_body(content = CreateApplicationBody, content_type = "application/json"),
    responses(
        (status = 201, description = "Application submitted successfully", body = j1_application::Model),
        (status = 400, description = "Missing or invalid fields", body = String),
    )
)]
pub async fn create_application(
    State(state): State<AppState>,
    Json(body): Json<CreateApplicationBody>,
) -> impl IntoResponse {
    if let Err(message) = validate_application(&body) {
        return (StatusCode::BAD_REQUEST, message).into_response();
    }

    let email_address = normalize_email(&body.email_address);

    let new_application = j1_application::ActiveModel {
        id: Set(nanoid!()),
        application_id: Set(make_application_id(&body.first_name, &body.last_name)),
        first_name: Set(body.first_name),
        last_name: Set(body.last_name),
        full_address: Set(body.full_address),
        country: Set(body.country),
        phone_number: Set(body.phone_number),
        email_address: Set(email_address),
        profession: Set(body.profession),
        other_profession: Set(body.other_profession),
        confirm_eligibility: Set(body.confirm_eligibility),
        terms_and_condition: Set(body.terms_and_condition),
        resume_url: Set(body.resume_url),
        passport_url: Set(body.passport_url),
        status: Set(ApplicationStatus::New),
        created_at: Set(Utc::now().fixed_offset()),
    };

    match new_application.insert(&state.db).await {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(e) => {
            warn!("Failed to insert application: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to submit application",
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    get,
    tags = ["Application"],
    description = "List applications, newest first, optionally filtered by status",
    path = "",
    params(
        ("status" = Option<String>, Query, description = "Status filter"),
        ("page" = Option<u64>, Query, description = "1-based page number"),
        ("limit" = Option<u64>, Query, description = "Page size, default 10"),
    ),
    responses(
        (status = 200, description = "Applications fetched successfully", body = ApplicationListResponse),
    )
)]
pub async fn list_applications(
    State(state): State<AppState>,
    Query(query): Query<ListApplicationsQuery>,
) -> impl IntoResponse {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, 100);

    let mut find =
        j1_application::Entity::find().order_by_desc(j1_application::Column::CreatedAt);
    if let Some(status) = query.status {
        find = find.filter(j1_application::Column::Status.eq(status));
    }

    let paginator = find.paginate(&state.db, limit);
    let total = match paginator.num_items().await {
        Ok(total) => total,
        Err(e) => {
            warn!("Failed to count applications: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch applications",
            )
                .into_response();
        }
    };
    let applications = match paginator.fetch_page(page - 1).await {
        Ok(applications) => applications,
        Err(e) => {
            warn!("Failed to fetch applications page {}: {}", page, e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch applications",
            )
                .into_response();
        }
    };

    (
        StatusCode::OK,
        Json(ApplicationListResponse {
            success: true,
            data: applications,
            total,
            page,
            pages: total.div_ceil(limit),
        }),
    )
        .into_response()
}

#[utoipa::path(
    get,
    tags = ["Application"],
    description = "Application counts: total, pending, last 7 days, and per-status breakdown",
    path = "/count",
    responses(
        (status = 200, description = "Counts fetched successfully", body = ApplicationCountResponse),
    )
)]
pub async fn count_applications(State(state): State<AppState>) -> impl IntoResponse {
    let total_count = match j1_application::Entity::find().count(&state.db).await {
        Ok(n) => n,
        Err(e) => {
            warn!("Failed to count applications: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch applications count",
            )
                .into_response();
        }
    };

    let pending_count = match j1_application::Entity::find()
        .filter(
            j1_application::Column::Status
                .is_in([ApplicationStatus::New, ApplicationStatus::Pending]),
        )
        .count(&state.db)
        .await
    {
        Ok(n) => n,
        Err(e) => {
            warn!("Failed to count pending applications: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch applications count",
            )
                .into_response();
        }
    };

    let seven_days_ago = (Utc::now() - Duration::days(7)).fixed_offset();
    let recent_count = match j1_application::Entity::find()
        .filter(j1_application::Column::CreatedAt.gte(seven_days_ago))
        .count(&state.db)
        .await
    {
        Ok(n) => n,
        Err(e) => {
            warn!("Failed to count recent applications: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch applications count",
            )
                .into_response();
        }
    };

    let status_breakdown: Vec<(ApplicationStatus, i64)> = match j1_application::Entity::find()
        .select_only()
        .column(j1_application::Column::Status)
        .column_as(j1_application::Column::Id.count(), "count")
        .group_by(j1_application::Column::Status)
        .into_tuple()
        .all(&state.db)
        .await
    {
        Ok(rows) => rows,
        Err(e) => {
            warn!("Failed to group applications by status: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch applications count",
            )
                .into_response();
        }
    };

    (
        StatusCode::OK,
        Json(ApplicationCountResponse {
            success: true,
            total_count,
            pending_count,
            recent_count,
            status_breakdown: status_breakdown
                .into_iter()
                .map(|(status, count)| StatusCount { status, count })
                .collect(),
        }),
    )
        .into_response()
}

#[utoipa::path(
    get,
    tags = ["Application"],
    description = "Get an application by record id or by its human-readable application id",
    path = "/{id}",
    responses(
        (status = 200, description = "Application fetched successfully", body = j1_application::Model),
        (status = 404, description = "Application not found", body = String),
    )
)]
pub async fn get_application(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let by_id = match j1_application::Entity::find_by_id(&id).one(&state.db).await {
        Ok(found) => found,
        Err(e) => {
            warn!("Failed to fetch application {}: {}", id, e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch application",
            )
                .into_response();
        }
    };

    let found = match by_id {
        Some(found) => Some(found),
        None => match j1_application::Entity::find()
            .filter(j1_application::Column::ApplicationId.eq(&id))
            .one(&state.db)
            .await
        {
            Ok(found) => found,
            Err(e) => {
                warn!("Failed to fetch application {}: {}", id, e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to fetch application",
                )
                    .into_response();
            }
        },
    };

    match found {
        Some(application) => (StatusCode::OK, Json(application)).into_response(),
        None => (StatusCode::NOT_FOUND, "Application not found").into_response(),
    }
}

#[utoipa::path(
    put,
    tags = ["Application"],
    description = "Update an application's status",
    path = "/{id}/status",
    request_body(content = UpdateStatusBody, content_type = "application/json"),
    responses(
        (status = 200, description = "Status updated successfully", body = j1_application::Model),
        (status = 404, description = "Application not found", body = String),
    )
)]
pub async fn update_application_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateStatusBody>,
) -> impl IntoResponse {
    let found = match j1_application::Entity::find_by_id(&id).one(&state.db).await {
        Ok(Some(found)) => found,
        Ok(None) => return (StatusCode::NOT_FOUND, "Application not found").into_response(),
        Err(e) => {
            warn!("Failed to fetch application {}: {}", id, e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to update application",
            )
                .into_response();
        }
    };

    let mut ua: j1_application::ActiveModel = found.into();
    ua.status = Set(body.status);

    match ua.update(&state.db).await {
        Ok(updated) => (StatusCode::OK, Json(updated)).into_response(),
        Err(e) => {
            warn!("Failed to update application {}: {}", id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to update application",
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    delete,
    tags = ["Application"],
    description = "Delete an application",
    path = "/{id}",
    responses(
        (status = 200, description = "Application deleted successfully"),
        (status = 404, description = "Application not found", body = String),
    )
)]
pub async fn delete_application(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let found = match j1_application::Entity::find_by_id(&id).one(&state.db).await {
        Ok(Some(found)) => found,
        Ok(None) => return (StatusCode::NOT_FOUND, "Application not found").into_response(),
        Err(e) => {
            warn!("Failed to fetch application {}: {}", id, e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to delete application",
            )
                .into_response();
        }
    };

    match found.delete(&state.db).await {
        Ok(_) => (StatusCode::OK, "Application deleted successfully").into_response(),
        Err(e) => {
            warn!("Failed to delete application {}: {}", id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to delete application",
            )
                .into_response()
        }
    }
}

pub fn application_router() -> Router<AppState> {
    let admin_only_route = Router::new()
        .route("/{id}", delete(delete_application))
        .route_layer(permission_required!(AuthBackend, Permission::Admin));

    let dashboard_route = Router::new()
        .route("/", get(list_applications))
        .route("/count", get(count_applications))
        .route("/{id}", get(get_application))
        .route("/{id}/status", put(update_application_status))
        .route_layer(permission_required!(AuthBackend, Permission::Dashboard));

    Router::new()
        .route("/", post(create_application))
        .merge(dashboard_route)
        .merge(admin_only_route)
}

#[cfg(test)]
mod tests {
    use super::{CreateApplicationBody, validate_application};

    fn valid_body() -> CreateApplicationBody {
        CreateApplicationBody {
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            full_address: "1 Main St, Springfield".to_string(),
            country: "Ireland".to_string(),
            phone_number: "+353 1 234 5678".to_string(),
            email_address: "jane.doe@example.com".to_string(),
            profession: "Nurse".to_string(),
            other_profession: None,
            confirm_eligibility: "yes".to_string(),
            terms_and_condition: true,
            resume_url: None,
            passport_url: None,
        }
    }

    #[test]
    fn test_valid_application_passes() {
        assert!(validate_application(&valid_body()).is_ok());
    }

    #[test]
    fn test_missing_required_field_rejected() {
        let mut body = valid_body();
        body.country = "   ".to_string();
        assert_eq!(
            validate_application(&body),
            Err("Missing required fields")
        );
    }

    #[test]
    fn test_other_profession_requires_detail() {
        let mut body = valid_body();
        body.profession = "Other".to_string();
        body.other_profession = None;
        assert_eq!(
            validate_application(&body),
            Err("Please specify your profession")
        );

        body.other_profession = Some("  ".to_string());
        assert_eq!(
            validate_application(&body),
            Err("Please specify your profession")
        );

        body.other_profession = Some("Dental technician".to_string());
        assert!(validate_application(&body).is_ok());
    }

    #[test]
    fn test_other_rule_only_applies_to_other() {
        let mut body = valid_body();
        body.profession = "Nurse".to_string();
        body.other_profession = None;
        assert!(validate_application(&body).is_ok());
    }

    #[test]
    fn test_invalid_email_rejected() {
        let mut body = valid_body();
        body.email_address = "jane.example.com".to_string();
        assert_eq!(validate_application(&body), Err("Invalid email format"));
    }

    #[test]
    fn test_terms_must_be_accepted() {
        let mut body = valid_body();
        body.terms_and_condition = false;
        assert_eq!(
            validate_application(&body),
            Err("Terms and conditions must be accepted")
        );
    }
}
