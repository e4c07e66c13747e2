use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use nanoid::nanoid;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;

use crate::{
    AppState, argon_hasher,
    entities::{sea_orm_active_enums::Role, user},
    login_system::{AuthSession, Credentials},
    utils::{check_email, normalize_email},
};

#[derive(Deserialize, ToSchema)]
pub struct RegisterBody {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub email_verified: bool,
}

/// What the API shows of an account; the password hash never leaves the
/// server.
#[derive(Serialize, ToSchema)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub email_verified: bool,
    pub role: Role,
    pub is_allowed_dashboard: bool,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            email_verified: model.email_verified,
            role: model.role,
            is_allowed_dashboard: model.is_allowed_dashboard,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct RegisterResponse {
    pub success: bool,
    pub user: UserResponse,
}

#[utoipa::path(
    post,
    tags = ["User"],
    description = "Register a new account",
    path = "/register",
    request_body(content = RegisterBody, content_type = "application/json"),
    responses(
        (status = 201, description = "Account created", body = RegisterResponse),
        (status = 400, description = "Missing or invalid fields", body = String),
        (status = 409, description = "Email already registered", body = String),
        (status = 500, description = "Internal server error", body = String),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterBody>,
) -> impl IntoResponse {
    let email = normalize_email(&body.email);
    if body.username.trim().is_empty() || email.is_empty() || body.password.is_empty() {
        return (StatusCode::BAD_REQUEST, "Missing required fields").into_response();
    }
    if !check_email(&email) {
        return (StatusCode::BAD_REQUEST, "Invalid email format").into_response();
    }

    match user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .one(&state.db)
        .await
    {
        Ok(Some(_)) => {
            return (
                StatusCode::CONFLICT,
                "User with this email already exists",
            )
                .into_response();
        }
        Ok(None) => {}
        Err(e) => {
            warn!("Failed to check for existing user {}: {}", email, e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to register user").into_response();
        }
    }

    let password_hash = match argon_hasher::hash(body.password.as_bytes()).await {
        Ok(h) => h,
        Err(_) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to hash password").into_response();
        }
    };

    let new_user = user::ActiveModel {
        id: Set(nanoid!()),
        username: Set(body.username.trim().to_string()),
        email: Set(email),
        password: Set(password_hash),
        email_verified: Set(body.email_verified),
        role: Set(Role::User),
        is_allowed_dashboard: Set(false),
        is_temporary_password: Set(false),
        reset_token: Set(None),
        reset_token_expires: Set(None),
        reset_attempts: Set(None),
        created_at: Set(Utc::now().fixed_offset()),
    };

    match new_user.insert(&state.db).await {
        Ok(created) => (
            StatusCode::CREATED,
            Json(RegisterResponse {
                success: true,
                user: created.into(),
            }),
        )
            .into_response(),
        Err(e) => {
            warn!("Failed to insert user: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to register user").into_response()
        }
    }
}

#[utoipa::path(
    post,
    tags = ["User"],
    description = "Sign in with email and password",
    path = "/login",
    request_body(content = Credentials, content_type = "application/json"),
    responses(
        (status = 200, description = "Signed in", body = UserResponse),
        (status = 401, description = "Invalid credentials", body = String),
        (status = 500, description = "Internal server error", body = String),
    )
)]
pub async fn login(
    mut session: AuthSession,
    Json(creds): Json<Credentials>,
) -> impl IntoResponse {
    let user = match session.authenticate(creds).await {
        Ok(Some(user)) => user,
        Ok(None) => return (StatusCode::UNAUTHORIZED, "Invalid email or password").into_response(),
        Err(e) => {
            warn!("Authentication failed: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to sign in").into_response();
        }
    };

    if session.login(&user).await.is_err() {
        return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to sign in").into_response();
    }

    (StatusCode::OK, Json(UserResponse::from(user))).into_response()
}

#[utoipa::path(
    get,
    tags = ["User"],
    description = "Sign out of the current session",
    path = "/logout",
    responses(
        (status = 200, description = "Signed out", body = String),
    )
)]
pub async fn logout(mut session: AuthSession) -> impl IntoResponse {
    match session.logout().await {
        Ok(_) => (StatusCode::OK, "Signed out").into_response(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Failed to sign out").into_response(),
    }
}

#[utoipa::path(
    get,
    tags = ["User"],
    description = "Current account profile",
    path = "/profile",
    responses(
        (status = 200, description = "Profile", body = UserResponse),
        (status = 401, description = "Not signed in", body = String),
    )
)]
pub async fn profile(session: AuthSession) -> impl IntoResponse {
    match session.user {
        Some(user) => (StatusCode::OK, Json(UserResponse::from(user))).into_response(),
        None => (StatusCode::UNAUTHORIZED, "Unauthorized").into_response(),
    }
}

pub fn user_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/profile", get(profile))
}
