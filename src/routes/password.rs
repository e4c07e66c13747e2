use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use redis::{AsyncCommands, RedisError};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, ExprTrait, QueryFilter,
    sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use string_builder::Builder;
use tracing::warn;
use utoipa::ToSchema;

use crate::{
    AppState, argon_hasher,
    constants::RESET_TOKEN_TTL_HOURS,
    email_client::send_email,
    entities::user,
    reset_token::{ResetState, TokenCheck, check_token, generate_temporary_password},
    utils::normalize_email,
};

#[derive(Deserialize, ToSchema)]
pub struct ForgotPasswordBody {
    pub email: String,
    /// When set, a generated temporary password is mailed alongside the
    /// reset link and becomes the active credential.
    #[serde(default)]
    pub send_temporary_password: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct ResetPasswordBody {
    pub token: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ValidateTokenQuery {
    pub token: Option<String>,
    pub email: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct ValidateTokenResponse {
    pub valid: bool,
    #[serde(rename = "attemptsLeft", skip_serializing_if = "Option::is_none")]
    pub attempts_left: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

const GENERIC_INVALID: &str = "Invalid or expired password reset token";
const MAX_ATTEMPTS_MESSAGE: &str =
    "Maximum password reset attempts reached. Please request a new password reset.";

fn not_revealing_success() -> (StatusCode, Json<MessageResponse>) {
    (
        StatusCode::OK,
        Json(MessageResponse {
            success: true,
            message: "If your email exists in our system, you will receive a password reset link"
                .to_string(),
        }),
    )
}

#[utoipa::path(
    post,
    tags = ["Password"],
    description = "Request a password reset link. Always returns 200 to avoid email enumeration.",
    path = "/forgot-password",
    request_body(content = ForgotPasswordBody, content_type = "application/json"),
    responses(
        (status = 200, description = "If the email exists, a reset link has been sent", body = MessageResponse),
        (status = 400, description = "Email is missing", body = String),
        (status = 500, description = "Internal server error", body = String),
    )
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<ForgotPasswordBody>,
) -> impl IntoResponse {
    let email = normalize_email(&body.email);
    if email.is_empty() {
        return (StatusCode::BAD_REQUEST, "Email is required").into_response();
    }

    let found = match user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .one(&state.db)
        .await
    {
        Ok(found) => found,
        Err(e) => {
            warn!("Failed to query user {} for password reset: {}", email, e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to query user").into_response();
        }
    };

    // Absent accounts get the same response shape, no email, no writes.
    let Some(u) = found else {
        return not_revealing_success().into_response();
    };

    let reset = ResetState::issue(Utc::now());
    let reset_url = format!(
        "{}/reset-password?token={}&email={}",
        state.app_url, reset.token, email
    );

    let temporary_password = if body.send_temporary_password {
        Some(generate_temporary_password())
    } else {
        None
    };

    let mut ua: user::ActiveModel = u.into();
    ua.reset_token = Set(Some(reset.token));
    ua.reset_token_expires = Set(Some(reset.expires_at.fixed_offset()));
    ua.reset_attempts = Set(Some(0));
    if let Some(ref temp) = temporary_password {
        let temp_hash = match argon_hasher::hash(temp.as_bytes()).await {
            Ok(h) => h,
            Err(_) => {
                return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to hash password")
                    .into_response();
            }
        };
        ua.password = Set(temp_hash);
        ua.is_temporary_password = Set(true);
    }

    if let Err(e) = ua.update(&state.db).await {
        warn!("Failed to store reset token for {}: {}", email, e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to create reset record",
        )
            .into_response();
    }

    let mut body_builder = Builder::default();
    body_builder.append("We received a request to reset your password.\n\n");
    body_builder.append("Open the link below to set a new password:\n");
    body_builder.append(reset_url);
    body_builder.append(format!(
        "\n\nThis link will expire in {RESET_TOKEN_TTL_HOURS} hours."
    ));
    if let Some(temp) = temporary_password {
        body_builder.append("\n\nAlternatively, sign in with this temporary password: ");
        body_builder.append(temp);
        body_builder.append("\nPlease change it right after signing in.");
    }
    body_builder.append(
        "\n\nIf you didn't request this password reset, you can ignore this email - your account is still secure.",
    );
    let email_body = body_builder.string().unwrap();

    if send_email(&email, "Password Reset Request", email_body)
        .await
        .is_err()
    {
        return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to send email").into_response();
    }

    (
        StatusCode::OK,
        Json(MessageResponse {
            success: true,
            message: "Password reset link sent to your email address".to_string(),
        }),
    )
        .into_response()
}

#[utoipa::path(
    get,
    tags = ["Password"],
    description = "Validate a reset token. Every successful check costs one attempt.",
    path = "/reset-password",
    params(
        ("token" = String, Query, description = "Reset token from the emailed link"),
        ("email" = String, Query, description = "Account email"),
    ),
    responses(
        (status = 200, description = "Validation result", body = ValidateTokenResponse),
        (status = 400, description = "Missing parameters or invalid token", body = ValidateTokenResponse),
        (status = 500, description = "Internal server error", body = String),
    )
)]
pub async fn validate_reset_token(
    State(state): State<AppState>,
    Query(query): Query<ValidateTokenQuery>,
) -> impl IntoResponse {
    let (Some(token), Some(email)) = (query.token, query.email) else {
        return (StatusCode::BAD_REQUEST, "Missing token or email").into_response();
    };
    let email = normalize_email(&email);

    let u = match user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .one(&state.db)
        .await
    {
        Ok(Some(u)) => u,
        Ok(None) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ValidateTokenResponse {
                    valid: false,
                    attempts_left: None,
                    error: Some("Invalid or expired token".to_string()),
                }),
            )
                .into_response();
        }
        Err(e) => {
            warn!("Failed to query user {} for token validation: {}", email, e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to validate token").into_response();
        }
    };

    let reset = ResetState::from_fields(
        u.reset_token.clone(),
        u.reset_token_expires,
        u.reset_attempts,
    );

    match check_token(reset.as_ref(), &token, Utc::now()) {
        TokenCheck::Invalid => (
            StatusCode::BAD_REQUEST,
            Json(ValidateTokenResponse {
                valid: false,
                attempts_left: None,
                error: Some("Invalid or expired token".to_string()),
            }),
        )
            .into_response(),
        TokenCheck::Exhausted => (
            StatusCode::OK,
            Json(ValidateTokenResponse {
                valid: false,
                attempts_left: None,
                error: Some(MAX_ATTEMPTS_MESSAGE.to_string()),
            }),
        )
            .into_response(),
        TokenCheck::Valid { attempts_left } => {
            // The check is a read with a side effect: charge the attempt now
            // so replayed requests cannot probe the token for free. The
            // increment happens in the database so concurrent checks each
            // pay, instead of overwriting one another's counter.
            let charge = user::Entity::update_many()
                .col_expr(
                    user::Column::ResetAttempts,
                    Expr::col(user::Column::ResetAttempts).if_null(0).add(1),
                )
                .filter(user::Column::Email.eq(&email))
                .filter(user::Column::ResetToken.eq(&token))
                .exec(&state.db)
                .await;
            if let Err(e) = charge {
                warn!("Failed to charge reset attempt for {}: {}", email, e);
                return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to validate token")
                    .into_response();
            }

            (
                StatusCode::OK,
                Json(ValidateTokenResponse {
                    valid: true,
                    attempts_left: Some(attempts_left),
                    error: None,
                }),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    post,
    tags = ["Password"],
    description = "Consume a reset token and set a new password.",
    path = "/reset-password",
    request_body(content = ResetPasswordBody, content_type = "application/json"),
    responses(
        (status = 200, description = "Password reset successfully", body = MessageResponse),
        (status = 400, description = "Missing fields, invalid token, or attempts exhausted", body = String),
        (status = 500, description = "Internal server error", body = String),
    )
)]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordBody>,
) -> impl IntoResponse {
    let token = body.token.trim().to_string();
    let email = normalize_email(&body.email);
    if token.is_empty() || email.is_empty() || body.password.is_empty() {
        return (StatusCode::BAD_REQUEST, "Missing required fields").into_response();
    }

    let u = match user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .one(&state.db)
        .await
    {
        Ok(Some(u)) => u,
        Ok(None) => return (StatusCode::BAD_REQUEST, GENERIC_INVALID).into_response(),
        Err(e) => {
            warn!("Failed to query user {} for password reset: {}", email, e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to reset password").into_response();
        }
    };

    let reset = ResetState::from_fields(
        u.reset_token.clone(),
        u.reset_token_expires,
        u.reset_attempts,
    );

    match check_token(reset.as_ref(), &token, Utc::now()) {
        TokenCheck::Invalid => (StatusCode::BAD_REQUEST, GENERIC_INVALID).into_response(),
        TokenCheck::Exhausted => {
            // Force the expiry into the past instead of clearing the fields,
            // leaving an audit trace of the exhausted token.
            let mut ua: user::ActiveModel = u.into();
            ua.reset_token_expires = Set(Some(DateTime::UNIX_EPOCH.fixed_offset()));
            if let Err(e) = ua.update(&state.db).await {
                warn!("Failed to invalidate exhausted token for {}: {}", email, e);
                return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to reset password")
                    .into_response();
            }
            (StatusCode::BAD_REQUEST, MAX_ATTEMPTS_MESSAGE).into_response()
        }
        TokenCheck::Valid { .. } => {
            let new_hash = match argon_hasher::hash(body.password.as_bytes()).await {
                Ok(h) => h,
                Err(_) => {
                    return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to hash password")
                        .into_response();
                }
            };

            let user_id = u.id.clone();
            let mut ua: user::ActiveModel = u.into();
            ua.password = Set(new_hash);
            ua.is_temporary_password = Set(false);
            ua.reset_token = Set(None);
            ua.reset_token_expires = Set(None);
            ua.reset_attempts = Set(None);

            if let Err(e) = ua.update(&state.db).await {
                warn!("Failed to update password for {}: {}", email, e);
                return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to update password")
                    .into_response();
            }

            // Password changed, drop the cached user
            let mut redis = state.redis.clone();
            let _: Result<(), RedisError> = redis.del(format!("user_{user_id}")).await;

            (
                StatusCode::OK,
                Json(MessageResponse {
                    success: true,
                    message: "Password has been reset successfully".to_string(),
                }),
            )
                .into_response()
        }
    }
}

pub fn password_router() -> Router<AppState> {
    Router::new()
        .route("/forgot-password", post(forgot_password))
        .route(
            "/reset-password",
            get(validate_reset_token).post(reset_password),
        )
}
