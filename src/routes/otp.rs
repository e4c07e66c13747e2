use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::post};
use chrono::{Duration, Utc};
use nanoid::nanoid;
use redis::{AsyncCommands, RedisError, SetExpiry, SetOptions};
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;

use crate::{
    AppState,
    constants::{OTP_RATE_LIMIT, OTP_RATE_WINDOW_SECONDS, OTP_TTL_SECONDS},
    email_client::send_email,
    utils::normalize_email,
};

fn otp_key(email: &str) -> String {
    format!("otp:code:{}", email)
}

fn rate_key(email: &str) -> String {
    format!("otp:rate:{}", email)
}

#[derive(Serialize, Deserialize)]
struct OtpData {
    code: String,
    expires_at: i64, // Unix timestamp
}

fn gen_6_digit_code() -> String {
    const DIGITS: [char; 10] = ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9'];
    nanoid!(6, &DIGITS)
}

#[derive(Deserialize, ToSchema)]
pub struct SendOtpBody {
    pub email: String,
}

#[derive(Deserialize, ToSchema)]
pub struct VerifyOtpBody {
    pub email: String,
    pub otp: String,
}

#[derive(Serialize, ToSchema)]
pub struct OtpResponse {
    pub success: bool,
}

#[utoipa::path(
    post,
    tags = ["Otp"],
    description = "Email a 6-digit verification code. Rate limited per email in a shared sliding window.",
    path = "/send-otp",
    request_body(content = SendOtpBody, content_type = "application/json"),
    responses(
        (status = 200, description = "Code sent", body = OtpResponse),
        (status = 429, description = "Too many verification attempts", body = String),
        (status = 500, description = "Internal server error", body = String),
    )
)]
pub async fn send_otp(
    State(state): State<AppState>,
    Json(body): Json<SendOtpBody>,
) -> impl IntoResponse {
    let email = normalize_email(&body.email);
    if email.is_empty() {
        return (StatusCode::BAD_REQUEST, "Email is required").into_response();
    }

    // Counter lives in Redis so the window survives restarts and is shared
    // across instances.
    let mut redis = state.redis.clone();
    let sends: i64 = match redis.incr(rate_key(&email), 1).await {
        Ok(n) => n,
        Err(e) => {
            warn!("Failed to bump OTP rate counter for {}: {}", email, e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to send OTP").into_response();
        }
    };
    if sends == 1 {
        let _: Result<(), RedisError> = redis
            .expire(rate_key(&email), OTP_RATE_WINDOW_SECONDS as i64)
            .await;
    }
    if sends > OTP_RATE_LIMIT {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            "Too many verification attempts. Please try again later.",
        )
            .into_response();
    }

    let code = gen_6_digit_code();
    let expires_at = (Utc::now() + Duration::seconds(OTP_TTL_SECONDS as i64)).timestamp();
    let otp_data = OtpData {
        code: code.clone(),
        expires_at,
    };

    // Storing with TTL replaces any previous code for this email
    let result: Result<(), RedisError> = redis
        .set_options(
            otp_key(&email),
            serde_json::to_string(&otp_data).unwrap(),
            SetOptions::default().with_expiration(SetExpiry::EX(OTP_TTL_SECONDS)),
        )
        .await;
    if let Err(e) = result {
        warn!("Failed to store OTP for {} in Redis: {}", email, e);
        return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to send OTP").into_response();
    }

    let content = format!(
        "Your verification code is: {code}\n\nThis code will expire in {} minutes.",
        OTP_TTL_SECONDS / 60
    );
    if send_email(&email, "Verify your email", content).await.is_err() {
        return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to send OTP").into_response();
    }

    (StatusCode::OK, Json(OtpResponse { success: true })).into_response()
}

#[utoipa::path(
    post,
    tags = ["Otp"],
    description = "Verify an emailed code. Codes are single use.",
    path = "/verify-otp",
    request_body(content = VerifyOtpBody, content_type = "application/json"),
    responses(
        (status = 200, description = "Code verified", body = OtpResponse),
        (status = 400, description = "Invalid or expired OTP", body = String),
    )
)]
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(body): Json<VerifyOtpBody>,
) -> impl IntoResponse {
    let email = normalize_email(&body.email);
    let otp = body.otp.trim().to_string();
    let now = Utc::now().timestamp();

    let mut redis = state.redis.clone();
    let stored: Option<String> = match redis.get(otp_key(&email)).await {
        Ok(s) => s,
        Err(e) => {
            warn!("Failed to get OTP for {} from Redis: {}", email, e);
            return (StatusCode::BAD_REQUEST, "Invalid or expired OTP").into_response();
        }
    };

    let otp_data: OtpData = match stored {
        Some(s) => match serde_json::from_str(&s) {
            Ok(d) => d,
            Err(e) => {
                warn!("Failed to parse OTP data for {}: {}", email, e);
                return (StatusCode::BAD_REQUEST, "Invalid or expired OTP").into_response();
            }
        },
        None => return (StatusCode::BAD_REQUEST, "Invalid or expired OTP").into_response(),
    };

    if otp_data.code != otp || otp_data.expires_at <= now {
        return (StatusCode::BAD_REQUEST, "Invalid or expired OTP").into_response();
    }

    // Delete the code (single use)
    let _: Result<(), RedisError> = redis.del(otp_key(&email)).await;

    (StatusCode::OK, Json(OtpResponse { success: true })).into_response()
}

pub fn otp_router() -> Router<AppState> {
    Router::new()
        .route("/send-otp", post(send_otp))
        .route("/verify-otp", post(verify_otp))
}
