use redis::{SetExpiry, SetOptions};

pub const MAX_RESET_ATTEMPTS: i32 = 3;
pub const RESET_TOKEN_TTL_HOURS: i64 = 24;

pub const OTP_TTL_SECONDS: u64 = 15 * 60;
pub const OTP_RATE_LIMIT: i64 = 3;
pub const OTP_RATE_WINDOW_SECONDS: u64 = 15 * 60;

pub const USER_CACHE_EXPIRY_SECONDS: u64 = 60;

pub fn get_user_cache_options() -> SetOptions {
    SetOptions::default().with_expiration(SetExpiry::EX(USER_CACHE_EXPIRY_SECONDS))
}
