use chrono::{DateTime, Duration, Utc};
use nanoid::nanoid;
use sea_orm::prelude::DateTimeWithTimeZone;

use crate::constants::{MAX_RESET_ATTEMPTS, RESET_TOKEN_TTL_HOURS};

const HEX: [char; 16] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f',
];

pub fn generate_reset_token() -> String {
    nanoid!(64, &HEX)
}

pub fn generate_temporary_password() -> String {
    nanoid!(12)
}

/// Reset fields as they live on the user record. Absent when no reset is
/// pending.
#[derive(Debug, Clone, PartialEq)]
pub struct ResetState {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub attempts: i32,
}

impl ResetState {
    /// Fresh token with a 24-hour expiry and the attempt counter at zero.
    /// Supersedes whatever reset was pending before.
    pub fn issue(now: DateTime<Utc>) -> Self {
        Self {
            token: generate_reset_token(),
            expires_at: now + Duration::hours(RESET_TOKEN_TTL_HOURS),
            attempts: 0,
        }
    }

    pub fn from_fields(
        token: Option<String>,
        expires_at: Option<DateTimeWithTimeZone>,
        attempts: Option<i32>,
    ) -> Option<Self> {
        Some(Self {
            token: token?,
            expires_at: expires_at?.with_timezone(&Utc),
            attempts: attempts.unwrap_or(0),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenCheck {
    /// Token matched and the attempt was charged; `attempts_left` counts the
    /// checks remaining after this one.
    Valid { attempts_left: i32 },
    /// Attempt budget spent. The counter is not charged again; the token must
    /// be reissued.
    Exhausted,
    /// No reset pending, token mismatch, or expiry passed. Deliberately one
    /// bucket so the response does not reveal which check failed.
    Invalid,
}

/// Expiry is checked before the attempt budget: an expired token reports
/// `Invalid` regardless of how many attempts remain. On `Valid`, the
/// validation endpoint persists the charged counter; the consume path clears
/// the fields instead.
pub fn check_token(state: Option<&ResetState>, presented: &str, now: DateTime<Utc>) -> TokenCheck {
    let Some(state) = state else {
        return TokenCheck::Invalid;
    };
    if state.token != presented || state.expires_at <= now {
        return TokenCheck::Invalid;
    }
    if state.attempts >= MAX_RESET_ATTEMPTS {
        return TokenCheck::Exhausted;
    }
    TokenCheck::Valid {
        attempts_left: MAX_RESET_ATTEMPTS - (state.attempts + 1),
    }
}
