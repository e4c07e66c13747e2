#[cfg(test)]
mod tests {
    use super::super::constants::MAX_RESET_ATTEMPTS;
    use super::super::reset_token::{ResetState, TokenCheck, check_token, generate_reset_token};
    use chrono::{Duration, Utc};

    fn pending_state(attempts: i32) -> ResetState {
        ResetState {
            token: "a".repeat(64),
            expires_at: Utc::now() + Duration::hours(24),
            attempts,
        }
    }

    #[test]
    fn test_token_is_64_hex_chars() {
        let token = generate_reset_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_issue_starts_with_zero_attempts() {
        let now = Utc::now();
        let state = ResetState::issue(now);
        assert_eq!(state.attempts, 0);
        assert_eq!(state.expires_at, now + Duration::hours(24));
    }

    #[test]
    fn test_no_pending_reset_is_invalid() {
        assert_eq!(check_token(None, "anything", Utc::now()), TokenCheck::Invalid);
    }

    #[test]
    fn test_mismatched_token_is_invalid() {
        let state = pending_state(0);
        assert_eq!(
            check_token(Some(&state), &"b".repeat(64), Utc::now()),
            TokenCheck::Invalid
        );
    }

    #[test]
    fn test_valid_token_charges_one_attempt_per_check() {
        let now = Utc::now();
        let mut state = pending_state(0);

        // attemptsLeft counts down 2, 1, 0 over three checks.
        for expected_left in [2, 1, 0] {
            match check_token(Some(&state), &state.token, now) {
                TokenCheck::Valid { attempts_left } => {
                    assert_eq!(attempts_left, expected_left);
                    state.attempts += 1;
                }
                other => panic!("expected Valid, got {:?}", other),
            }
        }

        // Fourth check finds the budget spent.
        assert_eq!(
            check_token(Some(&state), &state.token, now),
            TokenCheck::Exhausted
        );
    }

    #[test]
    fn test_exhausted_does_not_charge_further() {
        let state = pending_state(MAX_RESET_ATTEMPTS);
        for _ in 0..5 {
            assert_eq!(
                check_token(Some(&state), &state.token, Utc::now()),
                TokenCheck::Exhausted
            );
        }
    }

    #[test]
    fn test_expired_token_is_invalid_regardless_of_attempts() {
        let mut state = pending_state(0);
        state.expires_at = Utc::now() - Duration::seconds(1);
        assert_eq!(
            check_token(Some(&state), &state.token, Utc::now()),
            TokenCheck::Invalid
        );
    }

    #[test]
    fn test_epoch_expiry_invalidates_an_exhausted_token() {
        // Exceeding the budget forces expiry to the epoch; from then on the
        // token reads as invalid, not exhausted.
        let mut state = pending_state(MAX_RESET_ATTEMPTS);
        state.expires_at = chrono::DateTime::UNIX_EPOCH;
        assert_eq!(
            check_token(Some(&state), &state.token, Utc::now()),
            TokenCheck::Invalid
        );
    }

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        let now = Utc::now();
        let mut state = pending_state(0);
        state.expires_at = now;
        assert_eq!(
            check_token(Some(&state), &state.token, now),
            TokenCheck::Invalid
        );
    }

    #[test]
    fn test_reissue_supersedes_exhausted_token() {
        let now = Utc::now();
        let exhausted = pending_state(MAX_RESET_ATTEMPTS);
        assert_eq!(
            check_token(Some(&exhausted), &exhausted.token, now),
            TokenCheck::Exhausted
        );

        let fresh = ResetState::issue(now);
        assert_ne!(fresh.token, exhausted.token);
        assert_eq!(
            check_token(Some(&fresh), &fresh.token, now),
            TokenCheck::Valid { attempts_left: 2 }
        );
        // The old token no longer matches the stored state.
        assert_eq!(
            check_token(Some(&fresh), &exhausted.token, now),
            TokenCheck::Invalid
        );
    }

    #[test]
    fn test_from_fields_requires_token_and_expiry() {
        assert!(ResetState::from_fields(None, None, None).is_none());
        assert!(ResetState::from_fields(Some("t".into()), None, Some(1)).is_none());

        let expires = Utc::now().fixed_offset();
        let state = ResetState::from_fields(Some("t".into()), Some(expires), None).unwrap();
        // Missing counter reads as zero attempts.
        assert_eq!(state.attempts, 0);
    }
}
