#[cfg(test)]
mod tests {
    use super::super::utils::{check_email, make_application_id, normalize_email};

    #[test]
    fn test_valid_email() {
        assert!(check_email("jane.doe@example.com"));
    }

    #[test]
    fn test_valid_email_subdomain() {
        assert!(check_email("applicant@mail.agency.co"));
    }

    #[test]
    fn test_empty_email() {
        assert!(!check_email(""));
    }

    #[test]
    fn test_email_missing_at() {
        assert!(!check_email("jane.example.com"));
    }

    #[test]
    fn test_email_missing_local_part() {
        assert!(!check_email("@example.com"));
    }

    #[test]
    fn test_email_missing_domain() {
        assert!(!check_email("jane@"));
    }

    #[test]
    fn test_email_domain_without_dot() {
        assert!(!check_email("jane@example"));
    }

    #[test]
    fn test_email_with_whitespace() {
        assert!(!check_email("jane doe@example.com"));
        assert!(!check_email("jane@exam ple.com"));
    }

    #[test]
    fn test_email_double_at() {
        assert!(!check_email("jane@@example.com"));
        assert!(!check_email("jane@doe@example.com"));
    }

    #[test]
    fn test_normalize_email_lowercases_and_trims() {
        assert_eq!(normalize_email("  Jane.Doe@Example.COM "), "jane.doe@example.com");
    }

    #[test]
    fn test_application_id_shape() {
        let id = make_application_id("Jane", "Doe");
        assert!(id.starts_with("jane_doe_"));
        let suffix = id.rsplit('_').next().unwrap();
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_application_id_spaces_become_dashes() {
        let id = make_application_id("Mary Jane", "van Dyke");
        assert!(id.starts_with("mary-jane_van-dyke_"));
    }

    #[test]
    fn test_application_ids_are_unique() {
        let a = make_application_id("Jane", "Doe");
        let b = make_application_id("Jane", "Doe");
        assert_ne!(a, b);
    }
}
