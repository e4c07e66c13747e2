use nanoid::nanoid;

pub fn normalize_email(email: impl AsRef<str>) -> String {
    email.as_ref().trim().to_lowercase()
}

/// Same shape check the signup form applies: one '@', non-empty local part,
/// domain with at least one dot and no whitespace anywhere.
pub fn check_email(email: impl AsRef<str>) -> bool {
    let email = email.as_ref();
    if email.chars().any(|c| c.is_whitespace()) {
        return false;
    }
    let mut parts = email.splitn(2, '@');
    let local = match parts.next() {
        Some(l) if !l.is_empty() => l,
        _ => return false,
    };
    let domain = match parts.next() {
        Some(d) if !d.is_empty() => d,
        _ => return false,
    };
    if local.contains('@') || domain.contains('@') {
        return false;
    }
    let mut domain_parts = domain.split('.');
    let host = domain_parts.next().unwrap_or("");
    let tld = domain_parts.next_back().unwrap_or("");
    !host.is_empty() && !tld.is_empty()
}

/// Human-readable application id, e.g. `jane_doe_k3x9v1bq`.
pub fn make_application_id(first_name: &str, last_name: &str) -> String {
    const LOWER_ALNUM: [char; 36] = [
        '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h',
        'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
    ];
    format!(
        "{}_{}_{}",
        first_name.trim().to_lowercase().replace(' ', "-"),
        last_name.trim().to_lowercase().replace(' ', "-"),
        nanoid!(8, &LOWER_ALNUM)
    )
}
