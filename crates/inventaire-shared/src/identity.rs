//! Login identifier helpers.
//!
//! Users log in with their CP number; the backend auth service only knows
//! emails, so the CP is mapped onto a synthetic address in a fixed internal
//! domain.

/// Canonical form of a typed CP number: trimmed, upper case.
pub fn normalize_cp(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// `7408443F` -> `7408443f@<domain>`
pub fn email_from_cp(cp: &str, domain: &str) -> String {
    format!("{}@{}", cp.trim().to_lowercase(), domain)
}

/// Inverse of [`email_from_cp`], for display.
pub fn cp_from_email(email: &str) -> String {
    email
        .split('@')
        .next()
        .map(str::to_uppercase)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_EMAIL_DOMAIN;

    #[test]
    fn test_email_from_cp() {
        assert_eq!(
            email_from_cp("7408443F", DEFAULT_EMAIL_DOMAIN),
            "7408443f@catenaires-versailles.internal"
        );
    }

    #[test]
    fn test_cp_round_trip() {
        let email = email_from_cp(" ab12 ", "example.internal");
        assert_eq!(cp_from_email(&email), "AB12");
        assert_eq!(cp_from_email(""), "");
    }

    #[test]
    fn test_normalize_cp() {
        assert_eq!(normalize_cp("  7408443f "), "7408443F");
    }
}
