/// Input validators for account registration
///
/// Length limits guard against oversized input; the regex is a practical
/// subset of RFC 5322.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 3;

lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    )
    .expect("email regex is valid");
}

/// Validates an email address and returns it trimmed
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email"));
    }

    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort("email", MIN_EMAIL_LENGTH));
    }

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email", MAX_EMAIL_LENGTH));
    }

    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email"));
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_emails() {
        assert_eq!(is_valid_email("a@x.com"), Ok("a@x.com".to_string()));
        assert_eq!(
            is_valid_email("  walt@breakingbad.com "),
            Ok("walt@breakingbad.com".to_string())
        );
        assert!(is_valid_email("first.last+tag@sub.example.org").is_ok());
    }

    #[test]
    fn test_empty_email() {
        assert_eq!(is_valid_email("   "), Err(ValidationError::EmptyField("email")));
    }

    #[test]
    fn test_invalid_formats() {
        for email in ["notanemail", "user@", "@example.com", "user@@example.com"] {
            assert_eq!(
                is_valid_email(email),
                Err(ValidationError::InvalidFormat("email")),
                "should reject {}",
                email
            );
        }
    }

    #[test]
    fn test_too_long_email() {
        let email = format!("{}@example.com", "a".repeat(MAX_EMAIL_LENGTH));
        assert!(matches!(
            is_valid_email(&email),
            Err(ValidationError::TooLong("email", _))
        ));
    }
}
