/// Password Hashing and Verification
///
/// bcrypt with a fixed cost and a fresh random salt per call.

use bcrypt::{hash, verify};

use crate::error::AuthError;

/// bcrypt cost factor used for every stored hash
pub const HASH_COST: u32 = 10;

/// bcrypt only looks at the first 72 bytes of its input
const MAX_PASSWORD_BYTES: usize = 72;

/// Hash a password using bcrypt
///
/// Two calls with the same password produce different strings; compare
/// with [`verify_password`], never with `==`.
///
/// # Errors
/// `HashingFailure` if the password is longer than bcrypt accepts or the
/// primitive itself fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    // Refuse rather than silently truncate
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(AuthError::HashingFailure(format!(
            "password exceeds {} bytes",
            MAX_PASSWORD_BYTES
        )));
    }

    hash(password, HASH_COST).map_err(|e| AuthError::HashingFailure(e.to_string()))
}

/// Verify a password against a stored bcrypt hash
///
/// Returns `Ok(false)` on mismatch. A hash that cannot be parsed is
/// reported separately as `MalformedHash` so it can be logged as data
/// corruption rather than a bad login.
///
/// Inputs over the bcrypt limit never match: no stored hash can have come
/// from them, and bcrypt would otherwise compare only their first 72 bytes.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    if password.len() > MAX_PASSWORD_BYTES {
        return Ok(false);
    }

    verify(password, hash).map_err(|e| {
        tracing::error!(error = %e, "Stored password hash could not be parsed");
        AuthError::MalformedHash
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password() {
        let password = "skibidi";
        let hash = hash_password(password).expect("Failed to hash password");

        assert_ne!(password, hash);
        assert!(hash.starts_with("$2"));
        assert!(hash.contains(&format!("${}$", HASH_COST)));
    }

    #[test]
    fn test_verify_password() {
        let hash = hash_password("correct horse").expect("Failed to hash password");
        assert_eq!(verify_password("correct horse", &hash), Ok(true));
    }

    #[test]
    fn test_verify_wrong_password() {
        let hash = hash_password("correct horse").expect("Failed to hash password");
        assert_eq!(verify_password("battery staple", &hash), Ok(false));
    }

    #[test]
    fn test_same_password_hashes_differently() {
        let first = hash_password("secret").expect("Failed to hash password");
        let second = hash_password("secret").expect("Failed to hash password");

        assert_ne!(first, second);
        assert_eq!(verify_password("secret", &first), Ok(true));
        assert_eq!(verify_password("secret", &second), Ok(true));
    }

    #[test]
    fn test_malformed_hash_is_distinct_from_mismatch() {
        assert_eq!(
            verify_password("secret", "not-a-bcrypt-hash"),
            Err(AuthError::MalformedHash)
        );
    }

    #[test]
    fn test_too_long_password() {
        let long_password = "a".repeat(MAX_PASSWORD_BYTES + 1);
        assert!(matches!(
            hash_password(&long_password),
            Err(AuthError::HashingFailure(_))
        ));
    }

    #[test]
    fn test_password_at_limit_hashes() {
        let password = "b".repeat(MAX_PASSWORD_BYTES);
        let hash = hash_password(&password).expect("Failed to hash password");
        assert_eq!(verify_password(&password, &hash), Ok(true));
    }

    #[test]
    fn test_suffix_past_limit_does_not_match() {
        let password = "a".repeat(MAX_PASSWORD_BYTES);
        let hash = hash_password(&password).expect("Failed to hash password");

        assert_eq!(verify_password(&format!("{}EXTRA", password), &hash), Ok(false));
        assert_eq!(verify_password(&format!("{}a", password), &hash), Ok(false));
    }
}
