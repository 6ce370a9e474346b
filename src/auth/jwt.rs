/// JWT Token Generation and Validation
///
/// Access tokens are HS256-signed JWTs keyed by the shared secret. Both
/// functions are pure: the caller supplies `now`, nothing is persisted,
/// and verification needs no lookup. The flip side is that an access token
/// cannot be revoked before it expires, which is why its TTL stays short.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::{Claims, ISSUER};
use crate::error::AuthError;

/// Reject zero and negative lifetimes
pub(crate) fn ensure_positive(ttl: Duration) -> Result<(), AuthError> {
    if ttl <= Duration::zero() {
        return Err(AuthError::InvalidDuration(format!(
            "token lifetime must be positive, got {}",
            ttl
        )));
    }
    Ok(())
}

/// Mint a new access token for a user
///
/// # Errors
/// - `InvalidDuration` if `ttl <= 0`
/// - `SignatureInvalid` if the key cannot sign
pub fn generate_access_token(
    user_id: &Uuid,
    secret: &str,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<String, AuthError> {
    ensure_positive(ttl)?;

    let claims = Claims::new(*user_id, now, now + ttl);

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| {
        tracing::error!(error = %e, "Access token signing failed");
        AuthError::SignatureInvalid
    })
}

/// Verify an access token and return the user it was issued to
///
/// Checks, in order: signature and issuer, expiry against `now`, subject.
///
/// # Errors
/// - `SignatureInvalid` for a bad signature, wrong issuer or unparseable token
/// - `Expired` if `now > exp`
/// - `MalformedSubject` if `sub` is not a UUID
pub fn validate_access_token(
    token: &str,
    secret: &str,
    now: DateTime<Utc>,
) -> Result<Uuid, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.set_required_spec_claims(&["exp", "iss", "sub"]);
    // Expiry is checked below against the injected clock
    validation.validate_exp = false;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::warn!(error = %e, "JWT validation error");
        AuthError::SignatureInvalid
    })?;

    if claims.is_expired_at(now) {
        return Err(AuthError::Expired);
    }

    claims.user_id()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-characters-long";

    #[test]
    fn test_generate_and_validate_token() {
        let user_id = Uuid::new_v4();
        let now = Utc::now();

        let token = generate_access_token(&user_id, SECRET, Duration::hours(1), now)
            .expect("Failed to generate token");
        let validated = validate_access_token(&token, SECRET, now).expect("Failed to validate token");

        assert_eq!(validated, user_id);
    }

    #[test]
    fn test_claims_carry_issuer_and_window() {
        let user_id = Uuid::new_v4();
        let now = Utc::now();
        let token = generate_access_token(&user_id, SECRET, Duration::hours(1), now)
            .expect("Failed to generate token");

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        let claims = decode::<Claims>(&token, &DecodingKey::from_secret(SECRET.as_bytes()), &validation)
            .expect("Failed to decode token")
            .claims;

        assert_eq!(claims.iss, "chirpy");
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.iat, now.timestamp());
        assert_eq!(claims.exp, (now + Duration::hours(1)).timestamp());
    }

    #[test]
    fn test_non_positive_ttl_rejected() {
        let user_id = Uuid::new_v4();
        let now = Utc::now();

        for ttl in [Duration::zero(), Duration::seconds(-1), -Duration::hours(1)] {
            assert!(matches!(
                generate_access_token(&user_id, SECRET, ttl, now),
                Err(AuthError::InvalidDuration(_))
            ));
        }
    }

    #[test]
    fn test_wrong_secret() {
        let now = Utc::now();
        let token = generate_access_token(&Uuid::new_v4(), SECRET, Duration::hours(1), now)
            .expect("Failed to generate token");

        assert_eq!(
            validate_access_token(&token, "another-secret", now),
            Err(AuthError::SignatureInvalid)
        );
    }

    #[test]
    fn test_invalid_token() {
        assert_eq!(
            validate_access_token("invalid.token.here", SECRET, Utc::now()),
            Err(AuthError::SignatureInvalid)
        );
    }

    #[test]
    fn test_tampered_token() {
        let now = Utc::now();
        let token = generate_access_token(&Uuid::new_v4(), SECRET, Duration::hours(1), now)
            .expect("Failed to generate token");

        let tampered = format!("{}X", token);
        assert_eq!(
            validate_access_token(&tampered, SECRET, now),
            Err(AuthError::SignatureInvalid)
        );
    }

    #[test]
    fn test_expired_after_one_nanosecond_ttl() {
        let now = Utc::now();
        let token = generate_access_token(&Uuid::new_v4(), SECRET, Duration::nanoseconds(1), now)
            .expect("Failed to generate token");

        assert_eq!(
            validate_access_token(&token, SECRET, now + Duration::seconds(2)),
            Err(AuthError::Expired)
        );
    }

    #[test]
    fn test_wrong_issuer() {
        let now = Utc::now();
        let mut claims = Claims::new(Uuid::new_v4(), now, now + Duration::hours(1));
        claims.iss = "someone-else".to_string();
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes()))
            .expect("Failed to encode token");

        assert_eq!(
            validate_access_token(&token, SECRET, now),
            Err(AuthError::SignatureInvalid)
        );
    }

    #[test]
    fn test_malformed_subject() {
        let now = Utc::now();
        let mut claims = Claims::new(Uuid::new_v4(), now, now + Duration::hours(1));
        claims.sub = "user-42".to_string();
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes()))
            .expect("Failed to encode token");

        assert_eq!(
            validate_access_token(&token, SECRET, now),
            Err(AuthError::MalformedSubject)
        );
    }
}
