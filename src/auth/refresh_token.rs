/// Refresh Token Management
///
/// Refresh tokens are:
/// - 32 bytes from the OS CSPRNG, hex encoded (64 characters)
/// - Stored by SHA-256 fingerprint, never in plaintext
/// - Reusable until they expire or are revoked (no rotation on use)
/// - Never deleted; revocation only sets `revoked_at`, and it is never cleared

use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::auth::jwt::ensure_positive;
use crate::error::{AppError, AuthError};
use crate::store::RefreshTokenStore;

const REFRESH_TOKEN_BYTES: usize = 32;

/// A persisted refresh token row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshToken {
    /// Plaintext token as held by the client
    pub token: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshToken {
    /// The one validity rule for refresh tokens: not revoked and `now <= expires_at`
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && now <= self.expires_at
    }
}

/// Generate a new opaque refresh token
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// SHA-256 fingerprint used as the storage key
pub fn token_fingerprint(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Issue and persist a refresh token for `user_id`
///
/// No uniqueness retry: with 256 bits of entropy a collision is not a
/// practical concern and the store's unique key is the backstop.
pub async fn issue_refresh_token(
    store: &dyn RefreshTokenStore,
    user_id: Uuid,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<RefreshToken, AppError> {
    ensure_positive(ttl)?;

    let row = RefreshToken {
        token: generate_refresh_token(),
        user_id,
        created_at: now,
        updated_at: now,
        expires_at: now + ttl,
        revoked_at: None,
    };
    store.insert(&row).await?;

    tracing::debug!(user_id = %user_id, expires_at = %row.expires_at, "Refresh token issued");
    Ok(row)
}

/// Exact-match lookup
///
/// # Errors
/// `RefreshNotFound` if no row matches. Usability is not checked here.
pub async fn lookup_refresh_token(
    store: &dyn RefreshTokenStore,
    token: &str,
) -> Result<RefreshToken, AppError> {
    store
        .find(token)
        .await?
        .ok_or(AppError::Auth(AuthError::RefreshNotFound))
}

/// Revoke a refresh token
///
/// Idempotent: revoking an already revoked token succeeds and keeps the
/// original `revoked_at`.
pub async fn revoke_refresh_token(
    store: &dyn RefreshTokenStore,
    token: &str,
    now: DateTime<Utc>,
) -> Result<RefreshToken, AppError> {
    let row = store
        .revoke(token, now)
        .await?
        .ok_or(AppError::Auth(AuthError::RefreshNotFound))?;

    tracing::info!(user_id = %row.user_id, "Refresh token revoked");
    Ok(row)
}

/// Revoke every live refresh token of a user
///
/// Returns how many tokens were newly revoked.
pub async fn revoke_all_user_tokens(
    store: &dyn RefreshTokenStore,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<u64, AppError> {
    let revoked = store.revoke_all_for_user(user_id, now).await?;
    tracing::info!(user_id = %user_id, revoked = revoked, "All refresh tokens revoked for user");
    Ok(revoked)
}
