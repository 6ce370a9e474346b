/// Persistence seams
///
/// The credential subsystem talks to its datastore only through these two
/// traits. Each method is a single atomic operation; nothing in the core
/// spans more than one of them in a transaction.

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::RefreshToken;
use crate::error::AppError;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

/// A user account as the credential subsystem sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Credential>, AppError>;

    /// Fails with `UniqueConstraintViolation` if the email is taken
    async fn create(
        &self,
        email: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Credential, AppError>;
}

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn insert(&self, token: &RefreshToken) -> Result<(), AppError>;

    async fn find(&self, token: &str) -> Result<Option<RefreshToken>, AppError>;

    /// Set `revoked_at = at` unless already set. `None` if the token is unknown.
    async fn revoke(&self, token: &str, at: DateTime<Utc>)
        -> Result<Option<RefreshToken>, AppError>;

    /// Revoke every unrevoked token of `user_id`, returning how many changed
    async fn revoke_all_for_user(&self, user_id: Uuid, at: DateTime<Utc>)
        -> Result<u64, AppError>;
}
