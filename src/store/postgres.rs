/// Postgres store (schema in `migrations/`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{Credential, CredentialStore, RefreshTokenStore};
use crate::auth::{token_fingerprint, RefreshToken};
use crate::error::AppError;

type TokenTuple = (
    Uuid,
    DateTime<Utc>,
    DateTime<Utc>,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
);

fn to_refresh_token(token: &str, row: TokenTuple) -> RefreshToken {
    let (user_id, created_at, updated_at, expires_at, revoked_at) = row;
    RefreshToken {
        token: token.to_string(),
        user_id,
        created_at,
        updated_at,
        expires_at,
        revoked_at,
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Credential>, AppError> {
        let row = sqlx::query_as::<_, (Uuid, String, String, DateTime<Utc>, DateTime<Utc>)>(
            r#"
            SELECT id, email, password_hash, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, email, password_hash, created_at, updated_at)| Credential {
            id,
            email,
            password_hash,
            created_at,
            updated_at,
        }))
    }

    async fn create(
        &self,
        email: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Credential, AppError> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            "#,
        )
        .bind(id)
        .bind(email)
        .bind(password_hash)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Credential {
            id,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: now,
            updated_at: now,
        })
    }
}

#[async_trait]
impl RefreshTokenStore for PgStore {
    async fn insert(&self, token: &RefreshToken) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (token_hash, user_id, created_at, updated_at, expires_at, revoked_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(token_fingerprint(&token.token))
        .bind(token.user_id)
        .bind(token.created_at)
        .bind(token.updated_at)
        .bind(token.expires_at)
        .bind(token.revoked_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(&self, token: &str) -> Result<Option<RefreshToken>, AppError> {
        let row = sqlx::query_as::<_, TokenTuple>(
            r#"
            SELECT user_id, created_at, updated_at, expires_at, revoked_at
            FROM refresh_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(token_fingerprint(token))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| to_refresh_token(token, row)))
    }

    async fn revoke(
        &self,
        token: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<RefreshToken>, AppError> {
        // SET expressions see the pre-update row, so an existing revoked_at is kept
        let row = sqlx::query_as::<_, TokenTuple>(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = COALESCE(revoked_at, $1),
                updated_at = CASE WHEN revoked_at IS NULL THEN $1 ELSE updated_at END
            WHERE token_hash = $2
            RETURNING user_id, created_at, updated_at, expires_at, revoked_at
            "#,
        )
        .bind(at)
        .bind(token_fingerprint(token))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| to_refresh_token(token, row)))
    }

    async fn revoke_all_for_user(
        &self,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = $1, updated_at = $1
            WHERE user_id = $2 AND revoked_at IS NULL
            "#,
        )
        .bind(at)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
