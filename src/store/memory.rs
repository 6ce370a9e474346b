/// In-process store backed by `RwLock<HashMap>`.
///
/// Used by tests and for running the service without Postgres. Every
/// method takes the lock once, so each operation is atomic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Credential, CredentialStore, RefreshTokenStore};
use crate::auth::{token_fingerprint, RefreshToken};
use crate::error::{AppError, DatabaseError};

/// Stored row; the plaintext token is not kept
#[derive(Clone)]
struct TokenRow {
    user_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    revoked_at: Option<DateTime<Utc>>,
}

impl TokenRow {
    fn to_refresh_token(&self, token: &str) -> RefreshToken {
        RefreshToken {
            token: token.to_string(),
            user_id: self.user_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
            expires_at: self.expires_at,
            revoked_at: self.revoked_at,
        }
    }
}

/// Clones share the same tables
#[derive(Clone, Default)]
pub struct InMemoryStore {
    users: Arc<RwLock<HashMap<String, Credential>>>,
    refresh_tokens: Arc<RwLock<HashMap<String, TokenRow>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Credential>, AppError> {
        let users = self.users.read().await;
        Ok(users.get(email).cloned())
    }

    async fn create(
        &self,
        email: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Credential, AppError> {
        let mut users = self.users.write().await;
        if users.contains_key(email) {
            return Err(AppError::Database(DatabaseError::UniqueConstraintViolation(
                "users.email".to_string(),
            )));
        }

        let credential = Credential {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: now,
            updated_at: now,
        };
        users.insert(email.to_string(), credential.clone());
        Ok(credential)
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryStore {
    async fn insert(&self, token: &RefreshToken) -> Result<(), AppError> {
        let key = token_fingerprint(&token.token);
        let mut tokens = self.refresh_tokens.write().await;
        if tokens.contains_key(&key) {
            return Err(AppError::Database(DatabaseError::UniqueConstraintViolation(
                "refresh_tokens.token_hash".to_string(),
            )));
        }

        tokens.insert(
            key,
            TokenRow {
                user_id: token.user_id,
                created_at: token.created_at,
                updated_at: token.updated_at,
                expires_at: token.expires_at,
                revoked_at: token.revoked_at,
            },
        );
        Ok(())
    }

    async fn find(&self, token: &str) -> Result<Option<RefreshToken>, AppError> {
        let tokens = self.refresh_tokens.read().await;
        Ok(tokens
            .get(&token_fingerprint(token))
            .map(|row| row.to_refresh_token(token)))
    }

    async fn revoke(
        &self,
        token: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<RefreshToken>, AppError> {
        let mut tokens = self.refresh_tokens.write().await;
        Ok(tokens.get_mut(&token_fingerprint(token)).map(|row| {
            if row.revoked_at.is_none() {
                row.revoked_at = Some(at);
                row.updated_at = at;
            }
            row.to_refresh_token(token)
        }))
    }

    async fn revoke_all_for_user(
        &self,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let mut tokens = self.refresh_tokens.write().await;
        let mut revoked = 0;
        for row in tokens
            .values_mut()
            .filter(|row| row.user_id == user_id && row.revoked_at.is_none())
        {
            row.revoked_at = Some(at);
            row.updated_at = at;
            revoked += 1;
        }
        Ok(revoked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        store.create("a@x.com", "hash", now).await.unwrap();

        assert_eq!(
            store.create("a@x.com", "other", now).await,
            Err(AppError::Database(DatabaseError::UniqueConstraintViolation(
                "users.email".to_string()
            )))
        );
    }

    #[tokio::test]
    async fn test_find_by_email() {
        let store = InMemoryStore::new();
        let created = store.create("a@x.com", "hash", Utc::now()).await.unwrap();

        assert_eq!(store.find_by_email("a@x.com").await.unwrap(), Some(created));
        assert_eq!(store.find_by_email("b@x.com").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_plaintext_token_not_used_as_key() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let row = RefreshToken {
            token: "abc".to_string(),
            user_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            expires_at: now + Duration::hours(1),
            revoked_at: None,
        };
        store.insert(&row).await.unwrap();

        let tokens = store.refresh_tokens.read().await;
        assert!(!tokens.contains_key("abc"));
        assert!(tokens.contains_key(&token_fingerprint("abc")));
    }

    #[tokio::test]
    async fn test_revoke_sets_updated_at_once() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let row = RefreshToken {
            token: "abc".to_string(),
            user_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            expires_at: now + Duration::hours(1),
            revoked_at: None,
        };
        store.insert(&row).await.unwrap();

        let later = now + Duration::minutes(10);
        store.revoke("abc", later).await.unwrap();
        let again = store.revoke("abc", later + Duration::minutes(10)).await.unwrap().unwrap();

        assert_eq!(again.revoked_at, Some(later));
        assert_eq!(again.updated_at, later);
    }
}
