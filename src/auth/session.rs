/// Session Issuer
///
/// Orchestrates login, refresh and logout over the password hasher, the
/// access-token codec and the refresh-token store:
///
/// `Unauthenticated -> Authenticated -> Renewed* -> Revoked`
///
/// Every fallible step is a hard stop; nothing proceeds past a failed
/// credential or token lookup.

use lazy_static::lazy_static;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::jwt::{generate_access_token, validate_access_token};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::refresh_token::{
    issue_refresh_token, lookup_refresh_token, revoke_all_user_tokens, revoke_refresh_token,
};
use crate::clock::Clock;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError, ValidationError};
use crate::store::{Credential, CredentialStore, RefreshTokenStore};
use crate::validators::is_valid_email;

lazy_static! {
    // Verified against when the email is unknown so that path costs a bcrypt run too
    static ref DUMMY_HASH: String = hash_password("chirpy-timing-equaliser").unwrap_or_default();
}

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginSession {
    pub user: Credential,
    pub access_token: String,
    pub refresh_token: String,
}

/// Result of a successful refresh; the refresh token itself is unchanged
#[derive(Debug, Clone)]
pub struct RenewedAccess {
    pub user_id: Uuid,
    pub access_token: String,
}

#[derive(Clone)]
pub struct SessionIssuer {
    credentials: Arc<dyn CredentialStore>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    clock: Arc<dyn Clock>,
    settings: JwtSettings,
}

impl SessionIssuer {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        clock: Arc<dyn Clock>,
        settings: JwtSettings,
    ) -> Self {
        Self {
            credentials,
            refresh_tokens,
            clock,
            settings,
        }
    }

    /// Create an account from an email and a plaintext password
    #[tracing::instrument(name = "register", skip(self, password))]
    pub async fn register(&self, email: &str, password: &str) -> Result<Credential, AppError> {
        let email = is_valid_email(email)?;
        if password.is_empty() {
            return Err(ValidationError::EmptyField("password").into());
        }

        let password_hash = hash_password(password)?;
        let credential = self
            .credentials
            .create(&email, &password_hash, self.clock.now())
            .await?;

        tracing::info!(user_id = %credential.id, "User registered");
        Ok(credential)
    }

    /// Exchange credentials for an access token and a refresh token
    ///
    /// Unknown email, wrong password and a corrupt stored hash all yield
    /// the same `InvalidCredentials`.
    #[tracing::instrument(name = "login", skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginSession, AppError> {
        let user = match self.credentials.find_by_email(email.trim()).await? {
            Some(user) => user,
            None => {
                let _ = verify_password(password, &DUMMY_HASH);
                tracing::warn!("Login rejected: unknown email");
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        match verify_password(password, &user.password_hash) {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(user_id = %user.id, "Login rejected: password mismatch");
                return Err(AuthError::InvalidCredentials.into());
            }
            Err(e) => {
                tracing::error!(user_id = %user.id, error = %e, "Login rejected: stored hash unusable");
                return Err(AuthError::InvalidCredentials.into());
            }
        }

        let now = self.clock.now();
        let access_token = generate_access_token(
            &user.id,
            &self.settings.secret,
            self.settings.access_token_ttl(),
            now,
        )?;
        let refresh = issue_refresh_token(
            self.refresh_tokens.as_ref(),
            user.id,
            self.settings.refresh_token_ttl(),
            now,
        )
        .await?;

        tracing::info!(user_id = %user.id, "User logged in");
        Ok(LoginSession {
            user,
            access_token,
            refresh_token: refresh.token,
        })
    }

    /// Mint a fresh access token from a usable refresh token
    ///
    /// The refresh token is not rotated: it stays valid until it expires or
    /// is revoked. A refresh that reads before a concurrent logout commits
    /// may still succeed.
    #[tracing::instrument(name = "refresh", skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<RenewedAccess, AppError> {
        let row = lookup_refresh_token(self.refresh_tokens.as_ref(), refresh_token)
            .await
            .map_err(|e| {
                if e.as_auth() == Some(&AuthError::RefreshNotFound) {
                    tracing::warn!("Refresh rejected: unknown token");
                }
                e
            })?;

        let now = self.clock.now();
        if !row.is_usable(now) {
            tracing::warn!(
                user_id = %row.user_id,
                revoked = row.revoked_at.is_some(),
                "Refresh rejected: token expired or revoked"
            );
            return Err(AuthError::RefreshExpiredOrRevoked.into());
        }

        let access_token = generate_access_token(
            &row.user_id,
            &self.settings.secret,
            self.settings.access_token_ttl(),
            now,
        )?;

        tracing::info!(user_id = %row.user_id, "Access token renewed");
        Ok(RenewedAccess {
            user_id: row.user_id,
            access_token,
        })
    }

    /// Revoke the presented refresh token. Revoking twice is not an error.
    #[tracing::instrument(name = "logout", skip_all)]
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AppError> {
        revoke_refresh_token(self.refresh_tokens.as_ref(), refresh_token, self.clock.now()).await?;
        Ok(())
    }

    /// Revoke every session of a user
    #[tracing::instrument(name = "logout_everywhere", skip(self))]
    pub async fn logout_everywhere(&self, user_id: Uuid) -> Result<u64, AppError> {
        revoke_all_user_tokens(self.refresh_tokens.as_ref(), user_id, self.clock.now()).await
    }

    /// Verify a bearer access token, already stripped of transport framing
    pub fn authenticate(&self, access_token: &str) -> Result<Uuid, AuthError> {
        validate_access_token(access_token, &self.settings.secret, self.clock.now())
    }
}
