/// Authentication Routes
///
/// Thin JSON surface over `SessionIssuer`: registration, login, access
/// token refresh, logout, and the current user.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::SessionIssuer;
use crate::error::{ErrorContext, RequestError};
use crate::middleware::{extract_bearer_token, AuthenticatedUser};
use crate::store::Credential;

/// Registration and login request
#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// User information, with tokens after a login
#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl From<&Credential> for UserResponse {
    fn from(user: &Credential) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email.clone(),
            created_at: user.created_at.to_rfc3339(),
            updated_at: user.updated_at.to_rfc3339(),
            token: None,
            refresh_token: None,
        }
    }
}

/// New access token from a refresh
#[derive(Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// POST /api/users
///
/// # Errors
/// - 400: invalid email or empty password
/// - 409: email already registered
/// - 500: hashing failure
pub async fn register(
    form: web::Json<CredentialsRequest>,
    issuer: web::Data<SessionIssuer>,
) -> Result<HttpResponse, RequestError> {
    let context = ErrorContext::new("user_registration");

    let user = issuer
        .register(&form.email, &form.password)
        .await
        .map_err(|e| context.fail(e))?;

    Ok(HttpResponse::Created().json(UserResponse::from(&user)))
}

/// POST /api/login
///
/// Unknown email and wrong password get the same 401 body.
pub async fn login(
    form: web::Json<CredentialsRequest>,
    issuer: web::Data<SessionIssuer>,
) -> Result<HttpResponse, RequestError> {
    let context = ErrorContext::new("user_login");

    let session = issuer
        .login(&form.email, &form.password)
        .await
        .map_err(|e| context.fail(e))?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %session.user.id,
        "Login succeeded"
    );

    let mut body = UserResponse::from(&session.user);
    body.token = Some(session.access_token);
    body.refresh_token = Some(session.refresh_token);
    Ok(HttpResponse::Ok().json(body))
}

/// POST /api/refresh
///
/// Requires `Authorization: Bearer <refresh token>`.
pub async fn refresh(
    req: HttpRequest,
    issuer: web::Data<SessionIssuer>,
) -> Result<HttpResponse, RequestError> {
    let context = ErrorContext::new("token_refresh");
    let refresh_token = extract_bearer_token(req.headers()).map_err(|e| context.fail(e))?;

    let renewed = issuer
        .refresh(&refresh_token)
        .await
        .map_err(|e| context.fail(e))?;

    let context = context.with_user_id(renewed.user_id.to_string());
    tracing::info!(
        request_id = %context.request_id,
        user_id = ?context.user_id,
        "Access token refreshed"
    );

    Ok(HttpResponse::Ok().json(TokenResponse {
        token: renewed.access_token,
    }))
}

/// POST /api/revoke
///
/// Requires `Authorization: Bearer <refresh token>`. Revoking an already
/// revoked token still returns 204.
pub async fn revoke(
    req: HttpRequest,
    issuer: web::Data<SessionIssuer>,
) -> Result<HttpResponse, RequestError> {
    let context = ErrorContext::new("token_revoke");
    let refresh_token = extract_bearer_token(req.headers()).map_err(|e| context.fail(e))?;

    issuer
        .logout(&refresh_token)
        .await
        .map_err(|e| context.fail(e))?;

    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/me
///
/// Behind `JwtMiddleware`.
pub async fn get_current_user(user: web::ReqData<AuthenticatedUser>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "id": user.0.to_string() }))
}
