/*!
 * # Authentication and Authorization
 *
 * JWT-based authentication for the storefront API. Access tokens carry the
 * user id, email, and account kind; guests are identified by an opaque
 * session key supplied in the `X-Session-Key` header. Passwords are hashed
 * with Argon2id.
 */

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::ActiveEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::entities::user::UserKind;
use crate::errors::{ErrorResponse, ServiceError};
use crate::AppState;

/// Header carrying the opaque guest session key.
pub static SESSION_KEY_HEADER: HeaderName = HeaderName::from_static("x-session-key");

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// User's email
    pub email: String,
    /// Account kind: patient, pharmacy, or admin
    pub kind: String,
    /// JWT ID (unique identifier for this token)
    pub jti: String,
    /// Issued at time
    pub iat: i64,
    /// Expiration time
    pub exp: i64,
}

/// Authenticated user data extracted from the JWT token
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub email: String,
    pub kind: UserKind,
    pub token_id: String,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        matches!(self.kind, UserKind::Admin)
    }

    pub fn is_pharmacy(&self) -> bool {
        matches!(self.kind, UserKind::Pharmacy)
    }
}

/// Caller identity for cart and wishlist style endpoints: either an
/// authenticated user or a guest carrying a session key.
#[derive(Debug, Clone)]
pub enum Shopper {
    User(CurrentUser),
    Guest { session_key: String },
}

impl Shopper {
    pub fn user(&self) -> Option<&CurrentUser> {
        match self {
            Shopper::User(user) => Some(user),
            Shopper::Guest { .. } => None,
        }
    }
}

/// Extractor wrapper that requires an admin account.
#[derive(Debug, Clone)]
pub struct AdminUser(pub CurrentUser);

/// Extractor that yields `None` when no credentials are attached. A present
/// but invalid token is still rejected.
#[derive(Debug, Clone)]
pub struct OptionalUser(pub Option<CurrentUser>);

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication required")]
    MissingCredentials,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account is disabled")]
    AccountDisabled,

    #[error("Admin access required")]
    AdminRequired,

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingCredentials | Self::InvalidToken | Self::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            Self::AccountDisabled | Self::AdminRequired => StatusCode::FORBIDDEN,
            Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            AuthError::InternalError(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message,
            details: None,
            request_id: crate::request_id::current_request_id()
                .map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InternalError(msg) => ServiceError::InternalError(msg),
            e @ (AuthError::AdminRequired | AuthError::AccountDisabled) => {
                ServiceError::Forbidden(e.to_string())
            }
            other => ServiceError::Unauthorized(other.to_string()),
        }
    }
}

/// Hashes a password with Argon2id and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::HashError(format!("Password hashing failed: {}", e)))
}

/// Verifies a password against a stored PHC-format hash. A mismatch yields
/// `Ok(false)`; only malformed hashes or hasher failures are errors.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, ServiceError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| ServiceError::HashError(format!("Stored password hash invalid: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(ServiceError::HashError(format!(
            "Password verification failed: {}",
            e
        ))),
    }
}

/// Issues a signed HS256 access token for a user.
pub fn issue_token(
    user_id: Uuid,
    email: &str,
    kind: UserKind,
    secret: &str,
    expiration_secs: usize,
) -> Result<String, AuthError> {
    let now = Utc::now();
    let exp = now + ChronoDuration::seconds(expiration_secs as i64);

    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        kind: kind.to_value(),
        jti: Uuid::new_v4().to_string(),
        iat: now.timestamp(),
        exp: exp.timestamp(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthError::InternalError(format!("Token encoding failed: {}", e)))
}

/// Decodes and validates an access token, checking signature and expiry.
pub fn decode_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let validation = Validation::new(Algorithm::HS256);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| AuthError::InvalidToken)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn claims_to_user(claims: Claims) -> Result<CurrentUser, AuthError> {
    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;
    let kind = UserKind::try_from_value(&claims.kind).map_err(|_| AuthError::InvalidToken)?;

    Ok(CurrentUser {
        user_id,
        email: claims.email,
        kind,
        token_id: claims.jti,
    })
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let token = bearer_token(&parts.headers).ok_or(AuthError::MissingCredentials)?;
        let claims = decode_token(token, &app_state.config.jwt_secret)?;
        claims_to_user(claims)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for OptionalUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if bearer_token(&parts.headers).is_none() {
            return Ok(OptionalUser(None));
        }

        CurrentUser::from_request_parts(parts, state)
            .await
            .map(|user| OptionalUser(Some(user)))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Shopper
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if bearer_token(&parts.headers).is_some() {
            return CurrentUser::from_request_parts(parts, state)
                .await
                .map(Shopper::User);
        }

        let session_key = parts
            .headers
            .get(&SESSION_KEY_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(AuthError::MissingCredentials)?;

        Ok(Shopper::Guest {
            session_key: session_key.to_string(),
        })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if user.is_admin() {
            Ok(AdminUser(user))
        } else {
            Err(AuthError::AdminRequired)
        }
    }
}
