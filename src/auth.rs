use std::convert::Infallible;

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    config::{AccessMode, AppConfig},
    error::ApiError,
    models::ExtraFields,
};

/// Name of the cookie that carries the session credential.
pub const TOKEN_COOKIE: &str = "token";

/// Lifetime of a session credential, in seconds (20 hours).
pub const TOKEN_TTL_SECS: i64 = 20 * 60 * 60;

// Claim names the issuer owns or the verifier interprets; a payload cannot set them.
const RESERVED_CLAIMS: [&str; 8] = ["email", "iat", "exp", "aud", "iss", "sub", "nbf", "jti"];

/// IdentityPayload
///
/// Body of `POST /jwt`: the identity the client wants to be issued a session for.
/// `email` is the identity claim; other fields (display name, photo URL, ...) are
/// carried inside the token but never trusted for authorization.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IdentityPayload {
    pub email: String,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub extra: ExtraFields,
}

/// Claims
///
/// The payload signed into every session credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// The identity claim checked by owner-scoped routes.
    pub email: String,
    /// Issued At (iat), seconds since the epoch.
    pub iat: usize,
    /// Expiration Time (exp), seconds since the epoch. Enforced on every request.
    pub exp: usize,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl Claims {
    pub fn new(identity: IdentityPayload, issued_at: DateTime<Utc>) -> Self {
        let mut extra = identity.extra;
        for claim in RESERVED_CLAIMS {
            extra.remove(claim);
        }

        Self {
            email: identity.email,
            iat: issued_at.timestamp().max(0) as usize,
            exp: (issued_at + Duration::seconds(TOKEN_TTL_SECS)).timestamp().max(0) as usize,
            extra,
        }
    }
}

/// issue_token
///
/// Mints a signed session credential for `identity`, valid for [`TOKEN_TTL_SECS`] from `now`.
/// Nothing is persisted: validity is a function of the signature and `exp` alone.
pub fn issue_token(
    identity: IdentityPayload,
    secret: &str,
    now: DateTime<Utc>,
) -> Result<String, ApiError> {
    if identity.email.trim().is_empty() {
        return Err(ApiError::bad_request("email is required"));
    }

    let claims = Claims::new(identity, now);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&Header::default(), &claims, &key).map_err(|e| {
        tracing::error!("failed to sign session credential: {:?}", e);
        ApiError::Internal
    })
}

/// verify_token
///
/// Checks signature and expiry. Every failure reason maps to the same
/// `Unauthorized`, so nothing about the token leaks back to the caller.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, ApiError> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;
    // No audience is checked.
    validation.validate_aud = false;

    decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!("rejected session credential: {:?}", e.kind());
            ApiError::Unauthorized
        })
}

// --- Session Cookie ---

fn cookie_attributes(secure: bool) -> &'static str {
    // Browsers only accept SameSite=None together with Secure.
    if secure {
        "Path=/; HttpOnly; Secure; SameSite=None"
    } else {
        "Path=/; HttpOnly; SameSite=Lax"
    }
}

/// Set-Cookie value that attaches `token` to the client.
pub fn session_cookie(token: &str, secure: bool) -> String {
    format!(
        "{TOKEN_COOKIE}={token}; {}; Max-Age={}",
        cookie_attributes(secure),
        TOKEN_TTL_SECS
    )
}

/// Set-Cookie value that clears the session credential.
pub fn clear_session_cookie(secure: bool) -> String {
    format!("{TOKEN_COOKIE}=; {}; Max-Age=0", cookie_attributes(secure))
}

/// token_from_cookies
///
/// Finds the session credential among all `Cookie` headers of a request.
pub fn token_from_cookies(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == TOKEN_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

// --- Authenticated Identity ---

/// SessionUser
///
/// The resolved identity of a request that carried a valid session credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub email: String,
    /// Expiry of the credential, seconds since the epoch.
    pub expires_at: usize,
}

/// SessionUser Extractor
///
/// Reads the `token` cookie and verifies it with the secret held in `AppConfig`.
/// Rejects with `Unauthorized` when the cookie is missing or verification fails.
impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);

        let token = token_from_cookies(parts).ok_or(ApiError::Unauthorized)?;
        let claims = verify_token(&token, &config.jwt_secret)?;

        Ok(SessionUser {
            email: claims.email,
            expires_at: claims.exp,
        })
    }
}

/// Caller
///
/// What the access guard learned about the request. Handlers behind the guard
/// extract it to feed the authorization policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    Authenticated(SessionUser),
    Anonymous,
}

impl Caller {
    pub fn email(&self) -> Option<&str> {
        match self {
            Caller::Authenticated(user) => Some(user.email.as_str()),
            Caller::Anonymous => None,
        }
    }
}

/// Caller Extractor
///
/// Reads the identity attached by [`access_guard`]. A route mounted without the
/// guard sees `Anonymous`.
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Caller>()
            .cloned()
            .unwrap_or(Caller::Anonymous))
    }
}

/// access_guard
///
/// Middleware for the guarded routes. In `AccessMode::Guarded` a request without a
/// valid session credential is answered with 401 before the handler (and therefore
/// any store access) runs. In `AccessMode::Open` the request always continues; the
/// identity is attached only if a valid credential was present.
pub async fn access_guard(
    State(config): State<AppConfig>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (mut parts, body) = request.into_parts();

    let caller = match SessionUser::from_request_parts(&mut parts, &config).await {
        Ok(user) => Caller::Authenticated(user),
        Err(rejection) if config.access_mode == AccessMode::Guarded => return Err(rejection),
        Err(_) => Caller::Anonymous,
    };
    parts.extensions.insert(caller);

    Ok(next.run(Request::from_parts(parts, body)).await)
}
