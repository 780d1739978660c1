// SPDX-License-Identifier: BUSL-1.1
//! # Authentication & Authorization Middleware
//!
//! Every `/v1/*` request must carry `Authorization: Bearer <JWT>`, signed
//! HS256 with the configured secret. The token's `role` claim becomes the
//! caller's [`Role`]; the [`crate::policy`] table then decides whether that
//! role may use the route. Missing or invalid tokens get 401, disallowed
//! roles get 403, both before the handler runs.
//!
//! ## CallerIdentity
//!
//! Authenticated requests get a [`CallerIdentity`] in their extensions.
//! Handlers extract it via the `FromRequestParts` impl.

use std::fmt;

use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, ErrorBody, ErrorDetail};
use crate::policy;

// ── Role ────────────────────────────────────────────────────────────────────

/// Caller roles as carried in the token's `role` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Role {
    #[serde(rename = "admin")]
    Admin,
    #[serde(rename = "superadmin")]
    SuperAdmin,
    #[serde(rename = "surveyadmin")]
    SurveyAdmin,
    #[serde(rename = "division")]
    Division,
    #[serde(rename = "district")]
    District,
    #[serde(rename = "block")]
    Block,
    #[serde(rename = "SME")]
    Sme,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Self::Admin,
        Self::SuperAdmin,
        Self::SurveyAdmin,
        Self::Division,
        Self::District,
        Self::Block,
        Self::Sme,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::SuperAdmin => "superadmin",
            Self::SurveyAdmin => "surveyadmin",
            Self::Division => "division",
            Self::District => "district",
            Self::Block => "block",
            Self::Sme => "SME",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Claims & CallerIdentity ─────────────────────────────────────────────────

/// JWT claims accepted by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Expiration time (seconds since epoch).
    pub exp: i64,
}

/// Identity of the authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub role: Role,
    pub subject: Option<String>,
    pub email: Option<String>,
}

impl CallerIdentity {
    /// The identity used when authentication is disabled.
    pub fn superadmin() -> Self {
        Self {
            role: Role::SuperAdmin,
            subject: None,
            email: None,
        }
    }
}

impl From<Claims> for CallerIdentity {
    fn from(claims: Claims) -> Self {
        Self {
            role: claims.role,
            subject: claims.sub,
            email: claims.email,
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

// ── Auth Configuration ──────────────────────────────────────────────────────

/// Token verification settings injected into request extensions.
///
/// `None` disables authentication. Custom `Debug` keeps key material out of
/// logs.
#[derive(Clone)]
pub struct AuthConfig {
    decoding_key: Option<DecodingKey>,
}

impl AuthConfig {
    pub fn new(secret: Option<&str>) -> Self {
        Self {
            decoding_key: secret.map(|s| DecodingKey::from_secret(s.as_bytes())),
        }
    }

    pub fn disabled() -> Self {
        Self { decoding_key: None }
    }

    /// Verify a token and return its claims.
    pub fn verify(&self, token: &str) -> Result<Option<Claims>, String> {
        let Some(key) = &self.decoding_key else {
            return Ok(None);
        };
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, key, &validation)
            .map(|data| Some(data.claims))
            .map_err(|e| format!("invalid token: {e}"))
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("enabled", &self.decoding_key.is_some())
            .finish()
    }
}

/// Sign `claims` with `secret`. Used by operators and tests to mint tokens.
pub fn issue_token(secret: &str, claims: &Claims) -> Result<String, AppError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("failed to sign token: {e}")))
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Authenticate the caller, then enforce the route policy table.
///
/// With authentication disabled every request runs as `superadmin`.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let config = request
        .extensions()
        .get::<AuthConfig>()
        .cloned()
        .unwrap_or_else(AuthConfig::disabled);

    let identity = if config.decoding_key.is_some() {
        let auth_header = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        let token = match auth_header {
            Some(value) => match value.strip_prefix("Bearer ") {
                Some(token) => token.trim(),
                None => {
                    tracing::warn!("authentication failed: non-Bearer authorization scheme");
                    return error_response(
                        StatusCode::UNAUTHORIZED,
                        "UNAUTHORIZED",
                        "authorization header must use Bearer scheme",
                    );
                }
            },
            None => {
                tracing::warn!("authentication failed: missing authorization header");
                return error_response(
                    StatusCode::UNAUTHORIZED,
                    "UNAUTHORIZED",
                    "Please authenticate",
                );
            }
        };

        match config.verify(token) {
            Ok(Some(claims)) => CallerIdentity::from(claims),
            Ok(None) => CallerIdentity::superadmin(),
            Err(msg) => {
                tracing::warn!(reason = %msg, "authentication failed");
                return error_response(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "Please authenticate");
            }
        }
    } else {
        CallerIdentity::superadmin()
    };

    if !policy::is_allowed(request.method(), request.uri().path(), identity.role) {
        tracing::warn!(
            role = %identity.role,
            method = %request.method(),
            path = %request.uri().path(),
            "authorization denied by route policy"
        );
        return error_response(StatusCode::FORBIDDEN, "FORBIDDEN", "Forbidden");
    }

    request.extensions_mut().insert(identity);
    next.run(request).await
}

fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: code.to_string(),
            message: message.to_string(),
            details: None,
        },
    };
    (status, Json(body)).into_response()
}
