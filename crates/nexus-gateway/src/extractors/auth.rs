//! Caller identity as set by the authentication layer in front of the gateway.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use nexus_core::{Role, Viewer};

use crate::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";
pub const BRANCH_ID_HEADER: &str = "x-branch-id";

/// Bearer token forwarded to every downstream service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken(pub String);

impl BearerToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parsea el valor de un header `Authorization`.
    pub fn parse(value: &str) -> Option<Self> {
        let (scheme, token) = value.trim().split_once(' ')?;
        let token = token.trim();
        (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty())
            .then(|| Self(token.to_string()))
    }
}

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(BearerToken::parse)
            .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))
    }
}

/// Extractor que construye el [`Viewer`] a partir de los headers del gateway.
///
/// Without a role header the caller is treated as staff, which only sees
/// invoices it issued.
#[derive(Debug, Clone)]
pub struct CallerScope(pub Viewer);

impl CallerScope {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AppError> {
        let text = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
        };

        let role = match text(USER_ROLE_HEADER) {
            Some(role) => role.parse::<Role>().map_err(AppError::BadRequest)?,
            None => Role::default(),
        };

        Ok(Self(Viewer {
            user_id: text(USER_ID_HEADER),
            role,
            branch_id: text(BRANCH_ID_HEADER),
        }))
    }
}

impl<S> FromRequestParts<S> for CallerScope
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_headers(&parts.headers)
    }
}
