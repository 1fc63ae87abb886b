//! Authentication and tenant resolution for protected routes.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;
use uuid::Uuid;

use tessera_core::tenant::{Tenant, TenantContext};
use tessera_shared::types::UserId;
use tessera_shared::{Claims, JwtError};

use crate::{AppState, error::ApiError};

/// Optional header naming the tenant a request is meant for.
///
/// It must agree with the token's tenant; it never overrides it.
pub const TENANT_HEADER: &str = "x-tenant-id";

/// Extracts the bearer token from the Authorization header.
fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
}

fn explicit_tenant(headers: &HeaderMap) -> Result<Option<Uuid>, ApiError> {
    headers
        .get(TENANT_HEADER)
        .map(|value| {
            value
                .to_str()
                .ok()
                .and_then(|v| Uuid::parse_str(v.trim()).ok())
                .ok_or_else(|| ApiError::validation(format!("{TENANT_HEADER} must be a UUID")))
        })
        .transpose()
}

/// Validates the bearer token and resolves the request's tenant.
///
/// Claims and the resolved [`TenantContext`] are stored in request
/// extensions for the extractors below.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let Some(token) = auth_header.and_then(extract_bearer_token) else {
        return ApiError::new(
            401,
            "MISSING_TOKEN",
            "Authorization header with Bearer token is required",
        )
        .into_response();
    };

    let claims = match state.jwt_service.validate_token(token) {
        Ok(claims) => claims,
        Err(JwtError::Expired) => {
            return ApiError::new(401, "TOKEN_EXPIRED", "Token has expired").into_response();
        }
        Err(_) => {
            return ApiError::new(401, "INVALID_TOKEN", "Invalid or malformed token")
                .into_response();
        }
    };

    let context = match explicit_tenant(request.headers()).and_then(|explicit| {
        state
            .tenants
            .resolve(Some(claims.tenant_id()), explicit)
            .map_err(ApiError::from)
    }) {
        Ok(context) => context,
        Err(err) => return err.into_response(),
    };

    debug!(
        user_id = %claims.user_id(),
        tenant_id = %context.tenant(),
        source = context.source().as_str(),
        "request authenticated"
    );

    request.extensions_mut().insert(claims);
    request.extensions_mut().insert(context);
    next.run(request).await
}

/// Extractor for authenticated user claims.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    /// Returns the user ID from the claims.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        UserId::from_uuid(self.0.user_id())
    }

    /// Returns the user's role.
    #[must_use]
    pub fn role(&self) -> &str {
        &self.0.role
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| ApiError::new(401, "UNAUTHORIZED", "Authentication required"))
    }
}

/// Extractor for the tenant resolved by [`auth_middleware`].
///
/// Handlers receive the tenant only through this type, never from a path
/// or body parameter.
#[derive(Debug, Clone, Copy)]
pub struct CurrentTenant(pub Tenant);

impl<S> FromRequestParts<S> for CurrentTenant
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantContext>()
            .map(|context| Self(context.tenant()))
            .ok_or_else(|| ApiError::new(401, "NO_TENANT", "No tenant could be resolved"))
    }
}
