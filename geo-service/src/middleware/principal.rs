//! Caller identity extractors.
//!
//! The front end authenticates users and forwards who they are in headers.
//! Geo routes only read them; they never authenticate on their own.

use crate::models::{Principal, Role};
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use service_core::error::AppError;

pub const USER_ID_HEADER: &str = "X-User-ID";
pub const USER_ROLE_HEADER: &str = "X-User-Role";
pub const TENANT_ID_HEADER: &str = "X-Tenant-ID";

/// Matches `node_movements.moved_by`.
pub const MAX_USER_ID_LEN: usize = 128;

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header(parts, USER_ID_HEADER).ok_or_else(|| {
            AppError::Unauthorized(anyhow::anyhow!("Missing {} header", USER_ID_HEADER))
        })?;
        if user_id.chars().count() > MAX_USER_ID_LEN {
            return Err(AppError::Unauthorized(anyhow::anyhow!(
                "{} header exceeds {} characters",
                USER_ID_HEADER,
                MAX_USER_ID_LEN
            )));
        }

        let role = match header(parts, USER_ROLE_HEADER) {
            Some(role) => role
                .parse::<Role>()
                .map_err(|e| AppError::Unauthorized(anyhow::anyhow!(e)))?,
            None => Role::User,
        };

        let tenant_id = header(parts, TENANT_ID_HEADER).map(str::to_string);

        tracing::Span::current().record("user_id", user_id);

        Ok(Principal::new(user_id, role, tenant_id))
    }
}

/// A principal holding the ROOT role; anyone else gets 403.
#[derive(Debug, Clone)]
pub struct RootPrincipal(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for RootPrincipal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let principal = Principal::from_request_parts(parts, state).await?;
        if !principal.is_root() {
            tracing::warn!(
                user_id = %principal.user_id,
                role = principal.role.as_str(),
                "Non-root principal denied geo administration"
            );
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "ROOT role required for geo administration"
            )));
        }
        Ok(RootPrincipal(principal))
    }
}
