//! `AuthUser` extractor.
//!
//! BookHub sits behind the school portal's identity gateway, which
//! authenticates every request and forwards the verified identity in the
//! `X-Portal-User` and `X-Portal-Role` headers. The extractor trusts those
//! headers and builds the request context from them.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use bookhub_core::error::AppError;
use bookhub_core::types::role::PortalRole;
use bookhub_service::context::RequestContext;

use crate::state::AppState;

/// Extracted authenticated user context available in handlers.
#[derive(Debug, Clone)]
pub struct AuthUser(pub RequestContext);

impl AuthUser {
    /// Returns the inner `RequestContext`.
    pub fn context(&self) -> &RequestContext {
        &self.0
    }
}

impl std::ops::Deref for AuthUser {
    type Target = RequestContext;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user_id = header_value(parts, "x-portal-user")?
            .parse::<Uuid>()
            .map_err(|_| AppError::permission_denied("Invalid X-Portal-User header"))?;

        let role = header_value(parts, "x-portal-role")?
            .parse::<PortalRole>()
            .map_err(|_| AppError::permission_denied("Invalid X-Portal-Role header"))?;

        Ok(AuthUser(RequestContext::new(user_id, role)))
    }
}

fn header_value<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, AppError> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::permission_denied(format!("Missing {name} header")))
}
