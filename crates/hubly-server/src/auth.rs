//! Authentication and authorization

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::Response,
};

use hubly_core::{HublyError, Staff};

use crate::{ApiError, AppState};

/// The staff member behind the request's bearer token
#[derive(Debug, Clone)]
pub struct CurrentStaff(pub Staff);

impl CurrentStaff {
    /// Reject members on administrator-only routes
    pub fn require_admin(&self) -> Result<&Staff, ApiError> {
        if self.0.is_admin() {
            Ok(&self.0)
        } else {
            Err(HublyError::Forbidden("Admin access required".to_string()).into())
        }
    }
}

/// Extract the token from `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Token-based authentication middleware
///
/// Resolves the bearer token to a staff record and stores it as a
/// [`CurrentStaff`] request extension.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers()).ok_or(HublyError::Unauthorized)?;

    let staff = {
        let desk = state.desk()?;
        desk.authenticate(token)?
    };

    request.extensions_mut().insert(CurrentStaff(staff));
    Ok(next.run(request).await)
}
