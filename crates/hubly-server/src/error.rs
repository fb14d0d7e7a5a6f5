//! HTTP error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use hubly_core::{HublyError, StaffError};

/// An error rendered as `{"message": ...}` with a status code
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

/// Status code for each core error kind
pub fn status_for(err: &HublyError) -> StatusCode {
    match err {
        HublyError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        HublyError::NotFound(_) => StatusCode::NOT_FOUND,
        HublyError::Unauthorized => StatusCode::UNAUTHORIZED,
        HublyError::Forbidden(_) => StatusCode::FORBIDDEN,
        HublyError::Conflict(_) => StatusCode::CONFLICT,
        HublyError::Staff(StaffError::EmailTaken(_)) => StatusCode::CONFLICT,
        HublyError::Staff(_) => StatusCode::BAD_REQUEST,
        HublyError::NoStaffAvailable
        | HublyError::MultipleAdministrators(_)
        | HublyError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<HublyError> for ApiError {
    fn from(err: HublyError) -> Self {
        let status = status_for(&err);
        if status.is_server_error() {
            tracing::error!(error = %err, "Request failed");
        }
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "message": self.message })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hubly_core::PersistenceError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&HublyError::InvalidInput("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&HublyError::Staff(StaffError::EmailTaken("a@b.c".into()))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&HublyError::Staff(StaffError::CannotRemoveAdministrator)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&HublyError::NoStaffAvailable),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(&HublyError::Persistence(PersistenceError::Database("x".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
