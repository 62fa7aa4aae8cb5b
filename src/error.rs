use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt::Display;

use crate::domain::slot::{TransitionError, UploadError};
use crate::email::EmailError;
use crate::repository::RepositoryError;
use crate::services::ServiceError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized")
    }

    pub fn internal<E: Display>(error: E) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status;
        if status.is_server_error() {
            tracing::error!(%status, error = %self.message, "request failed");
        }
        let body = Json(ErrorResponse {
            error: self.message,
        });
        (status, body).into_response()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl From<ServiceError> for AppError {
    fn from(value: ServiceError) -> Self {
        let status = match &value {
            ServiceError::Validation(_)
            | ServiceError::Transition(TransitionError::MissingReason) => StatusCode::BAD_REQUEST,
            ServiceError::Upload(UploadError::InvalidFileType(_)) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            ServiceError::Upload(UploadError::FileTooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            ServiceError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) | ServiceError::Repository(RepositoryError::NotFound) => {
                StatusCode::NOT_FOUND
            }
            ServiceError::Conflict(_)
            | ServiceError::EmailAlreadySent
            | ServiceError::Transition(_) => StatusCode::CONFLICT,
            ServiceError::Email(EmailError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Email(EmailError::Rejected { .. }) => StatusCode::BAD_GATEWAY,
            ServiceError::Email(EmailError::Template(_))
            | ServiceError::Repository(_)
            | ServiceError::Storage(_)
            | ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        AppError::new(status, value.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        AppError::internal(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_service_errors_to_statuses() {
        let cases = [
            (ServiceError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (
                ServiceError::Upload(UploadError::InvalidFileType("text/plain".into())),
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ),
            (
                ServiceError::Upload(UploadError::FileTooLarge { size: 2, max: 1 }),
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (ServiceError::forbidden("no"), StatusCode::FORBIDDEN),
            (ServiceError::NotFound("request"), StatusCode::NOT_FOUND),
            (ServiceError::EmailAlreadySent, StatusCode::CONFLICT),
            (
                ServiceError::Conflict("document was replaced while under review".into()),
                StatusCode::CONFLICT,
            ),
            (
                ServiceError::Email(EmailError::Unavailable("down".into())),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ServiceError::Email(EmailError::Rejected {
                    status: 400,
                    message: "bad".into(),
                }),
                StatusCode::BAD_GATEWAY,
            ),
            (
                ServiceError::Repository(RepositoryError::Database("boom".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(AppError::from(error).status(), status);
        }
    }
}
