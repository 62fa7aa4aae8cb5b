//! Business operations. Every function takes the calling `Actor` explicitly and performs the
//! owner check itself.

use thiserror::Error;

use crate::domain::slot::{TransitionError, UploadError};
use crate::email::EmailError;
use crate::repository::RepositoryError;

pub mod accounts;
pub mod clients;
pub mod document_lists;
pub mod notifications;
pub mod ownership;
pub mod requests;
pub mod uploads;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("an email has already been sent for this request")]
    EmailAlreadySent,
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Email(#[from] EmailError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("{0}")]
    Internal(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        ServiceError::Forbidden(message.into())
    }
}

fn require_professional(actor: &crate::domain::Actor) -> ServiceResult<()> {
    if actor.is_professional() {
        Ok(())
    } else {
        Err(ServiceError::forbidden("a professional account is required"))
    }
}
