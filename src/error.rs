use mongodb::error::Error as DbError;
use rocket::{http::Status, response::Responder};
use thiserror::Error;

use crate::import::ImportError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Token not recognised")]
    TokenNotFound,
    #[error("Token has already been used to vote")]
    TokenAlreadyUsed,
    #[error("Ballot does not match voter role: {0}")]
    RoleMismatch(String),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Administrative wipe failed: {0}")]
    WipeFailed(String),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, _: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        warn!("Request rejected: {self}");
        Err(match self {
            Self::TokenNotFound | Self::NotFound(_) => Status::NotFound,
            Self::TokenAlreadyUsed => Status::Conflict,
            Self::RoleMismatch(_) => Status::UnprocessableEntity,
            Self::Import(_) | Self::BadRequest(_) => Status::BadRequest,
            Self::Unauthorized(_) => Status::Unauthorized,
            Self::StoreUnavailable(_) | Self::Db(_) => Status::ServiceUnavailable,
            Self::WipeFailed(_) => Status::InternalServerError,
        })
    }
}
