use argon2::Error as Argon2Error;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use rocket::{
    http::Status,
    response::{self, status, Responder},
    serde::json::Json,
    Catcher, Request,
};
use thiserror::Error;

use crate::model::{api::Message, store::StoreError};
use crate::voting::Rejection;

pub type Result<T> = std::result::Result<T, Error>;

/// The broad classes of failure a caller can see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvalidInput,
    Forbidden,
    Unauthorized,
    Internal,
}

impl ErrorKind {
    /// The HTTP status for this kind of failure.
    pub fn status(self) -> Status {
        match self {
            Self::NotFound => Status::NotFound,
            Self::Conflict => Status::Conflict,
            Self::InvalidInput => Status::BadRequest,
            Self::Forbidden => Status::Forbidden,
            Self::Unauthorized => Status::Unauthorized,
            Self::Internal => Status::InternalServerError,
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Rejected(#[from] Rejection),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),
    #[error("{1}")]
    Status(Status, String),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::Status(Status::NotFound, format!("{} not found", what.into()))
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::Status(Status::BadRequest, message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Status(Status::Conflict, message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Status(Status::Forbidden, message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Status(Status::Unauthorized, message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Status(Status::InternalServerError, message.into())
    }

    /// Which class of failure is this?
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Store(err) => err.kind(),
            Self::Rejected(rejection) => rejection.kind(),
            Self::Jwt(err) => match err.kind() {
                JwtErrorKind::ExpiredSignature
                | JwtErrorKind::ImmatureSignature
                | JwtErrorKind::InvalidSignature
                | JwtErrorKind::InvalidToken => ErrorKind::Unauthorized,
                _ => ErrorKind::Internal,
            },
            Self::Argon2(_) => ErrorKind::Internal,
            Self::Status(status, _) => match status.code {
                400 | 422 => ErrorKind::InvalidInput,
                401 => ErrorKind::Unauthorized,
                403 => ErrorKind::Forbidden,
                404 => ErrorKind::NotFound,
                409 => ErrorKind::Conflict,
                _ => ErrorKind::Internal,
            },
        }
    }

    /// The HTTP status this error is reported with.
    pub fn status(&self) -> Status {
        match self {
            Self::Status(status, _) => *status,
            _ => self.kind().status(),
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        if status.code >= 500 {
            error!("{self}");
        } else {
            debug!("Request failed with {status}: {self}");
        }
        // Don't leak internals to the client.
        let message = if status.code >= 500 {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        status::Custom(status, Json(Message::new(message))).respond_to(req)
    }
}

#[catch(400)]
fn bad_request() -> Json<Message> {
    Json(Message::new("Bad request"))
}

#[catch(401)]
fn unauthorized() -> Json<Message> {
    Json(Message::new("Not authenticated"))
}

#[catch(403)]
fn forbidden() -> Json<Message> {
    Json(Message::new("Access denied"))
}

#[catch(404)]
fn not_found() -> Json<Message> {
    Json(Message::new("Not found"))
}

#[catch(409)]
fn conflict() -> Json<Message> {
    Json(Message::new("Conflict"))
}

#[catch(422)]
fn unprocessable() -> Json<Message> {
    Json(Message::new("Invalid request data"))
}

#[catch(500)]
fn internal() -> Json<Message> {
    Json(Message::new("Internal server error"))
}

/// JSON catchers, so guard failures look the same as route errors.
pub fn catchers() -> Vec<Catcher> {
    catchers![
        bad_request,
        unauthorized,
        forbidden,
        not_found,
        conflict,
        unprocessable,
        internal
    ]
}
