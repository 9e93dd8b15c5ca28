use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use std::borrow::Cow;

use crate::modules::file_upload::validator::ValidationError;
use crate::storage::StorageError;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Bad Request: {0}")]
    BadRequest(Cow<'static, str>),
    #[error("Validation Failed: {0}")]
    Validation(ValidationError),
    #[error("Unauthorized: {0}")]
    Unauthorized(Cow<'static, str>),
    #[error("Not Found: {0}")]
    NotFound(Cow<'static, str>),
    #[error("Conflict: {0}")]
    Conflict(Cow<'static, str>),
    #[error("Not Implemented: {0}")]
    NotImplemented(Cow<'static, str>),
    #[error("Service Unavailable")]
    ServiceUnavailable,
    #[error("Internal Server Error")]
    InternalServer,
}

#[derive(serde::Serialize)]
pub struct ErrorBody {
    pub message: Cow<'static, str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<&'static str>,
}

impl Error {
    pub fn bad_request(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Unauthorized(msg.into())
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match *self {
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::Validation(ValidationError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            Error::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Error::InternalServer => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut res = HttpResponse::build(self.status_code());

        match self {
            // Has Message
            Error::NotFound(msg)
            | Error::Conflict(msg)
            | Error::Unauthorized(msg)
            | Error::BadRequest(msg)
            | Error::NotImplemented(msg) => {
                res.json(ErrorBody { message: msg.clone(), rule: None })
            }
            Error::Validation(err) => {
                res.json(ErrorBody { message: err.to_string().into(), rule: Some(err.rule()) })
            }
            // No Message
            Error::ServiceUnavailable => res.json(ErrorBody {
                message: "Storage temporarily unavailable".into(),
                rule: None,
            }),
            Error::InternalServer => {
                res.json(ErrorBody { message: "Internal Server Error".into(), rule: None })
            }
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SystemError {
    // jwt errors
    #[error("JWT Error")]
    JwtError(#[from] jsonwebtoken::errors::Error),
    // sqlx errors
    #[error("Database Error : {0}")]
    DatabaseError(Cow<'static, str>),
    // upload policy
    #[error(transparent)]
    Validation(#[from] ValidationError),
    // storage backend
    #[error("Storage Error: {0}")]
    Storage(StorageError),
    #[error("Unsupported: {0}")]
    Unsupported(Cow<'static, str>),
    // metadata and storage diverged and could not be reconciled
    #[error("Consistency Error: {0}")]
    Consistency(Cow<'static, str>),
    // Custom Errors
    #[error("Bad Request: {0}")]
    BadRequest(Cow<'static, str>),
    #[error("Database Not Found: {0}")]
    NotFound(Cow<'static, str>),
    #[error("Database Conflict: {0:?}")]
    Conflict(Option<DbErrorMeta>),
    #[error("Internal System Error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

fn conflict_message(meta: &Option<DbErrorMeta>) -> Cow<'static, str> {
    let Some(m) = meta else {
        return "Duplicate value".into();
    };

    let Some(constraint) = &m.constraint else {
        return "Duplicate value".into();
    };

    let field = constraint.split('_').next_back().unwrap_or("value");

    let mut chars = field.chars();
    let field = match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => "Value".to_string(),
    };

    format!("{field} already exists").into()
}

#[derive(Debug)]
pub struct DbErrorMeta {
    pub code: Option<String>,
    pub constraint: Option<String>,
    pub message: String,
}

impl From<SystemError> for Error {
    fn from(value: SystemError) -> Self {
        match value {
            SystemError::Validation(err) => Error::Validation(err),
            SystemError::BadRequest(msg) => Error::BadRequest(msg),
            SystemError::NotFound(msg) => Error::NotFound(msg),
            SystemError::Conflict(meta) => Error::Conflict(conflict_message(&meta)),
            SystemError::Unsupported(msg) => Error::NotImplemented(msg),
            SystemError::Storage(err) if err.is_transient() => {
                log::warn!("Transient storage failure: {:?}", err);
                Error::ServiceUnavailable
            }
            SystemError::Consistency(msg) => {
                log::error!("Consistency error, manual cleanup required: {}", msg);
                Error::InternalServer
            }
            _ => {
                log::error!("Internal Server Error: {:?}", value);
                Error::InternalServer
            }
        }
    }
}

impl From<StorageError> for SystemError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) => SystemError::NotFound("File not found".into()),
            StorageError::Payload(msg) => SystemError::BadRequest(msg.into()),
            StorageError::Unsupported(backend) => SystemError::Unsupported(
                format!("Operation not supported by the {backend} storage backend").into(),
            ),
            other => SystemError::Storage(other),
        }
    }
}

impl From<sqlx::Error> for SystemError {
    fn from(err: sqlx::Error) -> Self {
        log::error!("{:?}", err);
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.code().as_deref() {
                Some("23505") => {
                    return SystemError::Conflict(Some(DbErrorMeta {
                        code: db_err.code().map(|s| s.to_string()),
                        constraint: db_err.constraint().map(|s| s.to_string()),
                        message: db_err.message().to_string(),
                    }));
                }
                _ => {
                    log::error!("Unhandled DB error: {:?}", db_err);
                    return SystemError::DatabaseError(db_err.message().to_string().into());
                }
            }
        }
        SystemError::InternalError(Box::new(err))
    }
}

impl SystemError {
    pub fn not_found(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn consistency(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Consistency(msg.into())
    }
}
