use crate::domain::{EnvelopeError, ValidationError};
use crate::scoring::InterestsError;

pub const OK: u16 = 200;
pub const BAD_REQUEST: u16 = 400;
pub const FORBIDDEN: u16 = 403;
pub const NOT_FOUND: u16 = 404;
pub const METHOD_NOT_ALLOWED: u16 = 405;
pub const INVALID_REQUEST: u16 = 422;
pub const INTERNAL_ERROR: u16 = 500;

/// Reason phrase sent to callers for an error code.
pub fn reason(code: u16) -> &'static str {
    match code {
        BAD_REQUEST => "Bad Request",
        FORBIDDEN => "Forbidden",
        NOT_FOUND => "Not Found",
        INVALID_REQUEST => "Invalid Request",
        INTERNAL_ERROR => "Internal Server Error",
        METHOD_NOT_ALLOWED => "Method Not Allowed",
        _ => "Unknown Error",
    }
}

#[derive(Debug, thiserror::Error)]
/// Request failures, one variant per status class.
///
/// Details stay in logs; callers only see the code and its reason phrase.
pub enum ApiError {
    /// The body is not valid JSON.
    #[error("malformed JSON body: {0}")]
    BadRequest(#[source] serde_json::Error),

    /// The token does not match the credentials.
    #[error("authentication failed for login {login:?}")]
    Forbidden { login: String },

    /// No endpoint is registered under the path.
    #[error("no endpoint at {path:?}")]
    NotFound { path: String },

    /// A field, the argument set, or the method name is invalid.
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    /// A client id has no cached interests.
    #[error("no interests for client {client_id}")]
    MissingInterests { client_id: i64 },

    /// Anything not anticipated above.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn code(&self) -> u16 {
        match self {
            Self::BadRequest(_) => BAD_REQUEST,
            Self::Forbidden { .. } => FORBIDDEN,
            Self::NotFound { .. } => NOT_FOUND,
            Self::Validation(_) | Self::MissingInterests { .. } => INVALID_REQUEST,
            Self::Internal(_) => INTERNAL_ERROR,
        }
    }
}

impl From<EnvelopeError> for ApiError {
    fn from(err: EnvelopeError) -> Self {
        match err {
            EnvelopeError::Invalid(err) => Self::Validation(err),
            EnvelopeError::Forbidden { login } => Self::Forbidden { login },
        }
    }
}

impl From<InterestsError> for ApiError {
    fn from(err: InterestsError) -> Self {
        match err {
            InterestsError::NotFound { client_id } => Self::MissingInterests { client_id },
            other => Self::Internal(other.to_string()),
        }
    }
}
