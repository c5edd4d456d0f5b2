use std::fmt;

use crate::schedule::ValidationError;

#[derive(Debug)]
pub enum Error {
    BadCredentials,
    MfaRequired,
    MfaInvalid,
    TokenExpired,
    Validation(ValidationError),
    Http { status: u16, message: String },
    Protocol(String),
    Timeout,
    Transport(reqwest::Error),
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BadCredentials => write!(f, "authentication failed: bad username or password"),
            Error::MfaRequired => write!(f, "a multi-factor code is required to log in"),
            Error::MfaInvalid => write!(f, "multi-factor code rejected"),
            Error::TokenExpired => write!(f, "refresh token no longer valid, re-authenticate"),
            Error::Validation(e) => write!(f, "invalid schedule: {e}"),
            Error::Http { status, message } => write!(f, "HTTP {status}: {message}"),
            Error::Protocol(msg) => write!(f, "protocol error: {msg}"),
            Error::Timeout => write!(f, "request timed out"),
            Error::Transport(e) => write!(f, "transport error: {e}"),
            Error::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Validation(e) => Some(e),
            Error::Transport(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout
        } else {
            Error::Transport(e)
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Error::Validation(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
