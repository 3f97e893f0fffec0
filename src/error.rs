//! Request error taxonomy
//!
//! Every failure a handler can hit is one of these variants. Each one is turned
//! into exactly one HTTP response at the handler boundary and never escapes the
//! request that produced it.

use hyper::StatusCode;
use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed multipart body, bad `Content-Type`, or body over the size limit
    #[error("{0}")]
    Parse(String),

    #[error("No file uploaded")]
    MissingFile,

    /// Declared MIME type is not on the allow-list (carries the declared type)
    #[error("Invalid file type. Only images and text files are allowed.")]
    UnsupportedType(Option<String>),

    /// Client filename sanitized down to nothing usable
    #[error("Invalid file name")]
    InvalidName,

    /// Resolved path escapes its root directory
    #[error("Forbidden")]
    Forbidden,

    #[error("File not found")]
    NotFound,

    /// Filesystem failure; `context` is the client-facing message
    #[error("{context}")]
    Io {
        context: &'static str,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub const fn io(context: &'static str, source: io::Error) -> Self {
        Self::Io { context, source }
    }

    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Parse(_) | Self::MissingFile | Self::UnsupportedType(_) | Self::InvalidName => {
                StatusCode::BAD_REQUEST
            }
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client errors are logged as warnings, server-side failures as errors
    pub const fn is_client_error(&self) -> bool {
        !matches!(self, Self::Io { .. })
    }
}

impl From<multer::Error> for Error {
    fn from(err: multer::Error) -> Self {
        Self::Parse(err.to_string())
    }
}
