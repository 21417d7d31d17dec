//! Download error types.

use hyper::{Response, StatusCode};
use std::io;
use thiserror::Error;

use super::LocateError;
use crate::http::{self, RangeError, ResponseBody};
use crate::token::TokenError;

/// Everything that can stop a download before its headers are sent
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("invalid download token: {0}")]
    Token(#[from] TokenError),

    /// Missing resource, replayed token, or directory target
    #[error("resource not found")]
    NotFound,

    #[error("{source} (resource is {total} bytes)")]
    Range {
        #[source]
        source: RangeError,
        total: u64,
    },

    #[error("storage error: {0}")]
    Storage(#[from] io::Error),
}

impl From<LocateError> for DownloadError {
    fn from(err: LocateError) -> Self {
        match err {
            LocateError::NotFound => Self::NotFound,
            LocateError::Io(e) => Self::Storage(e),
        }
    }
}

impl DownloadError {
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Token(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Range { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn into_response(self) -> Response<ResponseBody> {
        match self {
            Self::Token(_) => http::build_400_response(),
            Self::NotFound => http::build_404_response(),
            Self::Range { total, .. } => http::build_416_response(total),
            Self::Storage(_) => http::build_500_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            DownloadError::from(TokenError::Missing).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(DownloadError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            DownloadError::Range { source: RangeError::Unsatisfiable, total: 10 }.status_code(),
            StatusCode::RANGE_NOT_SATISFIABLE
        );
        assert_eq!(
            DownloadError::from(io::Error::other("disk")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_locate_errors_map_onto_download_errors() {
        assert!(matches!(DownloadError::from(LocateError::NotFound), DownloadError::NotFound));
        assert!(matches!(
            DownloadError::from(LocateError::Io(io::Error::other("disk"))),
            DownloadError::Storage(_)
        ));
    }

    #[test]
    fn test_range_response_reports_total() {
        let response =
            DownloadError::Range { source: RangeError::InvalidFormat("x"), total: 42 }.into_response();
        assert_eq!(response.headers()[hyper::header::CONTENT_RANGE], "bytes */42");
    }
}
