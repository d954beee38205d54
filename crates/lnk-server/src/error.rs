use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use lnk_core::LinkError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error("store error: {0}")]
    Store(#[from] lnk_store::StoreError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Link(LinkError::InvalidOrigin(_) | LinkError::InvalidTtl { .. }) => {
                StatusCode::BAD_REQUEST
            }
            Self::Link(LinkError::NotFound(_) | LinkError::Expired(_)) => StatusCode::NOT_FOUND,
            Self::Link(LinkError::StoreUnavailable(_)) | Self::Store(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Link(_) | Self::Config(_) | Self::Io(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "request failed");
        }
        (status, self.to_string()).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn maps_link_errors_to_status() {
        let cases = [
            (LinkError::InvalidOrigin(String::new()), StatusCode::BAD_REQUEST),
            (
                LinkError::InvalidTtl {
                    ttl: Duration::ZERO,
                    max: Duration::from_secs(1),
                },
                StatusCode::BAD_REQUEST,
            ),
            (LinkError::NotFound("abcde".into()), StatusCode::NOT_FOUND),
            (LinkError::Expired("abcde".into()), StatusCode::NOT_FOUND),
            (
                LinkError::StoreUnavailable(lnk_store::StoreError::LockTimeout(Duration::from_secs(1))),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ServerError::from(err).status(), status);
        }
    }

    #[test]
    fn internal_errors_are_500() {
        assert_eq!(
            ServerError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ServerError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
    }
}
