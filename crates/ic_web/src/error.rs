use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ic_core::Error;
use serde_json::json;

/// An [`Error`] rendered as a JSON HTTP response.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            Error::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            Error::UnsupportedImage(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Error::InvalidImage(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            tracing::error!("Request failed: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
