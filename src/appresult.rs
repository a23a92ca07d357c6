use axum::{http::StatusCode, response::{IntoResponse, Response}};

pub type AppResult<T> = Result<T, AppError>;

/// Catch-all error for the HTTP surface. Anything that converts into
/// `anyhow::Error` bubbles up as a 500.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.0, "request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("{}", self.0),
        )
            .into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
