use axum::{http::StatusCode, response::IntoResponse, Json};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Acquisition error: {0}")]
    Acquisition(String),

    /// A request needs state that no earlier run has produced yet.
    #[error("{0}")]
    NoData(String),

    #[error("{0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = match &self {
            AppError::NoData(msg) | AppError::NotFound(msg) => serde_json::json!({
                "success": false,
                "message": msg,
            }),
            AppError::Acquisition(_) | AppError::Http(_) => serde_json::json!({
                "success": false,
                "error": self.to_string(),
                "message": "Failed to fetch data",
            }),
            _ => serde_json::json!({
                "success": false,
                "error": self.to_string(),
                "message": "Request failed",
            }),
        };
        let status = match &self {
            AppError::NoData(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(body)).into_response()
    }
}
