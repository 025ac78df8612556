// src/error.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

/// Everything that can go wrong between the source page and the rendered dashboard.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to download source page: {0}")]
    Http(#[from] reqwest::Error),

    #[error("html error: {0}")]
    Html(String),

    #[error("source page has {found} tables, none at index {index}")]
    TableNotFound { index: usize, found: usize },

    #[error("row {row}: {message}")]
    MalformedRow { row: usize, message: String },

    #[error("could not parse price '{0}'")]
    InvalidPrice(String),

    #[error("could not parse date '{0}'")]
    InvalidDate(String),

    #[error("cache file '{0}' not found; the data has never been fetched successfully")]
    CacheMissing(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("all observations share the same date; cannot fit a trend")]
    DegenerateSpan,

    #[error("model fit failed: {0}")]
    ModelFit(String),

    #[error("chart rendering failed: {0}")]
    Chart(String),

    #[error("horizon must be between 1 and {max}, got {got}")]
    InvalidHorizon { got: usize, max: usize },

    #[error("{0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("background task failed: {0}")]
    Task(String),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) | AppError::InvalidHorizon { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .content_type("text/plain; charset=utf-8")
            .body(self.to_string())
    }
}
