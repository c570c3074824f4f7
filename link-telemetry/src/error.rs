use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request failed with status: {0}")]
    Status(reqwest::StatusCode),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}
