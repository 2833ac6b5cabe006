use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("The HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("The exchange returned error {0}: {1}")]
    ExchangeError(i64, String),

    #[error("Failed to deserialize the API response: {0}")]
    Deserialization(String),

    #[error("Invalid data format from API: {0}")]
    InvalidData(String),

    #[error("The exchange returned no bar for {0}")]
    EmptyResponse(String),
}
