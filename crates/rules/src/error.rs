use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The rule file does not exist. Raised before any parse attempt.
    #[error("{0} doesn't exist")]
    NotFound(String),

    /// The rule file exists but could not be read.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The rule file is not valid JSON.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// The document parsed but is missing required structure.
    #[error("invalid rule document: {0}")]
    Format(String),
}
