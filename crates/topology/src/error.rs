use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone, Debug, Error)]
pub enum Error {
    /// Caller-supplied input is invalid. The message lists every violated
    /// constraint, not just the first.
    #[error("validation failed: {0}")]
    Validation(String),
}
