use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone, Debug, Error)]
pub enum Error {
    /// The provider rejected or failed the call. Carries the structured
    /// error list alongside the raw payload for diagnostics.
    #[error("provider call failed: {}", errors.join(", "))]
    Call {
        errors: Vec<String>,
        raw: serde_json::Value,
    },

    /// A textual value does not map to any variant this tool understands.
    #[error("{0}")]
    InvalidValue(String),
}

impl Error {
    /// Builds a call failure from a single error message.
    #[must_use]
    pub fn call(message: impl Into<String>) -> Self {
        Self::Call {
            errors: vec![message.into()],
            raw: serde_json::Value::Null,
        }
    }
}
