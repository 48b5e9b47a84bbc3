use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Caller-supplied input is invalid; the message lists every violated
    /// constraint. Recoverable by correcting the input and retrying.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A prerequisite resource is not yet available. The caller should
    /// poll and retry later; no retry loop runs internally.
    #[error("network is not ready")]
    NotReady,

    /// The provider failed in a way this tool does not handle. Surfaced
    /// as-is rather than swallowed.
    #[error(transparent)]
    Provider(#[from] cirrus_provider::Error),

    /// The rule document could not be loaded. Fatal for the current run.
    #[error(transparent)]
    Rules(#[from] cirrus_rules::Error),
}
