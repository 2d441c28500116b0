use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    /// The requested rule id is not present in the loaded rule set.
    /// Fails a run before any per-item processing starts.
    #[error("Unknown rule: {0}")]
    UnknownRule(String),

    #[error("Listing error: {0}")]
    Listing(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Fingerprint error: {0}")]
    Fingerprint(String),

    #[error("Classification error: {0}")]
    Classification(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Rule set error: {0}")]
    RuleSet(String),

    #[error("Call timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, AuditError>;
