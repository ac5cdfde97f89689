use thiserror::Error;

/// Error taxonomy for the execution core.
///
/// Two tiers apply during planning versus commitment: a technique missing
/// from the catalog while building a plan is logged and skipped (partial
/// coverage beats an aborted run), while a missing or offline agent at
/// start-execution time aborts before any write. Callers should not collapse
/// the two.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("agent {0} is not online")]
    AgentOffline(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("no executable tasks for the given scenario and agents")]
    NoExecutableTasks,

    #[error("storage error: {0}")]
    Store(String),
}

impl Error {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound {
            entity,
            id: id.into(),
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Store(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
