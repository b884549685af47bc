use browserpilot_core_types::PilotError;
use thiserror::Error;

#[derive(Clone, Debug, Error)]
pub enum PoolError {
    #[error("session {0} not found")]
    SessionNotFound(String),
    #[error("page {0} not found")]
    PageNotFound(String),
    #[error("navigation to {url} failed after {attempts} attempts: {last_error}")]
    NavigationFailed {
        url: String,
        attempts: u32,
        last_error: String,
    },
    #[error("blocked URL: {0}")]
    Blocked(String),
    #[error("engine failure: {0}")]
    Engine(String),
}

impl From<PoolError> for PilotError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::Blocked(reason) => PilotError::Security(reason),
            other => PilotError::Browser(other.to_string()),
        }
    }
}
