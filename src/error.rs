use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid config value for `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("invalid crossing line: {0}")]
    InvalidLine(String),

    #[error("failed to start cleanup thread: {0}")]
    CleanupThread(#[from] std::io::Error),
}
