use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("no address resolved for {0}")]
    Resolve(String),
    #[error("connect to {addr} failed: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },
    #[error("connect to {0} timed out")]
    ConnectTimeout(String),
    #[error("write failed: {0}")]
    Write(#[source] std::io::Error),
    #[error("replay line {line}: {reason}")]
    Replay { line: usize, reason: String },
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LinkError>;
