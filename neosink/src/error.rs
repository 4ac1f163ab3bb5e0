use graphload::errors::SinkError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Neo4jSinkError {
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Neo4j returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{code}: {message}")]
    Neo4j { code: String, message: String },
}

pub type Result<T> = std::result::Result<T, Neo4jSinkError>;

impl From<Neo4jSinkError> for SinkError {
    fn from(err: Neo4jSinkError) -> Self {
        match err {
            Neo4jSinkError::Neo4j { .. } => SinkError::Store(err.to_string()),
            Neo4jSinkError::Status { status, .. } if (400..500).contains(&status) => {
                SinkError::Store(err.to_string())
            }
            other => SinkError::Transport(other.to_string()),
        }
    }
}
