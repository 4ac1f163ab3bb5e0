use thiserror::Error;

/// Coarse classification used by the batch runner to decide how far an error travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed mapping, load spec or dataset config.
    Configuration,
    /// Primary key or node label missing or mistyped on a record.
    DataShape,
    /// Relation target lacks its label or primary-key attribute.
    RelationTarget,
    /// Query client or mutation sink failure.
    Collaborator,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    #[error("unknown directive `{0}`")]
    UnknownDirective(String),

    #[error("expression must be a string or a single-key directive object, got {0}")]
    Malformed(String),

    #[error("directive `{directive}` expects {expected}")]
    InvalidArgument {
        directive: &'static str,
        expected: &'static str,
    },

    #[error("directive `{directive}` cannot be applied to {found}")]
    TypeMismatch {
        directive: &'static str,
        found: &'static str,
    },

    #[error("invalid point literal '{0}', expected 'Point(x y)'")]
    InvalidPoint(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("query transport failed: {0}")]
    Transport(String),

    #[error("query endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("query response could not be decoded: {0}")]
    Decode(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SinkError {
    #[error("graph store rejected statement: {0}")]
    Store(String),

    #[error("graph store unreachable: {0}")]
    Transport(String),
}

/// Why a single record was rejected. Never aborts the batch.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error(transparent)]
    Expression(#[from] ExprError),

    #[error("primary_id must evaluate to a field name, got {0}")]
    InvalidPrimaryKeyName(String),

    #[error("record has no value for primary key `{0}`")]
    MissingPrimaryKeyValue(String),

    #[error("record has no string `#node_label`")]
    MissingNodeLabel,

    #[error("relation {index} target is missing {missing}")]
    InvalidRelationTarget { index: usize, missing: String },

    #[error("relation {index} type must evaluate to a string")]
    InvalidRelationType { index: usize },

    #[error("relation {index} direction must be IN or OUT, got {found}")]
    InvalidRelationDirection { index: usize, found: String },

    #[error(transparent)]
    Sink(#[from] SinkError),
}

impl RecordError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RecordError::Expression(_)
            | RecordError::InvalidRelationType { .. }
            | RecordError::InvalidRelationDirection { .. } => ErrorKind::Configuration,
            RecordError::InvalidPrimaryKeyName(_)
            | RecordError::MissingPrimaryKeyValue(_)
            | RecordError::MissingNodeLabel => ErrorKind::DataShape,
            RecordError::InvalidRelationTarget { .. } => ErrorKind::RelationTarget,
            RecordError::Sink(_) => ErrorKind::Collaborator,
        }
    }
}

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Dataset not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("Dataset task failed: {0}")]
    Task(String),
}

impl ImportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ImportError::Query(_) | ImportError::Sink(_) | ImportError::Task(_) => {
                ErrorKind::Collaborator
            }
            _ => ErrorKind::Configuration,
        }
    }
}

pub type Result<T> = std::result::Result<T, ImportError>;
