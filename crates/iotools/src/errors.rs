#[derive(Debug, thiserror::Error)]
pub enum IoToolsError {
    /// A locked converter was handed a token its pinned parser can't handle.
    #[error("cannot convert '{token}' to {datatype}")]
    ParseRejected { token: String, datatype: String },

    #[error("converter is locked and cannot be upgraded to handle '{token}'")]
    ConverterLocked { token: String },

    #[error("no lattice entry can handle type {0}")]
    UnsupportedType(String),

    #[error("unknown type token: '{0}'")]
    UnknownTypeToken(String),

    #[error("invalid default name format: '{0}'")]
    InvalidNameFormat(String),

    #[error("duplicate field name: '{0}'")]
    DuplicateFieldName(String),

    #[error("line {line}: expected {expected} fields, got {got}")]
    InconsistentFieldCount {
        line: usize,
        expected: usize,
        got: usize,
    },

    #[error("no records to infer a schema from")]
    NoRecords,

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("internal: {0}")]
    Internal(String),
}

pub type Result<T, E = IoToolsError> = std::result::Result<T, E>;

macro_rules! internal {
    ($($arg:tt)*) => {
        crate::errors::IoToolsError::Internal(std::format!($($arg)*))
    };
}

pub(crate) use internal;
