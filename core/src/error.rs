use thiserror::Error;

/// Error categories surfaced by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Encoding,
    QuerySyntax,
    Storage,
    IndexState,
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("query syntax error: {0}")]
    QuerySyntax(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("index state error: {0}")]
    IndexState(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Validation(_) => ErrorKind::Validation,
            EngineError::Encoding(_) => ErrorKind::Encoding,
            EngineError::QuerySyntax(_) => ErrorKind::QuerySyntax,
            EngineError::Storage(_) => ErrorKind::Storage,
            EngineError::IndexState(_) => ErrorKind::IndexState,
        }
    }

    /// True when the caller sent something the engine cannot accept as-is.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Validation | ErrorKind::Encoding | ErrorKind::QuerySyntax
        )
    }

    /// Storage failures may succeed on a later attempt; retrying is left to the caller.
    pub fn is_retriable(&self) -> bool {
        matches!(self, EngineError::Storage(_))
    }
}

impl From<sled::Error> for EngineError {
    fn from(e: sled::Error) -> Self {
        EngineError::Storage(e.to_string())
    }
}

impl From<bincode::Error> for EngineError {
    fn from(e: bincode::Error) -> Self {
        EngineError::Storage(format!("corrupt record: {e}"))
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Storage(format!("corrupt metadata: {e}"))
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Storage(e.to_string())
    }
}
