//! Error types for DocQA

use std::fmt;

use thiserror::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the DocQA query engine
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Provider error: {message}")]
    Provider { message: String, retriable: bool },

    #[error("Content policy violation: {0}")]
    ContentPolicy(String),

    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("No results: {0}")]
    NoResults(String),

    #[error("No context: {0}")]
    NoContext(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(String),
}

impl Error {
    /// Provider failure that is worth another attempt (timeouts, throttling, 5xx).
    pub fn transient(message: impl Into<String>) -> Self {
        Error::Provider {
            message: message.into(),
            retriable: true,
        }
    }

    /// Provider failure that will not succeed on retry.
    pub fn permanent(message: impl Into<String>) -> Self {
        Error::Provider {
            message: message.into(),
            retriable: false,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            Error::Provider { .. } => ErrorKind::Provider,
            Error::ContentPolicy(_) => ErrorKind::ContentPolicy,
            Error::ResourceExhausted(_) => ErrorKind::ResourceExhausted,
            Error::NoResults(_) => ErrorKind::NoResults,
            Error::NoContext(_) => ErrorKind::NoContext,
            Error::Cancelled(_) => ErrorKind::Cancelled,
            Error::Configuration(_)
            | Error::Serialization(_)
            | Error::Io(_)
            | Error::Other(_) => ErrorKind::Internal,
        }
    }

    /// Only transient provider failures are retried.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Error::Provider { retriable: true, .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Coarse classification of [`Error`] used by callers that map failures
/// onto an external protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    DimensionMismatch,
    Provider,
    ContentPolicy,
    ResourceExhausted,
    NoResults,
    NoContext,
    Cancelled,
    Internal,
}

impl ErrorKind {
    /// HTTP status an API layer should answer with for this kind of failure.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::InvalidArgument => 400,
            ErrorKind::NoResults | ErrorKind::NoContext => 404,
            ErrorKind::ResourceExhausted => 503,
            ErrorKind::Provider | ErrorKind::ContentPolicy => 502,
            // 499 is the de-facto "client closed request" code
            ErrorKind::Cancelled => 499,
            ErrorKind::DimensionMismatch | ErrorKind::Internal => 500,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::DimensionMismatch => "dimension_mismatch",
            ErrorKind::Provider => "provider",
            ErrorKind::ContentPolicy => "content_policy",
            ErrorKind::ResourceExhausted => "resource_exhausted",
            ErrorKind::NoResults => "no_results",
            ErrorKind::NoContext => "no_context",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stages of a single `answer` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Start,
    Retrieving,
    NoContextFallback,
    Assembling,
    Generating,
    Done,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Start => "START",
            Stage::Retrieving => "RETRIEVING",
            Stage::NoContextFallback => "NO_CONTEXT_FALLBACK",
            Stage::Assembling => "ASSEMBLING",
            Stage::Generating => "GENERATING",
            Stage::Done => "DONE",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of an `answer` call, tagged with the stage it originated in.
#[derive(Error, Debug)]
#[error("{} failed during {stage}: {source}", .source.kind())]
pub struct AnswerError {
    pub stage: Stage,
    #[source]
    pub source: Error,
}

impl AnswerError {
    pub fn new(stage: Stage, source: Error) -> Self {
        Self { stage, source }
    }

    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}
