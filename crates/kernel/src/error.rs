//! Query engine error types.

use thiserror::Error;

/// Errors raised while building, assembling or executing an association query.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("limit must be set before the query is assembled")]
    MissingLimit,

    #[error("limit must be a positive integer, got {0}")]
    InvalidLimit(i64),

    #[error("offset must be zero or a positive integer, got {0}")]
    InvalidOffset(i64),

    #[error("invalid query arguments: {0}")]
    InvalidArguments(String),

    #[error("unknown element domain '{0}'")]
    UnknownDomain(String),

    #[error("query has already been executed")]
    AlreadyExecuted,

    #[error("query has not been executed yet")]
    NotExecuted,

    #[error("found rows were not requested before execution")]
    FoundRowsNotRequested,

    #[error("host query conditions require the acknowledgement token")]
    MissingAcknowledgement,

    #[error("query execution failed: {0}")]
    Execution(#[from] anyhow::Error),
}

/// Coarse error category, used by callers that only care about who is at fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid or missing builder input.
    Configuration,
    /// The query object was used out of order.
    Misuse,
    /// A host collaborator failed.
    Execution,
}

impl QueryError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueryError::MissingLimit
            | QueryError::InvalidLimit(_)
            | QueryError::InvalidOffset(_)
            | QueryError::InvalidArguments(_)
            | QueryError::UnknownDomain(_) => ErrorKind::Configuration,
            QueryError::AlreadyExecuted
            | QueryError::NotExecuted
            | QueryError::FoundRowsNotRequested
            | QueryError::MissingAcknowledgement => ErrorKind::Misuse,
            QueryError::Execution(_) => ErrorKind::Execution,
        }
    }
}

/// Result type alias using QueryError.
pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn limit_errors_are_configuration_errors() {
        assert_eq!(QueryError::MissingLimit.kind(), ErrorKind::Configuration);
        assert_eq!(QueryError::InvalidLimit(0).kind(), ErrorKind::Configuration);
        assert_eq!(
            QueryError::InvalidOffset(-1).kind(),
            ErrorKind::Configuration
        );
    }

    #[test]
    fn reuse_errors_are_misuse() {
        assert_eq!(QueryError::AlreadyExecuted.kind(), ErrorKind::Misuse);
        assert_eq!(QueryError::MissingAcknowledgement.kind(), ErrorKind::Misuse);
    }

    #[test]
    fn collaborator_failures_keep_their_message() {
        let err: QueryError = anyhow::anyhow!("connection refused").into();
        assert_eq!(err.kind(), ErrorKind::Execution);
        assert_eq!(err.to_string(), "query execution failed: connection refused");
    }

    #[test]
    fn invalid_limit_display() {
        assert_eq!(
            QueryError::InvalidLimit(-5).to_string(),
            "limit must be a positive integer, got -5"
        );
    }
}
