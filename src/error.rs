use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use std::fmt;
use thiserror::Error;

/// Category of a failed DynamoDB call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Throttled,
    NotFound,
    TransactionConflict,
    ConditionFailed,
    Transient,
    Unknown,
}

impl ErrorKind {
    /// Map a service error code to its kind. Unrecognised or missing codes are `Unknown`.
    pub fn from_code(code: Option<&str>) -> Self {
        match code {
            Some(
                "ProvisionedThroughputExceededException"
                | "RequestLimitExceeded"
                | "ThrottlingException",
            ) => Self::Throttled,
            Some("ResourceNotFoundException") => Self::NotFound,
            Some("TransactionCanceledException" | "TransactionConflictException") => {
                Self::TransactionConflict
            }
            Some("ConditionalCheckFailedException") => Self::ConditionFailed,
            Some("InternalServerError" | "ServiceUnavailable") => Self::Transient,
            _ => Self::Unknown,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Throttled | Self::Transient)
    }

    pub fn advice(&self) -> &'static str {
        match self {
            Self::Throttled => "Request rate is too high. Retry with exponential back-off or increase the table's capacity.",
            Self::NotFound => "The table or index was not found. Verify it exists before retrying.",
            Self::TransactionConflict => "The transaction was cancelled by a conflicting request. Retry the whole transaction.",
            Self::ConditionFailed => "The condition expression evaluated to false. The item was not modified.",
            Self::Transient => "Internal server error, generally safe to retry with exponential back-off.",
            Self::Unknown => "An unexpected error occurred. Investigate before configuring a retry strategy.",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Throttled => "THROTTLED",
            Self::NotFound => "NOT_FOUND",
            Self::TransactionConflict => "TRANSACTION_CONFLICT",
            Self::ConditionFailed => "CONDITION_FAILED",
            Self::Transient => "TRANSIENT",
            Self::Unknown => "UNKNOWN",
        };
        write!(f, "{name}")
    }
}

/// Classify any SDK failure. Timeouts and connection failures never reached the
/// service, so they are treated as transient.
pub fn classify<E, R>(error: &SdkError<E, R>) -> ErrorKind
where
    E: ProvideErrorMetadata,
{
    match error {
        SdkError::ServiceError(context) => ErrorKind::from_code(context.err().code()),
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            ErrorKind::Transient
        }
        _ => ErrorKind::Unknown,
    }
}

#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct ClientError {
    kind: ErrorKind,
    message: String,
}

impl ClientError {
    pub fn new<T: Into<String>>(kind: ErrorKind, message: T) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn throttled<T: Into<String>>(message: T) -> Self {
        Self::new(ErrorKind::Throttled, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

impl<E, R> From<SdkError<E, R>> for ClientError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: fmt::Debug,
{
    fn from(error: SdkError<E, R>) -> Self {
        Self {
            kind: classify(&error),
            message: format!("{}", DisplayErrorContext(&error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_classifies_throttling_codes() {
        for code in [
            "ProvisionedThroughputExceededException",
            "RequestLimitExceeded",
            "ThrottlingException",
        ] {
            let kind = ErrorKind::from_code(Some(code));
            assert_eq!(kind, ErrorKind::Throttled);
            assert!(kind.is_retryable());
        }
    }

    #[test]
    fn it_classifies_non_retryable_codes() {
        assert_eq!(
            ErrorKind::from_code(Some("ResourceNotFoundException")),
            ErrorKind::NotFound
        );
        assert_eq!(
            ErrorKind::from_code(Some("TransactionCanceledException")),
            ErrorKind::TransactionConflict
        );
        assert_eq!(
            ErrorKind::from_code(Some("ConditionalCheckFailedException")),
            ErrorKind::ConditionFailed
        );
        assert!(!ErrorKind::NotFound.is_retryable());
        assert!(!ErrorKind::ConditionFailed.is_retryable());
    }

    #[test]
    fn it_treats_internal_errors_as_transient() {
        let kind = ErrorKind::from_code(Some("InternalServerError"));
        assert_eq!(kind, ErrorKind::Transient);
        assert!(kind.is_retryable());
    }

    #[test]
    fn it_returns_unknown_for_unrecognised_codes() {
        assert_eq!(ErrorKind::from_code(Some("SomethingNew")), ErrorKind::Unknown);
        assert_eq!(ErrorKind::from_code(None), ErrorKind::Unknown);
    }

    #[test]
    fn client_error_displays_kind_and_message() {
        let err = ClientError::throttled("Injected Error");
        assert_eq!(err.kind(), ErrorKind::Throttled);
        assert_eq!(format!("{err}"), "THROTTLED: Injected Error");
    }
}
