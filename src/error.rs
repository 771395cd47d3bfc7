use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OdmErrorCode {
    InvalidArgument,
    NotFound,
    FailedPrecondition,
    EmptySequence,
    Cancelled,
    Internal,
    Unavailable,
    DeadlineExceeded,
    ResourceExhausted,
    Aborted,
}

impl OdmErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OdmErrorCode::InvalidArgument => "odm/invalid-argument",
            OdmErrorCode::NotFound => "odm/not-found",
            OdmErrorCode::FailedPrecondition => "odm/failed-precondition",
            OdmErrorCode::EmptySequence => "odm/empty-sequence",
            OdmErrorCode::Cancelled => "odm/cancelled",
            OdmErrorCode::Internal => "odm/internal",
            OdmErrorCode::Unavailable => "odm/unavailable",
            OdmErrorCode::DeadlineExceeded => "odm/deadline-exceeded",
            OdmErrorCode::ResourceExhausted => "odm/resource-exhausted",
            OdmErrorCode::Aborted => "odm/aborted",
        }
    }

    /// Whether a failure with this code may succeed if the operation is
    /// attempted again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            OdmErrorCode::Unavailable
                | OdmErrorCode::DeadlineExceeded
                | OdmErrorCode::ResourceExhausted
                | OdmErrorCode::Aborted
        )
    }
}

#[derive(Clone, Debug)]
pub struct OdmError {
    pub code: OdmErrorCode,
    message: String,
}

impl OdmError {
    pub fn new(code: OdmErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    pub fn is_transient(&self) -> bool {
        self.code.is_transient()
    }
}

impl Display for OdmError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code_str())
    }
}

impl Error for OdmError {}

pub type OdmResult<T> = Result<T, OdmError>;

pub fn invalid_argument(message: impl Into<String>) -> OdmError {
    OdmError::new(OdmErrorCode::InvalidArgument, message)
}

pub fn not_found(message: impl Into<String>) -> OdmError {
    OdmError::new(OdmErrorCode::NotFound, message)
}

pub fn failed_precondition(message: impl Into<String>) -> OdmError {
    OdmError::new(OdmErrorCode::FailedPrecondition, message)
}

pub fn empty_sequence(message: impl Into<String>) -> OdmError {
    OdmError::new(OdmErrorCode::EmptySequence, message)
}

pub fn cancelled() -> OdmError {
    OdmError::new(OdmErrorCode::Cancelled, "Operation was cancelled")
}

pub fn internal_error(message: impl Into<String>) -> OdmError {
    OdmError::new(OdmErrorCode::Internal, message)
}

pub fn unavailable(message: impl Into<String>) -> OdmError {
    OdmError::new(OdmErrorCode::Unavailable, message)
}

pub fn deadline_exceeded(message: impl Into<String>) -> OdmError {
    OdmError::new(OdmErrorCode::DeadlineExceeded, message)
}

pub fn resource_exhausted(message: impl Into<String>) -> OdmError {
    OdmError::new(OdmErrorCode::ResourceExhausted, message)
}

pub fn aborted(message: impl Into<String>) -> OdmError {
    OdmError::new(OdmErrorCode::Aborted, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_codes() {
        assert!(unavailable("backend overloaded").is_transient());
        assert!(deadline_exceeded("timed out").is_transient());
        assert!(resource_exhausted("quota").is_transient());
        assert!(!invalid_argument("bad filter").is_transient());
        assert!(!cancelled().is_transient());
    }

    #[test]
    fn display_includes_code() {
        let err = not_found("document orders/1 does not exist");
        assert!(err.to_string().contains("odm/not-found"));
    }
}
