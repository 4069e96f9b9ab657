use thiserror::Error;

/// Failures raised by the value model itself.
///
/// These never carry language-level exception semantics; the executor decides
/// whether a given failure is fatal or becomes a catchable exception.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CellError {
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("cannot compare {0} with {1}")]
    Incomparable(&'static str, &'static str),
    #[error("dangling address: {0}")]
    DanglingAddress(String),
    #[error("invalid number literal: {0:?}")]
    InvalidNumber(String),
    #[error("number is not an integer: {0}")]
    NotAnInteger(String),
    #[error("number out of range: {0}")]
    OutOfRange(String),
}

impl CellError {
    pub fn mismatch(expected: &'static str, found: &'static str) -> Self {
        CellError::TypeMismatch { expected, found }
    }

    pub fn is_type_error(&self) -> bool {
        matches!(
            self,
            CellError::TypeMismatch { .. } | CellError::Incomparable(..)
        )
    }
}
