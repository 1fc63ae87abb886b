//! Document code error types.

use thiserror::Error;

use tessera_shared::AppError;

/// Errors that can occur while building or parsing a document code.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodeError {
    /// Prefix is not 2 to 10 uppercase alphanumerics starting with a letter.
    #[error("Invalid code prefix '{0}'")]
    InvalidPrefix(String),

    /// Year or month out of range.
    #[error("Invalid code period {year:04}-{month:02}")]
    InvalidPeriod {
        /// Year.
        year: u32,
        /// Month.
        month: u32,
    },

    /// The scope has used every sequence number.
    #[error("Sequence {value} exceeds the maximum of {max}")]
    SequenceOverflow {
        /// The number that would have been used.
        value: i64,
        /// Largest number that fits the format.
        max: i64,
    },

    /// The string is not a document code.
    #[error("Malformed document code '{0}'")]
    Malformed(String),
}

impl CodeError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidPrefix(_) | Self::InvalidPeriod { .. } | Self::Malformed(_) => 400,
            Self::SequenceOverflow { .. } => 409,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidPrefix(_) => "INVALID_CODE_PREFIX",
            Self::InvalidPeriod { .. } => "INVALID_CODE_PERIOD",
            Self::SequenceOverflow { .. } => "CODE_SEQUENCE_OVERFLOW",
            Self::Malformed(_) => "MALFORMED_CODE",
        }
    }
}

impl From<CodeError> for AppError {
    fn from(err: CodeError) -> Self {
        let message = err.to_string();
        match err {
            CodeError::SequenceOverflow { .. } => Self::Conflict(message),
            _ => Self::Validation(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overflow_is_conflict() {
        let err = CodeError::SequenceOverflow {
            value: 1_000_000,
            max: 999_999,
        };
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.error_code(), "CODE_SEQUENCE_OVERFLOW");
        assert!(matches!(AppError::from(err), AppError::Conflict(_)));
    }

    #[test]
    fn test_period_display_is_padded() {
        let err = CodeError::InvalidPeriod { year: 2025, month: 13 };
        assert_eq!(err.to_string(), "Invalid code period 2025-13");
        assert_eq!(err.status_code(), 400);
    }
}
