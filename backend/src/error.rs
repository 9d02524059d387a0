//! Error types for the roster normalization and mastery aggregation pipelines.
//!
//! - [`KeyError`] - An LO-coding key contains something other than digits
//! - [`NormalizeError`] - Raw result text and request body errors
//! - [`AggregateError`] - Intermediate table decoding and scoring errors
//! - [`SheetError`] - Spreadsheet and temporary file I/O errors
//! - [`PipelineError`] - Top-level orchestration errors
//! - [`ServerError`] - HTTP layer errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// LO Key Errors
// =============================================================================

/// An LO-coding key character that is not a single decimal digit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid character '{character}' at position {position} of LO key '{key}' (LO ids are single digits)")]
pub struct KeyError {
    pub key: String,
    pub character: char,
    pub position: usize,
}

// =============================================================================
// Normalizer Errors
// =============================================================================

/// Errors while turning test submissions into the intermediate table.
///
/// `test` fields are 1-based positions in the submitted list.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// The request body is not JSON.
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The request body does not match the submission schema.
    #[error("Invalid test submissions: {}", .0.join("; "))]
    Schema(Vec<String>),

    /// A test was submitted without any result text.
    #[error("Test {test} ('{name}') has no result text")]
    EmptyRawText { test: usize, name: String },

    /// A result line does not carry a score token.
    #[error("Test {test} ('{name}'), line {line}: expected at least 2 fields, found {found} in '{content}'")]
    MalformedLine {
        test: usize,
        name: String,
        line: usize,
        found: usize,
        content: String,
    },

    /// The LO-coding key of a test is not made of digits.
    #[error("Test {test} ('{name}'): {source}")]
    InvalidLoKey {
        test: usize,
        name: String,
        #[source]
        source: KeyError,
    },
}

// =============================================================================
// Aggregator Errors
// =============================================================================

/// Errors while computing mastery percentages from an intermediate table.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// The first sheet has no rows at all.
    #[error("Spreadsheet is empty")]
    EmptySheet,

    /// An explicit test count larger than the sheet itself.
    #[error("Expected {expected} LO key rows but the sheet only has {found} rows")]
    NotEnoughRows { expected: usize, found: usize },

    /// A key row is not made of digits.
    #[error("LO key row {test}: {source}")]
    InvalidLoKey {
        test: usize,
        #[source]
        source: KeyError,
    },

    /// A score token does not line up with its LO key.
    #[error("Student '{student}', test {test}: score '{token}' has {found} answers but the LO key has {expected} questions")]
    MisalignedScore {
        student: String,
        test: usize,
        token: String,
        expected: usize,
        found: usize,
    },

    /// A score sits in a column that has no LO key row.
    #[error("Student '{student}': column {column} has a score but no LO key row")]
    UnkeyedColumn { student: String, column: usize },
}

// =============================================================================
// Spreadsheet Errors
// =============================================================================

/// Errors reading or writing spreadsheet documents.
#[derive(Debug, Error)]
pub enum SheetError {
    /// Temporary or output file could not be created, written or removed.
    #[error("Spreadsheet IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The workbook could not be opened or decoded.
    #[error("Cannot read workbook: {0}")]
    Workbook(#[from] calamine::Error),

    /// The workbook has no worksheet.
    #[error("Workbook has no sheet")]
    NoSheet,

    /// CSV decoding or encoding failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The XLSX writer failed.
    #[error("Cannot write workbook: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Normalize error: {0}")]
    Normalize(#[from] NormalizeError),

    #[error("Aggregate error: {0}")]
    Aggregate(#[from] AggregateError),

    #[error("Spreadsheet error: {0}")]
    Sheet(#[from] SheetError),
}

impl PipelineError {
    /// Whether the failure was caused by the submitted document rather than the host.
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::Normalize(_) | Self::Aggregate(_) => true,
            Self::Sheet(SheetError::Io(_) | SheetError::Write(_)) => false,
            Self::Sheet(_) => true,
        }
    }
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

pub type NormalizeResult<T> = Result<T, NormalizeError>;

pub type AggregateResult<T> = Result<T, AggregateError>;

pub type SheetResult<T> = Result<T, SheetError>;

pub type PipelineResult<T> = Result<T, PipelineError>;

pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let agg_err = AggregateError::EmptySheet;
        let pipeline_err: PipelineError = agg_err.into();
        assert!(pipeline_err.to_string().contains("empty"));
        assert!(pipeline_err.is_client_error());

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let pipeline_err: PipelineError = SheetError::from(io).into();
        assert!(!pipeline_err.is_client_error());
    }

    #[test]
    fn test_malformed_line_format() {
        let err = NormalizeError::MalformedLine {
            test: 2,
            name: "Unit 3".into(),
            line: 7,
            found: 1,
            content: "ASMITH".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Test 2"));
        assert!(msg.contains("Unit 3"));
        assert!(msg.contains("line 7"));
        assert!(msg.contains("ASMITH"));
    }

    #[test]
    fn test_key_error_wrapped_with_test() {
        let err = NormalizeError::InvalidLoKey {
            test: 1,
            name: "Quiz".into(),
            source: KeyError {
                key: "12x".into(),
                character: 'x',
                position: 2,
            },
        };
        assert!(err.to_string().contains("'x'"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
