//! Error types for the gradesheet pipeline.
//!
//! - [`SheetError`] - Spreadsheet decoding errors
//! - [`GenerationError`] - Extract generation preconditions
//! - [`PipelineError`] - Top-level orchestration errors
//! - [`StoreError`] - Extract store errors
//! - [`ServerError`] - HTTP layer errors
//!
//! Row-level content problems are not errors: they are collected as
//! consolidated advisory strings by [`crate::validation`].

use thiserror::Error;

// =============================================================================
// Spreadsheet Errors
// =============================================================================

/// Errors while turning an uploaded file into a dataset.
#[derive(Debug, Error)]
pub enum SheetError {
    /// File name does not carry an accepted extension.
    #[error("Invalid file format. Allowed formats: {allowed}")]
    UnsupportedExtension { allowed: String },

    /// Workbook could not be opened or decoded.
    #[error("Could not read the spreadsheet: {0}")]
    Unreadable(String),

    /// Workbook has no worksheets.
    #[error("The spreadsheet has no worksheets")]
    NoWorksheets,

    /// IO error.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Generation Errors
// =============================================================================

/// Preconditions of the extract generators.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The document-number column is needed to key every output line.
    #[error("Column 'DNI' required for the {extract} extract was not found")]
    MissingDocumentColumn { extract: &'static str },

    /// RFC 4180 writer failure.
    #[error("CSV writer error: {0}")]
    Csv(#[from] csv::Error),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Fatal outcomes of [`crate::transform::pipeline::process_dataset`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Spreadsheet could not be decoded.
    #[error("Spreadsheet error: {0}")]
    Sheet(#[from] SheetError),

    /// Column count/name/order mismatch.
    #[error("The file does not have the correct structure")]
    Structure { errors: Vec<String> },

    /// Nothing survived faculty filtering and content validation.
    #[error("No valid records found in the file")]
    NoValidRecords { errors: Vec<String> },

    /// Extract generation precondition failed.
    #[error("Internal error: {0}")]
    Generation(#[from] GenerationError),
}

impl PipelineError {
    /// Caller-facing sentence.
    pub fn message(&self) -> String {
        match self {
            PipelineError::Sheet(e) => e.to_string(),
            other => other.to_string(),
        }
    }

    /// Detail lines (structural discrepancies or consolidated content errors).
    pub fn details(&self) -> &[String] {
        match self {
            PipelineError::Structure { errors } | PipelineError::NoValidRecords { errors } => {
                errors
            }
            _ => &[],
        }
    }
}

// =============================================================================
// Store Errors
// =============================================================================

/// Errors from the extract store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Unknown or expired id.
    #[error("File not found or expired: {0}")]
    NotFound(String),

    /// Entry exists but its file is gone from disk.
    #[error("File not found on disk: {0}")]
    MissingFile(String),

    /// Requested extract kind is not known.
    #[error("Invalid file type: {0}")]
    InvalidKind(String),

    /// IO error.
    #[error("Store IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

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

/// Result type for spreadsheet operations.
pub type SheetResult<T> = Result<T, SheetError>;

/// Result type for extract generation.
pub type GenerationResult<T> = Result<T, GenerationError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
