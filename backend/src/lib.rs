//! # Gradesheet - student grade spreadsheet to enrollment extracts
//!
//! Gradesheet reads an exported grade spreadsheet, keeps the rows of the
//! home faculty, validates each row and writes two CSV extracts for the
//! academic management system: a roster and a grades file.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ .xlsx/.xls  │────▶│  Structure  │────▶│   Faculty   │────▶│   Content   │────▶│   Roster +  │
//! │  workbook   │     │   check     │     │   filter    │     │  validation │     │ grades CSV  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gradesheet::{process_spreadsheet, ExtractOptions, FormParams};
//!
//! let bytes = std::fs::read("notas.xlsx")?;
//! let params = FormParams::from_pairs([("campo2", "K1021"), ("campo3", "AM1")]);
//! let output = process_spreadsheet(&bytes, "notas.xlsx", &params, &ExtractOptions::default())?;
//! println!("{} records", output.total_records);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`config`] - Fixed schema, rule constants and server settings
//! - [`models`] - Cells, rows, datasets and form parameters
//! - [`parser`] - Spreadsheet decoding
//! - [`validation`] - Structure and content validation
//! - [`transform`] - Faculty filter, extract generation and pipeline
//! - [`cache`] - Time-limited extract store
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Validation
pub mod validation;

// Transformation
pub mod transform;

// Extract storage
pub mod cache;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    GenerationError, GenerationResult, PipelineError, PipelineResult, ServerError, ServerResult,
    SheetError, SheetResult, StoreError, StoreResult,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{CellValue, Dataset, FormParams, Row};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    parse_spreadsheet_bytes, parse_spreadsheet_file, validate_file_extension, validate_file_size,
};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{consolidate_errors, validate_content, validate_structure, RowViolations};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::{
    filter_by_faculty, generate_grades, generate_roster, process_dataset, process_spreadsheet,
    ExtractOptions, ProcessOutput, ProcessReport, Quoting,
};

// =============================================================================
// Re-exports - Store
// =============================================================================

pub use cache::{ExtractKind, ExtractNames, ExtractStore, StoredExtract};

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
