//! Spreadsheet validation.
//!
//! - [`structure`] - Column count, names and order against the fixed schema
//! - [`content`] - Per-row grade, document, date and required-field rules
//! - [`consolidate`] - Grouping of row violations into report lines
//!
//! # Example
//!
//! ```rust,ignore
//! use gradesheet::config::REQUIRED_COLUMNS;
//! use gradesheet::validation::{validate_content, validate_structure};
//!
//! let (ok, errors) = validate_structure(&dataset, &REQUIRED_COLUMNS);
//! if ok {
//!     let (valid_rows, advisories) = validate_content(&dataset);
//! }
//! ```

pub mod consolidate;
pub mod content;
pub mod structure;

pub use consolidate::consolidate_errors;
pub use content::{
    check_date, check_document, check_grade, is_special_grade, is_valid_date, partition_rows,
    parse_flexible_date, validate_content, RowViolations,
};
pub use structure::validate_structure;
