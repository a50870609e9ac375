//! Transformation module.
//!
//! - Filter: faculty selection
//! - Extract: roster and grades CSV generation
//! - Pipeline: main processing pipeline

pub mod extract;
pub mod filter;
pub mod pipeline;

pub use extract::{
    generate_grades, generate_grades_with, generate_roster, generate_roster_with, ExtractOptions,
    Quoting,
};
pub use filter::{filter_by_faculty, is_allowed_faculty};
pub use pipeline::*;
