//! Faculty selection.
//!
//! Filtering is a selection step: rows from other faculties are dropped
//! without being reported.

use tracing::{info, warn};

use crate::config::{FACULTY_COLUMN, FACULTY_FILTER};
use crate::models::Dataset;

/// Keep rows whose faculty is in [`FACULTY_FILTER`].
///
/// Without a faculty column the dataset is returned unchanged.
pub fn filter_by_faculty(dataset: &Dataset) -> Dataset {
    let Some(col) = dataset.column(FACULTY_COLUMN) else {
        warn!(column = FACULTY_COLUMN, "faculty column not found, skipping filter");
        return dataset.clone();
    };

    let kept: Vec<_> = dataset
        .rows()
        .iter()
        .filter(|row| is_allowed_faculty(&row.text(col)))
        .cloned()
        .collect();

    info!(
        kept = kept.len(),
        total = dataset.len(),
        allowed = ?FACULTY_FILTER,
        "rows filtered by faculty"
    );

    dataset.with_rows(kept)
}

pub fn is_allowed_faculty(value: &str) -> bool {
    let normalized = value.trim().to_lowercase();
    FACULTY_FILTER.contains(&normalized.as_str())
}
