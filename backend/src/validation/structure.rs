//! Column count, name and order checks.

use crate::models::{normalize_header, Dataset};

/// Check the dataset header against `required`.
///
/// Names are compared trimmed and case-insensitively. Every discrepancy is
/// reported; only an empty dataset short-circuits. Cell values are never
/// inspected.
pub fn validate_structure(dataset: &Dataset, required: &[&str]) -> (bool, Vec<String>) {
    let mut errors = Vec::new();

    if dataset.is_empty() {
        errors.push("file is empty".to_string());
        return (false, errors);
    }

    let actual: Vec<&str> = dataset.columns().iter().map(|c| c.trim()).collect();

    if actual.len() != required.len() {
        errors.push(format!(
            "file has {} columns, expected exactly {}",
            actual.len(),
            required.len()
        ));
    }

    for (i, (found, expected)) in actual.iter().zip(required).enumerate() {
        if normalize_header(found) != normalize_header(expected) {
            errors.push(format!(
                "column {} must be '{}', but is '{}'",
                i + 1,
                expected.trim(),
                found
            ));
        }
    }

    if actual.len() > required.len() {
        errors.push(format!(
            "extra columns not permitted: {}",
            actual[required.len()..].join(", ")
        ));
    }

    (errors.is_empty(), errors)
}
