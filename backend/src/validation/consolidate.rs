//! Groups identical violations across rows into compact report lines.

use super::content::RowViolations;

/// Up to this many row numbers are listed in full.
const FULL_LISTING_LIMIT: usize = 5;

/// Row numbers shown before "and N more".
const PREVIEW_ROWS: usize = 3;

/// More invalid rows than this adds a leading summary line.
const SUMMARY_THRESHOLD: usize = 10;

/// Consolidate per-row violations.
///
/// One line per distinct message, in first-seen order. A summary line is
/// prepended when more than ten rows are invalid.
pub fn consolidate_errors(invalid: &[RowViolations]) -> Vec<String> {
    if invalid.is_empty() {
        return Vec::new();
    }

    let mut groups: Vec<(&str, Vec<usize>)> = Vec::new();
    for entry in invalid {
        for message in &entry.violations {
            match groups.iter_mut().find(|(m, _)| *m == message.as_str()) {
                Some((_, rows)) => rows.push(entry.row),
                None => groups.push((message.as_str(), vec![entry.row])),
            }
        }
    }

    let mut consolidated: Vec<String> = groups
        .into_iter()
        .map(|(message, rows)| format_group(message, &rows))
        .collect();

    if invalid.len() > SUMMARY_THRESHOLD {
        consolidated.insert(
            0,
            format!("⚠️ Errors found in {} rows of the file.", invalid.len()),
        );
    }

    consolidated
}

fn format_group(message: &str, rows: &[usize]) -> String {
    match rows {
        [row] => format!("Row {}: {}", row, message),
        _ if rows.len() <= FULL_LISTING_LIMIT => {
            format!("Rows {}: {}", join_rows(rows), message)
        }
        _ => format!(
            "Rows {} and {} more: {}",
            join_rows(&rows[..PREVIEW_ROWS]),
            rows.len() - PREVIEW_ROWS,
            message
        ),
    }
}

fn join_rows(rows: &[usize]) -> String {
    rows.iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failing(rows: &[usize], message: &str) -> Vec<RowViolations> {
        rows.iter()
            .map(|&row| RowViolations {
                row,
                violations: vec![message.to_string()],
            })
            .collect()
    }

    #[test]
    fn test_no_errors() {
        assert!(consolidate_errors(&[]).is_empty());
    }

    #[test]
    fn test_single_row() {
        let lines = consolidate_errors(&failing(&[4], "faculty is empty"));
        assert_eq!(lines, vec!["Row 4: faculty is empty"]);
    }

    #[test]
    fn test_up_to_five_rows_listed() {
        let lines = consolidate_errors(&failing(&[3, 7], "grade out of range"));
        assert_eq!(lines, vec!["Rows 3, 7: grade out of range"]);

        let lines = consolidate_errors(&failing(&[1, 2, 3, 4, 5], "grade out of range"));
        assert_eq!(lines, vec!["Rows 1, 2, 3, 4, 5: grade out of range"]);
    }

    #[test]
    fn test_six_rows_truncated() {
        let lines = consolidate_errors(&failing(&[1, 2, 3, 4, 5, 6], "grade out of range"));
        assert_eq!(lines, vec!["Rows 1, 2, 3 and 3 more: grade out of range"]);
    }

    #[test]
    fn test_first_seen_order() {
        let invalid = vec![
            RowViolations {
                row: 2,
                violations: vec!["b".into(), "a".into()],
            },
            RowViolations {
                row: 5,
                violations: vec!["a".into()],
            },
        ];
        assert_eq!(consolidate_errors(&invalid), vec!["Row 2: b", "Rows 2, 5: a"]);
    }

    #[test]
    fn test_summary_line_above_ten_rows() {
        let rows: Vec<usize> = (1..=11).collect();
        let lines = consolidate_errors(&failing(&rows, "faculty is empty"));
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "⚠️ Errors found in 11 rows of the file.");
        assert_eq!(lines[1], "Rows 1, 2, 3 and 8 more: faculty is empty");

        let rows: Vec<usize> = (1..=10).collect();
        let lines = consolidate_errors(&failing(&rows, "faculty is empty"));
        assert_eq!(lines.len(), 1);
    }
}
