//! Fixed-width timing table.

use std::fmt::Write as _;

use super::{Measurement, TimingRow};

/// Column titles, aligned with the row format.
pub const HEADER: &str = "    search\t board\tply\trevision\ttime (seconds)";

const SEPARATOR_WIDTH: usize = 62;

/// Render `rows` as a table: header, separator, then one line per row.
///
/// Each "current" row closes a configuration group and is followed by a blank
/// line. Rows whose run failed show `FAILED` in the time column.
pub fn format<'r>(rows: impl IntoIterator<Item = &'r TimingRow>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{HEADER}");
    let _ = writeln!(out, "{}", "-".repeat(SEPARATOR_WIDTH));
    for row in rows {
        out.push_str(&format_row(row));
        out.push('\n');
        if row.is_current() {
            out.push('\n');
        }
    }
    out
}

/// One table line, without the trailing newline.
#[must_use]
pub fn format_row(row: &TimingRow) -> String {
    let time = match &row.measurement {
        Measurement::Elapsed(d) => format!("{:5.3}", d.as_secs_f64()),
        Measurement::Failed(_) => "FAILED".to_string(),
    };
    format!(
        "{:>10}\t{:>5}\t{:>3}\t{:>8}\t{time}",
        row.method.name(),
        row.board,
        row.ply,
        row.revision
    )
}
