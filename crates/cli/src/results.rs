// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Result sets and their tabular rendering.

use serde::{Deserialize, Serialize};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Widest a single cell may render before it is truncated
pub const MAX_CELL_WIDTH: usize = 40;

/// How NULL cells render
const NULL_TEXT: &str = "NULL";

/// Column names plus data rows of a succeeded query
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl ResultSet {
    /// Split a raw payload whose first row is the header.
    ///
    /// N raw rows yield N-1 data rows; a header-only payload yields none.
    /// Data rows are padded or cut to the header's column count.
    pub fn from_raw(raw: Vec<Vec<Option<String>>>) -> Self {
        let mut rows = raw.into_iter();
        let columns: Vec<String> = match rows.next() {
            Some(header) => header.into_iter().map(Option::unwrap_or_default).collect(),
            None => return Self::default(),
        };
        let width = columns.len();
        let rows = rows
            .map(|mut row| {
                row.resize(width, None);
                row
            })
            .collect();
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Column position, matched case-insensitively
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Every value of a column, or None if the column is absent
    pub fn column_values(&self, name: &str) -> Option<Vec<Option<&str>>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| r[idx].as_deref()).collect())
    }

    /// True if some row equals `expected` cell by cell (NULL compares as "NULL")
    pub fn contains_row(&self, expected: &[String]) -> bool {
        self.rows.iter().any(|row| {
            row.len() == expected.len()
                && row
                    .iter()
                    .zip(expected)
                    .all(|(cell, want)| cell.as_deref().unwrap_or(NULL_TEXT) == want)
        })
    }

    /// Render as an aligned text table followed by a row count line
    pub fn render_table(&self) -> String {
        if self.columns.is_empty() {
            return "(no columns)\n".to_string();
        }

        let header: Vec<String> = self.columns.iter().map(|c| clip(c)).collect();
        let body: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| clip(cell.as_deref().unwrap_or(NULL_TEXT)))
                    .collect()
            })
            .collect();

        let mut widths: Vec<usize> = header.iter().map(|h| h.width()).collect();
        for row in &body {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.width());
            }
        }

        let mut out = String::new();
        push_line(&mut out, &header, &widths);
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(w + 2)).collect();
        out.push_str(&rule.join("+"));
        out.push('\n');
        for row in &body {
            push_line(&mut out, row, &widths);
        }
        let noun = if self.rows.len() == 1 { "row" } else { "rows" };
        out.push_str(&format!("({} {})\n", self.rows.len(), noun));
        out
    }
}

fn push_line(out: &mut String, cells: &[String], widths: &[usize]) {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, w)| format!(" {}{} ", cell, " ".repeat(w - cell.width())))
        .collect();
    out.push_str(padded.join("|").trim_end());
    out.push('\n');
}

/// Truncate to MAX_CELL_WIDTH display columns, marking the cut with an ellipsis
fn clip(text: &str) -> String {
    let text = text.replace(['\n', '\r', '\t'], " ");
    if text.width() <= MAX_CELL_WIDTH {
        return text;
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > MAX_CELL_WIDTH - 1 {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push('…');
    out
}

#[cfg(test)]
#[path = "results_tests.rs"]
mod tests;
