// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plain-text table renderer for CLI list views.
//!
//! Provides consistent column alignment and truncation across the list
//! commands.

/// Column text alignment.
#[derive(Clone, Copy)]
pub enum Align {
    Left,
    Right,
}

/// A column definition in a [`Table`].
pub struct Column {
    pub name: &'static str,
    pub align: Align,
    /// Maximum width (`None` = unlimited). Values exceeding this are truncated.
    pub max_width: Option<usize>,
}

impl Column {
    /// Left-aligned column.
    pub fn left(name: &'static str) -> Self {
        Self {
            name,
            align: Align::Left,
            max_width: None,
        }
    }

    /// Right-aligned column.
    pub fn right(name: &'static str) -> Self {
        Self {
            name,
            align: Align::Right,
            max_width: None,
        }
    }

    /// Set maximum width (values exceeding this are truncated with `…`).
    pub fn with_max(mut self, max: usize) -> Self {
        self.max_width = Some(max);
        self
    }
}

/// A simple aligned table.
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn row(&mut self, cells: Vec<String>) {
        debug_assert_eq!(cells.len(), self.columns.len());
        self.rows.push(cells);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render with a header line, columns separated by two spaces.
    pub fn render(&self) -> String {
        let truncated: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .zip(&self.columns)
                    .map(|(cell, col)| truncate(cell, col.max_width))
                    .collect()
            })
            .collect();

        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                truncated
                    .iter()
                    .map(|row| row[i].chars().count())
                    .chain(std::iter::once(col.name.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut out = String::new();
        render_line(
            &mut out,
            &self.columns,
            &widths,
            &self
                .columns
                .iter()
                .map(|c| c.name.to_string())
                .collect::<Vec<_>>(),
        );
        for row in &truncated {
            render_line(&mut out, &self.columns, &widths, row);
        }
        out
    }
}

fn render_line(out: &mut String, columns: &[Column], widths: &[usize], cells: &[String]) {
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            out.push_str("  ");
        }
        let width = widths[i];
        let len = cell.chars().count();
        let pad = width.saturating_sub(len);
        match columns[i].align {
            Align::Left => {
                out.push_str(cell);
                // No trailing padding on the last column
                if i + 1 < cells.len() {
                    out.extend(std::iter::repeat(' ').take(pad));
                }
            }
            Align::Right => {
                out.extend(std::iter::repeat(' ').take(pad));
                out.push_str(cell);
            }
        }
    }
    out.push('\n');
}

fn truncate(s: &str, max: Option<usize>) -> String {
    match max {
        Some(max) if s.chars().count() > max => {
            let cut: String = s.chars().take(max.saturating_sub(1)).collect();
            format!("{cut}…")
        }
        _ => s.to_string(),
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
