//! # trackexport-render
//!
//! Rendering backends for daily status reports.
//!
//! This crate provides:
//! - Excel workbooks (daily status sheet plus optional item table)
//! - Fixed-width text tables for terminals
//!
//! ## Example
//!
//! ```rust,ignore
//! use trackexport_core::{ExportReport, Renderer};
//! use trackexport_render::{ExcelRenderer, TextRenderer};
//!
//! let report = ExportReport::new("Sprint 12", snapshots);
//!
//! // Console table
//! print!("{}", TextRenderer::new().render(&report)?);
//!
//! // Excel workbook
//! let xlsx_bytes = ExcelRenderer::new().render(&report)?;
//! std::fs::write("status.xlsx", xlsx_bytes)?;
//! ```

pub mod excel;

pub use excel::ExcelRenderer;

use std::fmt::Write;

use trackexport_core::{validate_status_columns, ExportReport, RenderError, Renderer};

/// Plain text renderer for console output
#[derive(Clone, Debug)]
pub struct TextRenderer {
    /// Print the report title above the table
    pub show_title: bool,
    /// Spaces between columns
    pub gap: usize,
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self {
            show_title: true,
            gap: 2,
        }
    }
}

impl TextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Omit the title line
    pub fn no_title(mut self) -> Self {
        self.show_title = false;
        self
    }
}

impl Renderer for TextRenderer {
    type Output = String;

    fn render(&self, report: &ExportReport) -> Result<String, RenderError> {
        validate_status_columns(&report.status_columns).map_err(RenderError::InvalidData)?;

        let mut headers = vec!["Date".to_string()];
        headers.extend(report.status_columns.iter().map(|c| c.as_str().to_string()));

        let rows: Vec<Vec<String>> = report
            .snapshots
            .iter()
            .map(|snapshot| {
                let mut row = vec![snapshot.day.format("%Y-%m-%d").to_string()];
                row.extend(
                    snapshot
                        .values(&report.status_columns)
                        .into_iter()
                        .map(|n| n.to_string()),
                );
                row
            })
            .collect();

        let widths: Vec<usize> = headers
            .iter()
            .enumerate()
            .map(|(col, header)| {
                rows.iter()
                    .map(|row| row[col].len())
                    .chain(std::iter::once(header.len()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut out = String::new();
        if self.show_title {
            writeln!(out, "{}", report.title).map_err(|e| RenderError::Format(e.to_string()))?;
            writeln!(out).map_err(|e| RenderError::Format(e.to_string()))?;
        }

        self.write_line(&mut out, &headers, &widths)?;
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        self.write_line(&mut out, &rule, &widths)?;
        for row in &rows {
            self.write_line(&mut out, row, &widths)?;
        }

        if rows.is_empty() {
            writeln!(out, "(no status changes recorded)")
                .map_err(|e| RenderError::Format(e.to_string()))?;
        }

        Ok(out)
    }
}

impl TextRenderer {
    /// Date left-aligned, counts right-aligned
    fn write_line(&self, out: &mut String, cells: &[String], widths: &[usize]) -> Result<(), RenderError> {
        let gap = " ".repeat(self.gap);
        let line = cells
            .iter()
            .zip(widths)
            .enumerate()
            .map(|(col, (cell, width))| {
                if col == 0 {
                    format!("{cell:<width$}")
                } else {
                    format!("{cell:>width$}")
                }
            })
            .collect::<Vec<_>>()
            .join(&gap);
        writeln!(out, "{}", line.trim_end()).map_err(|e| RenderError::Format(e.to_string()))
    }
}
