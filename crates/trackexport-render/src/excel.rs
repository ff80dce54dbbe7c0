//! Excel status report renderer
//!
//! Generates XLSX workbooks with:
//! - Daily Status: one row per day, one column per status category
//! - Items: the decoded item table, when the report carries one
//!
//! ## Example Output Structure
//!
//! ```text
//! Sheet: Daily Status
//! | Date       | Blocked | Completed | Deleted | In Progress | Not Done |
//! |------------|---------|-----------|---------|-------------|----------|
//! | 2026-01-01 | 0       | 0         | 0       | 1           | 0        |
//! | 2026-01-02 | 1       | 0         | 0       | 1           | 0        |
//! ```
//!
//! Dates are written as real spreadsheet dates, so the sheet can be charted
//! directly.

use chrono::{Datelike, NaiveDate};
use rust_xlsxwriter::{ExcelDateTime, Format, FormatAlign, FormatBorder, Workbook, Worksheet};
use trackexport_core::{
    validate_status_columns, DailySnapshot, ExportReport, ItemTable, RenderError, Renderer,
    StatusCategory,
};

/// Default name of the daily status sheet
pub const DAILY_SHEET: &str = "Daily Status";
/// Default name of the item table sheet
pub const ITEMS_SHEET: &str = "Items";

/// Excel status report renderer
#[derive(Clone, Debug)]
pub struct ExcelRenderer {
    /// Name of the daily status sheet
    pub daily_sheet: String,
    /// Name of the item table sheet
    pub items_sheet: String,
    /// Number format for the date column
    pub date_format: String,
    /// Whether to write the item table when the report has one
    pub include_items: bool,
    /// Upper bound for auto-fitted item column widths
    pub max_column_width: u16,
}

impl Default for ExcelRenderer {
    fn default() -> Self {
        Self {
            daily_sheet: DAILY_SHEET.into(),
            items_sheet: ITEMS_SHEET.into(),
            date_format: "yyyy-mm-dd".into(),
            include_items: true,
            max_column_width: 60,
        }
    }
}

impl ExcelRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number format of the date column
    pub fn date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = format.into();
        self
    }

    /// Skip the Items sheet even when the report has an item table
    pub fn no_items(mut self) -> Self {
        self.include_items = false;
        self
    }

    /// Generate Excel workbook bytes
    pub fn render_to_bytes(&self, report: &ExportReport) -> Result<Vec<u8>, RenderError> {
        validate_status_columns(&report.status_columns).map_err(RenderError::InvalidData)?;

        let mut workbook = Workbook::new();
        let formats = self.create_formats();

        self.add_daily_sheet(&mut workbook, report, &formats)?;

        if self.include_items {
            if let Some(items) = &report.items {
                self.add_items_sheet(&mut workbook, items, &formats)?;
            }
        }

        let buffer = workbook
            .save_to_buffer()
            .map_err(|e| RenderError::Format(format!("Failed to create Excel: {e}")))?;

        Ok(buffer)
    }

    fn create_formats(&self) -> ExcelFormats {
        let header = Format::new()
            .set_bold()
            .set_align(FormatAlign::Center)
            .set_background_color(0x4472C4)
            .set_font_color(0xFFFFFF)
            .set_border(FormatBorder::Thin);

        let date = Format::new()
            .set_num_format(&self.date_format)
            .set_align(FormatAlign::Left)
            .set_border(FormatBorder::Thin);

        let integer = Format::new()
            .set_num_format("#,##0")
            .set_border(FormatBorder::Thin);

        let text = Format::new().set_border(FormatBorder::Thin);

        ExcelFormats {
            header,
            date,
            integer,
            text,
        }
    }

    // ========================================================================
    // Daily Status
    // ========================================================================

    fn add_daily_sheet(
        &self,
        workbook: &mut Workbook,
        report: &ExportReport,
        formats: &ExcelFormats,
    ) -> Result<(), RenderError> {
        let sheet = workbook.add_worksheet();
        sheet
            .set_name(&self.daily_sheet)
            .map_err(|e| RenderError::Format(e.to_string()))?;

        sheet
            .write_with_format(0, 0, "Date", &formats.header)
            .map_err(|e| RenderError::Format(e.to_string()))?;
        sheet.set_column_width(0, 12).ok();

        for (index, category) in report.status_columns.iter().enumerate() {
            let col = index as u16 + 1;
            sheet
                .write_with_format(0, col, category.as_str(), &formats.header)
                .map_err(|e| RenderError::Format(e.to_string()))?;
            sheet.set_column_width(col, status_column_width(*category)).ok();
        }

        for (index, snapshot) in report.snapshots.iter().enumerate() {
            let row = index as u32 + 1;
            self.write_snapshot_row(sheet, row, snapshot, &report.status_columns, formats)?;
        }

        sheet.set_freeze_panes(1, 0).ok();

        Ok(())
    }

    fn write_snapshot_row(
        &self,
        sheet: &mut Worksheet,
        row: u32,
        snapshot: &DailySnapshot,
        columns: &[StatusCategory],
        formats: &ExcelFormats,
    ) -> Result<(), RenderError> {
        let date = excel_date(snapshot.day)?;
        sheet
            .write_with_format(row, 0, &date, &formats.date)
            .map_err(|e| RenderError::Format(e.to_string()))?;

        for (index, count) in snapshot.values(columns).into_iter().enumerate() {
            sheet
                .write_with_format(row, index as u16 + 1, count as u32, &formats.integer)
                .map_err(|e| RenderError::Format(e.to_string()))?;
        }

        Ok(())
    }

    // ========================================================================
    // Items
    // ========================================================================

    fn add_items_sheet(
        &self,
        workbook: &mut Workbook,
        items: &ItemTable,
        formats: &ExcelFormats,
    ) -> Result<(), RenderError> {
        let sheet = workbook.add_worksheet();
        sheet
            .set_name(&self.items_sheet)
            .map_err(|e| RenderError::Format(e.to_string()))?;

        for (col, header) in items.headers.iter().enumerate() {
            sheet
                .write_with_format(0, col as u16, header, &formats.header)
                .map_err(|e| RenderError::Format(e.to_string()))?;
        }

        for (index, values) in items.rows.iter().enumerate() {
            let row = index as u32 + 1;
            for (col, value) in values.iter().enumerate() {
                sheet
                    .write_with_format(row, col as u16, value, &formats.text)
                    .map_err(|e| RenderError::Format(e.to_string()))?;
            }
        }

        for (col, width) in self.item_column_widths(items).into_iter().enumerate() {
            sheet.set_column_width(col as u16, width).ok();
        }

        sheet.set_freeze_panes(1, 0).ok();

        Ok(())
    }

    /// Width per item column: longest header or cell, padded and capped
    fn item_column_widths(&self, items: &ItemTable) -> Vec<u16> {
        items
            .headers
            .iter()
            .enumerate()
            .map(|(col, header)| {
                let longest = items
                    .rows
                    .iter()
                    .filter_map(|row| row.get(col))
                    .map(|cell| cell.chars().count())
                    .chain(std::iter::once(header.chars().count()))
                    .max()
                    .unwrap_or(0);
                u16::try_from(longest)
                    .unwrap_or(u16::MAX)
                    .saturating_add(2)
                    .clamp(8, self.max_column_width)
            })
            .collect()
    }
}

/// Formats shared by all sheets
struct ExcelFormats {
    header: Format,
    date: Format,
    integer: Format,
    text: Format,
}

fn status_column_width(category: StatusCategory) -> u16 {
    (category.as_str().len() as u16 + 3).max(10)
}

fn excel_date(day: NaiveDate) -> Result<ExcelDateTime, RenderError> {
    ExcelDateTime::from_ymd(day.year() as u16, day.month() as u8, day.day() as u8)
        .map_err(|e| RenderError::Format(format!("Date {day} out of range: {e}")))
}

impl Renderer for ExcelRenderer {
    type Output = Vec<u8>;

    fn render(&self, report: &ExportReport) -> Result<Vec<u8>, RenderError> {
        self.render_to_bytes(report)
    }
}
