//! Configuration file
//!
//! Optional TOML file, given with `--config` or `TRACKEXPORT_CONFIG`:
//!
//! ```toml
//! [fetch]
//! max_attempts = 100
//! retry_delay_ms = 100
//! concurrency = 8
//!
//! [report]
//! columns = ["Blocked", "Completed", "Deleted", "In Progress", "Not Done"]
//! utc_offset = "+00:00"
//! date_format = "yyyy-mm-dd"
//!
//! [status_field]
//! field_id = 15
//!
//! [status_field.values]
//! 2 = "not_done"
//! 3 = "in_progress"
//! ```
//!
//! Every key is optional. A `values` table replaces the default decode table
//! as a whole.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chrono::FixedOffset;
use serde::Deserialize;
use trackexport_core::{validate_status_columns, StatusCategory, StatusSchema};
use trackexport_engine::fetch::{DEFAULT_CONCURRENCY, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY};
use trackexport_engine::{FetchPolicy, StatusHistoryEngine};
use trackexport_render::ExcelRenderer;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub fetch: FetchSection,
    pub report: ReportSection,
    pub status_field: StatusFieldSection,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchSection {
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub concurrency: usize,
}

impl Default for FetchSection {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay_ms: DEFAULT_RETRY_DELAY.as_millis() as u64,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportSection {
    /// Status column order, by label or snake_case name
    pub columns: Option<Vec<String>>,
    /// Offset such as "+02:00" used to bucket events into days
    pub utc_offset: Option<String>,
    /// Spreadsheet number format of the date column
    pub date_format: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StatusFieldSection {
    pub field_id: Option<u32>,
    /// Raw value (as a TOML key) to category name
    pub values: Option<BTreeMap<String, String>>,
}

impl Config {
    /// Load `path`, or the defaults when no file is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn fetch_policy(&self) -> Result<FetchPolicy> {
        let policy = FetchPolicy::new()
            .max_attempts(self.fetch.max_attempts)
            .retry_delay(Duration::from_millis(self.fetch.retry_delay_ms))
            .concurrency(self.fetch.concurrency);
        policy.validate()?;
        Ok(policy)
    }

    pub fn status_schema(&self) -> Result<StatusSchema> {
        let field_id = self
            .status_field
            .field_id
            .unwrap_or(StatusSchema::default().field_id);

        let Some(values) = &self.status_field.values else {
            let mut schema = StatusSchema::default();
            schema.field_id = field_id;
            return Ok(schema);
        };

        let mut schema = StatusSchema::new(field_id);
        for (raw, name) in values {
            let raw: i64 = raw
                .trim()
                .parse()
                .with_context(|| format!("status value '{raw}' is not an integer"))?;
            let category: StatusCategory = name.parse()?;
            if !category.is_counted() {
                bail!("status value {raw} cannot map to '{name}'");
            }
            schema = schema.with_value(raw, category);
        }
        Ok(schema)
    }

    pub fn utc_offset(&self) -> Result<Option<FixedOffset>> {
        self.report
            .utc_offset
            .as_deref()
            .map(|text| {
                text.parse::<FixedOffset>()
                    .map_err(|e| anyhow!("invalid utc_offset '{text}': {e}"))
            })
            .transpose()
    }

    /// Status column order, validated
    pub fn status_columns(&self) -> Result<Vec<StatusCategory>> {
        let Some(names) = &self.report.columns else {
            return Ok(StatusCategory::COUNTED.to_vec());
        };
        let columns = names
            .iter()
            .map(|name| name.parse::<StatusCategory>())
            .collect::<Result<Vec<_>, _>>()?;
        validate_status_columns(&columns).map_err(|e| anyhow!(e))?;
        Ok(columns)
    }

    pub fn engine(&self) -> Result<StatusHistoryEngine> {
        let mut engine = StatusHistoryEngine::new()
            .policy(self.fetch_policy()?)
            .schema(self.status_schema()?);
        if let Some(offset) = self.utc_offset()? {
            engine = engine.utc_offset(offset);
        }
        Ok(engine)
    }

    pub fn excel_renderer(&self) -> ExcelRenderer {
        match &self.report.date_format {
            Some(format) => ExcelRenderer::new().date_format(format.as_str()),
            None => ExcelRenderer::new(),
        }
    }
}
