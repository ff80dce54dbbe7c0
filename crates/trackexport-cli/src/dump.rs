//! Offline project dumps
//!
//! A dump is a JSON snapshot of one project: its columns, resource
//! directory, and every item with stored column values and raw history.
//! `DumpSource` serves the histories through `HistorySource`, holding each
//! one back for a configurable number of polls the way a server does while
//! it assembles a history.
//!
//! ```json
//! {
//!   "project": "CRM Migration",
//!   "columns": [{ "kind": "builtin", "id": 1, "name": "ID" }],
//!   "items": [
//!     {
//!       "id": "101",
//!       "history_key": "h-101",
//!       "values": { "ID": "101" },
//!       "ready_after_polls": 2,
//!       "history": [
//!         { "field_id": 15, "kind": "field_changed", "time": "2026-01-05T09:00:00Z", "value": 3 }
//!       ]
//!     }
//!   ]
//! }
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use trackexport_core::{
    Column, HistoryKey, HistorySource, Item, ItemTable, RawHistory, ResourceDirectory, SourceError,
};

/// Parsed project dump
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectDump {
    pub project: String,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub directory: ResourceDirectory,
    #[serde(default)]
    pub items: Vec<DumpItem>,
}

/// One item of a dump
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DumpItem {
    pub id: String,
    pub history_key: HistoryKey,
    /// Stored column values keyed by column name
    #[serde(default)]
    pub values: HashMap<String, String>,
    #[serde(default)]
    pub history: RawHistory,
    /// Polls answered with "not yet available" before the history is served
    #[serde(default)]
    pub ready_after_polls: u32,
}

impl ProjectDump {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dump {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid dump {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let dump: Self = serde_json::from_str(text)?;
        dump.check_unique()?;
        Ok(dump)
    }

    /// Item ids and history keys must each be unique
    fn check_unique(&self) -> Result<()> {
        let mut ids = HashSet::new();
        let mut keys = HashSet::new();
        for item in &self.items {
            if !ids.insert(item.id.as_str()) {
                bail!("duplicate item id '{}'", item.id);
            }
            if !keys.insert(item.history_key.as_str()) {
                bail!(
                    "history key '{}' of item '{}' is already used by another item",
                    item.history_key,
                    item.id
                );
            }
        }
        Ok(())
    }

    /// Items in dump order
    pub fn items(&self) -> Vec<Item> {
        self.items
            .iter()
            .map(|item| Item::new(item.id.clone(), item.history_key.clone()))
            .collect()
    }

    /// Decode the stored column values of every item
    pub fn item_table(&self) -> Result<ItemTable> {
        let table = ItemTable::build(
            &self.columns,
            self.items.iter().map(|item| &item.values),
            &self.directory,
        )?;
        Ok(table)
    }

    /// History source serving this dump
    pub fn source(&self) -> DumpSource {
        DumpSource::new(
            self.items
                .iter()
                .map(|item| (item.history_key.clone(), item.history.clone(), item.ready_after_polls)),
        )
    }
}

struct Entry {
    history: RawHistory,
    ready_after: u32,
    polls: AtomicU32,
}

/// `HistorySource` over in-memory dump histories
pub struct DumpSource {
    entries: HashMap<HistoryKey, Entry>,
}

impl DumpSource {
    pub fn new(histories: impl IntoIterator<Item = (HistoryKey, RawHistory, u32)>) -> Self {
        let entries = histories
            .into_iter()
            .map(|(key, history, ready_after)| {
                (
                    key,
                    Entry {
                        history,
                        ready_after,
                        polls: AtomicU32::new(0),
                    },
                )
            })
            .collect();
        Self { entries }
    }

    /// Number of polls received for `key`
    pub fn polls(&self, key: &str) -> u32 {
        self.entries
            .get(key)
            .map_or(0, |entry| entry.polls.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl HistorySource for DumpSource {
    async fn fetch_history(&self, key: &HistoryKey) -> Result<Option<RawHistory>, SourceError> {
        let entry = self
            .entries
            .get(key)
            .ok_or_else(|| SourceError::new(format!("no history stored under '{key}'")))?;

        let previous = entry.polls.fetch_add(1, Ordering::SeqCst);
        if previous < entry.ready_after {
            return Ok(None);
        }
        Ok(Some(entry.history.clone()))
    }
}
