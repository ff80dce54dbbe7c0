//! Status event extraction
//!
//! Reduces an item's raw history to the status transitions it records.

use trackexport_core::{ExportError, HistoryEventKind, Item, RawHistory, StatusChange, StatusSchema};

/// Decode the status transitions recorded in `history`.
///
/// Keeps entries for the schema's status field whose kind is "field created"
/// or "field changed" and which carry a value. Output follows the source
/// order, not time order. A value outside the decode table is an error.
pub fn extract_status_changes(
    item: &Item,
    history: &RawHistory,
    schema: &StatusSchema,
) -> Result<Vec<StatusChange>, ExportError> {
    history
        .entries
        .iter()
        .enumerate()
        .filter(|(_, entry)| {
            entry.field_id == schema.field_id
                && matches!(
                    entry.kind,
                    HistoryEventKind::FieldChanged | HistoryEventKind::FieldCreated
                )
        })
        .filter_map(|(seq, entry)| entry.value.map(|raw| (seq, entry, raw)))
        .map(|(seq, entry, raw)| {
            let to = schema.decode(raw).ok_or_else(|| ExportError::Decode {
                item: item.id.clone(),
                raw_value: raw,
            })?;
            Ok(StatusChange {
                item: item.id.clone(),
                time: entry.time,
                to,
                seq,
            })
        })
        .collect()
}
