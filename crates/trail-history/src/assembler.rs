//! Turns raw audit entries into display-ready history records for one field.

use crate::labels::resolve_label;
use trail_types::{AuditEntry, FieldDelta, FieldMetadata, HistoryRecord, MAX_HISTORY_RECORDS};

const SYSTEM_ACTOR: &str = "System";

/// Delta for `field` in `entry`: decoded from the payload, or synthesized for a create.
/// Update entries that do not mention the field yield `None`.
fn entry_delta(entry: &AuditEntry, field: &str, current_value: &str) -> Option<FieldDelta> {
    trail_decode::decode(entry.change_data.as_deref(), field).or_else(|| {
        entry
            .operation
            .is_create()
            .then(|| FieldDelta::synthesized_create(field, current_value))
    })
}

fn to_record(entry: &AuditEntry, delta: &FieldDelta, metadata: &FieldMetadata) -> HistoryRecord {
    HistoryRecord {
        timestamp: entry.created_on,
        actor: entry
            .actor
            .clone()
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| SYSTEM_ACTOR.to_string()),
        operation: entry.operation.label().to_string(),
        action: entry.action.clone().unwrap_or_default(),
        entry_id: entry.entry_id.clone(),
        old_value: resolve_label(delta.old_value.display(), metadata),
        new_value: resolve_label(delta.new_value.display(), metadata),
    }
}

/// Assemble at most [`MAX_HISTORY_RECORDS`] records from newest-first `entries`.
pub fn assemble(
    entries: &[AuditEntry],
    field: &str,
    current_value: &str,
    metadata: &FieldMetadata,
) -> Vec<HistoryRecord> {
    entries
        .iter()
        .filter_map(|e| entry_delta(e, field, current_value).map(|d| to_record(e, &d, metadata)))
        .take(MAX_HISTORY_RECORDS)
        .collect()
}
