use trail_types::FieldMetadata;

/// Map a raw value to its option label for enumerated fields.
///
/// Plain fields and unmatched codes return `raw` unchanged.
pub fn resolve_label(raw: &str, metadata: &FieldMetadata) -> String {
    if !metadata.kind.is_enumerated() {
        return raw.to_string();
    }
    metadata
        .options
        .iter()
        .find(|o| o.value.to_string() == raw)
        .map(|o| o.label.clone())
        .unwrap_or_else(|| raw.to_string())
}
