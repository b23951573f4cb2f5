//! Builder functions to construct layers from upstream field records
//!
//! Converts text and image field records into layer records, deriving the
//! display name. Field attributes named after a layer field (`type`, `name`,
//! `zIndex`) override the computed values.

use super::types::{FieldRecord, Layer, LayerKind, RESERVED_KEYS};
use serde_json::Value;
use tracing::debug;

/// Placeholder display name for a field without column or text
///
/// `index` is 0-based; the rendered number is 1-based.
pub fn placeholder_name(kind: LayerKind, index: usize) -> String {
    format!("{} Field {}", kind.label(), index + 1)
}

/// Constructs a layer from a field record
///
/// The name prefers a non-empty mapped column, then non-empty text, then the
/// placeholder for `index`. The stored `z_index` starts at 0 unless the field
/// carries its own `zIndex`; the same goes for `name` and `type`. An override
/// whose value does not fit the layer field is dropped.
pub fn create_layer(kind: LayerKind, field: &FieldRecord, index: usize) -> Layer {
    let name = [field.mapped_column.as_deref(), field.text.as_deref()]
        .into_iter()
        .flatten()
        .find(|candidate| !candidate.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| placeholder_name(kind, index));

    let mut layer = Layer {
        id: field.id.clone(),
        kind,
        name,
        z_index: 0,
        mapped_column: field.mapped_column.clone(),
        text: field.text.clone(),
        attributes: field.attributes.clone(),
    };

    for key in RESERVED_KEYS {
        if let Some(value) = layer.attributes.remove(*key) {
            apply_override(&mut layer, key, value);
        }
    }
    layer
}

fn apply_override(layer: &mut Layer, key: &str, value: Value) {
    let applied = match (key, &value) {
        ("type", Value::String(raw)) => raw
            .parse::<LayerKind>()
            .map(|kind| layer.kind = kind)
            .is_ok(),
        ("name", Value::String(name)) => {
            layer.name = name.clone();
            true
        }
        ("zIndex", Value::Number(number)) => number
            .as_i64()
            .and_then(|z| i32::try_from(z).ok())
            .map(|z| layer.z_index = z)
            .is_some(),
        _ => false,
    };
    if !applied {
        debug!("Ignoring {}={} on layer {}", key, value, layer.id);
    }
}

/// Builds the full stack from both field lists
///
/// Image layers come first (behind), then text layers (in front). Each
/// layer's placeholder index is its position within its own field list.
pub fn build_layers(text_fields: &[FieldRecord], image_fields: &[FieldRecord]) -> Vec<Layer> {
    let images = image_fields
        .iter()
        .enumerate()
        .map(|(index, field)| create_layer(LayerKind::Image, field, index));
    let texts = text_fields
        .iter()
        .enumerate()
        .map(|(index, field)| create_layer(LayerKind::Text, field, index));

    images.chain(texts).collect()
}
