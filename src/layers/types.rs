//! Layer type definitions
//!
//! Defines layer records, the upstream field records they are built from,
//! partial updates, and the immutable sequence snapshot handed to observers.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::ops::Deref;
use std::sync::Arc;

/// Attribute keys that name one of the layer record's own fields
///
/// A field attribute with one of these names overrides the value computed at
/// construction instead of being carried in the attribute map.
pub const RESERVED_KEYS: &[&str] = &["type", "name", "zIndex"];

/// Opaque layer identifier, shared with the originating field record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(String);

impl LayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LayerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for LayerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Kind of visual element a layer renders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    /// Text field
    Text,
    /// Image field
    Image,
}

/// Error returned when a layer kind name is not recognised
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown layer type '{0}' (expected 'text' or 'image')")]
pub struct UnknownLayerKind(pub String);

impl LayerKind {
    /// Convert to the lowercase wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            LayerKind::Text => "text",
            LayerKind::Image => "image",
        }
    }

    /// Capitalised label used in placeholder names
    pub fn label(&self) -> &'static str {
        match self {
            LayerKind::Text => "Text",
            LayerKind::Image => "Image",
        }
    }
}

impl std::str::FromStr for LayerKind {
    type Err = UnknownLayerKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LayerKind::Text),
            "image" => Ok(LayerKind::Image),
            _ => Err(UnknownLayerKind(s.to_string())),
        }
    }
}

impl std::fmt::Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Field record produced by an upstream text or image field editor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldRecord {
    pub id: LayerId,
    /// Data column bound to the field, preferred as display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapped_column: Option<String>,
    /// Literal text content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Every other display attribute, carried through untouched
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl FieldRecord {
    /// Create a bare field record with only an id
    pub fn new(id: impl Into<LayerId>) -> Self {
        Self {
            id: id.into(),
            mapped_column: None,
            text: None,
            attributes: Map::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_mapped_column(mut self, column: impl Into<String>) -> Self {
        self.mapped_column = Some(column.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

/// One visual element in the stack
///
/// `z_index` is carried from construction and never recomputed; the
/// stacking value renderers should use comes from
/// [`layer_z_index`](super::query::layer_z_index).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    pub id: LayerId,
    #[serde(rename = "type")]
    pub kind: LayerKind,
    pub name: String,
    pub z_index: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapped_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Layer {
    /// Shallow merge of this layer with `patch`, patch values winning
    pub fn merged(&self, patch: &LayerPatch) -> Layer {
        let mut layer = self.clone();
        if let Some(id) = &patch.id {
            layer.id = id.clone();
        }
        if let Some(kind) = patch.kind {
            layer.kind = kind;
        }
        if let Some(name) = &patch.name {
            layer.name = name.clone();
        }
        if let Some(z_index) = patch.z_index {
            layer.z_index = z_index;
        }
        if let Some(column) = &patch.mapped_column {
            layer.mapped_column = column.clone();
        }
        if let Some(text) = &patch.text {
            layer.text = text.clone();
        }
        for (key, value) in &patch.attributes {
            layer.attributes.insert(key.clone(), value.clone());
        }
        layer
    }
}

/// Partial layer update; every present key replaces the layer's value
///
/// `mapped_column` and `text` distinguish an absent key (`None`) from an
/// explicit `null` (`Some(None)`), which clears the value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<LayerId>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<LayerKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i32>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub mapped_column: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub text: Option<Option<String>>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// Maps a present key to `Some`, keeping `null` as `Some(None)`
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl LayerPatch {
    /// Patch that only renames the layer
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

/// Immutable ordered snapshot of the layer stack
///
/// Index 0 is the backmost layer, the last index the frontmost. Clones
/// share the same allocation; a snapshot never changes once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerSequence(Arc<Vec<Layer>>);

impl LayerSequence {
    pub fn new(layers: Vec<Layer>) -> Self {
        Self(Arc::new(layers))
    }

    /// Copy the layers out for building the next sequence
    pub fn to_vec(&self) -> Vec<Layer> {
        self.0.as_ref().clone()
    }

    /// Ids in stacking order, backmost first
    pub fn ids(&self) -> Vec<&LayerId> {
        self.0.iter().map(|layer| &layer.id).collect()
    }

    /// Whether both snapshots share the same allocation
    pub fn ptr_eq(&self, other: &LayerSequence) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for LayerSequence {
    type Target = [Layer];

    fn deref(&self) -> &[Layer] {
        self.0.as_slice()
    }
}

impl From<Vec<Layer>> for LayerSequence {
    fn from(layers: Vec<Layer>) -> Self {
        Self::new(layers)
    }
}

impl<'a> IntoIterator for &'a LayerSequence {
    type Item = &'a Layer;
    type IntoIter = std::slice::Iter<'a, Layer>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Serialize for LayerSequence {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.as_slice().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for LayerSequence {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<Layer>::deserialize(deserializer).map(Self::new)
    }
}
