//! Read-only queries over a layer snapshot
//!
//! These never touch store state: callers pass the snapshot they rendered
//! from, so answers stay consistent with what is on screen.

use super::types::{Layer, LayerId, LayerKind, LayerSequence};

/// Stacking value of the backmost layer
///
/// Effective z-index is `position + BASE_Z_INDEX`; unknown ids map to the base.
pub const BASE_Z_INDEX: usize = 10;

/// Layers split by kind, each keeping stacking order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayersByType<'a> {
    pub text_fields: Vec<&'a Layer>,
    pub image_fields: Vec<&'a Layer>,
}

/// First layer with the given id
pub fn get_layer<'a>(layers: &'a [Layer], id: &LayerId) -> Option<&'a Layer> {
    layers.iter().find(|layer| &layer.id == id)
}

/// Position of the first layer with the given id
pub fn get_layer_index(layers: &[Layer], id: &LayerId) -> Option<usize> {
    layers.iter().position(|layer| &layer.id == id)
}

/// Effective stacking value renderers should paint with
pub fn layer_z_index(layers: &[Layer], id: &LayerId) -> usize {
    get_layer_index(layers, id).map_or(BASE_Z_INDEX, |index| index + BASE_Z_INDEX)
}

/// Whether the layer exists and is not already frontmost
pub fn can_move_up(layers: &[Layer], id: &LayerId) -> bool {
    get_layer_index(layers, id).is_some_and(|index| index + 1 < layers.len())
}

/// Whether the layer exists and is not already backmost
pub fn can_move_down(layers: &[Layer], id: &LayerId) -> bool {
    get_layer_index(layers, id).is_some_and(|index| index > 0)
}

pub fn layers_by_type(layers: &[Layer]) -> LayersByType<'_> {
    let of_kind = |kind: LayerKind| -> Vec<&Layer> {
        layers.iter().filter(|layer| layer.kind == kind).collect()
    };
    LayersByType {
        text_fields: of_kind(LayerKind::Text),
        image_fields: of_kind(LayerKind::Image),
    }
}

impl LayerSequence {
    pub fn get(&self, id: &LayerId) -> Option<&Layer> {
        get_layer(self, id)
    }

    pub fn index_of(&self, id: &LayerId) -> Option<usize> {
        get_layer_index(self, id)
    }

    pub fn z_index_of(&self, id: &LayerId) -> usize {
        layer_z_index(self, id)
    }

    pub fn can_move_up(&self, id: &LayerId) -> bool {
        can_move_up(self, id)
    }

    pub fn can_move_down(&self, id: &LayerId) -> bool {
        can_move_down(self, id)
    }

    pub fn by_type(&self) -> LayersByType<'_> {
        layers_by_type(self)
    }
}
