//! Layer stack module - ordered text and image layers of a canvas editor
//!
//! Array position is the stacking order: index 0 is painted first (back),
//! the last layer is painted on top. The [`LayerStore`] replaces its whole
//! sequence on every mutation, so observers always receive a consistent
//! [`LayerSequence`] snapshot. Renderers should take the z-index from
//! [`layer_z_index`], not from the stored `z_index` field.

mod actor;
mod actor_handle;
mod builders;
mod commands;
mod query;
mod store;
mod types;


pub use actor::LayerActor;
pub use actor_handle::{ActorError, LayerActorHandle};
pub use builders::{build_layers, create_layer, placeholder_name};
pub use commands::{LayerCommand, SubscriberFn, SubscriptionId};
pub use query::{
    can_move_down, can_move_up, get_layer, get_layer_index, layer_z_index, layers_by_type,
    LayersByType, BASE_Z_INDEX,
};
pub use store::LayerStore;
pub use types::{
    FieldRecord, Layer, LayerId, LayerKind, LayerPatch, LayerSequence, UnknownLayerKind,
    RESERVED_KEYS,
};
