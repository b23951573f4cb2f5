//! canvas-layers - ordered layer stack for design-canvas editors
//!
//! Builds text and image layers from field-editor records and keeps them in
//! a copy-on-write stack whose order is the render order. See [`layers`].

pub mod config;
pub mod layers;

pub use config::{AppConfig, FieldSet};
pub use layers::{
    FieldRecord, Layer, LayerActor, LayerActorHandle, LayerId, LayerKind, LayerPatch,
    LayerSequence, LayerStore,
};
