//! Command enum for the layer actor
//!
//! Mutations are fire-and-forget; anything that hands data back carries a
//! oneshot sender for the response.

use super::types::{FieldRecord, LayerId, LayerKind, LayerPatch, LayerSequence};
use std::sync::Arc;
use tokio::sync::oneshot;

// ============================================================================
// Type Aliases
// ============================================================================

/// Subscriber callback function type
///
/// Called after every state replacement with the new snapshot.
/// Must be Send + Sync so stores can be shared across tasks.
pub type SubscriberFn = Arc<dyn Fn(&LayerSequence) + Send + Sync>;

/// Handle returned by `subscribe`, used to unsubscribe later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

// ============================================================================
// LayerCommand
// ============================================================================

/// Commands processed one at a time by the layer actor
pub enum LayerCommand {
    // -------------------------------------------------------------------------
    // Mutations (fire and forget)
    // -------------------------------------------------------------------------
    /// Append a layer at the front of the stack
    AddLayer { kind: LayerKind, field: FieldRecord },

    /// Remove a layer by id
    RemoveLayer { id: LayerId },

    /// Shallow-merge a patch into a layer
    UpdateLayer { id: LayerId, patch: LayerPatch },

    /// Swap a layer with its front neighbour
    MoveLayerUp { id: LayerId },

    /// Swap a layer with its back neighbour
    MoveLayerDown { id: LayerId },

    /// Reinsert a layer at an absolute position
    MoveLayerToPosition { id: LayerId, target: usize },

    /// Drop every layer
    ClearLayers,

    // -------------------------------------------------------------------------
    // Request-response commands
    // -------------------------------------------------------------------------
    /// Rebuild the stack from field records
    InitializeLayers {
        text_fields: Vec<FieldRecord>,
        image_fields: Vec<FieldRecord>,
        response: oneshot::Sender<LayerSequence>,
    },

    /// Get the current snapshot
    Snapshot {
        response: oneshot::Sender<LayerSequence>,
    },

    /// Register a state change listener
    Subscribe {
        callback: SubscriberFn,
        response: oneshot::Sender<SubscriptionId>,
    },

    /// Remove a state change listener
    Unsubscribe {
        id: SubscriptionId,
        response: oneshot::Sender<bool>,
    },

    /// Stop the actor loop
    Shutdown,
}

impl std::fmt::Debug for LayerCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerCommand::AddLayer { kind, field } => {
                write!(f, "AddLayer({}, {})", kind, field.id)
            }
            LayerCommand::RemoveLayer { id } => write!(f, "RemoveLayer({})", id),
            LayerCommand::UpdateLayer { id, .. } => write!(f, "UpdateLayer({})", id),
            LayerCommand::MoveLayerUp { id } => write!(f, "MoveLayerUp({})", id),
            LayerCommand::MoveLayerDown { id } => write!(f, "MoveLayerDown({})", id),
            LayerCommand::MoveLayerToPosition { id, target } => {
                write!(f, "MoveLayerToPosition({}, {})", id, target)
            }
            LayerCommand::ClearLayers => write!(f, "ClearLayers"),
            LayerCommand::InitializeLayers {
                text_fields,
                image_fields,
                ..
            } => write!(
                f,
                "InitializeLayers({} text, {} image)",
                text_fields.len(),
                image_fields.len()
            ),
            LayerCommand::Snapshot { .. } => write!(f, "Snapshot"),
            LayerCommand::Subscribe { .. } => write!(f, "Subscribe"),
            LayerCommand::Unsubscribe { id, .. } => write!(f, "Unsubscribe({:?})", id),
            LayerCommand::Shutdown => write!(f, "Shutdown"),
        }
    }
}
