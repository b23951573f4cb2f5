//! LayerActorHandle - Public API for the LayerActor
//!
//! Mutations are fire-and-forget; queries await a oneshot response.

use tokio::sync::{mpsc, oneshot};

use super::commands::{LayerCommand, SubscriberFn, SubscriptionId};
use super::types::{FieldRecord, LayerId, LayerKind, LayerPatch, LayerSequence};

/// Errors returned by actor queries
#[derive(Debug, thiserror::Error)]
pub enum ActorError {
    /// The actor loop has stopped
    #[error("layer actor is no longer running")]
    Closed,
    /// The actor dropped the request without answering
    #[error("layer actor dropped the response")]
    NoResponse,
}

/// Cloneable handle for sending commands to a [`LayerActor`](super::LayerActor)
#[derive(Clone, Debug)]
pub struct LayerActorHandle {
    cmd_tx: mpsc::UnboundedSender<LayerCommand>,
}

impl LayerActorHandle {
    pub fn new(cmd_tx: mpsc::UnboundedSender<LayerCommand>) -> Self {
        Self { cmd_tx }
    }

    /// Whether the actor loop is still receiving
    pub fn is_running(&self) -> bool {
        !self.cmd_tx.is_closed()
    }

    // =========================================================================
    // Mutations (fire-and-forget)
    // =========================================================================

    pub fn add_layer(&self, kind: LayerKind, field: FieldRecord) {
        let _ = self.cmd_tx.send(LayerCommand::AddLayer { kind, field });
    }

    pub fn remove_layer(&self, id: LayerId) {
        let _ = self.cmd_tx.send(LayerCommand::RemoveLayer { id });
    }

    pub fn update_layer(&self, id: LayerId, patch: LayerPatch) {
        let _ = self.cmd_tx.send(LayerCommand::UpdateLayer { id, patch });
    }

    pub fn move_layer_up(&self, id: LayerId) {
        let _ = self.cmd_tx.send(LayerCommand::MoveLayerUp { id });
    }

    pub fn move_layer_down(&self, id: LayerId) {
        let _ = self.cmd_tx.send(LayerCommand::MoveLayerDown { id });
    }

    pub fn move_layer_to_position(&self, id: LayerId, target: usize) {
        let _ = self
            .cmd_tx
            .send(LayerCommand::MoveLayerToPosition { id, target });
    }

    pub fn clear_layers(&self) {
        let _ = self.cmd_tx.send(LayerCommand::ClearLayers);
    }

    /// Stop the actor after the commands already queued
    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(LayerCommand::Shutdown);
    }

    // =========================================================================
    // Request-response
    // =========================================================================

    /// Rebuild the stack from field records and return it
    pub async fn initialize_layers(
        &self,
        text_fields: Vec<FieldRecord>,
        image_fields: Vec<FieldRecord>,
    ) -> Result<LayerSequence, ActorError> {
        self.request(|response| LayerCommand::InitializeLayers {
            text_fields,
            image_fields,
            response,
        })
        .await
    }

    /// Snapshot after every command queued before this call
    pub async fn snapshot(&self) -> Result<LayerSequence, ActorError> {
        self.request(|response| LayerCommand::Snapshot { response })
            .await
    }

    pub async fn subscribe<F>(&self, listener: F) -> Result<SubscriptionId, ActorError>
    where
        F: Fn(&LayerSequence) + Send + Sync + 'static,
    {
        let callback: SubscriberFn = std::sync::Arc::new(listener);
        self.request(|response| LayerCommand::Subscribe { callback, response })
            .await
    }

    pub async fn unsubscribe(&self, id: SubscriptionId) -> Result<bool, ActorError> {
        self.request(|response| LayerCommand::Unsubscribe { id, response })
            .await
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> LayerCommand,
    ) -> Result<T, ActorError> {
        let (response_tx, response_rx) = oneshot::channel();

        self.cmd_tx
            .send(build(response_tx))
            .map_err(|_| ActorError::Closed)?;

        response_rx.await.map_err(|_| ActorError::NoResponse)
    }
}
