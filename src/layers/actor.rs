//! LayerActor - Serialized access to a layer store
//!
//! Owns a [`LayerStore`] and applies commands strictly one at a time, so a
//! session can be driven from many tasks without interleaving mutations.

use super::actor_handle::LayerActorHandle;
use super::commands::LayerCommand;
use super::store::LayerStore;
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

/// Actor processing layer commands sequentially
///
/// ```text
///   handle ──► command_rx (unbounded) ──► LayerActor ──► LayerStore ──► subscribers
/// ```
pub struct LayerActor {
    store: LayerStore,
    command_rx: mpsc::UnboundedReceiver<LayerCommand>,
    /// Total commands processed, reported on shutdown
    command_count: u64,
}

impl LayerActor {
    /// Spawn an actor around `store` and return a handle to it
    ///
    /// The store stays usable directly; the actor only serializes the
    /// commands that go through the handle.
    pub fn spawn(store: LayerStore) -> LayerActorHandle {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        let actor = LayerActor {
            store,
            command_rx: cmd_rx,
            command_count: 0,
        };

        tokio::spawn(actor.run());
        info!("LayerActor spawned");

        LayerActorHandle::new(cmd_tx)
    }

    /// Processes commands until shutdown or until every handle is dropped
    async fn run(mut self) {
        debug!("LayerActor run loop started");

        while let Some(cmd) = self.command_rx.recv().await {
            trace!(?cmd, "Processing command");
            self.command_count += 1;

            match cmd {
                LayerCommand::AddLayer { kind, field } => {
                    self.store.add_layer(kind, &field);
                }
                LayerCommand::RemoveLayer { id } => {
                    self.store.remove_layer(&id);
                }
                LayerCommand::UpdateLayer { id, patch } => {
                    self.store.update_layer(&id, &patch);
                }
                LayerCommand::MoveLayerUp { id } => {
                    self.store.move_layer_up(&id);
                }
                LayerCommand::MoveLayerDown { id } => {
                    self.store.move_layer_down(&id);
                }
                LayerCommand::MoveLayerToPosition { id, target } => {
                    self.store.move_layer_to_position(&id, target);
                }
                LayerCommand::ClearLayers => {
                    self.store.clear_layers();
                }
                LayerCommand::InitializeLayers {
                    text_fields,
                    image_fields,
                    response,
                } => {
                    let layers = self.store.initialize_layers(&text_fields, &image_fields);
                    let _ = response.send(layers);
                }
                LayerCommand::Snapshot { response } => {
                    let _ = response.send(self.store.snapshot());
                }
                LayerCommand::Subscribe { callback, response } => {
                    let id = self.store.subscribe_arc(callback);
                    debug!(?id, "Added subscriber");
                    let _ = response.send(id);
                }
                LayerCommand::Unsubscribe { id, response } => {
                    let removed = self.store.unsubscribe(id);
                    debug!(?id, removed, "Removed subscriber");
                    let _ = response.send(removed);
                }
                LayerCommand::Shutdown => {
                    info!("LayerActor received shutdown command");
                    break;
                }
            }
        }

        info!(
            commands = self.command_count,
            layers = self.store.len(),
            "LayerActor stopped"
        );
    }
}
