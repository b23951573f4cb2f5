//! LayerStore - Copy-on-write layer stack with subscription support
//!
//! Holds the current layer sequence of one editor session and notifies
//! subscribers with the new snapshot after every replacement.

use super::builders::{build_layers, create_layer};
use super::commands::{SubscriberFn, SubscriptionId};
use super::query::get_layer_index;
use super::types::{FieldRecord, Layer, LayerId, LayerKind, LayerPatch, LayerSequence};
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Ordered layer stack of one editor session
///
/// Cloning yields another handle to the same session; separate `new()`
/// stores never share state. Mutations never fail: unknown ids and
/// out-of-range positions leave the order unchanged, but still replace the
/// state and notify subscribers.
#[derive(Clone)]
pub struct LayerStore {
    /// Current snapshot, replaced wholesale on every mutation
    layers: Arc<RwLock<LayerSequence>>,
    /// Subscribers in registration order
    subscribers: Arc<RwLock<Vec<(SubscriptionId, SubscriberFn)>>>,
    /// Serializes replace-and-notify across threads; re-entrant for subscribers
    update_gate: Arc<ReentrantMutex<()>>,
    /// Snapshots waiting for the current notification round to finish
    delivery: Arc<Mutex<Delivery>>,
    next_subscription: Arc<AtomicU64>,
}

#[derive(Default)]
struct Delivery {
    pending: VecDeque<LayerSequence>,
    draining: bool,
}

/// Ends a notification round, even if a subscriber panics
struct DrainGuard<'a>(&'a Mutex<Delivery>);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        let mut delivery = self.0.lock();
        delivery.pending.clear();
        delivery.draining = false;
    }
}

impl LayerStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            layers: Arc::new(RwLock::new(LayerSequence::default())),
            subscribers: Arc::new(RwLock::new(Vec::new())),
            update_gate: Arc::new(ReentrantMutex::new(())),
            delivery: Arc::new(Mutex::new(Delivery::default())),
            next_subscription: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Current snapshot
    pub fn snapshot(&self) -> LayerSequence {
        self.layers.read().clone()
    }

    pub fn len(&self) -> usize {
        self.layers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.read().is_empty()
    }

    /// Replace the whole stack with layers built from field records
    ///
    /// Image layers go behind text layers. Ids are not checked for duplicates.
    pub fn initialize_layers(
        &self,
        text_fields: &[FieldRecord],
        image_fields: &[FieldRecord],
    ) -> LayerSequence {
        debug!(
            "Initializing layers from {} text and {} image fields",
            text_fields.len(),
            image_fields.len()
        );
        self.replace_with(|_| build_layers(text_fields, image_fields))
    }

    /// Append a layer at the frontmost position
    ///
    /// The placeholder index is the current stack length, not the number of
    /// layers of the same kind.
    pub fn add_layer(&self, kind: LayerKind, field: &FieldRecord) {
        debug!("Adding {} layer: {}", kind, field.id);
        self.replace_with(|layers| {
            let mut next = layers.to_vec();
            next.push(create_layer(kind, field, layers.len()));
            next
        });
    }

    /// Remove the layer with the given id, if any
    pub fn remove_layer(&self, id: &LayerId) {
        debug!("Removing layer: {}", id);
        self.replace_with(|layers| {
            layers
                .iter()
                .filter(|layer| &layer.id != id)
                .cloned()
                .collect()
        });
    }

    /// Shallow-merge `patch` into the layer with the given id
    ///
    /// The patch may change the id itself; keeping ids unique is up to the caller.
    pub fn update_layer(&self, id: &LayerId, patch: &LayerPatch) {
        debug!("Updating layer: {}", id);
        self.replace_with(|layers| {
            layers
                .iter()
                .map(|layer| {
                    if &layer.id == id {
                        layer.merged(patch)
                    } else {
                        layer.clone()
                    }
                })
                .collect()
        });
    }

    /// Swap the layer with its neighbour toward the front
    pub fn move_layer_up(&self, id: &LayerId) {
        self.replace_with(|layers| {
            let mut next = layers.to_vec();
            match get_layer_index(layers, id) {
                Some(index) if index + 1 < layers.len() => {
                    next.swap(index, index + 1);
                    debug!("Moved layer {} up to position {}", id, index + 1);
                }
                _ => debug!("Layer {} cannot move up", id),
            }
            next
        });
    }

    /// Swap the layer with its neighbour toward the back
    pub fn move_layer_down(&self, id: &LayerId) {
        self.replace_with(|layers| {
            let mut next = layers.to_vec();
            match get_layer_index(layers, id) {
                Some(index) if index > 0 => {
                    next.swap(index, index - 1);
                    debug!("Moved layer {} down to position {}", id, index - 1);
                }
                _ => debug!("Layer {} cannot move down", id),
            }
            next
        });
    }

    /// Reinsert the layer at `target`
    ///
    /// `target` is checked against the length before removal, then used as
    /// the raw insert position in the shortened stack.
    pub fn move_layer_to_position(&self, id: &LayerId, target: usize) {
        self.replace_with(|layers| {
            let mut next = layers.to_vec();
            match get_layer_index(layers, id) {
                Some(current) if target < layers.len() => {
                    let moved = next.remove(current);
                    next.insert(target, moved);
                    debug!("Moved layer {} from {} to {}", id, current, target);
                }
                _ => debug!("Layer {} cannot move to position {}", id, target),
            }
            next
        });
    }

    /// Drop every layer
    pub fn clear_layers(&self) {
        debug!("Clearing all layers");
        self.replace_with(|_| Vec::new());
    }

    /// Subscribe to state replacements
    ///
    /// Subscribers run synchronously, in registration order, after the new
    /// snapshot is installed. They may read the store, (un)subscribe, or
    /// mutate it; a mutation made while notifying is delivered to every
    /// subscriber once the current round has finished.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&LayerSequence) + Send + Sync + 'static,
    {
        self.subscribe_arc(Arc::new(listener))
    }

    pub(crate) fn subscribe_arc(&self, listener: SubscriberFn) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().push((id, listener));
        trace!("Subscriber {:?} registered", id);
        id
    }

    /// Remove a subscriber; returns whether it was registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(sub_id, _)| *sub_id != id);
        subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    fn replace_with<F>(&self, build: F) -> LayerSequence
    where
        F: FnOnce(&LayerSequence) -> Vec<Layer>,
    {
        let _gate = self.update_gate.lock();

        let next = {
            let mut current = self.layers.write();
            let next = LayerSequence::new(build(&*current));
            *current = next.clone();
            next
        };

        {
            let mut delivery = self.delivery.lock();
            delivery.pending.push_back(next.clone());
            if delivery.draining {
                trace!("Snapshot queued behind the current notification round");
                return next;
            }
            delivery.draining = true;
        }

        let _draining = DrainGuard(&self.delivery);
        loop {
            let pending = self.delivery.lock().pending.pop_front();
            match pending {
                Some(snapshot) => self.notify(&snapshot),
                None => break,
            }
        }
        next
    }

    fn notify(&self, snapshot: &LayerSequence) {
        // Copy out so subscribers can (un)subscribe while being notified
        let subscribers: Vec<SubscriberFn> = self
            .subscribers
            .read()
            .iter()
            .map(|(_, subscriber)| Arc::clone(subscriber))
            .collect();

        trace!(
            "Notifying {} subscribers ({} layers)",
            subscribers.len(),
            snapshot.len()
        );
        for subscriber in subscribers {
            subscriber(snapshot);
        }
    }
}

impl Default for LayerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LayerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerStore")
            .field("layers", &self.layers.read().ids())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::query::{can_move_up, layer_z_index};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn id(s: &str) -> LayerId {
        LayerId::from(s)
    }

    fn ids(seq: &LayerSequence) -> Vec<&str> {
        seq.iter().map(|l| l.id.as_str()).collect()
    }

    /// Store holding three text layers A, B, C (back to front)
    fn abc_store() -> LayerStore {
        let store = LayerStore::new();
        store.initialize_layers(
            &[FieldRecord::new("A"), FieldRecord::new("B"), FieldRecord::new("C")],
            &[],
        );
        store
    }

    #[test]
    fn test_initialize_example() {
        let store = LayerStore::new();
        let seq = store.initialize_layers(
            &[FieldRecord::new("txt1").with_text("Hello")],
            &[FieldRecord::new("img1")],
        );

        assert_eq!(
            serde_json::to_value(&seq).unwrap(),
            json!([
                {"id": "img1", "type": "image", "name": "Image Field 1", "zIndex": 0},
                {"id": "txt1", "type": "text", "name": "Hello", "zIndex": 0, "text": "Hello"}
            ])
        );
        assert_eq!(layer_z_index(&seq, &id("txt1")), 11);
        assert_eq!(store.snapshot(), seq);
    }

    #[test]
    fn test_initialize_replaces_previous_state() {
        let store = abc_store();
        let seq = store.initialize_layers(&[], &[FieldRecord::new("img1")]);
        assert_eq!(ids(&seq), vec!["img1"]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_add_layer_uses_total_length_for_placeholder() {
        let store = LayerStore::new();
        store.initialize_layers(&[FieldRecord::new("t1")], &[FieldRecord::new("i1")]);

        store.add_layer(LayerKind::Image, &FieldRecord::new("i2"));
        let seq = store.snapshot();

        assert_eq!(ids(&seq), vec!["i1", "t1", "i2"]);
        assert_eq!(seq[2].name, "Image Field 3");
        assert_eq!(seq[2].kind, LayerKind::Image);
    }

    #[test]
    fn test_add_layer_does_not_check_duplicates() {
        let store = abc_store();
        store.add_layer(LayerKind::Text, &FieldRecord::new("A").with_text("again"));
        let seq = store.snapshot();
        assert_eq!(seq.len(), 4);
        // Lookups return the first match
        assert_eq!(seq.index_of(&id("A")), Some(0));
    }

    #[test]
    fn test_remove_layer() {
        let store = abc_store();
        store.remove_layer(&id("B"));
        assert_eq!(ids(&store.snapshot()), vec!["A", "C"]);

        store.remove_layer(&id("missing"));
        assert_eq!(ids(&store.snapshot()), vec!["A", "C"]);
    }

    #[test]
    fn test_update_layer_merges_and_can_change_id() {
        let store = abc_store();
        let patch = LayerPatch::rename("Headline").with_attribute("fontSize", json!(32));
        store.update_layer(&id("B"), &patch);

        let seq = store.snapshot();
        let b = seq.get(&id("B")).unwrap();
        assert_eq!(b.name, "Headline");
        assert_eq!(b.attributes.get("fontSize"), Some(&json!(32)));
        assert_eq!(seq.index_of(&id("B")), Some(1));

        store.update_layer(
            &id("B"),
            &LayerPatch {
                id: Some(id("Z")),
                ..LayerPatch::default()
            },
        );
        assert_eq!(ids(&store.snapshot()), vec!["A", "Z", "C"]);

        store.update_layer(&id("missing"), &LayerPatch::rename("x"));
        assert_eq!(ids(&store.snapshot()), vec!["A", "Z", "C"]);
    }

    #[test]
    fn test_move_layer_up_example() {
        let store = abc_store();
        store.move_layer_up(&id("A"));
        let seq = store.snapshot();
        assert_eq!(ids(&seq), vec!["B", "A", "C"]);
        assert!(!can_move_up(&seq, &id("C")));
    }

    #[test]
    fn test_move_up_and_down_at_boundaries_are_noops() {
        let store = abc_store();
        store.move_layer_up(&id("C"));
        store.move_layer_down(&id("A"));
        store.move_layer_up(&id("missing"));
        store.move_layer_down(&id("missing"));
        assert_eq!(ids(&store.snapshot()), vec!["A", "B", "C"]);

        store.move_layer_down(&id("C"));
        assert_eq!(ids(&store.snapshot()), vec!["A", "C", "B"]);
    }

    #[test]
    fn test_move_layer_to_position() {
        let store = abc_store();
        store.move_layer_to_position(&id("C"), 0);
        assert_eq!(ids(&store.snapshot()), vec!["C", "A", "B"]);

        store.move_layer_to_position(&id("C"), 2);
        assert_eq!(ids(&store.snapshot()), vec!["A", "B", "C"]);

        store.move_layer_to_position(&id("A"), 1);
        assert_eq!(ids(&store.snapshot()), vec!["B", "A", "C"]);
    }

    #[test]
    fn test_move_layer_to_position_out_of_range() {
        let store = abc_store();
        store.move_layer_to_position(&id("A"), 3);
        store.move_layer_to_position(&id("missing"), 0);
        assert_eq!(ids(&store.snapshot()), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_clear_layers() {
        let store = abc_store();
        store.clear_layers();
        assert!(store.is_empty());
    }

    #[test]
    fn test_snapshots_are_immutable() {
        let store = abc_store();
        let before = store.snapshot();
        store.move_layer_up(&id("A"));
        store.remove_layer(&id("C"));

        assert_eq!(ids(&before), vec!["A", "B", "C"]);
        assert_eq!(ids(&store.snapshot()), vec!["B", "A"]);
    }

    #[test]
    fn test_subscribers_notified_in_order_with_snapshot() {
        let store = LayerStore::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for name in ["first", "second"] {
            let log = log.clone();
            store.subscribe(move |seq| log.lock().push((name, seq.len())));
        }

        store.add_layer(LayerKind::Text, &FieldRecord::new("t1"));
        assert_eq!(*log.lock(), vec![("first", 1), ("second", 1)]);
    }

    #[test]
    fn test_noop_mutations_still_notify() {
        let store = abc_store();
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();
        store.subscribe(move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        store.remove_layer(&id("missing"));
        store.move_layer_up(&id("C"));
        store.move_layer_to_position(&id("A"), 99);

        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_unsubscribe() {
        let store = LayerStore::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();
        let sub = store.subscribe(move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        store.clear_layers();
        assert!(store.unsubscribe(sub));
        assert!(!store.unsubscribe(sub));
        store.clear_layers();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn test_subscriber_can_read_store() {
        let store = LayerStore::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let store_clone = store.clone();
        let seen_clone = seen.clone();
        store.subscribe(move |seq| {
            seen_clone.lock().push(store_clone.snapshot().ptr_eq(seq));
        });

        store.add_layer(LayerKind::Image, &FieldRecord::new("i1"));
        assert_eq!(*seen.lock(), vec![true]);
    }

    #[test]
    fn test_mutation_inside_subscriber_is_delivered_after_current_round() {
        let store = LayerStore::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let store_clone = store.clone();
        let first_log = log.clone();
        store.subscribe(move |seq| {
            first_log.lock().push(("first", seq.len()));
            if seq.len() == 1 {
                store_clone.add_layer(LayerKind::Text, &FieldRecord::new("t2"));
            }
        });
        let second_log = log.clone();
        store.subscribe(move |seq| second_log.lock().push(("second", seq.len())));

        store.add_layer(LayerKind::Text, &FieldRecord::new("t1"));

        assert_eq!(store.len(), 2);
        assert_eq!(
            *log.lock(),
            vec![("first", 1), ("second", 1), ("first", 2), ("second", 2)]
        );
    }

    #[test]
    fn test_every_subscriber_ends_on_current_state() {
        let store = LayerStore::new();
        let last_seen = Arc::new(Mutex::new(None));

        let store_clone = store.clone();
        let filler = store.subscribe(move |seq| {
            if seq.len() < 3 {
                let field = FieldRecord::new(format!("i{}", seq.len()));
                store_clone.add_layer(LayerKind::Image, &field);
            }
        });
        let last_clone = last_seen.clone();
        store.subscribe(move |seq| *last_clone.lock() = Some(seq.len()));

        store.clear_layers();
        assert_eq!(store.len(), 3);
        assert_eq!(*last_seen.lock(), Some(store.len()));

        // Round finished; later mutations notify normally
        store.unsubscribe(filler);
        store.remove_layer(&id("i0"));
        assert_eq!(*last_seen.lock(), Some(2));
    }

    #[test]
    fn test_independent_stores_do_not_share_state() {
        let first = abc_store();
        let second = LayerStore::new();
        assert_eq!(first.len(), 3);
        assert!(second.is_empty());

        let handle = first.clone();
        handle.clear_layers();
        assert!(first.is_empty());
    }
}
