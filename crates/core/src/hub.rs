//! Generic fan-out broadcaster shared by the jobs hub (C2) and the chat hub
//! (C7): each subscriber gets its own unbounded channel; a dead receiver is
//! pruned the next time something is broadcast to it (§4.2, §9 "broadcast
//! hub semantics").

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

pub struct Hub<E: Clone> {
    subscribers: Mutex<HashMap<Uuid, UnboundedSender<E>>>,
}

impl<E: Clone> Hub<E> {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
        }
    }

    pub fn subscribe(&self) -> (Uuid, UnboundedReceiver<E>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        self.subscribers.lock().unwrap().insert(id, tx);
        (id, rx)
    }

    /// Registers a subscriber whose very first observed event is `init`,
    /// sent before the sender is reachable from [`Hub::broadcast`].
    pub fn subscribe_with_init(&self, init: E) -> (Uuid, UnboundedReceiver<E>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(init);
        let id = Uuid::new_v4();
        self.subscribers.lock().unwrap().insert(id, tx);
        (id, rx)
    }

    pub fn unsubscribe(&self, id: Uuid) {
        self.subscribers.lock().unwrap().remove(&id);
    }

    /// Writes `event` to every live subscriber; sinks whose receiver has
    /// been dropped are pruned on this pass (write-then-flush, best-effort).
    pub fn broadcast(&self, event: E) {
        let mut subs = self.subscribers.lock().unwrap();
        subs.retain(|_, tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap().len()
    }
}

impl<E: Clone> Default for Hub<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_with_init_arrives_before_later_broadcasts() {
        let hub: Hub<i32> = Hub::new();
        let (_id, mut rx) = hub.subscribe_with_init(0);
        hub.broadcast(1);
        hub.broadcast(2);

        assert_eq!(rx.try_recv().unwrap(), 0);
        assert_eq!(rx.try_recv().unwrap(), 1);
        assert_eq!(rx.try_recv().unwrap(), 2);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let hub: Hub<i32> = Hub::new();
        let (id, mut rx) = hub.subscribe();
        hub.unsubscribe(id);
        hub.broadcast(42);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dead_receiver_is_pruned_on_broadcast() {
        let hub: Hub<i32> = Hub::new();
        let (_id, rx) = hub.subscribe();
        drop(rx);
        assert_eq!(hub.subscriber_count(), 1);
        hub.broadcast(1);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn fans_out_to_multiple_subscribers() {
        let hub: Hub<i32> = Hub::new();
        let (_id1, mut rx1) = hub.subscribe();
        let (_id2, mut rx2) = hub.subscribe();
        hub.broadcast(7);
        assert_eq!(rx1.try_recv().unwrap(), 7);
        assert_eq!(rx2.try_recv().unwrap(), 7);
    }
}
