use futures::channel::mpsc;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::schemas::Group;

type Registry = HashMap<String, Vec<mpsc::UnboundedSender<Group>>>;

/// In-process registry of live group viewers. Handlers publish the updated
/// document after every group write; each subscriber holds the receiving end
/// of a channel and is dropped from the registry once its receiver is gone.
#[derive(Default)]
pub struct GroupWatch {
    subscribers: Mutex<Registry>,
}

impl GroupWatch {
    pub fn new() -> Self {
        GroupWatch::default()
    }

    /// Registers a viewer for one group. Dropping the receiver unsubscribes;
    /// the dead sender is pruned on the next publish.
    pub fn subscribe(&self, group_id: &str) -> mpsc::UnboundedReceiver<Group> {
        let (sender, receiver) = mpsc::unbounded();
        self.lock_registry()
            .entry(group_id.to_string())
            .or_default()
            .push(sender);
        receiver
    }

    /// Delivers the latest snapshot to every live viewer of the group.
    pub fn publish(&self, group: &Group) {
        let mut subscribers = self.lock_registry();
        if let Some(viewers) = subscribers.get_mut(&group.id) {
            viewers.retain(|sender| sender.unbounded_send(group.clone()).is_ok());
            if viewers.is_empty() {
                subscribers.remove(&group.id);
            }
        }
    }

    // The registry stays usable even if a holder of the lock panicked; the
    // map of senders is valid at every point it can be observed.
    fn lock_registry(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[cfg(test)]
    fn viewer_count(&self, group_id: &str) -> usize {
        self.lock_registry().get(group_id).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use futures::stream::{self, StreamExt};
    use std::collections::HashMap;

    fn group(id: &str, name: &str) -> Group {
        Group {
            id: id.into(),
            name: name.into(),
            members: vec!["u1".into()],
            created_by: "u1".into(),
            invite_code: "AB12CD".into(),
            selected_vendor: None,
            member_orders: HashMap::new(),
            order_status: None,
            created_at: Utc::now(),
        }
    }

    #[actix_web::test]
    async fn subscribers_receive_each_published_snapshot() {
        let watch = GroupWatch::new();
        let mut receiver = watch.subscribe("g1");
        watch.publish(&group("g1", "first"));
        watch.publish(&group("g1", "second"));
        assert_eq!(receiver.next().await.unwrap().name, "first");
        assert_eq!(receiver.next().await.unwrap().name, "second");
    }

    #[actix_web::test]
    async fn snapshots_only_reach_viewers_of_that_group() {
        let watch = GroupWatch::new();
        let mut one = watch.subscribe("g1");
        let mut other = watch.subscribe("g2");
        watch.publish(&group("g1", "lunch"));
        assert_eq!(one.next().await.unwrap().id, "g1");
        drop(watch);
        assert!(other.next().await.is_none());
    }

    #[actix_web::test]
    async fn dropped_viewers_are_pruned_on_publish() {
        let watch = GroupWatch::new();
        let receiver = watch.subscribe("g1");
        assert_eq!(watch.viewer_count("g1"), 1);
        drop(receiver);
        watch.publish(&group("g1", "lunch"));
        assert_eq!(watch.viewer_count("g1"), 0);
    }

    #[actix_web::test]
    async fn writes_between_subscribe_and_opening_snapshot_are_kept() {
        // The live endpoint registers first, then reads the opening
        // snapshot; a write in between must reach the viewer.
        let watch = GroupWatch::new();
        let updates = watch.subscribe("g1");
        watch.publish(&group("g1", "renamed"));
        let opening = group("g1", "original-name");
        let mut events = std::pin::pin!(stream::once(async move { opening }).chain(updates));
        assert_eq!(events.next().await.unwrap().name, "original-name");
        assert_eq!(events.next().await.unwrap().name, "renamed");
    }

    #[test]
    fn registry_survives_a_poisoned_lock() {
        let watch = std::sync::Arc::new(GroupWatch::new());
        let poisoner = std::sync::Arc::clone(&watch);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.subscribers.lock().unwrap();
            panic!("holder dies with the lock");
        })
        .join();

        let mut receiver = watch.subscribe("g1");
        watch.publish(&group("g1", "lunch"));
        assert_eq!(receiver.try_next().unwrap().unwrap().name, "lunch");
    }
}
