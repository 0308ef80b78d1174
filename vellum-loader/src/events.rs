use crossbeam_channel::{Receiver, Sender};
use vellum_base::hashing::HashMap;
use vellum_base::{ContentId, LibraryRecord};

/// Notifications published for named loading processes.
#[derive(Clone, Debug)]
pub enum LibraryEvent {
    /// One item of the named process finished, whether from cache or from a
    /// loader. Fired in result-arrival order, not request order.
    ResourceProgress {
        name: String,
        fraction: f32,
        num_completed: usize,
        total: usize,
    },
    /// The named process completed; carries the result set.
    ResourceLoadingCompleted {
        name: String,
        records: HashMap<ContentId, LibraryRecord>,
    },
}

/// Fans library events out to any number of subscribers.
#[derive(Default)]
pub struct EventPublisher {
    subscribers: Vec<Sender<LibraryEvent>>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn subscribe(&mut self) -> Receiver<LibraryEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    pub fn publish(
        &mut self,
        event: LibraryEvent,
    ) {
        // disconnected subscribers are pruned as they are discovered
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn check_publish_reaches_every_subscriber() {
        let mut publisher = EventPublisher::new();
        let first = publisher.subscribe();
        let second = publisher.subscribe();

        publisher.publish(LibraryEvent::ResourceProgress {
            name: "batch".to_string(),
            fraction: 1.0,
            num_completed: 1,
            total: 1,
        });

        assert_eq!(first.try_iter().count(), 1);
        assert_eq!(second.try_iter().count(), 1);
    }

    #[test]
    fn check_disconnected_subscribers_are_pruned() {
        let mut publisher = EventPublisher::new();
        let first = publisher.subscribe();
        drop(publisher.subscribe());

        publisher.publish(LibraryEvent::ResourceProgress {
            name: "batch".to_string(),
            fraction: 1.0,
            num_completed: 1,
            total: 1,
        });

        assert_eq!(publisher.subscribers.len(), 1);
        assert_eq!(first.try_iter().count(), 1);
    }
}
