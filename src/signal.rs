//! Latest-value cell with synchronous, ordered delivery to subscribers.

use std::fmt;

/// Handle returned by `subscribe`, used to deregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback<T> = Box<dyn FnMut(&T)>;

pub struct Publisher<T> {
    latest: T,
    next_id: u64,
    subscribers: Vec<(SubscriptionId, Callback<T>)>,
}

impl<T> Publisher<T> {
    pub fn new(initial: T) -> Self {
        Self {
            latest: initial,
            next_id: 0,
            subscribers: Vec::new(),
        }
    }

    pub fn latest(&self) -> &T {
        &self.latest
    }

    /// Register `callback` and hand it the current value before returning.
    pub fn subscribe(&mut self, mut callback: impl FnMut(&T) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        callback(&self.latest);
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Returns false when `id` was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    /// Store `value` and deliver it to every subscriber in registration order.
    pub fn publish(&mut self, value: T) {
        self.latest = value;
        for (_, callback) in self.subscribers.iter_mut() {
            callback(&self.latest);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl<T: fmt::Debug> fmt::Debug for Publisher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher")
            .field("latest", &self.latest)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::Publisher;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn subscribe_replays_latest_value() {
        let mut publisher = Publisher::new(7);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        publisher.subscribe(move |v| sink.borrow_mut().push(*v));
        assert_eq!(*seen.borrow(), vec![7]);
    }

    #[test]
    fn publish_delivers_in_registration_order() {
        let mut publisher = Publisher::new(0);
        let log = Rc::new(RefCell::new(Vec::new()));
        for name in ["first", "second", "third"] {
            let log = Rc::clone(&log);
            publisher.subscribe(move |v| log.borrow_mut().push(format!("{name}:{v}")));
        }
        log.borrow_mut().clear();

        publisher.publish(1);
        assert_eq!(*log.borrow(), vec!["first:1", "second:1", "third:1"]);
    }

    #[test]
    fn unsubscribed_callbacks_stop_receiving() {
        let mut publisher = Publisher::new(0);
        let count = Rc::new(RefCell::new(0));
        let c = Rc::clone(&count);
        let id = publisher.subscribe(move |_| *c.borrow_mut() += 1);

        assert!(publisher.unsubscribe(id));
        assert!(!publisher.unsubscribe(id));
        publisher.publish(5);
        assert_eq!(*count.borrow(), 1);
        assert_eq!(publisher.subscriber_count(), 0);
        assert_eq!(*publisher.latest(), 5);
    }
}
