use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::warn;

use crate::Snapshot;

/// Receives the mirrored hierarchy from a [`HierarchySync`](crate::HierarchySync).
///
/// Called once on registration and again after every refresh which changed the hierarchy.
pub trait HierarchyConsumer {
    fn set_hierarchy(&mut self, snapshot: Snapshot);
}

/// Keeps only the latest snapshot.
impl HierarchyConsumer for Option<Snapshot> {
    fn set_hierarchy(&mut self, snapshot: Snapshot) {
        *self = Some(snapshot);
    }
}

/// Shared handle the engine keeps for a registered consumer.
pub type SharedConsumer = Rc<RefCell<dyn HierarchyConsumer>>;

/// Registered consumers in registration order.
///
/// A plain list: registering a consumer twice delivers to it twice.
#[derive(Default)]
pub struct Consumers {
    list: Vec<SharedConsumer>,
}

impl fmt::Debug for Consumers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumers")
            .field("len", &self.list.len())
            .finish()
    }
}

impl Consumers {
    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn push(&mut self, consumer: SharedConsumer) {
        self.list.push(consumer);
    }

    /// Remove the first registration of `consumer`.
    pub fn remove<C>(&mut self, consumer: &Rc<RefCell<C>>) -> bool
    where
        C: HierarchyConsumer + ?Sized,
    {
        let position = self
            .list
            .iter()
            .position(|registered| std::ptr::addr_eq(Rc::as_ptr(registered), Rc::as_ptr(consumer)));
        position.map(|position| self.list.remove(position)).is_some()
    }

    /// Hand `snapshot` to every consumer.
    ///
    /// Returns the amount of consumers that received it.
    pub fn deliver(&self, snapshot: &Snapshot) -> usize {
        self.list
            .iter()
            .filter(|consumer| deliver(consumer, snapshot))
            .count()
    }
}

/// Hand `snapshot` to a single consumer.
///
/// A consumer that is borrowed right now (for example because it triggered the refresh itself) is skipped.
/// Returns whether the consumer received the snapshot.
pub fn deliver(consumer: &SharedConsumer, snapshot: &Snapshot) -> bool {
    let Ok(mut consumer) = consumer.try_borrow_mut() else {
        warn!(
            generation = snapshot.generation(),
            "consumer is borrowed during delivery, skipping it"
        );
        return false;
    };
    consumer.set_hierarchy(snapshot.clone());
    true
}

#[test]
fn remove_only_drops_first_registration() {
    let latest: Rc<RefCell<Option<Snapshot>>> = Rc::new(RefCell::new(None));
    let mut consumers = Consumers::default();
    consumers.push(latest.clone());
    consumers.push(latest.clone());
    assert_eq!(consumers.len(), 2);

    assert!(consumers.remove(&latest));
    assert_eq!(consumers.len(), 1);
    assert!(consumers.remove(&latest));
    assert!(!consumers.remove(&latest));
    assert_eq!(consumers.len(), 0);
}

#[test]
fn borrowed_consumer_is_skipped() {
    let latest: Rc<RefCell<Option<Snapshot>>> = Rc::new(RefCell::new(None));
    let shared: SharedConsumer = latest.clone();
    let guard = latest.borrow();
    assert!(!deliver(&shared, &Snapshot::default()));
    assert!(guard.is_none());
    drop(guard);

    assert!(deliver(&shared, &Snapshot::default()));
    assert!(latest.borrow().is_some());
}
