//! One-shot lifecycle events
//!
//! A milestone is reached at most once. Observers attached before that are
//! queued and handed back in registration order when it is reached; observers
//! attached afterwards are handed back immediately with the stored value. A
//! milestone that can no longer be reached is closed and drops its observers.
//!
//! Observers are returned to the caller instead of being invoked here so the
//! caller can release any borrow on the owning state first.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::mem;

pub(crate) type Observer<T> = Box<dyn FnOnce(T)>;

pub(crate) enum Milestone<T> {
    Pending(Vec<Observer<T>>),
    Reached(T),
    Closed,
}

impl<T: Copy> Milestone<T> {
    pub(crate) fn new() -> Self {
        Milestone::Pending(Vec::new())
    }

    /// Queue an observer, or hand it back with the value if already reached
    pub(crate) fn observe(&mut self, observer: Observer<T>) -> Option<(Observer<T>, T)> {
        match self {
            Milestone::Pending(observers) => {
                observers.push(observer);
                None
            }
            Milestone::Reached(value) => Some((observer, *value)),
            Milestone::Closed => None,
        }
    }

    /// Mark the milestone reached and take the queued observers
    ///
    /// Returns nothing if it was already reached or closed.
    pub(crate) fn reach(&mut self, value: T) -> Vec<Observer<T>> {
        match self {
            Milestone::Pending(observers) => {
                let observers = mem::take(observers);
                *self = Milestone::Reached(value);
                observers
            }
            Milestone::Reached(_) | Milestone::Closed => Vec::new(),
        }
    }

    /// Give up on a pending milestone
    pub(crate) fn close(&mut self) {
        if let Milestone::Pending(_) = self {
            *self = Milestone::Closed;
        }
    }

    pub(crate) fn value(&self) -> Option<T> {
        match self {
            Milestone::Reached(value) => Some(*value),
            Milestone::Pending(_) | Milestone::Closed => None,
        }
    }
}

/// Invoke observers in registration order
pub(crate) fn notify<T: Copy>(observers: Vec<Observer<T>>, value: T) {
    for observer in observers {
        observer(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use alloc::vec;
    use core::cell::RefCell;

    fn recorder(log: &Rc<RefCell<Vec<(u8, u32)>>>, tag: u8) -> Observer<u32> {
        let log = Rc::clone(log);
        Box::new(move |value| log.borrow_mut().push((tag, value)))
    }

    #[test]
    fn test_milestone_queues_until_reached() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut milestone = Milestone::new();

        assert!(milestone.observe(recorder(&log, 1)).is_none());
        assert!(milestone.observe(recorder(&log, 2)).is_none());
        assert_eq!(milestone.value(), None);
        assert!(log.borrow().is_empty());

        notify(milestone.reach(7), 7);
        assert_eq!(*log.borrow(), vec![(1, 7), (2, 7)]);
        assert_eq!(milestone.value(), Some(7));
    }

    #[test]
    fn test_milestone_reached_only_once() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut milestone = Milestone::new();
        milestone.observe(recorder(&log, 1));

        notify(milestone.reach(1), 1);
        let again = milestone.reach(2);
        assert!(again.is_empty());
        assert_eq!(milestone.value(), Some(1));
        assert_eq!(*log.borrow(), vec![(1, 1)]);
    }

    #[test]
    fn test_milestone_late_observer_gets_value() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut milestone = Milestone::new();
        milestone.reach(3);

        let (observer, value) = milestone.observe(recorder(&log, 9)).unwrap();
        observer(value);
        assert_eq!(*log.borrow(), vec![(9, 3)]);
    }

    #[test]
    fn test_milestone_closed_drops_observers() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut milestone = Milestone::new();
        milestone.observe(recorder(&log, 1));

        milestone.close();
        assert!(milestone.observe(recorder(&log, 2)).is_none());
        assert!(milestone.reach(5).is_empty());
        assert_eq!(milestone.value(), None);
        assert!(log.borrow().is_empty());
        // The observer queue itself was dropped
        assert_eq!(Rc::strong_count(&log), 1);
    }

    #[test]
    fn test_milestone_close_after_reach_keeps_value() {
        let mut milestone: Milestone<u32> = Milestone::new();
        milestone.reach(4);
        milestone.close();
        assert_eq!(milestone.value(), Some(4));
    }
}
