#![forbid(unsafe_code)]

//! Snapshot observers.
//!
//! Subscribers are stored as `Weak` callbacks and pruned lazily during
//! notification. The [`Subscription`] guard owns the strong reference, so
//! dropping it unsubscribes before the next notification cycle.
//!
//! # Invariants
//!
//! 1. Subscribers are notified in registration order.
//! 2. A callback registered during a notification is first called on the
//!    next one.
//! 3. No `RefCell` borrow is held while a callback runs.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use modstack_core::ModalStack;

type Callback = dyn Fn(&ModalStack);

/// RAII guard for a snapshot subscriber. Dropping it unsubscribes.
#[must_use = "dropping this guard unsubscribes immediately"]
pub struct Subscription {
    _callback: Rc<Callback>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// Ordered list of weakly held snapshot callbacks.
#[derive(Default)]
pub(crate) struct Subscribers {
    callbacks: RefCell<Vec<Weak<Callback>>>,
}

impl Subscribers {
    pub(crate) fn subscribe(&self, callback: impl Fn(&ModalStack) + 'static) -> Subscription {
        let strong: Rc<Callback> = Rc::new(callback);
        self.callbacks.borrow_mut().push(Rc::downgrade(&strong));
        Subscription { _callback: strong }
    }

    /// Call every live subscriber with `stack`.
    pub(crate) fn notify(&self, stack: &ModalStack) {
        let live: Vec<Rc<Callback>> = {
            let mut callbacks = self.callbacks.borrow_mut();
            callbacks.retain(|weak| weak.strong_count() > 0);
            callbacks.iter().filter_map(Weak::upgrade).collect()
        };
        for callback in live {
            callback(stack);
        }
    }

    /// Number of live subscribers.
    pub(crate) fn len(&self) -> usize {
        self.callbacks
            .borrow()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}
