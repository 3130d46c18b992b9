use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::types::UserProfile;

/// Notifications shared between otherwise independent components.
#[derive(Clone, Debug, PartialEq)]
pub enum AppEvent {
    ProfileUpdated {
        profile: UserProfile,
        previous_balance: f64,
    },
    UserLoggedIn {
        profile: UserProfile,
        token: String,
    },
}

type Handler = Rc<dyn Fn(&AppEvent)>;

#[derive(Default)]
struct Registry {
    next_id: Cell<u64>,
    handlers: RefCell<Vec<(u64, Handler)>>,
}

/// Single-threaded pub/sub bus. Clones share subscribers.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Rc<Registry>,
}

/// Live subscription; dropping it unsubscribes.
#[must_use = "dropping a Subscription immediately unsubscribes it"]
pub struct Subscription {
    id: u64,
    registry: Weak<Registry>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.handlers.borrow_mut().retain(|(id, _)| *id != self.id);
        }
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, handler: impl Fn(&AppEvent) + 'static) -> Subscription {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner
            .handlers
            .borrow_mut()
            .push((id, Rc::new(handler)));
        Subscription {
            id,
            registry: Rc::downgrade(&self.inner),
        }
    }

    pub fn unsubscribe(&self, id: u64) {
        self.inner.handlers.borrow_mut().retain(|(h, _)| *h != id);
    }

    /// Deliver to every current subscriber. The handler list is snapshotted
    /// first so handlers may unsubscribe (or drop their guard) while running.
    pub fn emit(&self, event: &AppEvent) {
        let handlers: Vec<Handler> = self
            .inner
            .handlers
            .borrow()
            .iter()
            .map(|(_, h)| h.clone())
            .collect();
        for handler in handlers {
            handler(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.handlers.borrow().len()
    }
}
