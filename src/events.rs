/// Typed event channel with explicit unsubscribe tokens
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Handle returned by `Event::subscribe`, used to unsubscribe later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerToken(u64);

struct Listeners<T> {
    next_id: Cell<u64>,
    callbacks: RefCell<Vec<(u64, Rc<dyn Fn(&T)>)>>,
}

/// A single typed event. Clones share the same listener list, so an event can
/// be handed to a JS callback and still be subscribed to from Rust.
pub struct Event<T> {
    inner: Rc<Listeners<T>>,
}

impl<T> Event<T> {
    pub fn new() -> Self {
        Event {
            inner: Rc::new(Listeners {
                next_id: Cell::new(0),
                callbacks: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> ListenerToken {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner
            .callbacks
            .borrow_mut()
            .push((id, Rc::new(callback)));
        ListenerToken(id)
    }

    /// Returns false if the token was already removed
    pub fn unsubscribe(&self, token: ListenerToken) -> bool {
        let mut callbacks = self.inner.callbacks.borrow_mut();
        let original_len = callbacks.len();
        callbacks.retain(|(id, _)| *id != token.0);
        callbacks.len() < original_len
    }

    pub fn emit(&self, value: &T) {
        // Snapshot so listeners may subscribe or unsubscribe while being called
        let snapshot: Vec<Rc<dyn Fn(&T)>> = self
            .inner
            .callbacks
            .borrow()
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();

        for callback in snapshot {
            callback(value);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.callbacks.borrow().len()
    }
}

impl<T> Clone for Event<T> {
    fn clone(&self) -> Self {
        Event {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Default for Event<T> {
    fn default() -> Self {
        Self::new()
    }
}
