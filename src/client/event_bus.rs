//! Per-connection publish/subscribe registry.
//!
//! Listeners are registered per event kind and invoked synchronously in
//! registration order. A panicking listener is logged and skipped; the
//! remaining listeners still run.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};

use super::events::{ChatEvent, ChatEventKind};

/// A subscriber callback. Registration and removal go by `Arc` identity.
pub type Listener = Arc<dyn Fn(&ChatEvent) + Send + Sync>;

/// Event bus owned by one `ChatConnectionManager`.
#[derive(Default)]
pub struct EventBus {
    listeners: Mutex<HashMap<ChatEventKind, Vec<Listener>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `listener` to `kind`. Returns the listener so closures can be
    /// registered inline and removed later.
    pub fn on(&self, kind: ChatEventKind, listener: Listener) -> Listener {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(kind)
            .or_default()
            .push(listener.clone());
        listener
    }

    /// Unsubscribe `listener` from `kind`. Returns false if it was not
    /// registered.
    pub fn off(&self, kind: ChatEventKind, listener: &Listener) -> bool {
        let mut listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(list) = listeners.get_mut(&kind) else {
            return false;
        };
        match list.iter().position(|l| same_listener(l, listener)) {
            Some(index) => {
                list.remove(index);
                true
            }
            None => false,
        }
    }

    /// Deliver `event` to every listener of its kind.
    pub fn emit(&self, event: &ChatEvent) {
        let kind = event.kind();
        // Snapshot so listeners may subscribe or unsubscribe while running.
        let snapshot: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .cloned()
            .unwrap_or_default();

        for listener in snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                tracing::error!(event = %kind, "chat event listener panicked");
            }
        }
    }

    /// Number of listeners registered for `kind`.
    pub fn listener_count(&self, kind: ChatEventKind) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

fn same_listener(a: &Listener, b: &Listener) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}
