use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;

enum Slot<V: Clone, E: Clone> {
    Pending(Shared<BoxFuture<'static, Result<V, E>>>),
    Ready(V),
}

/// Keyed populate-once cells
///
/// The first caller for a key installs a shared pending future. Every caller arriving while it runs awaits the same
/// future, so the initializer runs at most once per successful population. Failures are not stored; the next
/// caller starts over.
///
/// A caller only ever settles the slot of the future it awaited. A stored value is never replaced.
pub(crate) struct OnceSlots<V: Clone, E: Clone> {
    slots: Mutex<HashMap<String, Slot<V, E>>>,
}

impl<V, E> Default for OnceSlots<V, E>
where
    V: Clone,
    E: Clone,
{
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<V, E> OnceSlots<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub(crate) fn get(&self, key: &str) -> Option<V> {
        match self.slots.lock().get(key) {
            Some(Slot::Ready(value)) => Some(value.clone()),
            _ => None,
        }
    }

    pub(crate) fn is_pending(&self, key: &str) -> bool {
        matches!(self.slots.lock().get(key), Some(Slot::Pending(_)))
    }

    pub(crate) async fn get_or_init<F>(&self, key: &str, init: F) -> Result<V, E>
    where
        F: FnOnce() -> BoxFuture<'static, Result<V, E>>,
    {
        let pending = {
            let mut slots = self.slots.lock();
            match slots.get(key) {
                Some(Slot::Ready(value)) => return Ok(value.clone()),
                Some(Slot::Pending(pending)) => pending.clone(),
                None => {
                    let pending = init().shared();
                    slots.insert(key.to_string(), Slot::Pending(pending.clone()));
                    pending
                }
            }
        };

        // a completed `Shared` no longer compares equal, keep an untouched handle
        let awaited = pending.clone();
        let result = pending.await;

        let mut slots = self.slots.lock();
        let own = match slots.get(key) {
            Some(Slot::Ready(value)) => return Ok(value.clone()),
            Some(Slot::Pending(current)) => current.ptr_eq(&awaited),
            None => false,
        };
        if own {
            match &result {
                Ok(value) => {
                    slots.insert(key.to_string(), Slot::Ready(value.clone()));
                }
                Err(_) => {
                    slots.remove(key);
                }
            }
        }

        result
    }

    pub(crate) fn clear(&self) {
        self.slots.lock().clear();
    }
}
