//! In-flight guard for (entry, identity) pairs.
//!
//! A pair holds at most one guard at a time. Reconcile calls skip a busy
//! pair with [`InFlightSet::try_acquire`]; unlink handling waits for it with
//! [`InFlightSet::acquire`]. Dropping the guard releases the pair and wakes
//! every waiter.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::Notify;
use uuid::Uuid;

use super::types::SyncKind;

/// Key of one reconciled pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PairKey {
    pub kind: SyncKind,
    pub entry: String,
    pub player: Uuid,
}

impl PairKey {
    pub fn new(kind: SyncKind, entry: String, player: Uuid) -> Self {
        Self {
            kind,
            entry,
            player,
        }
    }
}

/// Set of keys currently being worked on.
#[derive(Debug)]
pub struct InFlightSet<K: Eq + Hash> {
    inner: Arc<DashMap<K, Arc<Notify>>>,
}

impl<K: Eq + Hash> Clone for InFlightSet<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K: Eq + Hash> Default for InFlightSet<K> {
    fn default() -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone> InFlightSet<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key`, or `None` if it is already held.
    pub fn try_acquire(&self, key: K) -> Option<InFlightGuard<K>> {
        match self.inner.entry(key.clone()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Notify::new()));
                Some(self.guard(key))
            }
        }
    }

    /// Claim `key`, waiting for the current holder to release it.
    pub async fn acquire(&self, key: K) -> InFlightGuard<K> {
        loop {
            let notify = match self.inner.entry(key.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(Arc::new(Notify::new()));
                    return self.guard(key);
                }
                Entry::Occupied(held) => Arc::clone(held.get()),
            };

            let notified = notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            // The holder may have released between the lookup and `enable`.
            let still_held = self
                .inner
                .get(&key)
                .is_some_and(|current| Arc::ptr_eq(current.value(), &notify));
            if still_held {
                notified.await;
            }
        }
    }

    pub fn is_held(&self, key: &K) -> bool {
        self.inner.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn guard(&self, key: K) -> InFlightGuard<K> {
        InFlightGuard {
            set: Arc::clone(&self.inner),
            key,
        }
    }
}

/// Releases its key on drop.
#[derive(Debug)]
pub struct InFlightGuard<K: Eq + Hash> {
    set: Arc<DashMap<K, Arc<Notify>>>,
    key: K,
}

impl<K: Eq + Hash> Drop for InFlightGuard<K> {
    fn drop(&mut self) {
        if let Some((_, notify)) = self.set.remove(&self.key) {
            notify.notify_waiters();
        }
    }
}
