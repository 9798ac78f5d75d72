use {
    crate::domain::id::IdempotencyKey,
    crate::domain::idempotency::{GuardFuture, IdempotencyGuard},
    std::collections::{HashSet, VecDeque},
    std::sync::{Mutex, MutexGuard},
};

pub const DEFAULT_MAX_ENTRIES: usize = 1000;
pub const DEFAULT_EVICT_COUNT: usize = 500;

#[derive(Debug, Default)]
struct KeySet {
    members: HashSet<IdempotencyKey>,
    order: VecDeque<IdempotencyKey>,
}

/// Process-local guard. Once the set grows past `max_entries`, the oldest
/// `evict_count` keys (by insertion, not by access) are dropped.
#[derive(Debug)]
pub struct InMemoryGuard {
    keys: Mutex<KeySet>,
    max_entries: usize,
    evict_count: usize,
}

impl Default for InMemoryGuard {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES, DEFAULT_EVICT_COUNT)
    }
}

impl InMemoryGuard {
    pub fn new(max_entries: usize, evict_count: usize) -> Self {
        Self {
            keys: Mutex::new(KeySet::default()),
            max_entries,
            evict_count: evict_count.max(1),
        }
    }

    pub fn contains(&self, key: &IdempotencyKey) -> bool {
        self.lock().members.contains(key)
    }

    /// Adds `key`; `false` if it was already present.
    pub fn insert(&self, key: IdempotencyKey) -> bool {
        let mut keys = self.lock();

        if !keys.members.insert(key.clone()) {
            return false;
        }
        keys.order.push_back(key);

        if keys.members.len() > self.max_entries {
            for _ in 0..self.evict_count {
                let Some(oldest) = keys.order.pop_front() else {
                    break;
                };
                keys.members.remove(&oldest);
            }
            tracing::debug!(
                remaining = keys.members.len(),
                "evicted oldest idempotency keys"
            );
        }
        true
    }

    pub fn remove(&self, key: &IdempotencyKey) {
        let mut keys = self.lock();
        if keys.members.remove(key) {
            keys.order.retain(|k| k != key);
        }
    }

    fn lock(&self) -> MutexGuard<'_, KeySet> {
        match self.keys.lock() {
            Ok(keys) => keys,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl IdempotencyGuard for InMemoryGuard {
    fn has_processed(&self, key: &IdempotencyKey) -> GuardFuture<'_, bool> {
        let seen = self.contains(key);
        Box::pin(async move { Ok(seen) })
    }

    fn claim(&self, key: &IdempotencyKey) -> GuardFuture<'_, bool> {
        let won = self.insert(key.clone());
        Box::pin(async move { Ok(won) })
    }

    fn release(&self, key: &IdempotencyKey) -> GuardFuture<'_, ()> {
        self.remove(key);
        Box::pin(async move { Ok(()) })
    }
}
