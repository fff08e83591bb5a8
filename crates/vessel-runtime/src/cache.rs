use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, RwLock};

use vessel_types::TypeKey;

/// What the cache knows about one key.
///
/// `Missing` is a positive "known absent" marker: the store was consulted
/// and holds no record for the key, so the next read or delete can skip the
/// store entirely. A key with no slot at all has simply never been looked
/// at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheSlot {
    /// The store is known to hold no record for this key.
    Missing,
    /// The encoded payload currently stored for this key.
    Present(Vec<u8>),
}

impl CacheSlot {
    /// The payload, or `None` for a known-absent key.
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            CacheSlot::Missing => None,
            CacheSlot::Present(bytes) => Some(bytes),
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            CacheSlot::Missing => None,
            CacheSlot::Present(bytes) => Some(bytes),
        }
    }
}

/// Cache of encoded payloads keyed by [`TypeKey`].
///
/// Implementations must be safe for concurrent use. The vessel keeps the
/// cache write-through: every store mutation updates the corresponding
/// slot, so a populated slot always reflects the store.
pub trait VesselCache: Send + Sync {
    /// Number of slots currently cached.
    fn len(&self) -> usize;

    /// Look up the slot for `key`.
    fn get(&self, key: &TypeKey) -> Option<CacheSlot>;

    /// Install or overwrite the slot for `key`.
    fn insert(&self, key: TypeKey, slot: CacheSlot);

    /// Drop the slot for `key`, if any.
    fn remove(&self, key: &TypeKey);

    /// Drop every slot.
    fn clear(&self);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Unbounded cache with no eviction. Slots stay resident until the vessel
/// is cleared or the process exits.
#[derive(Default)]
pub struct DefaultCache {
    slots: RwLock<HashMap<TypeKey, CacheSlot>>,
}

impl DefaultCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VesselCache for DefaultCache {
    fn len(&self) -> usize {
        self.slots.read().expect("lock poisoned").len()
    }

    fn get(&self, key: &TypeKey) -> Option<CacheSlot> {
        self.slots.read().expect("lock poisoned").get(key).cloned()
    }

    fn insert(&self, key: TypeKey, slot: CacheSlot) {
        self.slots.write().expect("lock poisoned").insert(key, slot);
    }

    fn remove(&self, key: &TypeKey) {
        self.slots.write().expect("lock poisoned").remove(key);
    }

    fn clear(&self) {
        self.slots.write().expect("lock poisoned").clear();
    }
}

struct LruInner {
    slots: HashMap<TypeKey, CacheSlot>,
    // Front is least recently used, back is most recent.
    order: VecDeque<TypeKey>,
}

/// Capacity-bounded cache. Inserting into a full cache evicts the least
/// recently used key.
pub struct LruCache {
    capacity: usize,
    inner: Mutex<LruInner>,
}

impl LruCache {
    /// A cache holding at most `capacity` slots. Zero capacity stores
    /// nothing.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(LruInner {
                slots: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    fn touch(inner: &mut LruInner, key: &TypeKey) {
        inner.order.retain(|k| k != key);
        inner.order.push_back(key.clone());
    }
}

impl VesselCache for LruCache {
    fn len(&self) -> usize {
        self.inner.lock().expect("lock poisoned").slots.len()
    }

    fn get(&self, key: &TypeKey) -> Option<CacheSlot> {
        let mut inner = self.inner.lock().expect("lock poisoned");
        let slot = inner.slots.get(key).cloned();
        if slot.is_some() {
            Self::touch(&mut inner, key);
        }
        slot
    }

    fn insert(&self, key: TypeKey, slot: CacheSlot) {
        if self.capacity == 0 {
            return;
        }
        let mut inner = self.inner.lock().expect("lock poisoned");
        Self::touch(&mut inner, &key);
        inner.slots.insert(key, slot);

        if inner.slots.len() > self.capacity {
            if let Some(evicted) = inner.order.pop_front() {
                inner.slots.remove(&evicted);
            }
        }
    }

    fn remove(&self, key: &TypeKey) {
        let mut inner = self.inner.lock().expect("lock poisoned");
        inner.order.retain(|k| k != key);
        inner.slots.remove(key);
    }

    fn clear(&self) {
        let mut inner = self.inner.lock().expect("lock poisoned");
        inner.slots.clear();
        inner.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(n: u8) -> TypeKey {
        TypeKey::from_name(format!("test::Type{n}")).unwrap()
    }

    // -----------------------------------------------------------------------
    // DefaultCache
    // -----------------------------------------------------------------------

    #[test]
    fn default_cache_stores_and_overwrites() {
        let cache = DefaultCache::new();
        cache.insert(key(1), CacheSlot::Present(vec![1]));
        cache.insert(key(1), CacheSlot::Missing);

        assert_eq!(cache.get(&key(1)), Some(CacheSlot::Missing));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn default_cache_remove_and_clear() {
        let cache = DefaultCache::new();
        cache.insert(key(1), CacheSlot::Present(vec![1]));
        cache.insert(key(2), CacheSlot::Present(vec![2]));

        cache.remove(&key(1));
        assert!(cache.get(&key(1)).is_none());

        cache.clear();
        assert!(cache.is_empty());
    }

    // -----------------------------------------------------------------------
    // LruCache
    // -----------------------------------------------------------------------

    #[test]
    fn lru_evicts_least_recently_used() {
        let cache = LruCache::new(2);
        cache.insert(key(1), CacheSlot::Present(vec![1]));
        cache.insert(key(2), CacheSlot::Present(vec![2]));

        // Touch key 1 so key 2 becomes the eviction candidate.
        assert!(cache.get(&key(1)).is_some());

        cache.insert(key(3), CacheSlot::Present(vec![3]));
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&key(2)).is_none());
        assert!(cache.get(&key(1)).is_some());
        assert!(cache.get(&key(3)).is_some());
    }

    #[test]
    fn lru_overwrite_does_not_grow() {
        let cache = LruCache::new(2);
        cache.insert(key(1), CacheSlot::Present(vec![1]));
        cache.insert(key(1), CacheSlot::Present(vec![2]));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&key(1)), Some(CacheSlot::Present(vec![2])));
    }

    #[test]
    fn lru_zero_capacity_stores_nothing() {
        let cache = LruCache::new(0);
        cache.insert(key(1), CacheSlot::Present(vec![1]));
        assert!(cache.get(&key(1)).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn lru_remove_clears_eviction_order() {
        let cache = LruCache::new(2);
        cache.insert(key(1), CacheSlot::Present(vec![1]));
        cache.remove(&key(1));
        cache.insert(key(2), CacheSlot::Present(vec![2]));
        cache.insert(key(3), CacheSlot::Present(vec![3]));
        // Removed key must not count against capacity.
        assert_eq!(cache.len(), 2);
    }

    // -----------------------------------------------------------------------
    // CacheSlot
    // -----------------------------------------------------------------------

    #[test]
    fn slot_byte_accessors() {
        assert_eq!(CacheSlot::Missing.into_bytes(), None);
        assert_eq!(
            CacheSlot::Present(vec![7]).as_bytes(),
            Some([7u8].as_slice())
        );
    }
}
