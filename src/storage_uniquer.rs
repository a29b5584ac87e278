//! Store unique instances of a rust type.
//! Only a single unique copy (per store) will exist
//! of objects instantiated through these utilities.
//!
//! Two interners are provided:
//!   - [UniqueStore]: arena backed, owned by [Context](crate::context::Context),
//!     hands out [ArenaIndex] handles. Insertion requires `&mut self`,
//!     i.e. it is a structural, setup-phase write.
//!   - [StorageUniquer]: standalone, hands out [Arc] canonical instances
//!     and supports concurrent callers, with a switchable threading mode.

use rustc_hash::{FxHashMap, FxHasher};
use std::{
    collections::hash_map::Entry,
    hash::{Hash, Hasher},
    sync::Arc,
};

use parking_lot::RwLock;

use crate::context::{ArenaCell, ArenaIndex};

/// Computes the hash of a rust value and its rust type.
/// ```rust
///     use corion::storage_uniquer::TypeValueHash;
///     #[derive(Hash)]
///     struct A { i: u64 }
///     #[derive(Hash)]
///     struct B { i: u64 }
///     let x = A { i: 10 };
///     let y = B { i: 10 };
///     assert!(TypeValueHash::new(&x) != TypeValueHash::new(&y));
/// ```
#[derive(Hash, Eq, PartialEq, Clone, Copy, Debug)]
pub struct TypeValueHash {
    hash: u64,
}

impl TypeValueHash {
    /// Hash a value and its type together.
    pub fn new<T: Hash + 'static>(t: &T) -> TypeValueHash {
        let mut hasher = FxHasher::default();
        t.hash(&mut hasher);
        std::any::TypeId::of::<T>().hash(&mut hasher);
        TypeValueHash {
            hash: hasher.finish(),
        }
    }
}

/// Hash the (to be) unique object.
pub type UniqueStoreHash<'a, T> = &'a dyn Fn(&T) -> TypeValueHash;

/// Are the two objects equal.
pub type UniqueStoreEq<'a, T> = &'a dyn Fn(&T, &T) -> bool;

/// Is the provided argument equal to the unique object under interest.
pub type UniqueStoreIs<'a, T> = &'a dyn Fn(&T) -> bool;

/// Store unique copy of objects, arena allocated.
pub struct UniqueStore<T: 'static> {
    pub unique_store: ArenaCell<T>,
    pub unique_stores_map: FxHashMap<TypeValueHash, Vec<ArenaIndex>>,
}

impl<T: 'static> Default for UniqueStore<T> {
    fn default() -> Self {
        Self {
            unique_store: ArenaCell::with_key(),
            unique_stores_map: FxHashMap::default(),
        }
    }
}

impl<T: 'static> UniqueStore<T> {
    /// Get or create a unique copy of `t: T`.
    /// Consumes the provided argument either way.
    /// Returns an [ArenaIndex] into [UniqueStore::unique_store] of the unique copy.
    pub fn get_or_create_unique(
        &mut self,
        t: T,
        hash: UniqueStoreHash<T>,
        eq: UniqueStoreEq<T>,
    ) -> ArenaIndex {
        let hash = hash(&t);
        match self.unique_stores_map.entry(hash) {
            Entry::Occupied(mut possible_matches) => {
                let index = possible_matches.get().iter().find_map(|index| {
                    let iref = &*self.unique_store[*index].read();
                    if eq(&t, iref) {
                        Some(*index)
                    } else {
                        None
                    }
                });
                index.unwrap_or_else(|| {
                    let new_index = self.unique_store.insert(RwLock::new(t));
                    possible_matches.get_mut().push(new_index);
                    new_index
                })
            }
            Entry::Vacant(slot) => {
                let new_index = self.unique_store.insert(RwLock::new(t));
                slot.insert(vec![new_index]);
                new_index
            }
        }
    }

    /// Get index to the stored object that satisfies `hash` and `is`.
    pub fn get(&self, hash: TypeValueHash, is: UniqueStoreIs<T>) -> Option<ArenaIndex> {
        self.unique_stores_map
            .get(&hash)
            .and_then(|mv| mv.iter().find(|other| is(&self.unique_store[**other].read())))
            .copied()
    }
}

/// A generic, thread-safe interner: at most one canonical instance
/// exists per distinct key, and all callers observe the same [Arc].
///
/// The threading mode trades locking strategy:
///   - multi-threaded (the default): lookups probe under a read lock;
///     only a miss takes the write lock (and re-probes, since another
///     writer may have raced the upgrade).
///   - single-threaded: one write lock per call, skipping the
///     optimistic read.
///
/// Toggling the mode takes `&mut self`: exclusive access is exactly the
/// "no concurrent execution in flight" guarantee the switch requires.
pub struct StorageUniquer<T: ?Sized + Send + Sync> {
    multithreaded: bool,
    table: RwLock<FxHashMap<TypeValueHash, Vec<Arc<T>>>>,
}

impl<T: ?Sized + Send + Sync> Default for StorageUniquer<T> {
    fn default() -> Self {
        Self {
            multithreaded: true,
            table: RwLock::new(FxHashMap::default()),
        }
    }
}

impl<T: ?Sized + Send + Sync> StorageUniquer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Is the optimistic concurrent lookup path active?
    pub fn is_multithreaded(&self) -> bool {
        self.multithreaded
    }

    /// Switch the locking strategy.
    pub fn set_multithreaded(&mut self, enable: bool) {
        self.multithreaded = enable;
    }

    /// Return the canonical instance for the key described by
    /// `(hash, is)`, constructing it via `ctor` only if no instance
    /// satisfying `is` exists yet.
    pub fn get_or_create(
        &self,
        hash: TypeValueHash,
        is: impl Fn(&T) -> bool,
        ctor: impl FnOnce() -> Arc<T>,
    ) -> Arc<T> {
        if self.multithreaded {
            let table = self.table.read();
            if let Some(existing) = Self::probe(&table, hash, &is) {
                return existing;
            }
            drop(table);
        }
        let mut table = self.table.write();
        // Re-probe: another writer may have inserted this key between
        // our read probe and acquiring the write lock.
        if let Some(existing) = Self::probe(&table, hash, &is) {
            return existing;
        }
        let new = ctor();
        log::trace!("storage uniquer: new instance for {hash:?}");
        table.entry(hash).or_default().push(new.clone());
        new
    }

    /// Get the canonical instance for `(hash, is)`, if present.
    pub fn get(&self, hash: TypeValueHash, is: impl Fn(&T) -> bool) -> Option<Arc<T>> {
        Self::probe(&self.table.read(), hash, &is)
    }

    fn probe(
        table: &FxHashMap<TypeValueHash, Vec<Arc<T>>>,
        hash: TypeValueHash,
        is: &impl Fn(&T) -> bool,
    ) -> Option<Arc<T>> {
        table
            .get(&hash)
            .and_then(|mv| mv.iter().find(|t| is(t)))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{StorageUniquer, TypeValueHash, UniqueStore};

    #[test]
    fn test_unique_store() {
        let mut u32_store = UniqueStore::<u32>::default();
        let u32_hash = |x: &u32| TypeValueHash::new(x);
        let u32_0_idx = u32_store.get_or_create_unique(0, &u32_hash, &u32::eq);
        let u32_1_idx = u32_store.get_or_create_unique(1, &u32_hash, &u32::eq);
        let u32_0_1_idx = u32_store.get_or_create_unique(0, &u32_hash, &u32::eq);

        assert!(u32_0_idx == u32_0_1_idx && u32_0_idx != u32_1_idx);
        let u32_0_2_idx = u32_store
            .get(TypeValueHash::new(&0u32), &|x| *x == 0)
            .unwrap();
        let u32_1_2_idx = u32_store
            .get(TypeValueHash::new(&1u32), &|x| *x == 1)
            .unwrap();
        assert!(u32_0_2_idx == u32_0_idx && u32_1_2_idx == u32_1_idx);

        assert!(u32_store
            .get(TypeValueHash::new(&2u32), &|x| *x == 2)
            .is_none());
    }

    #[test]
    fn storage_uniquer_idempotent() {
        let uniquer = StorageUniquer::<String>::new();
        let key = |s: &str| TypeValueHash::new(&s.to_string());
        let a1 = uniquer.get_or_create(key("a"), |t| t == "a", || Arc::new("a".to_string()));
        let a2 = uniquer.get_or_create(key("a"), |t| t == "a", || Arc::new("a".to_string()));
        let b = uniquer.get_or_create(key("b"), |t| t == "b", || Arc::new("b".to_string()));
        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));
        assert!(Arc::ptr_eq(
            &uniquer.get(key("b"), |t| t == "b").unwrap(),
            &b
        ));
        assert!(uniquer.get(key("c"), |t| t == "c").is_none());
    }

    #[test]
    fn storage_uniquer_single_threaded_mode() {
        let mut uniquer = StorageUniquer::<u64>::new();
        uniquer.set_multithreaded(false);
        let h = TypeValueHash::new(&42u64);
        let a = uniquer.get_or_create(h, |t| *t == 42, || Arc::new(42));
        let b = uniquer.get_or_create(h, |t| *t == 42, || Arc::new(42));
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn storage_uniquer_concurrent() {
        let uniquer = Arc::new(StorageUniquer::<u64>::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let uniquer = Arc::clone(&uniquer);
                std::thread::spawn(move || {
                    let h = TypeValueHash::new(&7u64);
                    uniquer.get_or_create(h, |t| *t == 7, || Arc::new(7))
                })
            })
            .collect();
        let canon: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for inst in &canon[1..] {
            assert!(Arc::ptr_eq(&canon[0], inst));
        }
    }
}
