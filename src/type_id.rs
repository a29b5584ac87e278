//! [TypeID] is an opaque, comparable and hashable identity token
//! for a logical kind of IR entity (a [Dialect](crate::dialect::Dialect),
//! a [Type](crate::type::Type) kind, an extension etc.).
//!
//! Tokens are issued by a process-wide registry backed by an atomic
//! counter, rather than by taking addresses of static objects. Two
//! [TypeID]s compare equal iff they were obtained for the same logical
//! kind through the same resolution path.

use std::{
    any,
    fmt::{self, Display},
    sync::atomic::{AtomicU64, Ordering},
};

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

/// An opaque identity token. Process-lifetime scoped: valid from first
/// issue until process exit (or, for [TypeIDAllocator] issued tokens,
/// until the allocator is dropped).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct TypeID(u64);

static NEXT_TYPE_ID: AtomicU64 = AtomicU64::new(1);

fn fresh_type_id() -> TypeID {
    TypeID(NEXT_TYPE_ID.fetch_add(1, Ordering::Relaxed))
}

/// TypeIDs resolved from rust types.
static RUST_TYPE_IDS: Lazy<Mutex<FxHashMap<any::TypeId, TypeID>>> =
    Lazy::new(|| Mutex::new(FxHashMap::default()));

/// TypeIDs resolved from type names (the fallback path).
static NAMED_TYPE_IDS: Lazy<Mutex<FxHashMap<&'static str, TypeID>>> =
    Lazy::new(|| Mutex::new(FxHashMap::default()));

impl TypeID {
    /// Get (issuing if necessary) the [TypeID] for the rust type `T`.
    /// Repeated calls with the same `T` return the same token; distinct
    /// `T`s get distinct tokens.
    pub fn get<T: ?Sized + 'static>() -> TypeID {
        let mut map = RUST_TYPE_IDS.lock();
        *map.entry(any::TypeId::of::<T>()).or_insert_with(fresh_type_id)
    }

    /// Resolve a [TypeID] from the *name* of `T` instead of its rust
    /// identity. This allows kinds described in multiple compilation
    /// units (e.g. across dynamic libraries, where [any::TypeId] is not
    /// stable) to share an identity. Refuses names originating in a
    /// function-local scope, since those are not globally unique.
    pub fn get_by_name<T: ?Sized + 'static>() -> TypeID {
        let name = any::type_name::<T>();
        assert!(
            !name.contains("{{closure}}"),
            "TypeID cannot be resolved by name for function-local type {}",
            name
        );
        Self::from_name(name)
    }

    /// Get (issuing if necessary) the [TypeID] registered under `name`.
    pub fn from_name(name: &'static str) -> TypeID {
        let mut map = NAMED_TYPE_IDS.lock();
        *map.entry(name).or_insert_with(fresh_type_id)
    }
}

impl Display for TypeID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "typeid({})", self.0)
    }
}

/// Issues fresh [TypeID]s for dynamically described kinds, e.g. a
/// dialect schema loaded from data at runtime. Tokens issued here never
/// collide with registry-resolved ones, but they are only meaningful
/// while the issuing allocator is alive: the allocator owns the
/// dynamic kind descriptions the tokens stand for.
#[derive(Default)]
pub struct TypeIDAllocator {
    issued: Vec<TypeID>,
}

impl TypeIDAllocator {
    pub fn new() -> TypeIDAllocator {
        Self::default()
    }

    /// Issue a fresh, never-before-seen [TypeID].
    pub fn allocate(&mut self) -> TypeID {
        let id = fresh_type_id();
        self.issued.push(id);
        id
    }

    /// All tokens issued by this allocator, in issue order.
    pub fn issued(&self) -> &[TypeID] {
        &self.issued
    }
}

#[cfg(test)]
mod tests {
    use super::{TypeID, TypeIDAllocator};

    struct A;
    struct B;

    #[test]
    fn distinct_and_stable() {
        assert_eq!(TypeID::get::<A>(), TypeID::get::<A>());
        assert_eq!(TypeID::get::<B>(), TypeID::get::<B>());
        assert_ne!(TypeID::get::<A>(), TypeID::get::<B>());
        for _ in 0..10 {
            assert_eq!(TypeID::get::<A>(), TypeID::get::<A>());
        }
    }

    #[test]
    fn name_fallback() {
        assert_eq!(TypeID::get_by_name::<A>(), TypeID::get_by_name::<A>());
        assert_ne!(TypeID::get_by_name::<A>(), TypeID::get_by_name::<B>());
        // The name path and the rust-identity path are separate registries.
        assert_eq!(TypeID::from_name("x.y"), TypeID::from_name("x.y"));
    }

    #[test]
    fn allocator_is_fresh() {
        let mut alloc = TypeIDAllocator::new();
        let t0 = alloc.allocate();
        let t1 = alloc.allocate();
        assert_ne!(t0, t1);
        assert_ne!(t0, TypeID::get::<A>());
        assert_eq!(alloc.issued(), &[t0, t1]);
    }

    #[test]
    fn stable_across_threads() {
        let expect = TypeID::get::<A>();
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(TypeID::get::<A>))
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), expect);
        }
    }
}
