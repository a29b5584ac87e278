//! Context-uniqued storage for arbitrary (non-IR) values, such as
//! source file paths referenced by [Location](crate::location::Location)s.
//! Saving an equal value twice yields keys referring to one shared
//! allocation.

use std::{any::Any, hash::Hash, marker::PhantomData, sync::Arc};

use crate::{
    context::Context,
    storage_uniquer::{StorageUniquer, TypeValueHash},
};

/// A key to a value saved with [save]. Holds the value alive; cheap to
/// clone. Two keys compare equal iff they refer to the same uniqued
/// allocation.
pub struct UniquedKey<T> {
    inner: Arc<dyn Any + Send + Sync>,
    _phantom: PhantomData<fn() -> T>,
}

impl<T> std::fmt::Debug for UniquedKey<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UniquedKey({:p})", Arc::as_ptr(&self.inner))
    }
}

impl<T: Any + Send + Sync> UniquedKey<T> {
    /// Access the uniqued value.
    pub fn get(&self) -> &T {
        self.inner
            .downcast_ref::<T>()
            .expect("UniquedKey type mismatch")
    }
}

impl<T> Clone for UniquedKey<T> {
    fn clone(&self) -> Self {
        UniquedKey {
            inner: Arc::clone(&self.inner),
            _phantom: PhantomData,
        }
    }
}

impl<T> PartialEq for UniquedKey<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Eq for UniquedKey<T> {}

impl<T> Hash for UniquedKey<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.inner).hash(state);
    }
}

/// Save `t` to the context, uniqued by value. Follows the threading
/// mode of the context.
pub(crate) fn save<T: Any + Hash + Eq + Send + Sync>(ctx: &mut Context, t: T) -> UniquedKey<T> {
    ctx.uniqued_any_store.save(t)
}

/// The underlying store, held by [Context].
pub(crate) struct UniquedAnyStore {
    uniquer: StorageUniquer<dyn Any + Send + Sync>,
}

impl Default for UniquedAnyStore {
    fn default() -> Self {
        Self {
            uniquer: StorageUniquer::new(),
        }
    }
}

impl UniquedAnyStore {
    pub(crate) fn set_multithreaded(&mut self, enable: bool) {
        self.uniquer.set_multithreaded(enable);
    }

    fn save<T: Any + Hash + Eq + Send + Sync>(&self, t: T) -> UniquedKey<T> {
        let hash = TypeValueHash::new(&t);
        // `is` only reads the slot, `ctor` takes it; the uniquer calls
        // `ctor` at most once, after all `is` probes.
        let slot = std::cell::RefCell::new(Some(t));
        let inner = self.uniquer.get_or_create(
            hash,
            |other| {
                let slot = slot.borrow();
                let t = slot.as_ref().expect("probe after construction");
                other.downcast_ref::<T>() == Some(t)
            },
            || {
                let t = slot.borrow_mut().take().expect("ctor called twice");
                Arc::new(t)
            },
        );
        UniquedKey {
            inner,
            _phantom: PhantomData,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::context::Context;

    use super::save;

    #[test]
    fn equal_values_share_storage() {
        let ctx = &mut Context::new();
        let k1 = save(ctx, PathBuf::from("/tmp/input.corion"));
        let k2 = save(ctx, PathBuf::from("/tmp/input.corion"));
        let k3 = save(ctx, PathBuf::from("/tmp/other.corion"));
        assert_eq!(k1, k2);
        assert_ne!(k1, k3);
        assert_eq!(k1.get(), k2.get());
    }

    #[test]
    fn same_value_different_type_is_distinct() {
        let ctx = &mut Context::new();
        let k1 = save(ctx, 42u64);
        let k2 = save(ctx, 42i64);
        assert_eq!(*k1.get(), 42u64);
        assert_eq!(*k2.get(), 42i64);
    }
}
