//! [Context] and [Ptr] together provide memory management for `corion`.
//!
//! The context is the ownership root of everything in a compilation
//! session: loaded [Dialect]s, uniqued [types](crate::type::Type),
//! registered [Op](crate::op::Op) kinds, the IR object arenas, and the
//! optional thread pool. It is also the sole synchronization domain:
//! arena cells are `RwLock`s so a shared `&Context` supports concurrent
//! reads, while structural mutation requires `&mut Context` and is
//! thereby confined to a quiescent, single-threaded phase.

use std::{marker::PhantomData, sync::atomic::AtomicUsize, sync::atomic::Ordering, sync::Arc};

use once_cell::sync::Lazy;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::{new_key_type, Key, SlotMap};

use crate::{
    attribute::AttrId,
    basic_block::BasicBlock,
    builtin::{self, CachedEntities},
    common_traits::Verify,
    dialect::{Dialect, DialectName},
    dialect_registry::DialectRegistry,
    op::{OpCreator, OpId},
    operation::Operation,
    printable::{self, Printable},
    r#type::{AbstractType, TypeId, TypeObj},
    region::Region,
    result::Result,
    storage_uniquer::UniqueStore,
    type_id::TypeID,
    uniqued_any::UniquedAnyStore,
};

new_key_type! {
    /// Index into an arena within [Context].
    pub struct ArenaIndex;
}

pub type ArenaCell<T> = SlotMap<ArenaIndex, RwLock<T>>;

/// Loading state of a [Dialect] namespace.
/// The `Loading` state carries no payload: it exists so that a lookup
/// during a dialect's own construction can be told apart from
/// "never requested".
enum DialectState {
    /// The dialect's constructor is currently running.
    Loading,
    /// The dialect finished loading and is owned by the context.
    Loaded(Dialect),
}

/// Describes one [Context::execute_action] invocation to an installed
/// action handler.
pub struct ActionDescriptor {
    /// A fixed tag identifying the kind of action.
    pub tag: &'static str,
    /// Free-form description of this particular invocation.
    pub description: String,
}

/// Forwarding target for [Context::execute_action] when instrumentation
/// is installed. The first argument runs the action; it must be called
/// exactly once.
pub type ActionHandler = Box<dyn Fn(&mut dyn FnMut(), &ActionDescriptor) + Send + Sync>;

/// The thread pool a [Context] computes on: either owned by the context
/// and destroyed with it, or shared with (and outlived by) the caller.
enum ThreadPoolRef {
    Owned(rayon::ThreadPool),
    Shared(Arc<rayon::ThreadPool>),
}

impl ThreadPoolRef {
    fn pool(&self) -> &rayon::ThreadPool {
        match self {
            ThreadPoolRef::Owned(pool) => pool,
            ThreadPoolRef::Shared(pool) => pool,
        }
    }
}

/// Debug kill-switch: when the environment variable is set, the context
/// never enables multithreading, regardless of API calls.
static MULTITHREADING_DISABLED_ENV: Lazy<bool> =
    Lazy::new(|| std::env::var_os("CORION_DISABLE_MULTITHREADING").is_some());

/// A context stores all IR data of this compilation session.
pub struct Context {
    /// Allocation pool for [Operation]s.
    pub operations: ArenaCell<Operation>,
    /// Allocation pool for [BasicBlock]s.
    pub basic_blocks: ArenaCell<BasicBlock>,
    /// Allocation pool for [Region]s.
    pub regions: ArenaCell<Region>,
    /// Loaded [Dialect]s, keyed by namespace.
    dialects: FxHashMap<DialectName, DialectState>,
    /// Registered [Op](crate::op::Op) kinds.
    pub(crate) ops: FxHashMap<OpId, OpCreator>,
    /// Metadata for registered [Type](crate::type::Type) kinds.
    pub(crate) type_kinds: FxHashMap<TypeId, AbstractType>,
    /// Registered [Attribute](crate::attribute::Attribute) kinds and
    /// the dialects that own them.
    pub(crate) attr_kinds: FxHashMap<AttrId, DialectName>,
    /// Storage for uniqued [TypeObj]s.
    pub type_store: UniqueStore<TypeObj>,
    /// Storage for other uniqued objects.
    pub(crate) uniqued_any_store: UniquedAnyStore,
    /// This context's copy of the composed dialect registry.
    registry: DialectRegistry,
    /// Extensions already applied, so registry re-appends don't re-fire
    /// them. Keyed by extension identity; per-dialect applications of
    /// anchorless extensions additionally carry the dialect name.
    applied_extensions: FxHashSet<(TypeID, Option<DialectName>)>,
    /// Eagerly constructed builtin singletons. Populated when the
    /// builtin dialect loads, i.e. during [Context::new].
    pub(crate) cached_entities: Option<CachedEntities>,
    /// Instrumentation hook for [Context::execute_action].
    action_handler: Option<ActionHandler>,
    /// Thread pool; present only while multithreading is enabled,
    /// except when an externally owned pool was injected.
    thread_pool: Option<ThreadPoolRef>,
    multithreading: bool,
    /// Number of multi-threaded execution contexts currently walking
    /// this context's IR. Structural mutation while non-zero is a
    /// programmer error.
    parallel_contexts: AtomicUsize,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Create a [Context] with the builtin dialect loaded and its
    /// singleton entities cached.
    pub fn new() -> Context {
        let mut ctx = Context {
            operations: ArenaCell::with_key(),
            basic_blocks: ArenaCell::with_key(),
            regions: ArenaCell::with_key(),
            dialects: FxHashMap::default(),
            ops: FxHashMap::default(),
            type_kinds: FxHashMap::default(),
            attr_kinds: FxHashMap::default(),
            type_store: UniqueStore::default(),
            uniqued_any_store: UniquedAnyStore::default(),
            registry: DialectRegistry::new(),
            applied_extensions: FxHashSet::default(),
            cached_entities: None,
            action_handler: None,
            thread_pool: None,
            multithreading: false,
            parallel_contexts: AtomicUsize::new(0),
        };
        let mut registry = DialectRegistry::new();
        builtin::register(&mut registry);
        ctx.append_dialect_registry(&registry);
        ctx.load_dialect_by_name(&DialectName::new(builtin::DIALECT_NAME))
            .expect("builtin dialect must be loadable");
        ctx
    }

    /// The builtin singletons eagerly constructed at context creation.
    pub fn cached(&self) -> &CachedEntities {
        self.cached_entities
            .as_ref()
            .expect("builtin dialect not loaded")
    }

    //-------------------------------------------------------------------
    // Dialect loading.
    //-------------------------------------------------------------------

    /// Get the dialect registered under `name` if loaded, loading it
    /// via `init` otherwise.
    ///
    /// Panics (these are build / identity defects, not runtime
    /// conditions):
    ///   - if `name` is currently loading: a dialect constructor
    ///     transitively requested its own namespace;
    ///   - if `name` is loaded but under a different [TypeID]: two
    ///     distinct dialect definitions claim one namespace;
    ///   - if called while a multi-threaded execution context is
    ///     active.
    pub fn get_or_load_dialect(
        &mut self,
        name: &DialectName,
        dialect_id: TypeID,
        init: impl FnOnce(&mut Context) -> Dialect,
    ) -> &Dialect {
        match self.dialects.get(name) {
            Some(DialectState::Loading) => {
                panic!("dialect '{name}' is repeatedly being loaded while its loading is in progress")
            }
            Some(DialectState::Loaded(existing)) => {
                if existing.type_id() != dialect_id {
                    panic!(
                        "a dialect with namespace '{name}' has already been registered with a different identity: {} vs {}",
                        existing.type_id(),
                        dialect_id
                    );
                }
            }
            None => {
                self.assert_not_in_parallel_execution(&format!("loading a dialect ('{name}')"));
                // A placeholder marks the namespace as loading, so that
                // recursive loads of *other* dialects from within `init`
                // work, while a recursive self-load is caught above.
                self.dialects.insert(name.clone(), DialectState::Loading);
                let dialect = init(self);
                assert!(
                    dialect.name() == name && dialect.type_id() == dialect_id,
                    "dialect constructor for '{name}' built a mismatching dialect"
                );
                // Re-resolve the slot: `init` may have loaded other
                // dialects, moving entries around in the table.
                self.dialects
                    .insert(name.clone(), DialectState::Loaded(dialect));
                log::debug!("loaded dialect '{name}'");
                self.apply_extensions_for_dialect(name);
            }
        }
        let Some(DialectState::Loaded(dialect)) = self.dialects.get(name) else {
            unreachable!("dialect '{name}' must be loaded at this point")
        };
        dialect
    }

    /// Load the dialect registered in this context's registry under
    /// `name`. Returns the loaded dialect, or [None] for an
    /// unregistered namespace.
    pub fn load_dialect_by_name(&mut self, name: &DialectName) -> Option<&Dialect> {
        let (dialect_id, ctor) = self.registry.lookup(name)?;
        Some(self.get_or_load_dialect(name, dialect_id, move |ctx| ctor(ctx)))
    }

    /// Load all dialects available in this context's registry.
    pub fn load_all_available_dialects(&mut self) {
        for name in self.registry.dialect_names() {
            self.load_dialect_by_name(&name);
        }
    }

    /// Get a reference to a loaded [Dialect] by name, if loaded.
    pub fn dialect(&self, name: &DialectName) -> Option<&Dialect> {
        match self.dialects.get(name) {
            Some(DialectState::Loaded(dialect)) => Some(dialect),
            _ => None,
        }
    }

    /// Get a mutable reference to a loaded [Dialect] by name.
    pub fn dialect_mut(&mut self, name: &DialectName) -> Option<&mut Dialect> {
        match self.dialects.get_mut(name) {
            Some(DialectState::Loaded(dialect)) => Some(dialect),
            _ => None,
        }
    }

    /// Is the dialect under `name` currently executing its constructor?
    pub fn is_dialect_loading(&self, name: &DialectName) -> bool {
        matches!(self.dialects.get(name), Some(DialectState::Loading))
    }

    /// Names of all loaded dialects.
    pub fn loaded_dialects(&self) -> impl Iterator<Item = &DialectName> {
        self.dialects.iter().filter_map(|(name, state)| match state {
            DialectState::Loaded(_) => Some(name),
            DialectState::Loading => None,
        })
    }

    /// Append `registry`'s dialects and extensions to this context's
    /// registry. Appending a registry that is already a subset is a
    /// cheap no-op. Extensions whose requirements are already met by
    /// loaded dialects are applied immediately.
    pub fn append_dialect_registry(&mut self, registry: &DialectRegistry) {
        if registry.is_subset_of(&self.registry) {
            return;
        }
        self.assert_not_in_parallel_execution("appending a dialect registry");
        registry.append_to(&mut self.registry);
        log::debug!("appended dialect registry");
        let loaded: Vec<_> = self.loaded_dialects().cloned().collect();
        for name in loaded {
            self.apply_extensions_for_dialect(&name);
        }
    }

    /// Apply registry extensions that become applicable now that
    /// `just_loaded` is available. Each extension fires at most once
    /// per context (anchorless ones: once per loaded dialect).
    fn apply_extensions_for_dialect(&mut self, just_loaded: &DialectName) {
        let candidates = self.registry.extensions();
        let mut pending = Vec::new();
        for (ext_id, ext) in candidates {
            let required = ext.required_dialects();
            if required.is_empty() {
                let key = (ext_id, Some(just_loaded.clone()));
                if !self.applied_extensions.contains(&key) {
                    pending.push((key, ext));
                }
                continue;
            }
            if !required.contains(just_loaded) {
                continue;
            }
            let all_loaded = required
                .iter()
                .all(|d| matches!(self.dialects.get(d), Some(DialectState::Loaded(_))));
            let key = (ext_id, None);
            if all_loaded && !self.applied_extensions.contains(&key) {
                pending.push((key, ext));
            }
        }
        for (key, ext) in pending {
            self.applied_extensions.insert(key);
            ext.apply(self);
        }
    }

    //-------------------------------------------------------------------
    // Threading.
    //-------------------------------------------------------------------

    /// Is multithreading currently enabled?
    pub fn is_multithreading_enabled(&self) -> bool {
        self.multithreading
    }

    /// Enable multithreading: creates an owned thread pool unless an
    /// externally owned one was injected with [Self::set_thread_pool].
    /// The `CORION_DISABLE_MULTITHREADING` environment variable wins
    /// over this call.
    pub fn enable_multithreading(&mut self) {
        if *MULTITHREADING_DISABLED_ENV {
            log::debug!("multithreading disabled by environment; not enabling");
            return;
        }
        if self.multithreading {
            return;
        }
        self.multithreading = true;
        self.uniqued_any_store.set_multithreaded(true);
        if self.thread_pool.is_none() {
            self.thread_pool = Some(ThreadPoolRef::Owned(
                rayon::ThreadPoolBuilder::new()
                    .build()
                    .expect("failed to construct the context thread pool"),
            ));
        }
    }

    /// Disable multithreading, destroying an owned thread pool. Must
    /// not be called while a multi-threaded execution context is
    /// active.
    pub fn disable_multithreading(&mut self) {
        self.assert_not_in_parallel_execution("disabling multithreading");
        self.multithreading = false;
        self.uniqued_any_store.set_multithreaded(false);
        if let Some(ThreadPoolRef::Owned(_)) = self.thread_pool {
            self.thread_pool = None;
        }
    }

    /// Use `pool` instead of an owned thread pool; the caller keeps
    /// ownership and must keep it alive for this context's lifetime.
    /// Legal only while multithreading is disabled.
    pub fn set_thread_pool(&mut self, pool: Arc<rayon::ThreadPool>) {
        assert!(
            !self.multithreading,
            "setting a thread pool requires multithreading to be disabled"
        );
        self.thread_pool = Some(ThreadPoolRef::Shared(pool));
        self.enable_multithreading();
    }

    /// The thread pool to compute on, when multithreading is enabled.
    pub fn thread_pool(&self) -> Option<&rayon::ThreadPool> {
        self.multithreading
            .then(|| self.thread_pool.as_ref().map(ThreadPoolRef::pool))
            .flatten()
    }

    /// Announce that a multi-threaded computation over this context's
    /// IR is starting. While any such computation is active, structural
    /// mutation of the context registries panics.
    pub fn enter_multi_threaded_execution(&self) {
        self.parallel_contexts.fetch_add(1, Ordering::AcqRel);
    }

    /// Announce that a multi-threaded computation finished.
    pub fn exit_multi_threaded_execution(&self) {
        let prev = self.parallel_contexts.fetch_sub(1, Ordering::AcqRel);
        assert!(prev > 0, "unbalanced exit_multi_threaded_execution");
    }

    /// Panic if a multi-threaded computation is active. Every path
    /// that registers a kind or loads a dialect goes through this.
    pub(crate) fn assert_not_in_parallel_execution(&self, what: &str) {
        assert!(
            self.parallel_contexts.load(Ordering::Acquire) == 0,
            "{what} while in a multi-threaded execution context"
        );
    }

    //-------------------------------------------------------------------
    // Action dispatch.
    //-------------------------------------------------------------------

    /// Install `handler` as the action handler, replacing any previous
    /// one. Only a single handler is active at a time.
    pub fn register_action_handler(&mut self, handler: ActionHandler) {
        self.action_handler = Some(handler);
    }

    /// Run `action`, forwarding it together with its descriptor to the
    /// installed handler, if any. Without a handler this is a direct
    /// call: the descriptor is not even built.
    pub fn execute_action(
        &self,
        action: impl FnOnce(),
        descriptor: impl FnOnce() -> ActionDescriptor,
    ) {
        match &self.action_handler {
            None => action(),
            Some(handler) => {
                let mut action = Some(action);
                let descriptor = descriptor();
                handler(
                    &mut || (action.take().expect("action executed more than once"))(),
                    &descriptor,
                );
            }
        }
    }
}

pub(crate) mod private {
    use parking_lot::RwLock;
    use std::marker::PhantomData;

    use super::{ArenaCell, Context, Ptr};

    /// An IR object owned by Context
    pub trait ArenaObj
    where
        Self: Sized,
    {
        /// Get the arena that has allocated this object.
        fn get_arena(ctx: &Context) -> &ArenaCell<Self>;
        /// Get the arena that has allocated this object.
        fn get_arena_mut(ctx: &mut Context) -> &mut ArenaCell<Self>;
        /// Get a Ptr to self.
        fn get_self_ptr(&self, ctx: &Context) -> Ptr<Self>;
        /// If this object contains any ArenaObj itself, it must dealloc()
        /// all of those sub-objects. This is called when self is deallocated.
        fn dealloc_sub_objects(ptr: Ptr<Self>, ctx: &mut Context);

        /// Allocates object on the arena, given a creator function.
        fn alloc<T: FnOnce(Ptr<Self>) -> Self>(ctx: &mut Context, f: T) -> Ptr<Self> {
            let creator = |idx: super::ArenaIndex| {
                let t = f(Ptr::<Self> {
                    idx,
                    _dummy: PhantomData::<Self>,
                });
                RwLock::new(t)
            };
            Ptr::<Self> {
                idx: Self::get_arena_mut(ctx).insert_with_key(creator),
                _dummy: PhantomData,
            }
        }

        /// Deallocates this object from the arena.
        fn dealloc(ptr: Ptr<Self>, ctx: &mut Context) {
            Self::dealloc_sub_objects(ptr, ctx);
            Self::get_arena_mut(ctx).remove(ptr.idx);
        }
    }
}

pub(crate) use private::ArenaObj;

/// Pointer to an IR Object owned by Context.
pub struct Ptr<T: ArenaObj> {
    pub(crate) idx: ArenaIndex,
    pub(crate) _dummy: PhantomData<T>,
}

// Manual impl: a derive would require `T: Debug`, but only the
// arena index is printed.
impl<T: ArenaObj> std::fmt::Debug for Ptr<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ptr").field("idx", &self.idx).finish()
    }
}

impl<'a, T: ArenaObj> Ptr<T> {
    /// Return a read guard to the pointee.
    /// The underlying cell is read-locked as long as the guard lives.
    pub fn deref(&self, ctx: &'a Context) -> RwLockReadGuard<'a, T> {
        T::get_arena(ctx)
            .get(self.idx)
            .expect("dangling Ptr deref")
            .read()
    }

    /// Return a write guard to the pointee.
    /// The underlying cell is write-locked as long as the guard lives.
    pub fn deref_mut(&self, ctx: &'a Context) -> RwLockWriteGuard<'a, T> {
        T::get_arena(ctx)
            .get(self.idx)
            .expect("dangling Ptr deref")
            .write()
    }

    /// Try and return a read guard to the pointee.
    pub fn try_deref(&self, ctx: &'a Context) -> Option<RwLockReadGuard<'a, T>> {
        T::get_arena(ctx).get(self.idx).and_then(|c| c.try_read())
    }

    /// Try and return a write guard to the pointee.
    pub fn try_deref_mut(&self, ctx: &'a Context) -> Option<RwLockWriteGuard<'a, T>> {
        T::get_arena(ctx).get(self.idx).and_then(|c| c.try_write())
    }

    /// Does this pointer refer to a live object?
    pub fn is_live(&self, ctx: &Context) -> bool {
        T::get_arena(ctx).contains_key(self.idx)
    }

    /// Create a unique (to the arena) name based on the arena index.
    pub(crate) fn make_name(&self, name_base: &str) -> String {
        let raw = self.idx.data().as_ffi();
        // Low 32 bits are the slot, high 32 the version.
        format!("{}_{}v{}", name_base, raw & 0xffff_ffff, raw >> 32)
    }
}

impl<T: ArenaObj> Clone for Ptr<T> {
    fn clone(&self) -> Ptr<T> {
        *self
    }
}

impl<T: ArenaObj> Copy for Ptr<T> {}

impl<T: ArenaObj> PartialEq for Ptr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.idx == other.idx
    }
}

impl<T: ArenaObj> Eq for Ptr<T> {}

impl<T: ArenaObj + 'static> std::hash::Hash for Ptr<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::any::TypeId::of::<T>().hash(state);
        self.idx.hash(state);
    }
}

impl<T: ArenaObj + Printable> Printable for Ptr<T> {
    fn fmt(
        &self,
        ctx: &Context,
        state: &printable::State,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        self.deref(ctx).fmt(ctx, state, f)
    }
}

impl<T: ArenaObj + Verify> Verify for Ptr<T> {
    fn verify(&self, ctx: &Context) -> Result<()> {
        self.deref(ctx).verify(ctx)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::{ActionDescriptor, Context};

    #[test]
    fn action_without_handler_runs_directly() {
        let ctx = Context::new();
        let mut ran = false;
        ctx.execute_action(
            || ran = true,
            || unreachable!("descriptor must not be built without a handler"),
        );
        assert!(ran);
    }

    #[test]
    fn action_handler_sees_descriptor_and_runs_action() {
        static HANDLED: AtomicUsize = AtomicUsize::new(0);
        let mut ctx = Context::new();
        ctx.register_action_handler(Box::new(|action, descriptor| {
            assert_eq!(descriptor.tag, "test-action");
            HANDLED.fetch_add(1, Ordering::SeqCst);
            action();
        }));
        let ran = Arc::new(AtomicUsize::new(0));
        let ran2 = Arc::clone(&ran);
        ctx.execute_action(
            move || {
                ran2.fetch_add(1, Ordering::SeqCst);
            },
            || ActionDescriptor {
                tag: "test-action",
                description: "an action from a test".to_string(),
            },
        );
        assert_eq!(HANDLED.load(Ordering::SeqCst), 1);
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn action_handler_may_decline() {
        let mut ctx = Context::new();
        ctx.register_action_handler(Box::new(|_action, _descriptor| {
            // Dropping the action without calling it skips it.
        }));
        ctx.execute_action(
            || panic!("declined action must not run"),
            || ActionDescriptor {
                tag: "skipped",
                description: String::new(),
            },
        );
    }
}
