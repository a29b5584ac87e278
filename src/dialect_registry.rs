//! A [DialectRegistry] maps dialect namespaces to constructors, letting
//! tools describe the set of available dialects up front while the
//! [Context] loads each one lazily, on first use. Registries compose:
//! they can be appended to one another and to a context, and carry
//! [DialectExtension]s that attach behavior to dialects they do not
//! define.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::{
    context::Context,
    dialect::{Dialect, DialectName},
    type_id::TypeID,
};

/// Constructor for a [Dialect]. Runs at most once per [Context], the
/// first time the dialect is needed.
pub type DialectCtor = Arc<dyn Fn(&mut Context) -> Dialect + Send + Sync>;

/// A statically described dialect, insertable into a [DialectRegistry]
/// by type.
pub trait DialectDefinition: 'static {
    /// The namespace this dialect registers under.
    const NAMESPACE: &'static str;
    /// Build the dialect. Called lazily by the context; may itself load
    /// other dialects (but not its own namespace).
    fn init(ctx: &mut Context) -> Dialect;
}

/// Attaches behavior to dialects after they load. An extension with a
/// non-empty required set applies once, when the last required dialect
/// loads. An extension with an empty required set applies once per
/// loaded dialect.
pub trait DialectExtension: Send + Sync + 'static {
    /// Dialects that must all be loaded before this extension applies.
    fn required_dialects(&self) -> &[DialectName];
    /// Apply the extension. The required dialects are loaded and
    /// reachable through `ctx`.
    fn apply(&self, ctx: &mut Context);
}

/// Maps dialect namespaces to constructors and holds pending
/// [DialectExtension]s.
#[derive(Default)]
pub struct DialectRegistry {
    ctors: FxHashMap<DialectName, (TypeID, DialectCtor)>,
    extensions: FxHashMap<TypeID, Arc<dyn DialectExtension>>,
    /// Namespaces in insertion order, for deterministic iteration.
    order: Vec<DialectName>,
}

impl DialectRegistry {
    pub fn new() -> DialectRegistry {
        DialectRegistry::default()
    }

    /// Register `D` under its namespace.
    pub fn insert<D: DialectDefinition>(&mut self) {
        self.insert_dynamic(
            DialectName::new(D::NAMESPACE),
            TypeID::get::<D>(),
            Arc::new(D::init),
        );
    }

    /// Register a constructor under `name` with an explicit identity.
    /// Re-registering the same identity is a no-op; a different
    /// identity under an existing name panics.
    pub fn insert_dynamic(&mut self, name: DialectName, dialect_id: TypeID, ctor: DialectCtor) {
        match self.ctors.get(&name) {
            Some((existing_id, _)) => {
                assert!(
                    *existing_id == dialect_id,
                    "conflicting registrations for dialect '{name}': {existing_id} vs {dialect_id}"
                );
            }
            None => {
                self.ctors.insert(name.clone(), (dialect_id, ctor));
                self.order.push(name);
            }
        }
    }

    /// The identity and constructor registered under `name`.
    pub fn lookup(&self, name: &DialectName) -> Option<(TypeID, DialectCtor)> {
        self.ctors
            .get(name)
            .map(|(id, ctor)| (*id, Arc::clone(ctor)))
    }

    /// Is a dialect registered under `name`?
    pub fn contains(&self, name: &DialectName) -> bool {
        self.ctors.contains_key(name)
    }

    /// Registered namespaces, in insertion order.
    pub fn dialect_names(&self) -> Vec<DialectName> {
        self.order.clone()
    }

    /// Add `ext`, keyed by its Rust type. Adding the same extension
    /// type twice keeps the first.
    pub fn add_extension<E: DialectExtension>(&mut self, ext: E) {
        self.extensions
            .entry(TypeID::get::<E>())
            .or_insert_with(|| Arc::new(ext));
    }

    /// All held extensions with their identities.
    pub(crate) fn extensions(&self) -> Vec<(TypeID, Arc<dyn DialectExtension>)> {
        self.extensions
            .iter()
            .map(|(id, ext)| (*id, Arc::clone(ext)))
            .collect()
    }

    /// Append everything in `self` to `destination`. Existing entries
    /// in `destination` are kept.
    pub fn append_to(&self, destination: &mut DialectRegistry) {
        for name in &self.order {
            let (id, ctor) = &self.ctors[name];
            destination.insert_dynamic(name.clone(), *id, Arc::clone(ctor));
        }
        for (id, ext) in &self.extensions {
            destination
                .extensions
                .entry(*id)
                .or_insert_with(|| Arc::clone(ext));
        }
    }

    /// Would appending `self` to `other` change `other`? Used by the
    /// context to skip redundant appends cheaply.
    pub fn is_subset_of(&self, other: &DialectRegistry) -> bool {
        self.ctors
            .iter()
            .all(|(name, (id, _))| matches!(other.ctors.get(name), Some((oid, _)) if oid == id))
            && self
                .extensions
                .keys()
                .all(|id| other.extensions.contains_key(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestDialect;
    impl DialectDefinition for TestDialect {
        const NAMESPACE: &'static str = "regtest";
        fn init(_ctx: &mut Context) -> Dialect {
            Dialect::new(DialectName::new(Self::NAMESPACE), TypeID::get::<Self>())
        }
    }

    #[test]
    fn empty_is_subset_of_everything() {
        let empty = DialectRegistry::new();
        let mut other = DialectRegistry::new();
        other.insert::<TestDialect>();
        assert!(empty.is_subset_of(&other));
        assert!(empty.is_subset_of(&DialectRegistry::new()));
        assert!(!other.is_subset_of(&empty));
    }

    #[test]
    fn append_then_subset() {
        let mut src = DialectRegistry::new();
        src.insert::<TestDialect>();
        let mut dst = DialectRegistry::new();
        src.append_to(&mut dst);
        assert!(src.is_subset_of(&dst));
        assert!(dst.is_subset_of(&src));
        // Appending again changes nothing.
        src.append_to(&mut dst);
        assert_eq!(dst.dialect_names().len(), 1);
    }

    #[test]
    fn reregistration_same_identity_is_noop() {
        let mut reg = DialectRegistry::new();
        reg.insert::<TestDialect>();
        reg.insert::<TestDialect>();
        assert_eq!(reg.dialect_names().len(), 1);
    }
}
