//! Every type in the IR must implement the [Type] trait.
//!
//! Types are value-immutable and uniqued in the [Context]: structurally
//! equal instances of one kind share a single [Ptr<TypeObj>], so
//! pointer equality is type equality. A type's kind must be registered
//! (to its dialect and the context) before instances can be created.
//!
//! [Type]s that implement [Hash] and [PartialEq] can use [impl_type!]
//! for the boilerplate.

use std::{hash::Hash, marker::PhantomData};

use downcast_rs::{impl_downcast, Downcast};

use crate::{
    common_traits::Verify,
    context::{ArenaCell, ArenaObj, Context, Ptr},
    dialect::{Dialect, DialectName},
    identifier::Identifier,
    printable::{self, Printable},
    storage_uniquer::TypeValueHash,
    type_id::TypeID,
};

pub trait Type: Printable + Verify + Downcast + Send + Sync {
    /// Compute and get the hash for this instance of Self.
    /// Hash collisions can be a possibility.
    fn hash_type(&self) -> TypeValueHash;
    /// Is self equal to an other Type?
    fn eq_type(&self, other: &dyn Type) -> bool;

    /// Get a copyable pointer to this type.
    fn get_self_ptr(&self, ctx: &Context) -> Ptr<TypeObj> {
        let is = |other: &TypeObj| self.eq_type(other.as_ref());
        let idx = ctx
            .type_store
            .get(self.hash_type(), &is)
            .expect("type not registered with the context");
        Ptr {
            idx,
            _dummy: PhantomData,
        }
    }

    /// Register an instance of a type in the provided [Context].
    /// Instances are uniqued: a structurally equal instance may already
    /// exist, in which case its [Ptr] is returned.
    ///
    /// Panics if this type's kind was not registered with the context.
    fn register_instance(t: Self, ctx: &mut Context) -> Ptr<TypeObj>
    where
        Self: Sized,
    {
        let kind = t.get_type_id();
        assert!(
            ctx.type_kinds.contains_key(&kind),
            "instance created for unregistered type kind '{}'",
            kind.disp(ctx)
        );
        let hash = |t: &TypeObj| t.hash_type();
        let eq = |t1: &TypeObj, t2: &TypeObj| t1.eq_type(t2.as_ref());
        let idx = ctx
            .type_store
            .get_or_create_unique(Box::new(t), &hash, &eq);
        Ptr {
            idx,
            _dummy: PhantomData,
        }
    }

    /// If an instance of `t` already exists in `ctx`, get its [Ptr].
    fn get_instance(t: Self, ctx: &Context) -> Option<Ptr<TypeObj>>
    where
        Self: Sized,
    {
        let is = |other: &TypeObj| t.eq_type(other.as_ref());
        ctx.type_store.get(t.hash_type(), &is).map(|idx| Ptr {
            idx,
            _dummy: PhantomData,
        })
    }

    /// Get a [TypeId] for this type's kind.
    fn get_type_id(&self) -> TypeId;

    /// Same as [get_type_id](Self::get_type_id), but without an instance.
    fn get_type_id_static() -> TypeId
    where
        Self: Sized;

    /// Register this type's kind with the context and its dialect.
    /// The [TypeID] of the Rust type is recorded as the kind's
    /// identity; registering two distinct Rust types under one
    /// [TypeId] panics.
    fn register_type_in_dialect(ctx: &mut Context, dialect: &mut Dialect)
    where
        Self: Sized,
    {
        ctx.assert_not_in_parallel_execution("registering a type kind");
        let abstract_type = AbstractType {
            id: Self::get_type_id_static(),
            defining_id: TypeID::get::<Self>(),
        };
        match ctx.type_kinds.get(&abstract_type.id) {
            Some(existing) => {
                assert!(
                    existing.defining_id == abstract_type.defining_id,
                    "conflicting registrations for type kind '{}'",
                    existing.id.disp(ctx)
                );
            }
            None => {
                dialect.add_type(abstract_type.id.clone());
                ctx.type_kinds.insert(abstract_type.id.clone(), abstract_type);
            }
        }
    }
}
impl_downcast!(Type);

/// Metadata the context keeps per registered type kind.
pub(crate) struct AbstractType {
    /// The kind being described.
    pub(crate) id: TypeId,
    /// Identity of the Rust type implementing the kind.
    pub(crate) defining_id: TypeID,
}

/// Name of a [Type]'s kind, within its dialect.
#[derive(Clone, Hash, PartialEq, Eq, Debug)]
pub struct TypeName(Identifier);

impl TypeName {
    /// Create a new TypeName.
    pub fn new(name: &str) -> TypeName {
        TypeName(name.into())
    }
}

impl Printable for TypeName {
    fn fmt(
        &self,
        _ctx: &Context,
        _state: &printable::State,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for TypeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A [Type]'s kind: its dialect and its name within that dialect.
#[derive(Clone, Hash, PartialEq, Eq, Debug)]
pub struct TypeId {
    pub dialect: DialectName,
    pub name: TypeName,
}

impl Printable for TypeId {
    fn fmt(
        &self,
        _ctx: &Context,
        _state: &printable::State,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        write!(f, "{}.{}", self.dialect, self.name)
    }
}

/// Since we can't store the [Type] trait in the arena,
/// we store boxed dyn objects of it instead.
pub type TypeObj = Box<dyn Type>;

impl PartialEq for dyn Type {
    fn eq(&self, other: &Self) -> bool {
        self.eq_type(other)
    }
}

impl Eq for dyn Type {}

impl ArenaObj for TypeObj {
    fn get_arena(ctx: &Context) -> &ArenaCell<Self> {
        &ctx.type_store.unique_store
    }

    fn get_arena_mut(ctx: &mut Context) -> &mut ArenaCell<Self> {
        &mut ctx.type_store.unique_store
    }

    fn get_self_ptr(&self, ctx: &Context) -> Ptr<Self> {
        self.as_ref().get_self_ptr(ctx)
    }

    fn dealloc_sub_objects(_ptr: Ptr<Self>, _ctx: &mut Context) {
        panic!("types are uniqued in the context and never deallocated")
    }
}

impl Printable for TypeObj {
    fn fmt(
        &self,
        ctx: &Context,
        state: &printable::State,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        self.as_ref().fmt(ctx, state, f)
    }
}

impl Verify for TypeObj {
    fn verify(&self, ctx: &Context) -> crate::result::Result<()> {
        self.as_ref().verify(ctx)
    }
}

/// Anything that has a [Type].
pub trait Typed {
    fn get_type(&self, ctx: &Context) -> Ptr<TypeObj>;
}

impl Typed for Ptr<TypeObj> {
    fn get_type(&self, _ctx: &Context) -> Ptr<TypeObj> {
        *self
    }
}

/// Implement [Type] for a rust type that implements [Hash] and
/// [PartialEq], naming its kind.
#[macro_export]
macro_rules! impl_type {
    ($structname: ident, $type_name: literal, $dialect_name: literal) => {
        impl $crate::r#type::Type for $structname {
            fn hash_type(&self) -> $crate::storage_uniquer::TypeValueHash {
                $crate::storage_uniquer::TypeValueHash::new(self)
            }

            fn eq_type(&self, other: &dyn $crate::r#type::Type) -> bool {
                other
                    .downcast_ref::<Self>()
                    .map_or(false, |other| other == self)
            }

            fn get_type_id(&self) -> $crate::r#type::TypeId {
                Self::get_type_id_static()
            }

            fn get_type_id_static() -> $crate::r#type::TypeId {
                $crate::r#type::TypeId {
                    name: $crate::r#type::TypeName::new($type_name),
                    dialect: $crate::dialect::DialectName::new($dialect_name),
                }
            }
        }
    };
}
