//! Attributes attach compile-time data to [Operation](crate::operation::Operation)s.
//!
//! Unlike [Type](crate::type::Type)s, attributes are not uniqued:
//! each [AttrObj] is an owned, cloneable value living in the operation
//! that holds it, so it can be mutated in place through the operation.
//! An attribute kind must be registered before instances of it are
//! attached to operations.
//!
//! [Attribute]s that implement [Clone] and [PartialEq] can use
//! [impl_attr!] for the boilerplate.

use downcast_rs::{impl_downcast, Downcast};
use dyn_clone::DynClone;

use crate::{
    common_traits::Verify,
    context::Context,
    dialect::{Dialect, DialectName},
    identifier::Identifier,
    printable::{self, Printable},
};

pub trait Attribute: Printable + Verify + Downcast + DynClone + Send + Sync {
    /// Is self equal to an other Attribute?
    fn eq_attr(&self, other: &dyn Attribute) -> bool;

    /// Get an [AttrId] for this attribute's kind.
    fn get_attr_id(&self) -> AttrId;

    /// Same as [get_attr_id](Self::get_attr_id), but without an instance.
    fn get_attr_id_static() -> AttrId
    where
        Self: Sized;

    /// Register this attribute's kind with the context and its dialect.
    /// Re-registration under the same dialect is a no-op.
    fn register_attr_in_dialect(ctx: &mut Context, dialect: &mut Dialect)
    where
        Self: Sized,
    {
        ctx.assert_not_in_parallel_execution("registering an attribute kind");
        let id = Self::get_attr_id_static();
        match ctx.attr_kinds.get(&id) {
            Some(owner) => {
                assert!(
                    owner == dialect.name(),
                    "attribute kind '{}' already registered to dialect '{owner}'",
                    id.disp(ctx)
                );
            }
            None => {
                ctx.attr_kinds.insert(id.clone(), dialect.name().clone());
                dialect.add_attr(id);
            }
        }
    }
}
impl_downcast!(Attribute);
dyn_clone::clone_trait_object!(Attribute);

/// Name of an [Attribute]'s kind, within its dialect.
#[derive(Clone, Hash, PartialEq, Eq, Debug)]
pub struct AttrName(Identifier);

impl AttrName {
    /// Create a new AttrName.
    pub fn new(name: &str) -> AttrName {
        AttrName(name.into())
    }
}

impl Printable for AttrName {
    fn fmt(
        &self,
        _ctx: &Context,
        _state: &printable::State,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for AttrName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An [Attribute]'s kind: its dialect and its name within that dialect.
#[derive(Clone, Hash, PartialEq, Eq, Debug)]
pub struct AttrId {
    pub dialect: DialectName,
    pub name: AttrName,
}

impl Printable for AttrId {
    fn fmt(
        &self,
        _ctx: &Context,
        _state: &printable::State,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        write!(f, "{}.{}", self.dialect, self.name)
    }
}

/// Since we can't store the [Attribute] trait in containers,
/// we store boxed dyn objects of it instead.
pub type AttrObj = Box<dyn Attribute>;

impl PartialEq for dyn Attribute {
    fn eq(&self, other: &Self) -> bool {
        self.eq_attr(other)
    }
}

impl Eq for dyn Attribute {}

impl Printable for AttrObj {
    fn fmt(
        &self,
        ctx: &Context,
        state: &printable::State,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        self.as_ref().fmt(ctx, state, f)
    }
}

impl Verify for AttrObj {
    fn verify(&self, ctx: &Context) -> crate::result::Result<()> {
        self.as_ref().verify(ctx)
    }
}

/// Implement [Attribute] for a rust type that implements [Clone] and
/// [PartialEq], naming its kind.
#[macro_export]
macro_rules! impl_attr {
    ($structname: ident, $attr_name: literal, $dialect_name: literal) => {
        impl $crate::attribute::Attribute for $structname {
            fn eq_attr(&self, other: &dyn $crate::attribute::Attribute) -> bool {
                other
                    .downcast_ref::<Self>()
                    .map_or(false, |other| other == self)
            }

            fn get_attr_id(&self) -> $crate::attribute::AttrId {
                Self::get_attr_id_static()
            }

            fn get_attr_id_static() -> $crate::attribute::AttrId {
                $crate::attribute::AttrId {
                    name: $crate::attribute::AttrName::new($attr_name),
                    dialect: $crate::dialect::DialectName::new($dialect_name),
                }
            }
        }
    };
}
