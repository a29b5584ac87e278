//! An [Op] is a thin, copyable typed wrapper around an
//! [Operation](crate::operation::Operation) [Ptr], providing the
//! kind-specific API of that operation. The wrapped [Operation] is the
//! data; the [Op] is the view. Op kinds are registered with the
//! [Context] per dialect; creating or wrapping an [Operation] whose
//! kind was never registered panics.
//!
//! New [Op]s can be easily declared using the [declare_op!] macro.

use downcast_rs::{impl_downcast, Downcast};

use crate::{
    common_traits::Verify,
    context::{Context, Ptr},
    dialect::{Dialect, DialectName},
    identifier::Identifier,
    operation::Operation,
    printable::{self, Printable},
};

pub trait Op: Downcast + Verify + Printable {
    /// Get the underlying IR Operation.
    fn get_operation(&self) -> Ptr<Operation>;
    /// Create a new Op object, by wrapping an existing [Operation].
    fn wrap_operation(op: Ptr<Operation>) -> OpObj
    where
        Self: Sized;
    /// Get this Op's [OpId].
    fn get_opid(&self) -> OpId;
    /// Same as [get_opid](Self::get_opid), but without an instance.
    fn get_opid_static() -> OpId
    where
        Self: Sized;

    /// Register this Op's kind with the context and its dialect.
    /// Re-registration is a no-op.
    fn register(ctx: &mut Context, dialect: &mut Dialect)
    where
        Self: Sized,
    {
        let opid = Self::get_opid_static();
        if ctx.ops.contains_key(&opid) {
            return;
        }
        ctx.assert_not_in_parallel_execution("registering an op kind");
        ctx.ops.insert(opid.clone(), Self::wrap_operation);
        dialect.add_op(opid);
    }
}
impl_downcast!(Op);

/// Create [OpObj] from [`Ptr<Operation>`](Operation).
pub(crate) type OpCreator = fn(Ptr<Operation>) -> OpObj;

/// Since we can't store the [Op] trait in containers,
/// we store boxed dyn objects of it instead.
pub type OpObj = Box<dyn Op>;

/// Wrap `op` into the [Op] registered for its kind.
/// Panics if the kind was never registered with `ctx`.
pub fn from_operation(ctx: &Context, op: Ptr<Operation>) -> OpObj {
    let opid = op.deref(ctx).get_opid();
    let creator = ctx
        .ops
        .get(&opid)
        .unwrap_or_else(|| panic!("Unregistered Op {}", opid.disp(ctx)));
    creator(op)
}

/// Name of an [Op]'s kind, within its dialect.
#[derive(Clone, Hash, PartialEq, Eq, Debug)]
pub struct OpName(Identifier);

impl OpName {
    /// Create a new OpName.
    pub fn new(name: &str) -> OpName {
        OpName(name.into())
    }
}

impl Printable for OpName {
    fn fmt(
        &self,
        _ctx: &Context,
        _state: &printable::State,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for OpName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An [Op]'s kind: its dialect and its name within that dialect.
#[derive(Clone, Hash, PartialEq, Eq, Debug)]
pub struct OpId {
    pub dialect: DialectName,
    pub name: OpName,
}

impl Printable for OpId {
    fn fmt(
        &self,
        _ctx: &Context,
        _state: &printable::State,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        write!(f, "{}.{}", self.dialect, self.name)
    }
}

impl std::fmt::Display for OpId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.dialect, self.name)
    }
}

/// Declare an [Op]: a named struct wrapping a
/// [`Ptr<Operation>`](crate::operation::Operation), with the [Op]
/// boilerplate implemented. [Verify](crate::common_traits::Verify) and
/// [Printable](crate::printable::Printable) remain to be implemented by
/// hand.
///
/// Usage:
/// ```ignore
/// declare_op!(ModuleOp, "module", "builtin");
/// ```
#[macro_export]
macro_rules! declare_op {
    (   $(#[$outer:meta])*
        $structname: ident, $op_name: literal, $dialect_name: literal) => {
        $(#[$outer])*
        #[derive(Clone, Copy)]
        pub struct $structname {
            op: $crate::context::Ptr<$crate::operation::Operation>,
        }

        impl $crate::op::Op for $structname {
            fn get_operation(&self) -> $crate::context::Ptr<$crate::operation::Operation> {
                self.op
            }

            fn wrap_operation(
                op: $crate::context::Ptr<$crate::operation::Operation>,
            ) -> $crate::op::OpObj {
                Box::new($structname { op })
            }

            fn get_opid(&self) -> $crate::op::OpId {
                Self::get_opid_static()
            }

            fn get_opid_static() -> $crate::op::OpId {
                $crate::op::OpId {
                    name: $crate::op::OpName::new($op_name),
                    dialect: $crate::dialect::DialectName::new($dialect_name),
                }
            }
        }
    };
}
