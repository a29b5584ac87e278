//! Types of the builtin dialect.

use thiserror::Error;

use crate::{
    common_traits::Verify,
    context::{Context, Ptr},
    dialect::Dialect,
    impl_type,
    printable::{self, fmt_iter, ListSeparator, Printable},
    r#type::{Type, TypeObj},
    result::Result,
    verify_err_noloc,
};

/// Whether arithmetic on an [IntegerType] is signed, unsigned, or left
/// to the operations interpreting it.
#[derive(Hash, PartialEq, Eq, Clone, Copy, Debug)]
pub enum Signedness {
    Signed,
    Unsigned,
    Signless,
}

/// Fixed width integer type.
#[derive(Hash, PartialEq, Eq, Debug)]
pub struct IntegerType {
    width: u32,
    signedness: Signedness,
}
impl_type!(IntegerType, "integer", "builtin");

impl IntegerType {
    /// Get or create a new integer type.
    pub fn get(ctx: &mut Context, width: u32, signedness: Signedness) -> Ptr<TypeObj> {
        Type::register_instance(IntegerType { width, signedness }, ctx)
    }

    /// Get, if it already exists, an integer type.
    pub fn get_existing(ctx: &Context, width: u32, signedness: Signedness) -> Option<Ptr<TypeObj>> {
        Type::get_instance(IntegerType { width, signedness }, ctx)
    }

    /// Get width.
    pub fn get_width(&self) -> u32 {
        self.width
    }

    /// Get signedness.
    pub fn get_signedness(&self) -> Signedness {
        self.signedness
    }
}

impl Printable for IntegerType {
    fn fmt(
        &self,
        _ctx: &Context,
        _state: &printable::State,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        match self.signedness {
            Signedness::Signed => write!(f, "si{}", self.width),
            Signedness::Unsigned => write!(f, "ui{}", self.width),
            Signedness::Signless => write!(f, "i{}", self.width),
        }
    }
}

#[derive(Debug, Error)]
#[error("integer width must be non-zero")]
pub struct ZeroWidthIntegerErr;

impl Verify for IntegerType {
    fn verify(&self, _ctx: &Context) -> Result<()> {
        if self.width == 0 {
            return verify_err_noloc!(ZeroWidthIntegerErr);
        }
        Ok(())
    }
}

/// An unbounded integer index, used where a platform-width integer is
/// called for.
#[derive(Hash, PartialEq, Eq, Debug)]
pub struct IndexType;
impl_type!(IndexType, "index", "builtin");

impl IndexType {
    /// Get or create the index type.
    pub fn get(ctx: &mut Context) -> Ptr<TypeObj> {
        Type::register_instance(IndexType, ctx)
    }
}

impl Printable for IndexType {
    fn fmt(
        &self,
        _ctx: &Context,
        _state: &printable::State,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        write!(f, "index")
    }
}

impl Verify for IndexType {
    fn verify(&self, _ctx: &Context) -> Result<()> {
        Ok(())
    }
}

/// The type of a value carrying no data.
#[derive(Hash, PartialEq, Eq, Debug)]
pub struct NoneType;
impl_type!(NoneType, "none", "builtin");

impl NoneType {
    /// Get or create the none type.
    pub fn get(ctx: &mut Context) -> Ptr<TypeObj> {
        Type::register_instance(NoneType, ctx)
    }
}

impl Printable for NoneType {
    fn fmt(
        &self,
        _ctx: &Context,
        _state: &printable::State,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        write!(f, "none")
    }
}

impl Verify for NoneType {
    fn verify(&self, _ctx: &Context) -> Result<()> {
        Ok(())
    }
}

/// A function's signature.
#[derive(Hash, PartialEq, Eq, Debug)]
pub struct FunctionType {
    inputs: Vec<Ptr<TypeObj>>,
    results: Vec<Ptr<TypeObj>>,
}
impl_type!(FunctionType, "function", "builtin");

impl FunctionType {
    /// Get or create a new function type.
    pub fn get(
        ctx: &mut Context,
        inputs: Vec<Ptr<TypeObj>>,
        results: Vec<Ptr<TypeObj>>,
    ) -> Ptr<TypeObj> {
        Type::register_instance(FunctionType { inputs, results }, ctx)
    }

    /// Input types of this signature.
    pub fn get_inputs(&self) -> &[Ptr<TypeObj>] {
        &self.inputs
    }

    /// Result types of this signature.
    pub fn get_results(&self) -> &[Ptr<TypeObj>] {
        &self.results
    }
}

impl Printable for FunctionType {
    fn fmt(
        &self,
        ctx: &Context,
        state: &printable::State,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        write!(f, "(")?;
        fmt_iter(
            self.inputs.iter(),
            ctx,
            state,
            ListSeparator::CharSpace(','),
            f,
        )?;
        write!(f, ") -> (")?;
        fmt_iter(
            self.results.iter(),
            ctx,
            state,
            ListSeparator::CharSpace(','),
            f,
        )?;
        write!(f, ")")
    }
}

impl Verify for FunctionType {
    fn verify(&self, _ctx: &Context) -> Result<()> {
        Ok(())
    }
}

pub(crate) fn register(ctx: &mut Context, dialect: &mut Dialect) {
    IntegerType::register_type_in_dialect(ctx, dialect);
    IndexType::register_type_in_dialect(ctx, dialect);
    NoneType::register_type_in_dialect(ctx, dialect);
    FunctionType::register_type_in_dialect(ctx, dialect);
}
