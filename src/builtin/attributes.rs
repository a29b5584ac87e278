//! Attributes of the builtin dialect.

use apint::ApInt;
use thiserror::Error;

use super::types::IntegerType;
use crate::{
    attribute::{AttrObj, Attribute},
    common_traits::Verify,
    context::{Context, Ptr},
    dialect::Dialect,
    identifier::Identifier,
    impl_attr,
    printable::{self, Printable},
    r#type::{TypeObj, Typed},
    result::Result,
    verify_err_noloc,
};

/// An attribute containing a string.
#[derive(Clone, PartialEq, Eq)]
pub struct StringAttr(String);
impl_attr!(StringAttr, "string", "builtin");

impl StringAttr {
    /// Create a new [StringAttr].
    pub fn create(value: String) -> AttrObj {
        Box::new(StringAttr(value))
    }
}

impl From<StringAttr> for String {
    fn from(value: StringAttr) -> Self {
        value.0
    }
}

impl Printable for StringAttr {
    fn fmt(
        &self,
        _ctx: &Context,
        _state: &printable::State,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl Verify for StringAttr {
    fn verify(&self, _ctx: &Context) -> Result<()> {
        Ok(())
    }
}

/// An attribute containing an arbitrary precision integer and the
/// [IntegerType](super::types::IntegerType) interpreting it.
#[derive(Clone, PartialEq, Eq)]
pub struct IntegerAttr {
    ty: Ptr<TypeObj>,
    val: ApInt,
}
impl_attr!(IntegerAttr, "integer", "builtin");

impl IntegerAttr {
    /// Create a new [IntegerAttr].
    pub fn create(ty: Ptr<TypeObj>, val: ApInt) -> AttrObj {
        Box::new(IntegerAttr { ty, val })
    }

    /// The type interpreting this attribute's bits.
    pub fn get_type(&self) -> Ptr<TypeObj> {
        self.ty
    }
}

impl From<IntegerAttr> for ApInt {
    fn from(value: IntegerAttr) -> Self {
        value.val
    }
}

impl Printable for IntegerAttr {
    fn fmt(
        &self,
        ctx: &Context,
        _state: &printable::State,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        write!(f, "0x{:x}: {}", self.val, self.ty.disp(ctx))
    }
}

#[derive(Debug, Error)]
#[error("IntegerAttr must be of IntegerType")]
pub struct IntegerAttrVerifyErr;

impl Verify for IntegerAttr {
    fn verify(&self, ctx: &Context) -> Result<()> {
        if !self.ty.deref(ctx).is::<IntegerType>() {
            return verify_err_noloc!(IntegerAttrVerifyErr);
        }
        Ok(())
    }
}

/// An attribute containing a boolean.
#[derive(Clone, PartialEq, Eq)]
pub struct BoolAttr(bool);
impl_attr!(BoolAttr, "bool", "builtin");

impl BoolAttr {
    /// Create a new [BoolAttr].
    pub fn create(value: bool) -> AttrObj {
        Box::new(BoolAttr(value))
    }
}

impl From<&BoolAttr> for bool {
    fn from(value: &BoolAttr) -> Self {
        value.0
    }
}

impl Printable for BoolAttr {
    fn fmt(
        &self,
        _ctx: &Context,
        _state: &printable::State,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Verify for BoolAttr {
    fn verify(&self, _ctx: &Context) -> Result<()> {
        Ok(())
    }
}

/// An attribute that carries no data; its presence is the information.
#[derive(Clone, PartialEq, Eq)]
pub struct UnitAttr;
impl_attr!(UnitAttr, "unit", "builtin");

impl UnitAttr {
    /// Create a new [UnitAttr].
    pub fn create() -> AttrObj {
        Box::new(UnitAttr)
    }
}

impl Printable for UnitAttr {
    fn fmt(
        &self,
        _ctx: &Context,
        _state: &printable::State,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        write!(f, "unit")
    }
}

impl Verify for UnitAttr {
    fn verify(&self, _ctx: &Context) -> Result<()> {
        Ok(())
    }
}

/// An attribute containing a sorted dictionary of attributes, keyed by
/// [Identifier].
#[derive(Clone, PartialEq, Eq)]
pub struct DictAttr(Vec<(Identifier, AttrObj)>);
impl_attr!(DictAttr, "dict", "builtin");

impl DictAttr {
    /// Create a new [DictAttr]. Keys must be distinct.
    pub fn create(value: Vec<(Identifier, AttrObj)>) -> AttrObj {
        let mut value = value;
        value.sort_by(|(key1, _), (key2, _)| key1.cmp(key2));
        value
            .windows(2)
            .for_each(|w| assert!(w[0].0 != w[1].0, "DictAttr with duplicate key"));
        Box::new(DictAttr(value))
    }

    /// Look up `key` in the dictionary.
    pub fn lookup(&self, key: &Identifier) -> Option<&AttrObj> {
        self.0
            .binary_search_by(|(k, _)| k.cmp(key))
            .ok()
            .map(|idx| &self.0[idx].1)
    }
}

impl Printable for DictAttr {
    fn fmt(
        &self,
        ctx: &Context,
        state: &printable::State,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        write!(f, "{{")?;
        for (i, (key, val)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{key} = ")?;
            val.fmt(ctx, state, f)?;
        }
        write!(f, "}}")
    }
}

impl Verify for DictAttr {
    fn verify(&self, ctx: &Context) -> Result<()> {
        for (key, val) in &self.0 {
            key.verify(ctx)?;
            val.verify(ctx)?;
        }
        Ok(())
    }
}

/// An attribute referring to a [Type](crate::type::Type).
#[derive(Clone, PartialEq, Eq)]
pub struct TypeAttr(Ptr<TypeObj>);
impl_attr!(TypeAttr, "type", "builtin");

impl TypeAttr {
    /// Create a new [TypeAttr].
    pub fn create(ty: Ptr<TypeObj>) -> AttrObj {
        Box::new(TypeAttr(ty))
    }
}

impl Typed for TypeAttr {
    fn get_type(&self, _ctx: &Context) -> Ptr<TypeObj> {
        self.0
    }
}

impl Printable for TypeAttr {
    fn fmt(
        &self,
        ctx: &Context,
        _state: &printable::State,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        write!(f, "<{}>", self.0.disp(ctx))
    }
}

impl Verify for TypeAttr {
    fn verify(&self, _ctx: &Context) -> Result<()> {
        Ok(())
    }
}

pub(crate) fn register(ctx: &mut Context, dialect: &mut Dialect) {
    StringAttr::register_attr_in_dialect(ctx, dialect);
    IntegerAttr::register_attr_in_dialect(ctx, dialect);
    BoolAttr::register_attr_in_dialect(ctx, dialect);
    UnitAttr::register_attr_in_dialect(ctx, dialect);
    DictAttr::register_attr_in_dialect(ctx, dialect);
    TypeAttr::register_attr_in_dialect(ctx, dialect);
}

#[cfg(test)]
mod tests {
    use apint::ApInt;
    use expect_test::expect;

    use crate::{context::Context, printable::Printable};

    use super::{BoolAttr, DictAttr, IntegerAttr, StringAttr};

    #[test]
    fn attrs_compare_by_value_and_kind() {
        let hello1 = StringAttr::create("hello".to_string());
        let hello2 = StringAttr::create("hello".to_string());
        let world = StringAttr::create("world".to_string());
        assert!(hello1 == hello2);
        assert!(hello1 != world);
        // Same payload, different kind.
        let truthy = BoolAttr::create(true);
        assert!(hello1 != truthy);
    }

    #[test]
    fn attrs_clone_independently() {
        let a = StringAttr::create("alpha".to_string());
        let b = a.clone();
        assert!(a == b);
    }

    #[test]
    fn dict_attr_lookup_and_print() {
        let ctx = &mut Context::new();
        let i64_ty = ctx.cached().i64_type;
        let dict = DictAttr::create(vec![
            ("flag".into(), BoolAttr::create(false)),
            ("count".into(), IntegerAttr::create(i64_ty, ApInt::from(42u64))),
        ]);
        let dict_ref = dict.downcast_ref::<DictAttr>().unwrap();
        assert!(dict_ref.lookup(&"flag".into()).unwrap() == &BoolAttr::create(false));
        assert!(dict_ref.lookup(&"missing".into()).is_none());
        expect![[r#"{count = 0x2a: i64, flag = false}"#]]
            .assert_eq(&dict.disp(ctx).to_string());
    }
}
