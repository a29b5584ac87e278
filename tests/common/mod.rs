//! A small dialect of ops used across the integration tests.

use corion::{
    attribute::Attribute,
    basic_block::BasicBlock,
    common_traits::Verify,
    context::{Context, Ptr},
    declare_op, impl_attr,
    dialect::{Dialect, DialectName},
    dialect_registry::{DialectDefinition, DialectRegistry},
    location::Location,
    op::Op,
    operation::Operation,
    printable::{self, Printable},
    r#type::{TypeObj, Typed},
    result::Result,
    type_id::TypeID,
    use_def_lists::Value,
};

pub struct TestDialect;

impl DialectDefinition for TestDialect {
    const NAMESPACE: &'static str = "test";

    fn init(ctx: &mut Context) -> Dialect {
        let mut dialect = Dialect::new(DialectName::new(Self::NAMESPACE), TypeID::get::<Self>());
        ConstOp::register(ctx, &mut dialect);
        AddOp::register(ctx, &mut dialect);
        BranchOp::register(ctx, &mut dialect);
        SplitOp::register(ctx, &mut dialect);
        FlagAttr::register_attr_in_dialect(ctx, &mut dialect);
        LabelAttr::register_attr_in_dialect(ctx, &mut dialect);
        CountAttr::register_attr_in_dialect(ctx, &mut dialect);
        dialect
    }
}

macro_rules! display_print_and_verify {
    ($attrname:ident) => {
        impl Printable for $attrname {
            fn fmt(
                &self,
                _ctx: &Context,
                _state: &printable::State,
                f: &mut core::fmt::Formatter<'_>,
            ) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl Verify for $attrname {
            fn verify(&self, _ctx: &Context) -> Result<()> {
                Ok(())
            }
        }
    };
}

/// A boolean marker attribute.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct FlagAttr(pub bool);
impl_attr!(FlagAttr, "flag", "test");
display_print_and_verify!(FlagAttr);

/// A free-form string attribute.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct LabelAttr(pub String);
impl_attr!(LabelAttr, "label", "test");
display_print_and_verify!(LabelAttr);

/// A counter attribute.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CountAttr(pub u64);
impl_attr!(CountAttr, "count", "test");
display_print_and_verify!(CountAttr);

/// A fresh [Context] with the test dialect loaded.
pub fn setup_context() -> Context {
    let mut ctx = Context::new();
    let mut registry = DialectRegistry::new();
    registry.insert::<TestDialect>();
    ctx.append_dialect_registry(&registry);
    ctx.load_dialect_by_name(&DialectName::new(TestDialect::NAMESPACE))
        .expect("test dialect must be registered");
    ctx
}

macro_rules! generic_print_and_verify {
    ($opname:ident) => {
        impl Printable for $opname {
            fn fmt(
                &self,
                ctx: &Context,
                state: &printable::State,
                f: &mut core::fmt::Formatter<'_>,
            ) -> core::fmt::Result {
                self.get_operation().fmt(ctx, state, f)
            }
        }

        impl Verify for $opname {
            fn verify(&self, _ctx: &Context) -> Result<()> {
                Ok(())
            }
        }
    };
}

declare_op!(
    /// Materializes a single value of a given type out of nothing.
    ConstOp,
    "const",
    "test"
);
generic_print_and_verify!(ConstOp);

impl ConstOp {
    pub fn new(ctx: &mut Context, ty: Ptr<TypeObj>) -> ConstOp {
        let op = Operation::new(
            ctx,
            Self::get_opid_static(),
            Location::Unknown,
            vec![ty],
            vec![],
            vec![],
            0,
        );
        ConstOp { op }
    }

    pub fn get_result(&self, ctx: &Context) -> Value {
        self.op
            .deref(ctx)
            .get_result(0)
            .expect("ConstOp with missing result")
    }
}

declare_op!(
    /// Two operands, one result of the first operand's type.
    AddOp,
    "add",
    "test"
);
generic_print_and_verify!(AddOp);

impl AddOp {
    pub fn new(ctx: &mut Context, lhs: Value, rhs: Value) -> AddOp {
        let ty = lhs.get_type(ctx);
        let op = Operation::new(
            ctx,
            Self::get_opid_static(),
            Location::Unknown,
            vec![ty],
            vec![lhs, rhs],
            vec![],
            0,
        );
        AddOp { op }
    }

    pub fn get_result(&self, ctx: &Context) -> Value {
        self.op
            .deref(ctx)
            .get_result(0)
            .expect("AddOp with missing result")
    }
}

declare_op!(
    /// Unconditional branch to a destination block.
    BranchOp,
    "branch",
    "test"
);
generic_print_and_verify!(BranchOp);

impl BranchOp {
    pub fn new(ctx: &mut Context, dest: Ptr<BasicBlock>) -> BranchOp {
        let op = Operation::new(
            ctx,
            Self::get_opid_static(),
            Location::Unknown,
            vec![],
            vec![],
            vec![dest],
            0,
        );
        BranchOp { op }
    }
}

declare_op!(
    /// Produces an arbitrary number of results of the given types.
    SplitOp,
    "split",
    "test"
);
generic_print_and_verify!(SplitOp);

impl SplitOp {
    pub fn new(ctx: &mut Context, result_types: Vec<Ptr<TypeObj>>) -> SplitOp {
        let op = Operation::new(
            ctx,
            Self::get_opid_static(),
            Location::Unknown,
            result_types,
            vec![],
            vec![],
            0,
        );
        SplitOp { op }
    }
}
