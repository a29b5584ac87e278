//! [Op]s of the builtin dialect.

use once_cell::sync::Lazy;
use thiserror::Error;

use super::{
    attributes::{StringAttr, TypeAttr},
    types::FunctionType,
};
use crate::{
    basic_block::BasicBlock,
    common_traits::Verify,
    context::{Context, Ptr},
    declare_op,
    dialect::Dialect,
    identifier::Identifier,
    location::Location,
    op::Op,
    operation::Operation,
    printable::{self, Printable},
    r#type::{TypeObj, Typed},
    region::Region,
    result::Result,
    verify_err_noloc,
};

/// Property key for a symbol defining operation's name.
pub static PROP_KEY_SYM_NAME: Lazy<Identifier> = Lazy::new(|| "sym_name".into());
/// Property key for a [FuncOp]'s signature.
pub static PROP_KEY_FUNC_TYPE: Lazy<Identifier> = Lazy::new(|| "function_type".into());

declare_op!(
    /// A top level container operation with a single region holding a
    /// single block of arbitrary operations.
    ModuleOp,
    "module",
    "builtin"
);

#[derive(Debug, Error)]
#[error("ModuleOp must have a StringAttr sym_name property")]
pub struct ModuleOpVerifyErr;

impl ModuleOp {
    /// Create a new [ModuleOp] named `name`.
    /// The underlying [Operation] is not linked to a [BasicBlock].
    pub fn new(ctx: &mut Context, name: &str) -> ModuleOp {
        let op = Operation::new(
            ctx,
            Self::get_opid_static(),
            Location::Unknown,
            vec![],
            vec![],
            vec![],
            1,
        );
        op.deref_mut(ctx).set_property(
            PROP_KEY_SYM_NAME.clone(),
            StringAttr::create(name.to_string()),
        );
        let opop = ModuleOp { op };
        let block = BasicBlock::new(ctx, None, vec![]);
        block.insert_at_front(opop.get_region(ctx), ctx);
        opop
    }

    /// The single region of this module.
    pub fn get_region(&self, ctx: &Context) -> Ptr<Region> {
        self.op
            .deref(ctx)
            .get_region(0)
            .expect("ModuleOp with missing region")
    }

    /// The single block within this module's region.
    pub fn get_body(&self, ctx: &Context) -> Ptr<BasicBlock> {
        self.get_region(ctx)
            .deref(ctx)
            .get_entry_block()
            .expect("ModuleOp with missing body")
    }

    /// Name of this module.
    pub fn get_name(&self, ctx: &Context) -> String {
        let op = self.op.deref(ctx);
        let name = op
            .property(&PROP_KEY_SYM_NAME)
            .and_then(|attr| attr.downcast_ref::<StringAttr>())
            .expect("ModuleOp with missing or malformed sym_name");
        name.clone().into()
    }
}

impl Printable for ModuleOp {
    fn fmt(
        &self,
        ctx: &Context,
        state: &printable::State,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        write!(f, "{} @{}", self.get_opid(), self.get_name(ctx))?;
        self.get_region(ctx).fmt(ctx, state, f)
    }
}

impl Verify for ModuleOp {
    fn verify(&self, ctx: &Context) -> Result<()> {
        let op = &*self.op.deref(ctx);
        let name_ok = op
            .property(&PROP_KEY_SYM_NAME)
            .is_some_and(|attr| attr.is::<StringAttr>());
        if !name_ok || op.num_regions() != 1 || op.get_num_results() != 0 {
            return verify_err_noloc!(ModuleOpVerifyErr);
        }
        Ok(())
    }
}

declare_op!(
    /// A named function with a single region. The entry block's
    /// arguments are the function's parameters.
    FuncOp,
    "func",
    "builtin"
);

#[derive(Debug, Error)]
#[error("FuncOp must have sym_name and function_type properties")]
pub struct FuncOpVerifyErr;

impl FuncOp {
    /// Create a new [FuncOp] with an empty `entry` block whose
    /// arguments match the signature's inputs.
    /// `ty` must be a [FunctionType].
    pub fn new(ctx: &mut Context, name: &str, ty: Ptr<TypeObj>) -> FuncOp {
        let arg_types = ty
            .deref(ctx)
            .downcast_ref::<FunctionType>()
            .expect("FuncOp type must be a FunctionType")
            .get_inputs()
            .to_vec();
        let op = Operation::new(
            ctx,
            Self::get_opid_static(),
            Location::Unknown,
            vec![],
            vec![],
            vec![],
            1,
        );
        {
            let op = &mut *op.deref_mut(ctx);
            op.set_property(
                PROP_KEY_SYM_NAME.clone(),
                StringAttr::create(name.to_string()),
            );
            op.set_property(PROP_KEY_FUNC_TYPE.clone(), TypeAttr::create(ty));
        }
        let opop = FuncOp { op };
        let entry = BasicBlock::new(ctx, Some("entry".into()), arg_types);
        entry.insert_at_front(opop.get_region(ctx), ctx);
        opop
    }

    /// The single region of this function.
    pub fn get_region(&self, ctx: &Context) -> Ptr<Region> {
        self.op
            .deref(ctx)
            .get_region(0)
            .expect("FuncOp with missing region")
    }

    /// The entry block of this function.
    pub fn get_entry_block(&self, ctx: &Context) -> Ptr<BasicBlock> {
        self.get_region(ctx)
            .deref(ctx)
            .get_entry_block()
            .expect("FuncOp with missing entry block")
    }

    /// Name of this function.
    pub fn get_name(&self, ctx: &Context) -> String {
        let op = self.op.deref(ctx);
        let name = op
            .property(&PROP_KEY_SYM_NAME)
            .and_then(|attr| attr.downcast_ref::<StringAttr>())
            .expect("FuncOp with missing or malformed sym_name");
        name.clone().into()
    }
}

impl Typed for FuncOp {
    fn get_type(&self, ctx: &Context) -> Ptr<TypeObj> {
        let op = self.op.deref(ctx);
        let ty_attr = op
            .property(&PROP_KEY_FUNC_TYPE)
            .and_then(|attr| attr.downcast_ref::<TypeAttr>())
            .expect("FuncOp with missing or malformed function_type");
        ty_attr.get_type(ctx)
    }
}

impl Printable for FuncOp {
    fn fmt(
        &self,
        ctx: &Context,
        state: &printable::State,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        write!(
            f,
            "{} @{}: {}",
            self.get_opid(),
            self.get_name(ctx),
            self.get_type(ctx).disp(ctx)
        )?;
        self.get_region(ctx).fmt(ctx, state, f)
    }
}

impl Verify for FuncOp {
    fn verify(&self, ctx: &Context) -> Result<()> {
        let ty = {
            let op = &*self.op.deref(ctx);
            let name_ok = op
                .property(&PROP_KEY_SYM_NAME)
                .is_some_and(|attr| attr.is::<StringAttr>());
            let ty = op
                .property(&PROP_KEY_FUNC_TYPE)
                .and_then(|attr| attr.downcast_ref::<TypeAttr>())
                .map(|ty_attr| ty_attr.get_type(ctx));
            let (Some(ty), true) = (ty, name_ok && op.num_regions() == 1) else {
                return verify_err_noloc!(FuncOpVerifyErr);
            };
            ty
        };
        if !ty.deref(ctx).is::<FunctionType>() {
            return verify_err_noloc!(FuncOpVerifyErr);
        }
        Ok(())
    }
}

pub(crate) fn register(ctx: &mut Context, dialect: &mut Dialect) {
    ModuleOp::register(ctx, dialect);
    FuncOp::register(ctx, dialect);
}

#[cfg(test)]
mod tests {
    use crate::{
        builtin::{ops::ModuleOp, types::FunctionType},
        common_traits::{Named, Verify},
        context::Context,
        op::Op,
        printable::Printable,
        r#type::Typed,
    };

    use super::FuncOp;

    #[test]
    fn module_op_create_and_print() {
        let ctx = &mut Context::new();
        let module = ModuleOp::new(ctx, "test_module");
        assert_eq!(module.get_name(ctx), "test_module");
        module.verify(ctx).unwrap();
        let body_name = module.get_body(ctx).deref(ctx).unique_name(ctx);
        assert_eq!(
            module.disp(ctx).to_string(),
            format!("builtin.module @test_module {{\n^{body_name}():\n}}")
        );
    }

    #[test]
    fn func_op_entry_block_matches_signature() {
        let ctx = &mut Context::new();
        let i32_ty = ctx.cached().i32_type;
        let i64_ty = ctx.cached().i64_type;
        let sig = FunctionType::get(ctx, vec![i32_ty, i64_ty], vec![i32_ty]);
        let func = FuncOp::new(ctx, "add", sig);
        func.verify(ctx).unwrap();
        assert_eq!(func.get_type(ctx), sig);
        let entry = func.get_entry_block(ctx);
        assert_eq!(entry.deref(ctx).get_num_arguments(), 2);
        assert_eq!(entry.deref(ctx).arg_types(), vec![i32_ty, i64_ty]);
    }

    #[test]
    fn module_holds_funcs() {
        let ctx = &mut Context::new();
        let module = ModuleOp::new(ctx, "m");
        let sig = FunctionType::get(ctx, vec![], vec![]);
        let func = FuncOp::new(ctx, "f", sig);
        func.get_operation().insert_at_back(module.get_body(ctx), ctx);
        module.verify(ctx).unwrap();
    }
}
