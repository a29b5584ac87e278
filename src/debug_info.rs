//! Utilities for attaching / retrieving debug info to / from the IR.
//!
//! Names given to [Operation] results and [BasicBlock] arguments are
//! stored as discardable [StringAttr] attributes on the owning object,
//! one key per index.

use crate::{
    basic_block::BasicBlock,
    builtin::attributes::StringAttr,
    context::{Context, Ptr},
    identifier::Identifier,
    operation::Operation,
};

/// Attribute key under which the name of the idx'th result / argument
/// is stored.
fn name_key(idx: usize) -> Identifier {
    format!("debug_info_name_{idx}").into()
}

/// Set the name for a result in an [Operation].
/// Panics if the given `res_idx` is out of range.
pub fn set_operation_result_name(
    ctx: &Context,
    op: Ptr<Operation>,
    res_idx: usize,
    name: String,
) {
    let op = &mut *op.deref_mut(ctx);
    assert!(res_idx < op.get_num_results());
    op.set_attr(name_key(res_idx), StringAttr::create(name));
}

/// Get the name, if any, given to a result in an [Operation].
pub fn get_operation_result_name(
    ctx: &Context,
    op: Ptr<Operation>,
    res_idx: usize,
) -> Option<String> {
    operation_result_name(&op.deref(ctx), res_idx)
}

/// Same as [get_operation_result_name], but on an already borrowed
/// [Operation].
pub(crate) fn operation_result_name(op: &Operation, res_idx: usize) -> Option<String> {
    op.attr(&name_key(res_idx))
        .and_then(|attr| attr.downcast_ref::<StringAttr>())
        .map(|name| name.clone().into())
}

/// Set the name for an argument in a [BasicBlock].
/// Panics if the given `arg_idx` is out of range.
pub fn set_block_arg_name(ctx: &Context, block: Ptr<BasicBlock>, arg_idx: usize, name: String) {
    let block = &mut *block.deref_mut(ctx);
    assert!(arg_idx < block.get_num_arguments());
    block.set_attr(name_key(arg_idx), StringAttr::create(name));
}

/// Get the name, if any, given to an argument in a [BasicBlock].
pub fn get_block_arg_name(ctx: &Context, block: Ptr<BasicBlock>, arg_idx: usize) -> Option<String> {
    block_arg_name(&block.deref(ctx), arg_idx)
}

/// Same as [get_block_arg_name], but on an already borrowed
/// [BasicBlock].
pub(crate) fn block_arg_name(block: &BasicBlock, arg_idx: usize) -> Option<String> {
    block
        .attr(&name_key(arg_idx))
        .and_then(|attr| attr.downcast_ref::<StringAttr>())
        .map(|name| name.clone().into())
}

#[cfg(test)]
mod tests {
    use crate::{
        basic_block::BasicBlock,
        common_traits::Named,
        context::Context,
        debug_info::{get_block_arg_name, set_block_arg_name},
    };

    #[test]
    fn block_arg_names_round_trip() {
        let ctx = &mut Context::new();
        let i32_ty = ctx.cached().i32_type;
        let block = BasicBlock::new(ctx, Some("entry".into()), vec![i32_ty, i32_ty]);
        assert!(get_block_arg_name(ctx, block, 0).is_none());
        set_block_arg_name(ctx, block, 1, "count".to_string());
        assert_eq!(get_block_arg_name(ctx, block, 1).as_deref(), Some("count"));
        let arg1 = block.deref(ctx).get_argument(1).unwrap();
        assert!(arg1.unique_name(ctx).starts_with("count_"));
    }
}
