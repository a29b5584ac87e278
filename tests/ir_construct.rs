//! Construction, mutation and destruction of IR objects.

mod common;

use rustc_hash::FxHashMap;

use common::{setup_context, AddOp, BranchOp, ConstOp, CountAttr, FlagAttr, LabelAttr, SplitOp};
use corion::{
    attribute::Attribute,
    basic_block::BasicBlock,
    builtin::{
        ops::{FuncOp, ModuleOp},
        types::FunctionType,
    },
    common_traits::Verify,
    context::Context,
    debug_info::set_operation_result_name,
    identifier::Identifier,
    linked_list::ContainsLinkedList,
    location::{LineCol, Located, Location, Source},
    op::Op,
    operation::{Operation, MAX_INLINE_RESULTS},
    printable::Printable,
};

/// A module "mod" with a function "foo" whose entry block holds
/// `c0 = const; add(c0, c0)`.
fn const_add_in_func(ctx: &mut Context) -> (ModuleOp, FuncOp, ConstOp, AddOp) {
    let i64_ty = ctx.cached().i64_type;
    let module = ModuleOp::new(ctx, "mod");
    let func_ty = FunctionType::get(ctx, vec![], vec![i64_ty]);
    let func = FuncOp::new(ctx, "foo", func_ty);
    func.get_operation()
        .insert_at_back(module.get_body(ctx), ctx);
    let bb = func.get_entry_block(ctx);

    let const_op = ConstOp::new(ctx, i64_ty);
    const_op.get_operation().insert_at_front(bb, ctx);
    set_operation_result_name(ctx, const_op.get_operation(), 0, "c0".to_string());

    let c0 = const_op.get_result(ctx);
    let add_op = AddOp::new(ctx, c0, c0);
    add_op.get_operation().insert_at_back(bb, ctx);

    module.verify(ctx).unwrap();
    (module, func, const_op, add_op)
}

#[test]
fn construct_and_print() {
    let ctx = &mut setup_context();
    let (module, _, _, _) = const_add_in_func(ctx);
    let printed = module.disp(ctx).to_string();
    assert!(printed.starts_with("builtin.module @mod {"));
    assert!(printed.contains("builtin.func @foo: () -> (i64)"));
    // The named result and its use.
    assert!(printed.contains("c0_"));
    assert!(printed.contains("test.add("));
}

#[test]
fn construct_and_erase() {
    let ctx = &mut setup_context();
    let (module, _, _, _) = const_add_in_func(ctx);
    Operation::erase(module.get_operation(), ctx);
    assert!(ctx.operations.is_empty() && ctx.basic_blocks.is_empty() && ctx.regions.is_empty());
}

#[test]
#[should_panic(expected = "Operation with use(s) being erased")]
fn erase_used_op() {
    let ctx = &mut setup_context();
    let (_, _, const_op, _) = const_add_in_func(ctx);
    // const_op's result is used by the add.
    Operation::erase(const_op.get_operation(), ctx);
}

#[test]
fn erase_after_dropping_user() {
    let ctx = &mut setup_context();
    let (_, _, const_op, add_op) = const_add_in_func(ctx);
    assert_eq!(const_op.get_result(ctx).num_uses(ctx), 2);
    Operation::erase(add_op.get_operation(), ctx);
    assert_eq!(const_op.get_result(ctx).num_uses(ctx), 0);
    Operation::erase(const_op.get_operation(), ctx);
}

#[test]
fn replace_operand_moves_use() {
    let ctx = &mut setup_context();
    let (_, _, const_op, add_op) = const_add_in_func(ctx);
    let i64_ty = ctx.cached().i64_type;
    let other = ConstOp::new(ctx, i64_ty);
    let c0 = const_op.get_result(ctx);
    let c1 = other.get_result(ctx);
    assert_eq!(c0.num_uses(ctx), 2);
    Operation::replace_operand(add_op.get_operation(), ctx, 1, c1);
    assert_eq!(c0.num_uses(ctx), 1);
    assert_eq!(c1.num_uses(ctx), 1);
    assert_eq!(add_op.get_operation().deref(ctx).get_operand(1), Some(c1));
    // Replacing with the value already in place is a no-op.
    Operation::replace_operand(add_op.get_operation(), ctx, 1, c1);
    assert_eq!(c1.num_uses(ctx), 1);
}

#[test]
fn operation_created_at_location() {
    let ctx = &mut setup_context();
    let src = Source::new_from_file(ctx, "/tmp/demo.corion".into());
    let loc = Location::SrcPos {
        src,
        pos: LineCol::new(3, 7),
    };
    let i64_ty = ctx.cached().i64_type;
    let op = Operation::new(
        ctx,
        ConstOp::get_opid_static(),
        loc.clone(),
        vec![i64_ty],
        vec![],
        vec![],
        0,
    );
    assert_eq!(op.deref(ctx).loc(), loc);

    // Clones keep the original's location.
    let mut value_map = FxHashMap::default();
    let mut block_map = FxHashMap::default();
    let cloned = Operation::deep_clone(op, ctx, &mut value_map, &mut block_map);
    assert_eq!(cloned.deref(ctx).loc(), loc);
}

#[test]
fn qualified_op_names_and_dialect_attrs() {
    let ctx = &mut setup_context();
    let (_, _, const_op, add_op) = const_add_in_func(ctx);
    let add = add_op.get_operation();
    assert_eq!(add.deref(ctx).get_opid().to_string(), "test.add");
    assert_eq!(
        const_op.get_operation().deref(ctx).get_opid().to_string(),
        "test.const"
    );

    let note: Identifier = "note".into();
    let visited: Identifier = "visited".into();
    let trips: Identifier = "trips".into();
    {
        let mut add_mut = add.deref_mut(ctx);
        add_mut.set_attr(note.clone(), Box::new(LabelAttr("fast".to_string())));
        add_mut.set_attr(visited.clone(), Box::new(FlagAttr(true)));
        add_mut.set_attr(trips.clone(), Box::new(CountAttr(3)));
    }
    {
        let add_ref = add.deref(ctx);
        let label = add_ref.attr(&note).expect("note attribute must be set");
        assert_eq!(
            label.downcast_ref::<LabelAttr>(),
            Some(&LabelAttr("fast".to_string()))
        );
        assert_eq!(label.get_attr_id().disp(ctx).to_string(), "test.label");
        assert_eq!(
            add_ref.attr(&trips).and_then(|a| a.downcast_ref::<CountAttr>()),
            Some(&CountAttr(3))
        );
    }
    assert!(add.deref_mut(ctx).remove_attr(&visited).is_some());
    assert!(add.deref(ctx).attr(&visited).is_none());
    // Removing an absent attribute is a silent no-op.
    assert!(add.deref_mut(ctx).remove_attr(&visited).is_none());
}

#[test]
fn operand_insertion_and_erasure() {
    let ctx = &mut setup_context();
    let i64_ty = ctx.cached().i64_type;
    let a = ConstOp::new(ctx, i64_ty);
    let b = ConstOp::new(ctx, i64_ty);
    let va = a.get_result(ctx);
    let vb = b.get_result(ctx);
    let add = AddOp::new(ctx, va, va).get_operation();
    assert_eq!(va.num_uses(ctx), 2);

    // [va, va] -> [va, vb, va]
    Operation::insert_operand(add, ctx, 1, vb);
    assert_eq!(add.deref(ctx).get_num_operands(), 3);
    assert_eq!(add.deref(ctx).get_operand(1), Some(vb));
    assert_eq!(add.deref(ctx).get_operand(2), Some(va));
    assert_eq!(va.num_uses(ctx), 2);
    assert_eq!(vb.num_uses(ctx), 1);

    // [va, vb, va] -> [vb, va]
    Operation::erase_operand(add, ctx, 0);
    assert_eq!(add.deref(ctx).get_num_operands(), 2);
    assert_eq!(add.deref(ctx).get_operand(0), Some(vb));
    assert_eq!(add.deref(ctx).get_operand(1), Some(va));
    assert_eq!(va.num_uses(ctx), 1);

    // The renumbered slot is still wired up on the def side.
    Operation::replace_operand(add, ctx, 1, vb);
    assert_eq!(va.num_uses(ctx), 0);
    assert_eq!(vb.num_uses(ctx), 2);
    Operation::erase(add, ctx);
    assert_eq!(vb.num_uses(ctx), 0);
}

#[test]
fn set_operands_rewrites_use_lists() {
    let ctx = &mut setup_context();
    let i64_ty = ctx.cached().i64_type;
    let a = ConstOp::new(ctx, i64_ty);
    let b = ConstOp::new(ctx, i64_ty);
    let c = ConstOp::new(ctx, i64_ty);
    let va = a.get_result(ctx);
    let vb = b.get_result(ctx);
    let vc = c.get_result(ctx);
    let add = AddOp::new(ctx, va, vb).get_operation();

    Operation::set_operands(add, ctx, vec![vc, vc, vc]);
    assert_eq!(add.deref(ctx).get_num_operands(), 3);
    assert_eq!(va.num_uses(ctx), 0);
    assert_eq!(vb.num_uses(ctx), 0);
    assert_eq!(vc.num_uses(ctx), 3);

    Operation::insert_operands(add, ctx, 0, &[va, vb]);
    assert_eq!(add.deref(ctx).get_num_operands(), 5);
    assert_eq!(add.deref(ctx).get_operand(0), Some(va));
    assert_eq!(add.deref(ctx).get_operand(1), Some(vb));
    assert_eq!(add.deref(ctx).get_operand(4), Some(vc));

    Operation::erase_operand(add, ctx, 3);
    assert_eq!(add.deref(ctx).get_num_operands(), 4);
    assert_eq!(vc.num_uses(ctx), 2);
    Operation::erase(add, ctx);
    assert_eq!(vc.num_uses(ctx), 0);
}

#[test]
fn replace_uses_with_predicate() {
    let ctx = &mut setup_context();
    let (_, _, const_op, add_op) = const_add_in_func(ctx);
    let i64_ty = ctx.cached().i64_type;
    let other = ConstOp::new(ctx, i64_ty);
    let c0 = const_op.get_result(ctx);
    let c1 = other.get_result(ctx);
    // Move only the second operand's use over to c1.
    c0.replace_some_uses_with(ctx, |_ctx, r#use| r#use.opd_idx == 1, &c1);
    assert_eq!(c0.num_uses(ctx), 1);
    assert_eq!(c1.num_uses(ctx), 1);
    assert_eq!(add_op.get_operation().deref(ctx).get_operand(0), Some(c0));
    assert_eq!(add_op.get_operation().deref(ctx).get_operand(1), Some(c1));
}

#[test]
fn block_order_and_insertion() {
    let ctx = &mut setup_context();
    let i64_ty = ctx.cached().i64_type;
    let bb = BasicBlock::new(ctx, None, vec![]);
    let a = ConstOp::new(ctx, i64_ty).get_operation();
    let b = ConstOp::new(ctx, i64_ty).get_operation();
    let c = ConstOp::new(ctx, i64_ty).get_operation();
    a.insert_at_back(bb, ctx);
    b.insert_at_back(bb, ctx);
    c.insert_at_back(bb, ctx);
    assert!(a.is_before_in_block(ctx, b));
    assert!(b.is_before_in_block(ctx, c));
    assert!(!c.is_before_in_block(ctx, a));

    // Repeated insertion right after `a` exhausts the gap between
    // consecutive order indices, forcing a renumbering.
    let mut latest = b;
    for _ in 0..8 {
        let mid = ConstOp::new(ctx, i64_ty).get_operation();
        mid.insert_after(ctx, a);
        assert!(a.is_before_in_block(ctx, mid));
        assert!(mid.is_before_in_block(ctx, latest));
        latest = mid;
    }
    assert!(a.is_before_in_block(ctx, c));

    // Unlink and reinsert at a different position.
    c.unlink(ctx);
    c.insert_before(ctx, latest);
    assert!(c.is_before_in_block(ctx, latest));
    assert!(a.is_before_in_block(ctx, c));

    let in_block: Vec<_> = bb.deref(ctx).iter(ctx).collect();
    assert_eq!(in_block.len(), 11);
    assert_eq!(in_block[0], a);
}

#[test]
#[should_panic(expected = "is_before_in_block: operation not in a block")]
fn order_query_on_unlinked_op() {
    let ctx = &mut setup_context();
    let i64_ty = ctx.cached().i64_type;
    let a = ConstOp::new(ctx, i64_ty).get_operation();
    let b = ConstOp::new(ctx, i64_ty).get_operation();
    a.is_before_in_block(ctx, b);
}

#[test]
fn many_results_spill() {
    let ctx = &mut setup_context();
    let i64_ty = ctx.cached().i64_type;
    let tys = vec![i64_ty; MAX_INLINE_RESULTS + 1];
    let split = SplitOp::new(ctx, tys).get_operation();
    assert_eq!(split.deref(ctx).get_num_results(), MAX_INLINE_RESULTS + 1);
    let last = split
        .deref(ctx)
        .get_result(MAX_INLINE_RESULTS)
        .unwrap();
    let add = AddOp::new(ctx, last, last);
    assert_eq!(last.num_uses(ctx), 2);
    Operation::erase(add.get_operation(), ctx);
    Operation::erase(split, ctx);
}

#[test]
fn successors_and_preds() {
    let ctx = &mut setup_context();
    let bb1 = BasicBlock::new(ctx, Some("bb1".into()), vec![]);
    let bb2 = BasicBlock::new(ctx, Some("bb2".into()), vec![]);
    let bb3 = BasicBlock::new(ctx, Some("bb3".into()), vec![]);
    let br = BranchOp::new(ctx, bb2).get_operation();
    br.insert_at_back(bb1, ctx);
    assert_eq!(bb2.num_preds(ctx), 1);
    assert!(bb2.is_succ_of(ctx, bb1));
    assert!(!bb3.is_succ_of(ctx, bb1));

    Operation::set_successor(br, ctx, 0, bb3);
    assert_eq!(bb2.num_preds(ctx), 0);
    assert_eq!(bb3.num_preds(ctx), 1);
    assert!(bb3.is_succ_of(ctx, bb1));
}

#[test]
fn shallow_clone_keeps_external_defs() {
    let ctx = &mut setup_context();
    let (_, _, const_op, add_op) = const_add_in_func(ctx);
    let c0 = const_op.get_result(ctx);
    let mut value_map = FxHashMap::default();
    let mut block_map = FxHashMap::default();
    // Nothing mapped: the clone's operands fall back to the original
    // definitions.
    let cloned = Operation::deep_clone(add_op.get_operation(), ctx, &mut value_map, &mut block_map);
    assert_eq!(cloned.deref(ctx).get_operand(0), Some(c0));
    assert_eq!(c0.num_uses(ctx), 4);
    // The clone's own results were recorded in the map.
    assert_eq!(
        value_map.get(&add_op.get_result(ctx)),
        cloned.deref(ctx).get_result(0).as_ref()
    );
    Operation::erase(cloned, ctx);
}

#[test]
fn deep_clone_remaps_internal_defs() {
    let ctx = &mut setup_context();
    let (_, func, const_op, _) = const_add_in_func(ctx);
    let c0 = const_op.get_result(ctx);
    let uses_before = c0.num_uses(ctx);
    let mut value_map = FxHashMap::default();
    let mut block_map = FxHashMap::default();
    let cloned = Operation::deep_clone(func.get_operation(), ctx, &mut value_map, &mut block_map);

    // The cloned function's add uses the cloned const, not the
    // original one.
    assert_eq!(c0.num_uses(ctx), uses_before);
    let cloned_func = FuncOp::wrap_operation(cloned);
    let cloned_body = cloned_func
        .downcast_ref::<FuncOp>()
        .unwrap()
        .get_entry_block(ctx);
    assert_ne!(cloned_body, func.get_entry_block(ctx));
    let cloned_ops: Vec<_> = cloned_body.deref(ctx).iter(ctx).collect();
    assert_eq!(cloned_ops.len(), 2);
    let cloned_c0 = cloned_ops[0].deref(ctx).get_result(0).unwrap();
    assert_eq!(cloned_ops[1].deref(ctx).get_operand(0), Some(cloned_c0));
    assert_eq!(cloned_c0.num_uses(ctx), 2);
    Operation::erase(cloned, ctx);
}
