//! [Operation] is the fixed-shape data of every IR instruction: its
//! kind ([OpId](crate::op::OpId)), results, operands, successors,
//! regions, a properties dictionary for inherent data and an
//! attributes dictionary for discardable data. Kind-specific behavior
//! lives in the [Op](crate::op::Op) wrapping it.
//!
//! Operations within a [BasicBlock] carry a cached order index so that
//! "is A before B" queries are O(1) amortized; inserting an operation
//! invalidates only its own index, and a query repairs indices lazily,
//! renumbering the whole block only when no gap is available.

use std::marker::PhantomData;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::{
    attribute::AttrObj,
    basic_block::BasicBlock,
    common_traits::{Named, Verify},
    context::{private::ArenaObj, ArenaCell, Context, Ptr},
    identifier::Identifier,
    linked_list::{private, ContainsLinkedList, LinkedList},
    location::{Located, Location},
    op::OpId,
    printable::{self, fmt_iter, ListSeparator, Printable},
    r#type::{TypeObj, Typed},
    region::Region,
    result::Result,
    use_def_lists::{DefNode, DefTrait, DefUseParticipant, Use, UseNode, Value},
};

/// Results up to this count live inline in the operation; more spill
/// to the heap.
pub const MAX_INLINE_RESULTS: usize = 6;

/// Gap left between consecutive order indices during renumbering, so
/// that an insertion between neighbors usually finds a free slot.
const ORDER_STRIDE: u32 = 5;

/// An [Operation] result; a definition.
pub(crate) struct OpResult {
    /// The def containing the list of this result's uses.
    pub(crate) def: DefNode<Value>,
    /// Get the [Operation] that this is a result of.
    def_op: Ptr<Operation>,
    /// Index of this result in the [Operation] that this is a result of.
    res_idx: usize,
    /// [Type](crate::type::Type) of this result.
    ty: Ptr<TypeObj>,
}

impl Typed for OpResult {
    fn get_type(&self, _ctx: &Context) -> Ptr<TypeObj> {
        self.ty
    }
}

impl OpResult {
    /// Get this result as a [Value].
    pub(crate) fn as_value(&self) -> Value {
        Value::OpResult {
            op: self.def_op,
            res_idx: self.res_idx,
        }
    }
}

/// Container for a [Use] inside an [Operation]: either an operand
/// (`T = `[Value]) or a successor (`T = Ptr<BasicBlock>`).
pub struct Operand<T: DefUseParticipant> {
    pub(crate) r#use: UseNode<T>,
    pub(crate) opd_idx: usize,
    pub(crate) user_op: Ptr<Operation>,
}

impl<T: DefUseParticipant> Operand<T> {
    /// The definition this operand refers to.
    pub fn get_def(&self) -> T {
        self.r#use.get_def()
    }

    /// i'th operand or successor of the user [Operation].
    pub fn get_opd_idx(&self) -> usize {
        self.opd_idx
    }

    /// The [Operation] of which this is an operand.
    pub fn get_user_op(&self) -> Ptr<Operation> {
        self.user_op
    }

    fn as_use(&self) -> Use<T> {
        Use {
            op: self.user_op,
            opd_idx: self.opd_idx,
            _dummy: PhantomData,
        }
    }
}

impl Printable for Operand<Value> {
    fn fmt(
        &self,
        ctx: &Context,
        _state: &printable::State,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        write!(f, "{}", self.get_def().unique_name(ctx))
    }
}

/// Links an [Operation] with other operations and the container
/// [BasicBlock].
pub(crate) struct BlockLinks {
    /// Parent block of this operation.
    parent_block: Option<Ptr<BasicBlock>>,
    /// The next operation in the block's list of operations.
    next_op: Option<Ptr<Operation>>,
    /// The previous operation in the block's list of operations.
    prev_op: Option<Ptr<Operation>>,
}

impl BlockLinks {
    fn new_unlinked() -> BlockLinks {
        BlockLinks {
            parent_block: None,
            next_op: None,
            prev_op: None,
        }
    }
}

/// An IR instruction.
pub struct Operation {
    /// A [Ptr] to self.
    pub(crate) self_ptr: Ptr<Operation>,
    /// [OpId] of the [Op](crate::op::Op) this operation is an instance of.
    pub(crate) opid: OpId,
    /// Source location.
    loc: Location,
    /// [OpResult]s defined by self.
    pub(crate) results: SmallVec<[OpResult; MAX_INLINE_RESULTS]>,
    /// [Operand]s used by self.
    pub(crate) operands: SmallVec<[Operand<Value>; 2]>,
    /// Control-flow-graph successors.
    pub(crate) successors: SmallVec<[Operand<Ptr<BasicBlock>>; 1]>,
    /// Regions contained inside this operation.
    pub(crate) regions: Vec<Ptr<Region>>,
    /// Inherent data of this operation's kind.
    properties: FxHashMap<Identifier, AttrObj>,
    /// Discardable data, free to be added or dropped by any client.
    attributes: FxHashMap<Identifier, AttrObj>,
    /// Links to the parent [BasicBlock] and next / previous operations.
    block_links: BlockLinks,
    /// Cached position in the parent block. [None] after (re)insertion,
    /// repaired lazily by [Ptr::is_before_in_block].
    order: Option<u32>,
}

impl PartialEq for Operation {
    fn eq(&self, other: &Self) -> bool {
        self.self_ptr == other.self_ptr
    }
}

impl Operation {
    /// Create a new, unlinked (i.e., not in a [BasicBlock]) operation
    /// at `loc`. Panics if `opid` was not registered with `ctx`.
    pub fn new(
        ctx: &mut Context,
        opid: OpId,
        loc: Location,
        result_types: Vec<Ptr<TypeObj>>,
        operands: Vec<Value>,
        successors: Vec<Ptr<BasicBlock>>,
        num_regions: usize,
    ) -> Ptr<Operation> {
        assert!(
            ctx.ops.contains_key(&opid),
            "Unregistered Op {}",
            opid.disp(ctx)
        );
        let newop = Self::alloc(ctx, |self_ptr: Ptr<Operation>| Operation {
            self_ptr,
            opid,
            loc,
            results: result_types
                .iter()
                .enumerate()
                .map(|(res_idx, ty)| OpResult {
                    def: DefNode::new(),
                    def_op: self_ptr,
                    res_idx,
                    ty: *ty,
                })
                .collect(),
            operands: SmallVec::new(),
            successors: SmallVec::new(),
            regions: vec![],
            properties: FxHashMap::default(),
            attributes: FxHashMap::default(),
            block_links: BlockLinks::new_unlinked(),
            order: None,
        });
        // Operands and successors are attached after allocation since
        // registering a use requires the user's Ptr.
        let operands = operands
            .iter()
            .enumerate()
            .map(|(opd_idx, def)| Self::attach_use(ctx, newop, opd_idx, *def))
            .collect();
        newop.deref_mut(ctx).operands = operands;
        let successors = successors
            .iter()
            .enumerate()
            .map(|(opd_idx, def)| Self::attach_use(ctx, newop, opd_idx, *def))
            .collect();
        newop.deref_mut(ctx).successors = successors;
        for _ in 0..num_regions {
            let region = Region::new(ctx, newop);
            newop.deref_mut(ctx).regions.push(region);
        }
        newop
    }

    fn attach_use<T: DefTrait>(
        ctx: &Context,
        user_op: Ptr<Operation>,
        opd_idx: usize,
        def: T,
    ) -> Operand<T> {
        let r#use = Use {
            op: user_op,
            opd_idx,
            _dummy: PhantomData,
        };
        let usenode = def.get_defnode_mut(ctx).add_use(def, r#use);
        Operand {
            r#use: usenode,
            opd_idx,
            user_op,
        }
    }

    /// Get this operation's [OpId].
    pub fn get_opid(&self) -> OpId {
        self.opid.clone()
    }

    /// Number of results this operation defines.
    pub fn get_num_results(&self) -> usize {
        self.results.len()
    }

    /// Get idx'th result as a [Value].
    pub fn get_result(&self, idx: usize) -> Option<Value> {
        self.results.get(idx).map(OpResult::as_value)
    }

    /// Get type of the idx'th result.
    pub fn get_type(&self, idx: usize) -> Option<Ptr<TypeObj>> {
        self.results.get(idx).map(|r| r.ty)
    }

    /// All results as [Value]s.
    pub fn results(&self) -> impl Iterator<Item = Value> + '_ {
        self.results.iter().map(OpResult::as_value)
    }

    pub(crate) fn get_result_ref(&self, idx: usize) -> Option<&OpResult> {
        self.results.get(idx)
    }

    pub(crate) fn get_result_mut(&mut self, idx: usize) -> Option<&mut OpResult> {
        self.results.get_mut(idx)
    }

    /// Number of operands.
    pub fn get_num_operands(&self) -> usize {
        self.operands.len()
    }

    /// Get the idx'th operand's [Value].
    pub fn get_operand(&self, idx: usize) -> Option<Value> {
        self.operands.get(idx).map(Operand::get_def)
    }

    /// All operand [Value]s.
    pub fn operands(&self) -> impl Iterator<Item = Value> + '_ {
        self.operands.iter().map(Operand::get_def)
    }

    pub(crate) fn get_operand_ref(&self, idx: usize) -> Option<&Operand<Value>> {
        self.operands.get(idx)
    }

    pub(crate) fn get_operand_mut(&mut self, idx: usize) -> Option<&mut Operand<Value>> {
        self.operands.get_mut(idx)
    }

    /// Number of successors.
    pub fn get_num_successors(&self) -> usize {
        self.successors.len()
    }

    /// Get the idx'th successor block.
    pub fn get_successor(&self, idx: usize) -> Option<Ptr<BasicBlock>> {
        self.successors.get(idx).map(Operand::get_def)
    }

    /// All successor blocks.
    pub fn successors(&self) -> impl Iterator<Item = Ptr<BasicBlock>> + '_ {
        self.successors.iter().map(Operand::get_def)
    }

    pub(crate) fn get_successor_ref(&self, idx: usize) -> Option<&Operand<Ptr<BasicBlock>>> {
        self.successors.get(idx)
    }

    pub(crate) fn get_successor_mut(&mut self, idx: usize) -> Option<&mut Operand<Ptr<BasicBlock>>> {
        self.successors.get_mut(idx)
    }

    /// Number of regions.
    pub fn num_regions(&self) -> usize {
        self.regions.len()
    }

    /// Get the idx'th region.
    pub fn get_region(&self, idx: usize) -> Option<Ptr<Region>> {
        self.regions.get(idx).copied()
    }

    /// Replace the `opd_idx`'th operand of `op` with `new_val`,
    /// updating both use lists. Panics on an out of range index.
    pub fn replace_operand(op: Ptr<Operation>, ctx: &Context, opd_idx: usize, new_val: Value) {
        let old_val = op
            .deref(ctx)
            .get_operand(opd_idx)
            .expect("replace_operand: index out of range");
        if old_val == new_val {
            return;
        }
        let r#use = Use {
            op,
            opd_idx,
            _dummy: PhantomData,
        };
        old_val.get_defnode_mut(ctx).remove_use(r#use);
        let usenode = new_val.get_defnode_mut(ctx).add_use(new_val, r#use);
        op.deref_mut(ctx).operands[opd_idx].r#use = usenode;
    }

    /// Replace all operands of `op` with `new_vals`, updating use
    /// lists on both sides. The operand count may change.
    pub fn set_operands(op: Ptr<Operation>, ctx: &Context, new_vals: Vec<Value>) {
        let old_vals: Vec<Value> = op.deref(ctx).operands().collect();
        for (opd_idx, old_val) in old_vals.iter().enumerate() {
            let r#use = Use {
                op,
                opd_idx,
                _dummy: PhantomData,
            };
            old_val.get_defnode_mut(ctx).remove_use(r#use);
        }
        let operands = new_vals
            .iter()
            .enumerate()
            .map(|(opd_idx, def)| Self::attach_use(ctx, op, opd_idx, *def))
            .collect();
        op.deref_mut(ctx).operands = operands;
    }

    /// Insert `new_val` as the `opd_idx`'th operand of `op`; operands
    /// at and after `opd_idx` shift one slot up. Panics if `opd_idx`
    /// is greater than the operand count.
    pub fn insert_operand(op: Ptr<Operation>, ctx: &Context, opd_idx: usize, new_val: Value) {
        Self::insert_operands(op, ctx, opd_idx, &[new_val]);
    }

    /// Insert `new_vals` starting at position `opd_idx`; operands at
    /// and after `opd_idx` shift up by `new_vals.len()`. Panics if
    /// `opd_idx` is greater than the operand count.
    pub fn insert_operands(op: Ptr<Operation>, ctx: &Context, opd_idx: usize, new_vals: &[Value]) {
        let shifted: Vec<Value> = {
            let opref = op.deref(ctx);
            assert!(
                opd_idx <= opref.get_num_operands(),
                "insert_operands: index out of range"
            );
            opref.operands[opd_idx..].iter().map(Operand::get_def).collect()
        };
        if new_vals.is_empty() {
            return;
        }
        // Renumber the shifted tail in the def-side use sets, highest
        // index first so a use never lands on a slot that is still
        // occupied.
        let n = new_vals.len();
        for (i, def) in shifted.iter().enumerate().rev() {
            let mut defnode = def.get_defnode_mut(ctx);
            defnode.remove_use(Use {
                op,
                opd_idx: opd_idx + i,
                _dummy: PhantomData,
            });
            defnode.add_use(
                *def,
                Use {
                    op,
                    opd_idx: opd_idx + i + n,
                    _dummy: PhantomData,
                },
            );
        }
        let new_operands: Vec<_> = new_vals
            .iter()
            .enumerate()
            .map(|(i, def)| Self::attach_use(ctx, op, opd_idx + i, *def))
            .collect();
        let mut opref = op.deref_mut(ctx);
        for opd in opref.operands[opd_idx..].iter_mut() {
            opd.opd_idx += n;
        }
        for (i, opd) in new_operands.into_iter().enumerate() {
            opref.operands.insert(opd_idx + i, opd);
        }
    }

    /// Erase the `opd_idx`'th operand of `op`; operands after it shift
    /// one slot down. Panics on an out of range index.
    pub fn erase_operand(op: Ptr<Operation>, ctx: &Context, opd_idx: usize) {
        let (old_val, shifted) = {
            let opref = op.deref(ctx);
            let old_val = opref
                .get_operand(opd_idx)
                .expect("erase_operand: index out of range");
            let shifted: Vec<Value> =
                opref.operands[opd_idx + 1..].iter().map(Operand::get_def).collect();
            (old_val, shifted)
        };
        old_val.get_defnode_mut(ctx).remove_use(Use {
            op,
            opd_idx,
            _dummy: PhantomData,
        });
        // Renumber the tail, lowest index first; each use moves into
        // the slot just vacated below it.
        for (i, def) in shifted.iter().enumerate() {
            let mut defnode = def.get_defnode_mut(ctx);
            defnode.remove_use(Use {
                op,
                opd_idx: opd_idx + 1 + i,
                _dummy: PhantomData,
            });
            defnode.add_use(
                *def,
                Use {
                    op,
                    opd_idx: opd_idx + i,
                    _dummy: PhantomData,
                },
            );
        }
        let mut opref = op.deref_mut(ctx);
        opref.operands.remove(opd_idx);
        for opd in opref.operands[opd_idx..].iter_mut() {
            opd.opd_idx -= 1;
        }
    }

    /// Replace the `succ_idx`'th successor of `op` with `new_block`,
    /// updating both predecessor lists. Panics on an out of range index.
    pub fn set_successor(op: Ptr<Operation>, ctx: &Context, succ_idx: usize, new_block: Ptr<BasicBlock>) {
        let old_block = op
            .deref(ctx)
            .get_successor(succ_idx)
            .expect("set_successor: index out of range");
        if old_block == new_block {
            return;
        }
        let r#use = Use {
            op,
            opd_idx: succ_idx,
            _dummy: PhantomData,
        };
        old_block.get_defnode_mut(ctx).remove_use(r#use);
        let usenode = new_block.get_defnode_mut(ctx).add_use(new_block, r#use);
        op.deref_mut(ctx).successors[succ_idx].r#use = usenode;
    }

    /// The display name of the idx'th result, as
    /// [Named::unique_name](crate::common_traits::Named) would produce,
    /// computed without re-locking this operation's cell.
    pub(crate) fn result_unique_name(&self, idx: usize) -> String {
        let id = format!("{}_res{idx}", self.self_ptr.make_name("op"));
        match crate::debug_info::operation_result_name(self, idx) {
            Some(given) => given + "_" + &id,
            None => id,
        }
    }

    /// Get a discardable attribute.
    pub fn attr(&self, key: &Identifier) -> Option<&AttrObj> {
        self.attributes.get(key)
    }

    /// Set a discardable attribute, replacing any previous value.
    pub fn set_attr(&mut self, key: Identifier, val: AttrObj) {
        self.attributes.insert(key, val);
    }

    /// Remove a discardable attribute. Removing an absent key is a
    /// no-op returning [None].
    pub fn remove_attr(&mut self, key: &Identifier) -> Option<AttrObj> {
        self.attributes.remove(key)
    }

    /// Get an inherent property.
    pub fn property(&self, key: &Identifier) -> Option<&AttrObj> {
        self.properties.get(key)
    }

    /// Set an inherent property, replacing any previous value.
    pub fn set_property(&mut self, key: Identifier, val: AttrObj) {
        self.properties.insert(key, val);
    }

    /// Remove an inherent property. Removing an absent key is a no-op
    /// returning [None].
    pub fn remove_property(&mut self, key: &Identifier) -> Option<AttrObj> {
        self.properties.remove(key)
    }

    /// Drop all uses that this operation and operations nested in its
    /// regions hold on any definition.
    pub fn drop_all_uses(op: Ptr<Operation>, ctx: &Context) {
        let uses: Vec<_> = op
            .deref(ctx)
            .operands
            .iter()
            .map(|opd| (opd.get_def(), opd.as_use()))
            .collect();
        for (def, r#use) in uses {
            def.get_defnode_mut(ctx).remove_use(r#use);
        }
        op.deref_mut(ctx).operands.clear();
        let succ_uses: Vec<_> = op
            .deref(ctx)
            .successors
            .iter()
            .map(|succ| (succ.get_def(), succ.as_use()))
            .collect();
        for (def, r#use) in succ_uses {
            def.get_defnode_mut(ctx).remove_use(r#use);
        }
        op.deref_mut(ctx).successors.clear();
        let regions = op.deref(ctx).regions.clone();
        for region in regions {
            let blocks: Vec<_> = {
                let region_ref = region.deref(ctx);
                region_ref.iter(ctx).collect()
            };
            for block in blocks {
                let ops: Vec<_> = {
                    let block_ref = block.deref(ctx);
                    block_ref.iter(ctx).collect()
                };
                for op in ops {
                    Self::drop_all_uses(op, ctx);
                }
            }
        }
    }

    /// Unlink and deallocate this operation and everything owned by it.
    /// Panics if any result still has a use outside of this operation's
    /// own regions.
    pub fn erase(op: Ptr<Operation>, ctx: &mut Context) {
        let used: bool = op
            .deref(ctx)
            .results
            .iter()
            .any(|res| res.def.has_use());
        assert!(!used, "Operation with use(s) being erased");
        if op.is_linked(ctx) {
            op.unlink(ctx);
        }
        Self::drop_all_uses(op, ctx);
        ArenaObj::dealloc(op, ctx);
    }

    /// Clone this operation (and, recursively, its regions) into a new
    /// unlinked operation. Operands are remapped through `value_map`
    /// and successors through `block_map`; an operand whose definition
    /// is not in the map keeps its original definition. Result and
    /// block-argument definitions of the cloned IR are recorded into
    /// the maps for subsequent clones.
    pub fn deep_clone(
        op: Ptr<Operation>,
        ctx: &mut Context,
        value_map: &mut FxHashMap<Value, Value>,
        block_map: &mut FxHashMap<Ptr<BasicBlock>, Ptr<BasicBlock>>,
    ) -> Ptr<Operation> {
        Self::clone_with(op, ctx, value_map, block_map, true)
    }

    /// Same as [deep_clone](Self::deep_clone), but contained regions
    /// are not cloned; the new operation has none.
    pub fn clone_without_regions(
        op: Ptr<Operation>,
        ctx: &mut Context,
        value_map: &mut FxHashMap<Value, Value>,
        block_map: &mut FxHashMap<Ptr<BasicBlock>, Ptr<BasicBlock>>,
    ) -> Ptr<Operation> {
        Self::clone_with(op, ctx, value_map, block_map, false)
    }

    fn clone_with(
        op: Ptr<Operation>,
        ctx: &mut Context,
        value_map: &mut FxHashMap<Value, Value>,
        block_map: &mut FxHashMap<Ptr<BasicBlock>, Ptr<BasicBlock>>,
        clone_regions: bool,
    ) -> Ptr<Operation> {
        let (opid, loc, result_types, operands, successors, properties, attributes, regions) = {
            let opref = op.deref(ctx);
            (
                opref.opid.clone(),
                opref.loc.clone(),
                opref.results.iter().map(|res| res.ty).collect::<Vec<_>>(),
                opref.operands().collect::<Vec<_>>(),
                opref.successors().collect::<Vec<_>>(),
                opref.properties.clone(),
                opref.attributes.clone(),
                opref.regions.clone(),
            )
        };
        let operands = operands
            .into_iter()
            .map(|def| value_map.get(&def).copied().unwrap_or(def))
            .collect();
        let successors = successors
            .into_iter()
            .map(|block| block_map.get(&block).copied().unwrap_or(block))
            .collect();
        let new_op = Operation::new(ctx, opid, loc, result_types, operands, successors, 0);
        {
            let mut new_ref = new_op.deref_mut(ctx);
            new_ref.properties = properties;
            new_ref.attributes = attributes;
        }
        let num_results = new_op.deref(ctx).get_num_results();
        for res_idx in 0..num_results {
            value_map.insert(
                Value::OpResult { op, res_idx },
                Value::OpResult { op: new_op, res_idx },
            );
        }
        if clone_regions {
            for region in regions {
                Region::deep_clone(region, new_op, ctx, value_map, block_map);
            }
        }
        new_op
    }
}

impl Located for Operation {
    fn loc(&self) -> Location {
        self.loc.clone()
    }

    fn set_loc(&mut self, loc: Location) {
        self.loc = loc;
    }
}

impl ArenaObj for Operation {
    fn get_arena(ctx: &Context) -> &ArenaCell<Self> {
        &ctx.operations
    }

    fn get_arena_mut(ctx: &mut Context) -> &mut ArenaCell<Self> {
        &mut ctx.operations
    }

    fn get_self_ptr(&self, _ctx: &Context) -> Ptr<Self> {
        self.self_ptr
    }

    fn dealloc_sub_objects(ptr: Ptr<Self>, ctx: &mut Context) {
        let regions = ptr.deref(ctx).regions.clone();
        for region in regions {
            ArenaObj::dealloc(region, ctx);
        }
    }
}

impl private::LinkedList for Operation {
    type ContainerType = BasicBlock;

    fn set_next(&mut self, next: Option<Ptr<Self>>) {
        self.block_links.next_op = next;
    }

    fn set_prev(&mut self, prev: Option<Ptr<Self>>) {
        self.block_links.prev_op = prev;
    }

    fn set_container(&mut self, container: Option<Ptr<Self::ContainerType>>) {
        self.block_links.parent_block = container;
        // Any cached position is stale now.
        self.order = None;
    }
}

impl LinkedList for Operation {
    fn get_next(&self) -> Option<Ptr<Self>> {
        self.block_links.next_op
    }

    fn get_prev(&self) -> Option<Ptr<Self>> {
        self.block_links.prev_op
    }

    fn get_container(&self) -> Option<Ptr<BasicBlock>> {
        self.block_links.parent_block
    }
}

impl Ptr<Operation> {
    /// Is this operation before `other` in their common parent block's
    /// list of operations? Panics if the two operations are not in the
    /// same block. Amortized O(1): order indices are repaired lazily.
    pub fn is_before_in_block(&self, ctx: &Context, other: Ptr<Operation>) -> bool {
        let block = self
            .deref(ctx)
            .get_container()
            .expect("is_before_in_block: operation not in a block");
        let other_block = other
            .deref(ctx)
            .get_container()
            .expect("is_before_in_block: operation not in a block");
        assert!(
            block == other_block,
            "is_before_in_block: operations are in different blocks"
        );
        self.ensure_order(ctx, block);
        other.ensure_order(ctx, block);
        self.deref(ctx).order.unwrap() < other.deref(ctx).order.unwrap()
    }

    /// Assign an order index if missing: between the neighbors' indices
    /// when a gap exists, otherwise by renumbering the whole block.
    fn ensure_order(&self, ctx: &Context, block: Ptr<BasicBlock>) {
        if self.deref(ctx).order.is_some() {
            return;
        }
        let prev_order = self
            .deref(ctx)
            .get_prev()
            .map(|prev| prev.deref(ctx).order);
        let next_order = self
            .deref(ctx)
            .get_next()
            .map(|next| next.deref(ctx).order);
        let slot = match (prev_order, next_order) {
            (None, None) => Some(0),
            (Some(Some(p)), None) => Some(p + ORDER_STRIDE),
            (None, Some(Some(n))) if n > 0 => Some(n / 2),
            (Some(Some(p)), Some(Some(n))) if n - p >= 2 => Some(p + (n - p) / 2),
            // A neighbor's index is itself missing, or there is no gap.
            _ => None,
        };
        match slot {
            Some(order) => self.deref_mut(ctx).order = Some(order),
            None => renumber_ops(block, ctx),
        }
    }
}

/// Reassign order indices for every operation in `block`, leaving
/// [ORDER_STRIDE]-wide gaps for future insertions.
fn renumber_ops(block: Ptr<BasicBlock>, ctx: &Context) {
    let ops: Vec<_> = {
        let block_ref = block.deref(ctx);
        block_ref.iter(ctx).collect()
    };
    for (i, op) in ops.iter().enumerate() {
        op.deref_mut(ctx).order = Some(i as u32 * ORDER_STRIDE);
    }
}

impl Printable for Operation {
    fn fmt(
        &self,
        ctx: &Context,
        state: &printable::State,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        if !self.results.is_empty() {
            fmt_iter(
                (0..self.results.len()).map(|idx| self.result_unique_name(idx)),
                ctx,
                state,
                ListSeparator::CharSpace(','),
                f,
            )?;
            write!(f, " = ")?;
        }
        write!(f, "{}", self.opid)?;
        write!(f, "(")?;
        fmt_iter(
            self.operands.iter(),
            ctx,
            state,
            ListSeparator::CharSpace(','),
            f,
        )?;
        write!(f, ")")?;
        if !self.successors.is_empty() {
            write!(f, " [")?;
            fmt_iter(
                self.successors
                    .iter()
                    .map(|succ| succ.get_def().unique_name(ctx)),
                ctx,
                state,
                ListSeparator::CharSpace(','),
                f,
            )?;
            write!(f, "]")?;
        }
        for region in &self.regions {
            region.fmt(ctx, state, f)?;
        }
        Ok(())
    }
}

impl Verify for Operation {
    fn verify(&self, ctx: &Context) -> Result<()> {
        for region in &self.regions {
            region.verify(ctx)?;
        }
        Ok(())
    }
}
