//! A [Region] is a list of [BasicBlock]s contained inside an
//! [Operation]. Values defined inside a region are not visible outside
//! of it.

use rustc_hash::FxHashMap;

use crate::{
    basic_block::BasicBlock,
    common_traits::Verify,
    context::{private::ArenaObj, ArenaCell, Context, Ptr},
    linked_list::{private, ContainsLinkedList},
    operation::Operation,
    printable::{self, Printable},
    result::Result,
    use_def_lists::Value,
};

/// A list of [BasicBlock]s, owned by an [Operation].
pub struct Region {
    pub(crate) self_ptr: Ptr<Region>,
    /// The operation that contains this region.
    parent_op: Ptr<Operation>,
    blocks_list: BlocksInRegion,
}

struct BlocksInRegion {
    first: Option<Ptr<BasicBlock>>,
    last: Option<Ptr<BasicBlock>>,
}

impl Region {
    /// Create a new, empty region inside `parent_op`.
    pub fn new(ctx: &mut Context, parent_op: Ptr<Operation>) -> Ptr<Region> {
        Self::alloc(ctx, |self_ptr: Ptr<Region>| Region {
            self_ptr,
            parent_op,
            blocks_list: BlocksInRegion {
                first: None,
                last: None,
            },
        })
    }

    /// The operation that contains this region.
    pub fn get_parent_op(&self) -> Ptr<Operation> {
        self.parent_op
    }

    /// The entry block, if the region is not empty.
    pub fn get_entry_block(&self) -> Option<Ptr<BasicBlock>> {
        self.get_head()
    }

    /// Clone `region`'s blocks and operations into a fresh region
    /// appended to `dest_op`. Blocks and the values they define are
    /// recorded into `block_map` / `value_map` in a first pass, so
    /// that forward references within the region resolve to clones.
    pub(crate) fn deep_clone(
        region: Ptr<Region>,
        dest_op: Ptr<Operation>,
        ctx: &mut Context,
        value_map: &mut FxHashMap<Value, Value>,
        block_map: &mut FxHashMap<Ptr<BasicBlock>, Ptr<BasicBlock>>,
    ) -> Ptr<Region> {
        let new_region = Region::new(ctx, dest_op);
        dest_op.deref_mut(ctx).regions.push(new_region);

        let blocks: Vec<_> = {
            let region_ref = region.deref(ctx);
            region_ref.iter(ctx).collect()
        };
        for block in &blocks {
            let (label, arg_types, num_args) = {
                let block_ref = block.deref(ctx);
                (
                    block_ref.label.clone(),
                    block_ref.arg_types(),
                    block_ref.get_num_arguments(),
                )
            };
            let new_block = BasicBlock::new(ctx, label, arg_types);
            new_block.insert_at_back(new_region, ctx);
            block_map.insert(*block, new_block);
            for arg_idx in 0..num_args {
                value_map.insert(
                    Value::BlockArgument {
                        block: *block,
                        arg_idx,
                    },
                    Value::BlockArgument {
                        block: new_block,
                        arg_idx,
                    },
                );
            }
        }
        for block in &blocks {
            let ops: Vec<_> = {
                let block_ref = block.deref(ctx);
                block_ref.iter(ctx).collect()
            };
            let new_block = block_map[block];
            for op in ops {
                let new_op = Operation::deep_clone(op, ctx, value_map, block_map);
                new_op.insert_at_back(new_block, ctx);
            }
        }
        new_region
    }
}

impl ArenaObj for Region {
    fn get_arena(ctx: &Context) -> &ArenaCell<Self> {
        &ctx.regions
    }

    fn get_arena_mut(ctx: &mut Context) -> &mut ArenaCell<Self> {
        &mut ctx.regions
    }

    fn get_self_ptr(&self, _ctx: &Context) -> Ptr<Self> {
        self.self_ptr
    }

    fn dealloc_sub_objects(ptr: Ptr<Self>, ctx: &mut Context) {
        let blocks: Vec<_> = {
            let region_ref = ptr.deref(ctx);
            region_ref.iter(ctx).collect()
        };
        for block in blocks {
            ArenaObj::dealloc(block, ctx);
        }
    }
}

impl ContainsLinkedList<BasicBlock> for Region {
    fn get_head(&self) -> Option<Ptr<BasicBlock>> {
        self.blocks_list.first
    }

    fn get_tail(&self) -> Option<Ptr<BasicBlock>> {
        self.blocks_list.last
    }
}

impl private::ContainsLinkedList<BasicBlock> for Region {
    fn set_head(&mut self, head: Option<Ptr<BasicBlock>>) {
        self.blocks_list.first = head;
    }

    fn set_tail(&mut self, tail: Option<Ptr<BasicBlock>>) {
        self.blocks_list.last = tail;
    }
}

impl Printable for Region {
    fn fmt(
        &self,
        ctx: &Context,
        state: &printable::State,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        writeln!(f, " {{")?;
        for block in self.iter(ctx) {
            block.fmt(ctx, state, f)?;
        }
        let indent = " ".repeat(state.get_current_indent() as usize);
        write!(f, "{indent}}}")
    }
}

impl Verify for Region {
    fn verify(&self, ctx: &Context) -> Result<()> {
        for block in self.iter(ctx) {
            block.verify(ctx)?;
        }
        Ok(())
    }
}
