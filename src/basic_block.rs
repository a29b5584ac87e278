//! [BasicBlock]s are straight-line sequences of
//! [Operation](crate::operation::Operation)s, contained inside a
//! [Region]. A block defines its arguments as [Value]s and is itself a
//! definition whose uses are the successor slots of predecessor
//! terminators.

use rustc_hash::FxHashMap;

use crate::{
    attribute::AttrObj,
    common_traits::{Named, Verify},
    context::{private::ArenaObj, ArenaCell, Context, Ptr},
    debug_info,
    identifier::Identifier,
    linked_list::{private, ContainsLinkedList, LinkedList},
    operation::Operation,
    printable::{self, Printable},
    r#type::{TypeObj, Typed},
    region::Region,
    result::Result,
    use_def_lists::{DefNode, Value},
};

/// Argument to a [BasicBlock]; a definition.
pub(crate) struct BlockArgument {
    /// The def containing the list of this argument's uses.
    pub(crate) def: DefNode<Value>,
    /// The block of which this is an argument.
    def_block: Ptr<BasicBlock>,
    /// Index of this argument in the block's list of arguments.
    arg_idx: usize,
    /// [Type](crate::type::Type) of this argument.
    ty: Ptr<TypeObj>,
}

impl Typed for BlockArgument {
    fn get_type(&self, _ctx: &Context) -> Ptr<TypeObj> {
        self.ty
    }
}

impl BlockArgument {
    fn as_value(&self) -> Value {
        Value::BlockArgument {
            block: self.def_block,
            arg_idx: self.arg_idx,
        }
    }
}

/// Links a [BasicBlock] with other blocks and the container [Region].
pub(crate) struct RegionLinks {
    /// Parent region of this block.
    parent_region: Option<Ptr<Region>>,
    /// The next block in the region's list of blocks.
    next_block: Option<Ptr<BasicBlock>>,
    /// The previous block in the region's list of blocks.
    prev_block: Option<Ptr<BasicBlock>>,
}

impl RegionLinks {
    fn new_unlinked() -> RegionLinks {
        RegionLinks {
            parent_region: None,
            next_block: None,
            prev_block: None,
        }
    }
}

/// A straight-line sequence of [Operation]s.
pub struct BasicBlock {
    pub(crate) self_ptr: Ptr<BasicBlock>,
    pub(crate) label: Option<Identifier>,
    pub(crate) args: Vec<BlockArgument>,
    /// The [Operation]s in this block.
    ops_list: OpsInBlock,
    /// The block's predecessors: uses in successor slots of
    /// terminators.
    pub(crate) preds: DefNode<Ptr<BasicBlock>>,
    /// Links to the parent [Region] and next / previous blocks.
    region_links: RegionLinks,
    /// Discardable attributes of this block.
    attributes: FxHashMap<Identifier, AttrObj>,
}

struct OpsInBlock {
    first: Option<Ptr<Operation>>,
    last: Option<Ptr<Operation>>,
}

impl PartialEq for BasicBlock {
    fn eq(&self, other: &Self) -> bool {
        self.self_ptr == other.self_ptr
    }
}

impl BasicBlock {
    /// Create a new, unlinked (i.e., not in a [Region]) block.
    pub fn new(
        ctx: &mut Context,
        label: Option<Identifier>,
        arg_types: Vec<Ptr<TypeObj>>,
    ) -> Ptr<BasicBlock> {
        Self::alloc(ctx, |self_ptr: Ptr<BasicBlock>| BasicBlock {
            self_ptr,
            label,
            args: arg_types
                .iter()
                .enumerate()
                .map(|(arg_idx, ty)| BlockArgument {
                    def: DefNode::new(),
                    def_block: self_ptr,
                    arg_idx,
                    ty: *ty,
                })
                .collect(),
            ops_list: OpsInBlock {
                first: None,
                last: None,
            },
            preds: DefNode::new(),
            region_links: RegionLinks::new_unlinked(),
            attributes: FxHashMap::default(),
        })
    }

    /// Number of arguments this block defines.
    pub fn get_num_arguments(&self) -> usize {
        self.args.len()
    }

    /// Get idx'th argument as a [Value].
    pub fn get_argument(&self, idx: usize) -> Option<Value> {
        self.args.get(idx).map(BlockArgument::as_value)
    }

    /// All arguments as [Value]s.
    pub fn arguments(&self) -> impl Iterator<Item = Value> + '_ {
        self.args.iter().map(BlockArgument::as_value)
    }

    /// Types of this block's arguments, in order.
    pub fn arg_types(&self) -> Vec<Ptr<TypeObj>> {
        self.args.iter().map(|arg| arg.ty).collect()
    }

    pub(crate) fn get_argument_ref(&self, idx: usize) -> Option<&BlockArgument> {
        self.args.get(idx)
    }

    pub(crate) fn get_argument_mut(&mut self, idx: usize) -> Option<&mut BlockArgument> {
        self.args.get_mut(idx)
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
    /// no-op.
    pub fn remove_attr(&mut self, key: &Identifier) -> Option<AttrObj> {
        self.attributes.remove(key)
    }
}

impl Named for BasicBlock {
    fn given_name(&self, _ctx: &Context) -> Option<String> {
        self.label.as_ref().map(|label| label.to_string())
    }

    fn id(&self, _ctx: &Context) -> String {
        self.self_ptr.make_name("block")
    }
}

impl ArenaObj for BasicBlock {
    fn get_arena(ctx: &Context) -> &ArenaCell<Self> {
        &ctx.basic_blocks
    }

    fn get_arena_mut(ctx: &mut Context) -> &mut ArenaCell<Self> {
        &mut ctx.basic_blocks
    }

    fn get_self_ptr(&self, _ctx: &Context) -> Ptr<Self> {
        self.self_ptr
    }

    fn dealloc_sub_objects(ptr: Ptr<Self>, ctx: &mut Context) {
        let ops: Vec<_> = {
            let block_ref = ptr.deref(ctx);
            block_ref.iter(ctx).collect()
        };
        for op in ops {
            ArenaObj::dealloc(op, ctx);
        }
    }
}

impl ContainsLinkedList<Operation> for BasicBlock {
    fn get_head(&self) -> Option<Ptr<Operation>> {
        self.ops_list.first
    }

    fn get_tail(&self) -> Option<Ptr<Operation>> {
        self.ops_list.last
    }
}

impl private::ContainsLinkedList<Operation> for BasicBlock {
    fn set_head(&mut self, head: Option<Ptr<Operation>>) {
        self.ops_list.first = head;
    }

    fn set_tail(&mut self, tail: Option<Ptr<Operation>>) {
        self.ops_list.last = tail;
    }
}

impl private::LinkedList for BasicBlock {
    type ContainerType = Region;

    fn set_next(&mut self, next: Option<Ptr<Self>>) {
        self.region_links.next_block = next;
    }

    fn set_prev(&mut self, prev: Option<Ptr<Self>>) {
        self.region_links.prev_block = prev;
    }

    fn set_container(&mut self, container: Option<Ptr<Self::ContainerType>>) {
        self.region_links.parent_region = container;
    }
}

impl LinkedList for BasicBlock {
    fn get_next(&self) -> Option<Ptr<Self>> {
        self.region_links.next_block
    }

    fn get_prev(&self) -> Option<Ptr<Self>> {
        self.region_links.prev_block
    }

    fn get_container(&self) -> Option<Ptr<Region>> {
        self.region_links.parent_region
    }
}

impl Printable for BasicBlock {
    fn fmt(
        &self,
        ctx: &Context,
        state: &printable::State,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        let indent = " ".repeat(state.get_current_indent() as usize);
        write!(f, "{indent}^{}", self.unique_name(ctx))?;
        write!(f, "(")?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(
                f,
                "{}",
                debug_info::block_arg_name(self, i)
                    .unwrap_or_else(|| format!("{}_arg{}", self.self_ptr.make_name("block"), i))
            )?;
            write!(f, ": {}", arg.ty.disp(ctx))?;
        }
        writeln!(f, "):")?;
        state.push_indent();
        let inner_indent = " ".repeat(state.get_current_indent() as usize);
        for op in self.iter(ctx) {
            write!(f, "{inner_indent}")?;
            // Print through the op's registered view, so kinds with a
            // custom syntax use it.
            crate::op::from_operation(ctx, op).fmt(ctx, state, f)?;
            writeln!(f)?;
        }
        state.pop_indent();
        Ok(())
    }
}

impl Verify for BasicBlock {
    fn verify(&self, ctx: &Context) -> Result<()> {
        if let Some(label) = &self.label {
            label.verify(ctx)?;
        }
        for op in self.iter(ctx) {
            op.verify(ctx)?;
        }
        Ok(())
    }
}
