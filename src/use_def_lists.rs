//! # Use-Def and Def-Use Graph.
//! At the core of the IR are SSA use-def chains, composed of:
//!   - [Value]: a value definition, either a block argument or an
//!     operation result.
//!   - [`Ptr<BasicBlock>`]: a block definition. Its uses are in the
//!     successor lists of predecessor terminators.
//!   - [Use]: the use of a definition, either as an operand or as a
//!     successor of an [Operation].
//!
//! Def nodes live inside the defining object's arena cell, so walking
//! or editing a chain read / write locks that cell for the duration of
//! the returned guard.

use std::{hash::Hash, marker::PhantomData};

use parking_lot::{MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLockReadGuard, RwLockWriteGuard};
use rustc_hash::FxHashSet;

use crate::{
    basic_block::BasicBlock,
    common_traits::Named,
    context::{Context, Ptr},
    linked_list::{ContainsLinkedList, LinkedList},
    operation::Operation,
    printable::Printable,
    r#type::{TypeObj, Typed},
};

/// def-use chains are implemented for [Value]s and `Ptr<BasicBlock>`.
pub trait DefUseParticipant: Copy + Hash + Eq {}
impl DefUseParticipant for Value {}
impl DefUseParticipant for Ptr<BasicBlock> {}

/// A def node contains a list of its uses.
pub(crate) struct DefNode<T: DefUseParticipant> {
    /// The list of uses of this Def.
    uses: FxHashSet<Use<T>>,
}

impl<T: DefUseParticipant> DefNode<T> {
    /// Create a new definition.
    pub(crate) fn new() -> DefNode<T> {
        DefNode {
            uses: FxHashSet::default(),
        }
    }

    /// Does the definition have a use?
    pub(crate) fn has_use(&self) -> bool {
        !self.uses.is_empty()
    }

    /// How many uses does this definition have?
    pub(crate) fn num_uses(&self) -> usize {
        self.uses.len()
    }

    /// Get a copy of all [Use]s.
    pub(crate) fn get_uses(&self) -> Vec<Use<T>> {
        self.uses.iter().cloned().collect()
    }

    /// This definition has a new use. Track it and return a
    /// corresponding [UseNode], to be stored in the operand / successor.
    pub(crate) fn add_use(&mut self, self_descr: T, r#use: Use<T>) -> UseNode<T> {
        if !self.uses.insert(r#use) {
            panic!("Def: Attempt to insert an existing use");
        }
        UseNode { def: self_descr }
    }

    /// Remove `use` from the underlying definition.
    pub(crate) fn remove_use(&mut self, r#use: Use<T>) {
        if !self.uses.remove(&r#use) {
            panic!("Def: Attempt to remove a use that doesn't exist");
        }
    }

    /// Replace uses of the underlying definition, that satisfy `pred`,
    /// with `other`. `other` must be a different definition than the
    /// one this def node belongs to; its cell gets write locked here.
    pub(crate) fn replace_some_uses_with<P: Fn(&Context, &Use<T>) -> bool>(
        &mut self,
        ctx: &Context,
        pred: P,
        other: &T,
    ) where
        T: DefTrait + UseTrait,
    {
        for r#use in self.uses.iter().filter(|r#use| pred(ctx, r#use)) {
            let mut use_mut = T::get_usenode_mut(r#use, ctx);
            *use_mut = other.get_defnode_mut(ctx).add_use(*other, *r#use);
        }
        // self no longer has these uses.
        self.uses.retain(|r#use| !pred(ctx, r#use));
    }
}

/// Interface for [UseNode] wrappers.
pub(crate) trait UseTrait: DefUseParticipant {
    /// Get a reference to the [UseNode] described by this use.
    fn get_usenode_ref<'a>(
        r#use: &Use<Self>,
        ctx: &'a Context,
    ) -> MappedRwLockReadGuard<'a, UseNode<Self>>;
    /// Get a mutable reference to the [UseNode] described by this use.
    fn get_usenode_mut<'a>(
        r#use: &Use<Self>,
        ctx: &'a Context,
    ) -> MappedRwLockWriteGuard<'a, UseNode<Self>>;
}

/// Interface for [DefNode] wrappers.
pub(crate) trait DefTrait: DefUseParticipant {
    /// Get a reference to the underlying [DefNode].
    fn get_defnode_ref<'a>(&self, ctx: &'a Context) -> MappedRwLockReadGuard<'a, DefNode<Self>>;
    /// Get a mutable reference to the underlying [DefNode].
    fn get_defnode_mut<'a>(&self, ctx: &'a Context) -> MappedRwLockWriteGuard<'a, DefNode<Self>>;
}

/// Describes a value definition.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Value {
    OpResult {
        op: Ptr<Operation>,
        res_idx: usize,
    },
    BlockArgument {
        block: Ptr<BasicBlock>,
        arg_idx: usize,
    },
}

impl Value {
    /// How many uses does this definition have?
    pub fn num_uses(&self, ctx: &Context) -> usize {
        self.get_defnode_ref(ctx).num_uses()
    }

    /// Get all uses of this value.
    pub fn get_uses(&self, ctx: &Context) -> Vec<Use<Value>> {
        self.get_defnode_ref(ctx).get_uses()
    }

    /// Does this definition have any [Use]?
    pub fn has_use(&self, ctx: &Context) -> bool {
        self.get_defnode_ref(ctx).has_use()
    }

    /// Replace uses of the underlying definition, that satisfy `pred`,
    /// with `other`.
    pub fn replace_some_uses_with<P: Fn(&Context, &Use<Value>) -> bool>(
        &self,
        ctx: &Context,
        pred: P,
        other: &Value,
    ) {
        if self == other {
            return;
        }
        self.get_defnode_mut(ctx)
            .replace_some_uses_with(ctx, pred, other);
    }
}

impl Typed for Value {
    fn get_type(&self, ctx: &Context) -> Ptr<TypeObj> {
        match self {
            Value::OpResult { op, res_idx } => {
                op.deref(ctx).get_result_ref(*res_idx).unwrap().get_type(ctx)
            }
            Value::BlockArgument { block, arg_idx } => block
                .deref(ctx)
                .get_argument_ref(*arg_idx)
                .unwrap()
                .get_type(ctx),
        }
    }
}

impl Named for Value {
    fn given_name(&self, ctx: &Context) -> Option<String> {
        match self {
            Value::OpResult { op, res_idx } => {
                crate::debug_info::operation_result_name(&op.deref(ctx), *res_idx)
            }
            Value::BlockArgument { block, arg_idx } => {
                crate::debug_info::block_arg_name(&block.deref(ctx), *arg_idx)
            }
        }
    }

    fn id(&self, _ctx: &Context) -> String {
        match self {
            Value::OpResult { op, res_idx } => {
                format!("{}_res{res_idx}", op.make_name("op"))
            }
            Value::BlockArgument { block, arg_idx } => {
                format!("{}_arg{arg_idx}", block.make_name("block"))
            }
        }
    }
}

impl Printable for Value {
    fn fmt(
        &self,
        ctx: &Context,
        _state: &crate::printable::State,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}", self.unique_name(ctx))
    }
}

impl DefTrait for Value {
    fn get_defnode_ref<'a>(&self, ctx: &'a Context) -> MappedRwLockReadGuard<'a, DefNode<Self>> {
        match self {
            Self::OpResult { op, res_idx } => {
                let op = op.deref(ctx);
                RwLockReadGuard::map(op, |opref| &opref.get_result_ref(*res_idx).unwrap().def)
            }
            Self::BlockArgument { block, arg_idx } => {
                let block = block.deref(ctx);
                RwLockReadGuard::map(block, |blockref| {
                    &blockref.get_argument_ref(*arg_idx).unwrap().def
                })
            }
        }
    }

    fn get_defnode_mut<'a>(&self, ctx: &'a Context) -> MappedRwLockWriteGuard<'a, DefNode<Self>> {
        match self {
            Self::OpResult { op, res_idx } => {
                let op = op.deref_mut(ctx);
                RwLockWriteGuard::map(op, |opref| {
                    &mut opref.get_result_mut(*res_idx).unwrap().def
                })
            }
            Self::BlockArgument { block, arg_idx } => {
                let block = block.deref_mut(ctx);
                RwLockWriteGuard::map(block, |blockref| {
                    &mut blockref.get_argument_mut(*arg_idx).unwrap().def
                })
            }
        }
    }
}

impl UseTrait for Value {
    fn get_usenode_ref<'a>(
        r#use: &Use<Value>,
        ctx: &'a Context,
    ) -> MappedRwLockReadGuard<'a, UseNode<Value>> {
        let op = r#use.op.deref(ctx);
        RwLockReadGuard::map(op, |opref| {
            &opref.get_operand_ref(r#use.opd_idx).unwrap().r#use
        })
    }

    fn get_usenode_mut<'a>(
        r#use: &Use<Self>,
        ctx: &'a Context,
    ) -> MappedRwLockWriteGuard<'a, UseNode<Value>> {
        let op = r#use.op.deref_mut(ctx);
        RwLockWriteGuard::map(op, |opref| {
            &mut opref.get_operand_mut(r#use.opd_idx).unwrap().r#use
        })
    }
}

impl Named for Ptr<BasicBlock> {
    fn given_name(&self, ctx: &Context) -> Option<String> {
        self.deref(ctx).given_name(ctx)
    }
    fn id(&self, ctx: &Context) -> String {
        self.deref(ctx).id(ctx)
    }
}

impl Ptr<BasicBlock> {
    /// How many predecessors does this block have?
    pub fn num_preds(&self, ctx: &Context) -> usize {
        self.get_defnode_ref(ctx).num_uses()
    }

    /// Does this [BasicBlock] have any predecessor?
    pub fn has_pred(&self, ctx: &Context) -> bool {
        self.get_defnode_ref(ctx).has_use()
    }

    /// Checks whether self is a successor of `pred`.
    /// O(n) in the number of successors of `pred`.
    pub fn is_succ_of(&self, ctx: &Context, pred: Ptr<BasicBlock>) -> bool {
        pred.deref(ctx).get_tail().is_some_and(|pred_term| {
            pred_term.deref(ctx).successors().any(|succ| self == &succ)
        })
    }

    /// Retarget predecessors (that satisfy `pred`) to `other`.
    pub fn retarget_some_preds_to<P: Fn(&Context, Ptr<BasicBlock>) -> bool>(
        &self,
        ctx: &Context,
        pred: P,
        other: Ptr<BasicBlock>,
    ) {
        if *self == other {
            return;
        }
        let pred = |ctx: &Context, r#use: &Use<Ptr<BasicBlock>>| {
            let pred_block = r#use
                .op
                .deref(ctx)
                .get_container()
                .expect("Predecessor terminator must be in a BasicBlock");
            pred(ctx, pred_block)
        };

        self.get_defnode_mut(ctx)
            .replace_some_uses_with(ctx, pred, &other);
    }
}

impl DefTrait for Ptr<BasicBlock> {
    fn get_defnode_ref<'a>(&self, ctx: &'a Context) -> MappedRwLockReadGuard<'a, DefNode<Self>> {
        let block = self.deref(ctx);
        RwLockReadGuard::map(block, |blockref| &blockref.preds)
    }

    fn get_defnode_mut<'a>(&self, ctx: &'a Context) -> MappedRwLockWriteGuard<'a, DefNode<Self>> {
        let block = self.deref_mut(ctx);
        RwLockWriteGuard::map(block, |blockref| &mut blockref.preds)
    }
}

impl UseTrait for Ptr<BasicBlock> {
    fn get_usenode_ref<'a>(
        r#use: &Use<Ptr<BasicBlock>>,
        ctx: &'a Context,
    ) -> MappedRwLockReadGuard<'a, UseNode<Ptr<BasicBlock>>> {
        let op = r#use.op.deref(ctx);
        RwLockReadGuard::map(op, |opref| {
            &opref.get_successor_ref(r#use.opd_idx).unwrap().r#use
        })
    }

    fn get_usenode_mut<'a>(
        r#use: &Use<Ptr<BasicBlock>>,
        ctx: &'a Context,
    ) -> MappedRwLockWriteGuard<'a, UseNode<Ptr<BasicBlock>>> {
        let op = r#use.op.deref_mut(ctx);
        RwLockWriteGuard::map(op, |opref| {
            &mut opref.get_successor_mut(r#use.opd_idx).unwrap().r#use
        })
    }
}

/// A use node contains a pointer to its definition.
#[derive(Clone, Copy, Debug)]
pub(crate) struct UseNode<T: DefUseParticipant> {
    /// The definition that this is a use of.
    def: T,
}

impl<T: DefUseParticipant> UseNode<T> {
    pub(crate) fn get_def(&self) -> T {
        self.def
    }
}

/// Describes a [Value] or [BasicBlock] use.
#[derive(Clone, Copy, Eq, PartialEq, Hash)]
pub struct Use<T: DefUseParticipant> {
    /// Uses of a def can only be in an operation.
    pub op: Ptr<Operation>,
    /// Used as the i'th operand or successor of [op](Self::op).
    pub opd_idx: usize,
    pub(crate) _dummy: PhantomData<T>,
}
