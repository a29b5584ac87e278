//! Intrusive doubly linked lists over [Ptr]s, used to chain
//! [Operation](crate::operation::Operation)s inside a
//! [BasicBlock](crate::basic_block::BasicBlock) and blocks inside a
//! [Region](crate::region::Region).

use crate::context::{Context, Ptr};

/// The setter methods on [LinkedList] and [ContainsLinkedList] must
/// only be called from the list operations below; they do not maintain
/// list consistency on their own. Rust has no private trait methods,
/// hence this private super-trait workaround.
pub(crate) mod private {
    use crate::context::{private::ArenaObj, Ptr};

    pub trait ContainsLinkedList<T: LinkedList> {
        /// Simply set the head pointer.
        fn set_head(&mut self, head: Option<Ptr<T>>);
        /// Simply set the tail pointer.
        fn set_tail(&mut self, tail: Option<Ptr<T>>);
    }

    pub trait LinkedList: ArenaObj + PartialEq {
        type ContainerType: super::ContainsLinkedList<Self> + ArenaObj
        where
            Self: super::LinkedList;
        /// Simply set the item next to this in the list.
        fn set_next(&mut self, next: Option<Ptr<Self>>);
        /// Simply set the item previous to this in the list.
        fn set_prev(&mut self, prev: Option<Ptr<Self>>);
        /// Set the container for this node.
        fn set_container(&mut self, container: Option<Ptr<Self::ContainerType>>)
        where
            Self: super::LinkedList;
    }
}

/// An object that contains a linked list.
pub trait ContainsLinkedList<T: LinkedList>: private::ContainsLinkedList<T> {
    /// Simply get the head of the list.
    fn get_head(&self) -> Option<Ptr<T>>;
    /// Simply get the tail of the list.
    fn get_tail(&self) -> Option<Ptr<T>>;
    /// Get an iterator over the items. Context is borrowed throughout.
    fn iter<'a>(&self, ctx: &'a Context) -> Iter<'a, T> {
        Iter {
            next: self.get_head(),
            next_back: self.get_tail(),
            ctx,
        }
    }
}

/// An iterator over the elements of a [LinkedList].
pub struct Iter<'a, T: LinkedList> {
    next: Option<Ptr<T>>,
    next_back: Option<Ptr<T>>,
    ctx: &'a Context,
}

impl<T: LinkedList> Iterator for Iter<'_, T> {
    type Item = Ptr<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next.inspect(|curr| {
            if *curr
                == self
                    .next_back
                    .expect("Some(next) => Some(next_back) violated")
            {
                self.next = None;
                self.next_back = None;
            } else {
                self.next = curr.deref(self.ctx).get_next();
            }
        })
    }
}

impl<T: LinkedList> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.next_back.inspect(|curr| {
            if *curr == self.next.expect("Some(next_back) => Some(next) violated") {
                self.next_back = None;
                self.next = None;
            } else {
                self.next_back = curr.deref(self.ctx).get_prev();
            }
        })
    }
}

/// Implements a linked list based on [Ptr].
/// Types implementing this trait provide simple getters and setters
/// for the prev and next links; the actual list operations are
/// implemented on `Ptr<T: LinkedList>`.
pub trait LinkedList: private::LinkedList {
    /// Simple getter for the item next to this in the list.
    fn get_next(&self) -> Option<Ptr<Self>>;
    /// Simple getter for the item previous to this in the list.
    fn get_prev(&self) -> Option<Ptr<Self>>;
    /// Get a reference to the object that contains this linked list.
    fn get_container(&self) -> Option<Ptr<Self::ContainerType>>;
}

impl<T> Ptr<T>
where
    T: LinkedList,
{
    fn assert_unlinked(&self, ctx: &Context) {
        let node = self.deref(ctx);
        assert!(
            node.get_prev().is_none()
                && node.get_next().is_none()
                && node.get_container().is_none(),
            "LinkedList node must be unlinked before relinking"
        );
    }

    /// Insert self after mark.
    pub fn insert_after(&self, ctx: &Context, mark: Ptr<T>) {
        self.assert_unlinked(ctx);
        assert!(
            mark.deref(ctx).get_container().is_some(),
            "insert_after: mark node itself is unlinked"
        );
        let next;
        let container;
        {
            let mut mark_ref = mark.deref_mut(ctx);
            container = mark_ref.get_container().unwrap();
            next = mark_ref.get_next();
            match next {
                Some(next) => next.deref_mut(ctx).set_prev(Some(*self)),
                None => {
                    private::ContainsLinkedList::set_tail(
                        &mut *container.deref_mut(ctx),
                        Some(*self),
                    );
                }
            }
            mark_ref.set_next(Some(*self));
        }
        let mut node = self.deref_mut(ctx);
        node.set_next(next);
        node.set_prev(Some(mark));
        node.set_container(Some(container));
    }

    /// Insert self before mark.
    pub fn insert_before(&self, ctx: &Context, mark: Ptr<T>) {
        self.assert_unlinked(ctx);
        assert!(
            mark.deref(ctx).get_container().is_some(),
            "insert_before: mark node itself is unlinked"
        );
        let prev;
        let container;
        {
            let mut mark_ref = mark.deref_mut(ctx);
            container = mark_ref.get_container().unwrap();
            prev = mark_ref.get_prev();
            match prev {
                Some(prev) => prev.deref_mut(ctx).set_next(Some(*self)),
                None => {
                    private::ContainsLinkedList::set_head(
                        &mut *container.deref_mut(ctx),
                        Some(*self),
                    );
                }
            }
            mark_ref.set_prev(Some(*self));
        }
        let mut node = self.deref_mut(ctx);
        node.set_prev(prev);
        node.set_next(Some(mark));
        node.set_container(Some(container));
    }

    /// Insert self as the head of the list.
    pub fn insert_at_front(&self, container: Ptr<T::ContainerType>, ctx: &Context) {
        self.assert_unlinked(ctx);
        let mut node = self.deref_mut(ctx);
        let mut container_ref = container.deref_mut(ctx);
        let head = container_ref.get_head();
        match head {
            Some(head) => head.deref_mut(ctx).set_prev(Some(*self)),
            None => private::ContainsLinkedList::set_tail(&mut *container_ref, Some(*self)),
        }
        node.set_next(head);
        private::ContainsLinkedList::set_head(&mut *container_ref, Some(*self));
        node.set_container(Some(container));
    }

    /// Insert self as the tail of the list.
    pub fn insert_at_back(&self, container: Ptr<T::ContainerType>, ctx: &Context) {
        self.assert_unlinked(ctx);
        let mut node = self.deref_mut(ctx);
        let mut container_ref = container.deref_mut(ctx);
        let tail = container_ref.get_tail();
        match tail {
            Some(tail) => tail.deref_mut(ctx).set_next(Some(*self)),
            None => private::ContainsLinkedList::set_head(&mut *container_ref, Some(*self)),
        }
        node.set_prev(tail);
        private::ContainsLinkedList::set_tail(&mut *container_ref, Some(*self));
        node.set_container(Some(container));
    }

    /// Is this node part of a linked list?
    pub fn is_linked(&self, ctx: &Context) -> bool {
        let node = &*self.deref(ctx);
        let has_container = node.get_container().is_some();
        assert!(
            has_container || node.get_next().is_none() && node.get_prev().is_none(),
            "LinkedList node has no container, but has next/prev node"
        );
        has_container
    }

    /// Unlink self from the list.
    pub fn unlink(&self, ctx: &Context) {
        let container = self
            .deref(ctx)
            .get_container()
            .expect("LinkedList: Attempt to remove unlinked node");
        let next = self.deref(ctx).get_next();
        let prev = self.deref(ctx).get_prev();
        match next {
            Some(next) => next.deref_mut(ctx).set_prev(prev),
            None => private::ContainsLinkedList::set_tail(&mut *container.deref_mut(ctx), prev),
        }
        match prev {
            Some(prev) => prev.deref_mut(ctx).set_next(next),
            None => private::ContainsLinkedList::set_head(&mut *container.deref_mut(ctx), next),
        }
        let mut node = self.deref_mut(ctx);
        node.set_next(None);
        node.set_prev(None);
        node.set_container(None);
    }
}
