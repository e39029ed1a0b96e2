#[cfg(feature = "no-std")]
use alloc::boxed::Box;
#[cfg(not(feature = "no-std"))]
use std::boxed::Box;

use core::cmp::Ordering;
use core::fmt;
use core::marker::PhantomData;
use core::ptr::NonNull;

pub type LinkedListResult<T> = Result<T, LinkedListError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkedListError {
    /// the node handle does not refer to a node currently linked into the list
    ForeignNode,
}

impl fmt::Display for LinkedListError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ForeignNode => f.write_str("node handle does not belong to this list"),
        }
    }
}

#[cfg(not(feature = "no-std"))]
impl std::error::Error for LinkedListError {}

/// a singly-linked list that owns its nodes. the list keeps a pointer to its
/// last node so appending is O(1), but nodes only link forward, so removing
/// from the back walks the whole chain.
pub struct LinkedList<T> {
    /// owning pointer to the first node, null iff the list is empty
    head: *mut Node<T>,
    /// non-owning pointer to the last node reachable from `head`, null iff the
    /// list is empty
    tail: *mut Node<T>,
    _owns: PhantomData<Box<Node<T>>>,
}

impl<T> LinkedList<T> {
    pub const fn new() -> Self {
        Self {
            head: core::ptr::null_mut(),
            tail: core::ptr::null_mut(),
            _owns: PhantomData,
        }
    }

    /// returns true if the list has no head node
    pub fn is_empty(&self) -> bool {
        self.head.is_null()
    }

    /// count the elements by walking the chain. the list doesn't store its
    /// length, so this is O(n)
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// a handle to the first node, or None if the list is empty
    pub fn head(&self) -> Option<NodeRef<T>> {
        NodeRef::from_raw(self.head)
    }

    /// a handle to the last node, or None if the list is empty
    pub fn tail(&self) -> Option<NodeRef<T>> {
        NodeRef::from_raw(self.tail)
    }

    pub fn first(&self) -> Option<&T> {
        // SAFETY: head is either null or a node owned by this list
        unsafe { self.head.as_ref() }.map(Node::value)
    }

    pub fn last(&self) -> Option<&T> {
        // SAFETY: tail is either null or a node owned by this list
        unsafe { self.tail.as_ref() }.map(Node::value)
    }

    /// insert `value` at the front of the list
    pub fn push(&mut self, value: T) {
        self.push_node(value);
    }

    /// insert `value` at the back of the list
    pub fn append(&mut self, value: T) {
        self.append_node(value);
    }

    /// walk `index` nodes from the head and return a handle to the node found
    /// there, or None if the chain ends first
    pub fn node_at(&self, index: usize) -> Option<NodeRef<T>> {
        NodeRef::from_raw(self.node_ptr_at(index))
    }

    /// the value at `index`, or None if `index` is out of bounds
    pub fn get(&self, index: usize) -> Option<&T> {
        // SAFETY: node_ptr_at only returns null or nodes owned by this list
        unsafe { self.node_ptr_at(index).as_ref() }.map(Node::value)
    }

    /// returns true if `node` is currently linked into this list. O(n)
    pub fn contains_node(&self, node: NodeRef<T>) -> bool {
        let target = node.as_ptr();
        let mut curr = self.head;
        while !curr.is_null() {
            if curr == target {
                return true;
            }
            // SAFETY: curr is non-null and owned by this list
            curr = unsafe { (*curr).next };
        }
        false
    }

    /// borrow the node behind `node` if it belongs to this list
    pub fn resolve(&self, node: NodeRef<T>) -> Option<&Node<T>> {
        if self.contains_node(node) {
            // SAFETY: we just found the node in our own chain
            Some(unsafe { &*node.as_ptr() })
        } else {
            None
        }
    }

    /// insert `value` directly after `node`, returning a handle to the new
    /// node. inserting after the tail appends, moving the tail forward.
    ///
    /// # Safety
    /// `node` must refer to a node currently linked into `self`. a handle from
    /// another list, or to a node that has since been removed, is undefined
    /// behaviour. see `try_insert_after` for a checked version
    pub unsafe fn insert_after(&mut self, value: T, node: NodeRef<T>) -> NodeRef<T> {
        debug_assert!(
            self.contains_node(node),
            "insert_after called with a node from another list"
        );

        let node = node.as_ptr();
        if node == self.tail {
            return NodeRef::new(self.append_node(value));
        }

        // Before: (node) -> (node.next)
        // After: (node) -> (new) -> (node.next)
        let new_node = Node::alloc(value, (*node).next);
        (*node).next = new_node.as_ptr();
        NodeRef::new(new_node)
    }

    /// like `insert_after`, but scans the list first and refuses handles that
    /// don't belong to it
    pub fn try_insert_after(&mut self, value: T, node: NodeRef<T>) -> LinkedListResult<NodeRef<T>> {
        if !self.contains_node(node) {
            log::debug!("refusing to insert after {:?}: not linked into this list", node);
            return Err(LinkedListError::ForeignNode);
        }

        // SAFETY: membership was just checked
        Ok(unsafe { self.insert_after(value, node) })
    }

    /// remove the first element and return its value, or None if the list is
    /// empty
    pub fn pop(&mut self) -> Option<T> {
        if self.head.is_null() {
            return None;
        }

        // SAFETY: head is non-null and was allocated by Node::alloc. the list
        // owns it and nothing else frees it
        let head = unsafe { Box::from_raw(self.head) };
        self.head = head.next;
        if self.head.is_null() {
            self.tail = core::ptr::null_mut();
        }
        Some(head.value)
    }

    /// remove the last element and return its value, or None if the list is
    /// empty. nodes don't link backward, so finding the new tail is O(n)
    pub fn remove_last(&mut self) -> Option<T> {
        if self.head.is_null() {
            return None;
        }

        // SAFETY: every pointer followed below is a non-null node owned by
        // this list; the last node is unlinked before being freed
        unsafe {
            if (*self.head).next.is_null() {
                return self.pop();
            }

            let mut prev = self.head;
            let mut curr = (*self.head).next;
            while !(*curr).next.is_null() {
                prev = curr;
                curr = (*curr).next;
            }

            (*prev).next = core::ptr::null_mut();
            log::trace!("remove_last moved tail from {:p} to {:p}", curr, prev);
            self.tail = prev;
            Some(Box::from_raw(curr).value)
        }
    }

    /// remove the node following `node` and return its value, or None if
    /// `node` is the last node
    ///
    /// # Safety
    /// `node` must refer to a node currently linked into `self`. a handle from
    /// another list, or to a node that has since been removed, is undefined
    /// behaviour. see `try_remove_after` for a checked version
    pub unsafe fn remove_after(&mut self, node: NodeRef<T>) -> Option<T> {
        debug_assert!(
            self.contains_node(node),
            "remove_after called with a node from another list"
        );

        let node = node.as_ptr();
        let removed = (*node).next;
        if removed.is_null() {
            return None;
        }

        if removed == self.tail {
            log::trace!("remove_after moved tail from {:p} to {:p}", removed, node);
            self.tail = node;
        }

        // Before: (node) -> (removed) -> (removed.next)
        // After: (node) -> (removed.next)
        (*node).next = (*removed).next;
        Some(Box::from_raw(removed).value)
    }

    /// like `remove_after`, but scans the list first and refuses handles that
    /// don't belong to it
    pub fn try_remove_after(&mut self, node: NodeRef<T>) -> LinkedListResult<Option<T>> {
        if !self.contains_node(node) {
            log::debug!("refusing to remove after {:?}: not linked into this list", node);
            return Err(LinkedListError::ForeignNode);
        }

        // SAFETY: membership was just checked
        Ok(unsafe { self.remove_after(node) })
    }

    /// the position of the first element. equal to `end_position` when the
    /// list is empty
    pub fn start_position(&self) -> Position<'_, T> {
        Position::new(self.head)
    }

    /// the position one past the last element
    pub fn end_position(&self) -> Position<'_, T> {
        // SAFETY: tail is either null or the last node owned by this list
        match unsafe { self.tail.as_ref() } {
            Some(tail) => Position::new(tail.next),
            None => Position::new(core::ptr::null_mut()),
        }
    }

    /// the position following `position`. the end position is its own
    /// successor
    pub fn position_after<'a>(&'a self, position: Position<'a, T>) -> Position<'a, T> {
        match position.node() {
            Some(node) => Position::new(node.next),
            None => position,
        }
    }

    /// the value at `position`
    ///
    /// # Panics
    /// panics if `position` is the end position
    pub fn at<'a>(&'a self, position: Position<'a, T>) -> &'a T {
        match position.value() {
            Some(value) => value,
            None => panic!("cannot dereference the end position of a LinkedList"),
        }
    }

    /// return an immutable iterator over the values, from `start_position` up
    /// to `end_position`
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            curr: self.start_position(),
            end: self.end_position(),
        }
    }

    /// return a mutable iterator over the values
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut {
            curr: self.head,
            _list: PhantomData,
        }
    }

    fn node_ptr_at(&self, index: usize) -> *mut Node<T> {
        let mut curr = self.head;
        let mut curr_index = 0;
        while !curr.is_null() && curr_index < index {
            // SAFETY: curr is non-null and owned by this list
            curr = unsafe { (*curr).next };
            curr_index += 1;
        }
        curr
    }

    fn push_node(&mut self, value: T) -> NonNull<Node<T>> {
        let node = Node::alloc(value, self.head);
        self.head = node.as_ptr();
        if self.tail.is_null() {
            self.tail = self.head;
        }
        node
    }

    fn append_node(&mut self, value: T) -> NonNull<Node<T>> {
        if self.is_empty() {
            return self.push_node(value);
        }

        let node = Node::alloc(value, core::ptr::null_mut());
        // SAFETY: the list isn't empty, so tail is the last node we own
        unsafe { (*self.tail).next = node.as_ptr() };
        self.tail = node.as_ptr();
        node
    }
}

impl<T> Drop for LinkedList<T> {
    fn drop(&mut self) {
        // popping one node at a time keeps long chains from recursing through
        // nested drops
        while self.pop().is_some() {}
    }
}

impl<T> Default for LinkedList<T> {
    fn default() -> Self {
        Self::new()
    }
}

// the list uniquely owns every node, so it's as thread-safe as T is
unsafe impl<T: Send> Send for LinkedList<T> {}
unsafe impl<T: Sync> Sync for LinkedList<T> {}

impl<T: Clone> Clone for LinkedList<T> {
    fn clone(&self) -> Self {
        self.iter().cloned().collect()
    }
}

impl<T: PartialEq> PartialEq for LinkedList<T> {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl<T: Eq> Eq for LinkedList<T> {}

impl<T> Extend<T> for LinkedList<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.append(value);
        }
    }
}

impl<T> FromIterator<T> for LinkedList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = Self::new();
        list.extend(iter);
        list
    }
}

impl<T: fmt::Debug> fmt::Debug for LinkedList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: fmt::Display> fmt::Display for LinkedList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // SAFETY: head is either null or a node owned by this list
        match unsafe { self.head.as_ref() } {
            Some(head) => write!(f, "{} ", head),
            None => f.write_str("Empty List"),
        }
    }
}

/// a single cell of the chain, owning its value and its successor
pub struct Node<T> {
    value: T,
    next: *mut Node<T>,
}

impl<T> Node<T> {
    fn alloc(value: T, next: *mut Node<T>) -> NonNull<Node<T>> {
        NonNull::from(Box::leak(Box::new(Node { value, next })))
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    /// the following node, or None if this is the last node
    pub fn next(&self) -> Option<&Node<T>> {
        // SAFETY: next is either null or a node owned by the same list as self
        unsafe { self.next.as_ref() }
    }
}

/// renders this node and every node after it, `a -> b -> c`
impl<T: fmt::Display> fmt::Display for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)?;
        let mut curr = self.next();
        while let Some(node) = curr {
            write!(f, " -> {}", node.value)?;
            curr = node.next();
        }
        Ok(())
    }
}

impl<T: fmt::Debug> fmt::Debug for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("self", &core::ptr::addr_of!(*self))
            .field("value", &self.value)
            .field("next", &self.next)
            .finish()
    }
}

/// a copyable, non-owning handle to a node, used to name the node that
/// `insert_after` and `remove_after` operate on. a handle stays valid only as
/// long as its node stays in the list
pub struct NodeRef<T> {
    ptr: NonNull<Node<T>>,
}

impl<T> NodeRef<T> {
    fn new(ptr: NonNull<Node<T>>) -> Self {
        Self { ptr }
    }

    fn from_raw(ptr: *mut Node<T>) -> Option<Self> {
        NonNull::new(ptr).map(Self::new)
    }

    fn as_ptr(self) -> *mut Node<T> {
        self.ptr.as_ptr()
    }
}

impl<T> Clone for NodeRef<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for NodeRef<T> {}

impl<T> PartialEq for NodeRef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr
    }
}

impl<T> Eq for NodeRef<T> {}

impl<T> fmt::Debug for NodeRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeRef({:p})", self.ptr)
    }
}

/// a position in a list, marking the node about to be visited. the end
/// position wraps the (always null) link after the tail
pub struct Position<'a, T> {
    node: *mut Node<T>,
    _list: PhantomData<&'a LinkedList<T>>,
}

impl<'a, T> Position<'a, T> {
    fn new(node: *mut Node<T>) -> Self {
        Self {
            node,
            _list: PhantomData,
        }
    }

    fn node(&self) -> Option<&'a Node<T>> {
        // SAFETY: positions are only created from nodes of a list borrowed for 'a
        unsafe { self.node.as_ref() }
    }

    /// the value at this position, or None for the end position
    pub fn value(&self) -> Option<&'a T> {
        self.node().map(Node::value)
    }

    /// true if `other`'s node can be reached by walking forward from ours. the
    /// end position is reachable from every position
    fn reaches(&self, other: &Self) -> bool {
        let mut curr = self.node();
        while let Some(node) = curr {
            if core::ptr::eq(node, other.node) {
                return true;
            }
            curr = node.next();
        }
        other.node.is_null()
    }
}

impl<'a, T> Clone for Position<'a, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T> Copy for Position<'a, T> {}

/// two positions are equal when both are at the end, or when the nodes they
/// wrap share the same successor. this compares one link ahead rather than
/// the wrapped nodes themselves, so the last node of one list equals the last
/// node of any other list
impl<'a, T> PartialEq for Position<'a, T> {
    fn eq(&self, other: &Self) -> bool {
        match (self.node(), other.node()) {
            (Some(lhs), Some(rhs)) => lhs.next == rhs.next,
            (None, None) => true,
            _ => false,
        }
    }
}

impl<'a, T> Eq for Position<'a, T> {}

/// unequal positions are ordered by reachability; positions in unrelated
/// chains have no ordering
impl<'a, T> PartialOrd for Position<'a, T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self == other {
            Some(Ordering::Equal)
        } else if self.reaches(other) {
            Some(Ordering::Less)
        } else if other.reaches(self) {
            Some(Ordering::Greater)
        } else {
            None
        }
    }
}

impl<'a, T> fmt::Debug for Position<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Position").field("node", &self.node).finish()
    }
}

pub struct Iter<'a, T> {
    list: &'a LinkedList<T>,
    curr: Position<'a, T>,
    end: Position<'a, T>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.curr == self.end {
            return None;
        }

        let value = self.curr.value()?;
        self.curr = self.list.position_after(self.curr);
        Some(value)
    }
}

pub struct IterMut<'a, T> {
    curr: *mut Node<T>,
    _list: PhantomData<&'a mut LinkedList<T>>,
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = &'a mut T;

    fn next(&mut self) -> Option<Self::Item> {
        // SAFETY: the list is mutably borrowed for 'a and each node is handed
        // out exactly once, so the returned references never alias
        let node = unsafe { self.curr.as_mut() }?;
        self.curr = node.next;
        Some(&mut node.value)
    }
}

/// an owning iterator that pops values off the front of the list
pub struct IntoIter<T>(LinkedList<T>);

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.pop()
    }
}

impl<T> IntoIterator for LinkedList<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter(self)
    }
}

impl<'a, T> IntoIterator for &'a LinkedList<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T> IntoIterator for &'a mut LinkedList<T> {
    type Item = &'a mut T;
    type IntoIter = IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}


#[cfg(test)]
mod position_test {
    use super::*;

    fn read_back<T: Clone>(ll: &LinkedList<T>) -> Vec<T> {
        let mut out = Vec::new();
        let mut position = ll.start_position();
        let end = ll.end_position();
        while position != end {
            out.push(ll.at(position).clone());
            position = ll.position_after(position);
        }
        out
    }

    #[test]
    fn positions_round_trip_appended_values() {
        let sequences: [Vec<u32>; 5] = [
            Vec::new(),
            [1].to_vec(),
            [1, 2, 3].to_vec(),
            [5, 5, 5].to_vec(),
            (0..10).collect(),
        ];

        for sequence in sequences {
            let mut ll = LinkedList::new();
            for value in sequence.iter() {
                ll.append(*value);
            }
            assert_eq!(read_back(&ll), sequence);
            assert_eq!(ll.iter().copied().collect::<Vec<_>>(), sequence);
        }
    }

    #[test]
    fn start_equals_end_on_empty_list() {
        let ll = LinkedList::<u32>::new();
        assert_eq!(ll.start_position(), ll.end_position());
        assert!(ll.start_position().value().is_none());
        assert_eq!(ll.iter().next(), None);
    }

    #[test]
    fn end_position_has_no_value() {
        let ll: LinkedList<u32> = [1, 2].into_iter().collect();
        assert!(ll.end_position().value().is_none());
        assert_eq!(ll.position_after(ll.end_position()), ll.end_position());
    }

    #[test]
    #[should_panic(expected = "end position")]
    fn dereferencing_end_position_panics() {
        let ll: LinkedList<u32> = [1, 2].into_iter().collect();
        let _ = ll.at(ll.end_position());
    }

    #[test]
    fn end_positions_of_different_lists_are_equal() {
        let a: LinkedList<u32> = [1, 2].into_iter().collect();
        let b = LinkedList::<u32>::new();
        assert_eq!(a.end_position(), b.end_position());
    }

    #[test]
    fn positions_compare_by_successor() {
        let a: LinkedList<u32> = [1, 2].into_iter().collect();
        let b: LinkedList<u32> = [3, 4].into_iter().collect();

        // both tails are followed by nothing, so their positions compare equal
        let a_last = a.position_after(a.start_position());
        let b_last = b.position_after(b.start_position());
        assert_eq!(a_last, b_last);
        assert_ne!(a.start_position(), b.start_position());
        assert_ne!(a_last, a.end_position());
    }

    #[test]
    fn positions_are_ordered_front_to_back() {
        let ll: LinkedList<u32> = (0..4).collect();
        let start = ll.start_position();
        let second = ll.position_after(start);
        let end = ll.end_position();

        assert!(start < second);
        assert!(second > start);
        assert!(start < end);
        assert!(second < end);
        assert!(!(end < start));
        assert_eq!(start.partial_cmp(&start), Some(Ordering::Equal));
        assert_eq!(end.partial_cmp(&second), Some(Ordering::Greater));
    }

    #[test]
    fn positions_in_unrelated_lists_are_unordered() {
        let a: LinkedList<u32> = [1, 2].into_iter().collect();
        let b: LinkedList<u32> = [3, 4].into_iter().collect();
        assert_eq!(a.start_position().partial_cmp(&b.start_position()), None);
    }

    #[test]
    fn iteration_restarts_from_the_head() {
        let ll: LinkedList<u32> = (0..10).collect();
        assert_eq!(*ll.at(ll.start_position()), 0);

        let prefix: Vec<u32> = ll.iter().take(3).copied().collect();
        assert_eq!(prefix, [0, 1, 2]);

        let suffix: Vec<u32> = ll.iter().skip(ll.len() - 3).copied().collect();
        assert_eq!(suffix, [7, 8, 9]);

        let sum: u32 = ll.iter().sum();
        assert_eq!(sum, 45);
        assert_eq!(ll.iter().fold(0, |acc, value| acc + value), 45);
    }

    #[test]
    fn iter_terminates_properly_single_element() {
        let mut ll = LinkedList::new();
        ll.append(42);
        let mut iter = ll.iter();
        assert_eq!(iter.next(), Some(&42));
        for _ in 0..10 {
            assert!(iter.next().is_none());
        }
    }
}

// proptest doesn't run under miri with default config
#[cfg(all(not(miri), test))]
mod proptests {
    use proptest::prelude::*;
    use proptest::test_runner::Config;
    use proptest_state_machine::{ReferenceStateMachine, StateMachineTest};

    use super::*;

    proptest_state_machine::prop_state_machine! {
        #![proptest_config(Config {
            failure_persistence: None,
            .. Config::default()
        })]

        #[test]
        fn linked_list_state_machine_test(
            sequential
            1..200
            =>
            LinkedList<u32>
        );
    }

    #[derive(Clone, Debug)]
    pub enum Transition {
        Push(u32),
        Append(u32),
        Pop,
        RemoveLast,
        InsertAfter(usize, u32),
        RemoveAfter(usize),
    }

    pub struct LinkedListStateMachine;

    impl ReferenceStateMachine for LinkedListStateMachine {
        type State = Vec<u32>;
        type Transition = Transition;

        fn init_state() -> BoxedStrategy<Self::State> {
            Just(Vec::new()).boxed()
        }

        fn transitions(state: &Self::State) -> BoxedStrategy<Self::Transition> {
            if state.is_empty() {
                return prop_oneof![
                    1 => Just(Transition::Pop),
                    1 => Just(Transition::RemoveLast),
                    2 => any::<u32>().prop_map(Transition::Push),
                    2 => any::<u32>().prop_map(Transition::Append),
                ]
                .boxed();
            }

            let len = state.len();
            prop_oneof![
                1 => Just(Transition::Pop),
                1 => Just(Transition::RemoveLast),
                2 => any::<u32>().prop_map(Transition::Push),
                2 => any::<u32>().prop_map(Transition::Append),
                2 => (0..len, any::<u32>())
                    .prop_map(|(index, value)| Transition::InsertAfter(index, value)),
                1 => (0..len).prop_map(Transition::RemoveAfter),
            ]
            .boxed()
        }

        fn preconditions(state: &Self::State, transition: &Self::Transition) -> bool {
            match transition {
                Transition::InsertAfter(index, _) | Transition::RemoveAfter(index) => {
                    *index < state.len()
                }
                _ => true,
            }
        }

        fn apply(mut state: Self::State, transition: &Self::Transition) -> Self::State {
            match transition {
                Transition::Push(value) => state.insert(0, *value),
                Transition::Append(value) => state.push(*value),
                Transition::Pop => {
                    if !state.is_empty() {
                        state.remove(0);
                    }
                }
                Transition::RemoveLast => {
                    state.pop();
                }
                Transition::InsertAfter(index, value) => state.insert(index + 1, *value),
                Transition::RemoveAfter(index) => {
                    if index + 1 < state.len() {
                        state.remove(index + 1);
                    }
                }
            }
            state
        }
    }

    impl StateMachineTest for LinkedList<u32> {
        type SystemUnderTest = Self;
        type Reference = LinkedListStateMachine;

        fn init_test(
            _ref_state: &<Self::Reference as ReferenceStateMachine>::State,
        ) -> Self::SystemUnderTest {
            LinkedList::new()
        }

        fn apply(
            mut state: Self::SystemUnderTest,
            _ref_state: &<Self::Reference as ReferenceStateMachine>::State,
            transition: Transition,
        ) -> Self::SystemUnderTest {
            match transition {
                Transition::Push(value) => state.push(value),
                Transition::Append(value) => state.append(value),
                Transition::Pop => {
                    let _ = state.pop();
                }
                Transition::RemoveLast => {
                    let _ = state.remove_last();
                }
                Transition::InsertAfter(index, value) => {
                    let node = state.node_at(index).expect("index checked by preconditions");
                    state
                        .try_insert_after(value, node)
                        .expect("node_at returns nodes of this list");
                }
                Transition::RemoveAfter(index) => {
                    let node = state.node_at(index).expect("index checked by preconditions");
                    let _ = state
                        .try_remove_after(node)
                        .expect("node_at returns nodes of this list");
                }
            }
            state
        }

        fn check_invariants(
            state: &Self::SystemUnderTest,
            ref_state: &<Self::Reference as ReferenceStateMachine>::State,
        ) {
            assert_eq!(state.is_empty(), ref_state.is_empty());
            assert_eq!(state.len(), ref_state.len());
            assert_eq!(state.first(), ref_state.first());
            assert_eq!(state.last(), ref_state.last());
            assert!(state.iter().eq(ref_state.iter()));

            match state.tail() {
                Some(tail) => {
                    let tail = state.resolve(tail).expect("tail should be linked from head");
                    assert!(tail.next().is_none());
                }
                None => assert!(state.head().is_none()),
            }
        }
    }
}

#[cfg(all(not(miri), test))]
mod longform_proptests {
    use proptest::collection::vec;
    use proptest::prelude::*;
    use proptest_derive::Arbitrary;
    use rand::Rng;

    use super::*;

    #[derive(Arbitrary, Debug)]
    enum Operation {
        Push(u32),
        Append(u32),
        Pop,
        RemoveLast,
        InsertAfterRandom(u32),
        RemoveAfterRandom,
        Iterate,
    }

    fn random_index(reference: &[u32]) -> Option<usize> {
        if reference.is_empty() {
            return None;
        }
        Some(rand::thread_rng().gen_range(0..reference.len()))
    }

    proptest! {
        #[test]
        #[ignore]
        fn longform(ops in vec(any::<Operation>(), 2048)) {
            let mut reference: Vec<u32> = Vec::new();
            let mut ll = LinkedList::new();

            for op in ops.iter() {
                match op {
                    Operation::Push(value) => {
                        reference.insert(0, *value);
                        ll.push(*value);
                    }
                    Operation::Append(value) => {
                        reference.push(*value);
                        ll.append(*value);
                    }
                    Operation::Pop => {
                        let expected = if reference.is_empty() { None } else { Some(reference.remove(0)) };
                        assert_eq!(ll.pop(), expected);
                    }
                    Operation::RemoveLast => {
                        assert_eq!(ll.remove_last(), reference.pop());
                    }
                    Operation::InsertAfterRandom(value) => {
                        if let Some(index) = random_index(&reference) {
                            reference.insert(index + 1, *value);
                            let node = ll.node_at(index).expect("index in bounds");
                            ll.try_insert_after(*value, node).expect("node belongs to list");
                        }
                    }
                    Operation::RemoveAfterRandom => {
                        if let Some(index) = random_index(&reference) {
                            let expected = if index + 1 < reference.len() {
                                Some(reference.remove(index + 1))
                            } else {
                                None
                            };
                            let node = ll.node_at(index).expect("index in bounds");
                            assert_eq!(ll.try_remove_after(node), Ok(expected));
                        }
                    }
                    Operation::Iterate => {
                        assert!(ll.iter().eq(reference.iter()));
                    }
                }
                assert_eq!(ll.last(), reference.last());
            }
        }
    }
}
