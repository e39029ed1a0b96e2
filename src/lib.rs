#![cfg_attr(all(feature = "no-std", not(test)), no_std)]

#[cfg(feature = "no-std")]
extern crate alloc;

pub mod collections;
pub mod sync;

pub use collections::linked_list::{
    LinkedList, LinkedListError, LinkedListResult, Node, NodeRef, Position,
};
pub use sync::shared_list::SharedLinkedList;
