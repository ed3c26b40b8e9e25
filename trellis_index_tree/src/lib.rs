// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Trellis Index Tree: the positional backbone of a collaborative structured document.
//!
//! A document is a tree of *block* nodes (containers such as paragraphs) and *inline*
//! nodes (text leaves). Peers edit it concurrently, so positions have to be expressed in
//! forms that survive edits and can be exchanged. This crate keeps three of them
//! consistent with each other:
//!
//! - **Linear index**: one unit per character and one per block open/close boundary,
//!   counted depth-first. The tree spans `0..=tree.size()`.
//! - **Path**: a root-to-leaf offset sequence, see [`Path`].
//! - **Tree position**: a [`TreePos`], i.e. a node and an offset inside it.
//!
//! The conversions are pure functions of one invariant: a block node's size is the sum
//! of the padded sizes of its live children, where a block counts two extra units for
//! its boundaries and an inline node counts its content length.
//! Every mutator in this crate keeps that invariant.
//!
//! ## Tombstones
//!
//! The tree does not decide when content goes away; the CRDT layer above does. Removal
//! happens in two explicitly separate steps:
//!
//! 1. *Logical*: flip the node's tombstone flag through [`IndexTree::data_mut`] and call
//!    [`IndexTree::update_ancestors_size`]. The node stops counting and disappears from
//!    [`NodeRef::children`], traversal and ranged visitation, but
//!    [`IndexTree::find_branch_offset`] still locates positions inside it.
//! 2. *Physical*: [`IndexTree::remove_child`] detaches the node and frees its subtree.
//!
//! ## API overview
//!
//! - [`IndexTree`]: arena-backed container owning the root; all operations live here.
//! - [`TreeNode`]: capability a concrete node kind implements (type tag, content,
//!   tombstone flag, split factory). [`BasicNode`] is a ready-made implementation.
//! - [`NodeId`]: generational handle of a node.
//! - [`NodeRef`]: borrowed read view of a node.
//! - [`TreeError`]: precondition violations.
//!
//! Key operations:
//! - [`IndexTree::find_tree_pos`], [`IndexTree::tree_pos_to_path`],
//!   [`IndexTree::path_to_tree_pos`], [`IndexTree::index_of`],
//!   [`IndexTree::tree_pos_to_index`], [`IndexTree::index_to_path`].
//! - [`IndexTree::split`] to create a clean boundary at an index before inserting there.
//! - [`IndexTree::nodes_between`] and [`IndexTree::traverse`].
//!
//! # Example
//!
//! ```rust
//! use trellis_index_tree::{BasicNode, IndexTree, TreePos};
//!
//! // <root><p>AB CD</p></root>
//! let mut tree = IndexTree::<BasicNode>::default();
//! let p = tree.create_node(BasicNode::block("p"));
//! let ab = tree.create_node(BasicNode::text("AB"));
//! let cd = tree.create_node(BasicNode::text("CD"));
//! tree.append(tree.root(), [p]).unwrap();
//! tree.append(p, [ab, cd]).unwrap();
//! assert_eq!(tree.size(), 6);
//!
//! // Index 4 is between 'C' and 'D'.
//! let pos = tree.find_tree_pos(4, true).unwrap();
//! assert_eq!(pos, TreePos::new(cd, 1));
//! assert_eq!(tree.tree_pos_to_path(pos).unwrap(), vec![0, 3]);
//! assert_eq!(tree.path_to_index(&[0, 3]).unwrap(), 4);
//!
//! // Split the paragraph at index 4 so that "D" starts a new paragraph.
//! tree.split(4, 2).unwrap();
//! assert_eq!(tree.get(tree.root()).unwrap().children().count(), 2);
//! assert_eq!(tree.size(), 8);
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod error;
mod node;
mod tree;
mod types;

pub use error::TreeError;
pub use node::{BasicNode, NodeRef, TreeNode};
pub use tree::IndexTree;
pub use types::{
    BLOCK_PADDING_SIZE, DEFAULT_INLINE_TYPE, DEFAULT_ROOT_TYPE, NodeId, Path, TreePos,
};
