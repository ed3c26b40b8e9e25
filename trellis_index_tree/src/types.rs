// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the index tree: node identifiers, positions, and constants.

use alloc::vec::Vec;

/// Extra address units a block node contributes to its parent.
///
/// A block node is a pair of open and close tokens, each taking one position.
pub const BLOCK_PADDING_SIZE: usize = 2;

/// Type tag of the root node when the caller has no better name.
pub const DEFAULT_ROOT_TYPE: &str = "root";

/// Type tag reserved for inline (content leaf) nodes.
pub const DEFAULT_INLINE_TYPE: &str = "text";

/// Identifier for a node in the tree.
///
/// This is a small, copyable handle that stays stable across updates but becomes
/// invalid when the underlying slot is freed.
/// It consists of a slot index and a generation counter.
///
/// ## Semantics
///
/// - On creation, a fresh slot is allocated with generation `1`.
/// - On [`remove_child`](crate::IndexTree::remove_child), the slots of the detached
///   subtree are freed; any existing `NodeId` that pointed into it is now stale.
/// - On reuse of a freed slot, its generation is incremented, producing a new, distinct `NodeId`.
///
/// ### Liveness
///
/// Use [`IndexTree::is_alive`](crate::IndexTree::is_alive) to check whether a `NodeId` still
/// refers to a node in the arena.
/// Stale `NodeId`s never alias a different node because the generation must match.
///
/// Note that "alive" is about storage, not about the document: a tombstoned node is
/// still alive until it is physically removed.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeId(pub(crate) u32, pub(crate) u32);

impl NodeId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// A position in the tree: a node and an offset inside it.
///
/// - For an inline node, `offset` is a content offset in `0..=size`.
/// - For a block node, `offset` is a child offset in `0..=children.len()` and means
///   "before `children[offset]`" (counting live children only).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct TreePos {
    /// The node holding the position.
    pub node: NodeId,
    /// Offset inside `node`.
    pub offset: usize,
}

impl TreePos {
    /// Create a position.
    pub const fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// A root-to-leaf offset sequence.
///
/// Every element but the last is a live-child offset at successive levels from the root.
/// The last element is a content offset when the addressed node holds inline children,
/// otherwise a child offset.
pub type Path = Vec<usize>;
