// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core tree implementation: arena storage, coordinate conversion, traversal.

use alloc::vec::Vec;
use tracing::instrument;

use crate::error::TreeError;
use crate::node::{BasicNode, NodeRef, TreeNode};
use crate::types::{DEFAULT_ROOT_TYPE, NodeId, Path, TreePos};

/// An index-addressable tree over a single root node.
///
/// Nodes live in an arena of generational slots; parent and child links are [`NodeId`]
/// handles, so the parent link never owns anything.
/// The root is fixed for the lifetime of the tree.
pub struct IndexTree<T> {
    nodes: Vec<Option<Slot<T>>>, // slots
    generations: Vec<u32>,       // last generation per slot (persists across frees)
    free_list: Vec<usize>,
    root: NodeId,
}

impl<T> core::fmt::Debug for IndexTree<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.nodes.len();
        let alive = self.nodes.iter().filter(|n| n.is_some()).count();
        let free = self.free_list.len();
        f.debug_struct("IndexTree")
            .field("nodes_total", &total)
            .field("nodes_alive", &alive)
            .field("free_list", &free)
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl Default for IndexTree<BasicNode> {
    fn default() -> Self {
        Self::new(BasicNode::new(DEFAULT_ROOT_TYPE))
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Slot<T> {
    generation: u32,
    pub(crate) parent: Option<NodeId>,
    /// Every linked child, tombstones included.
    pub(crate) children: Vec<NodeId>,
    /// Descendant position count, excluding this node's own padding.
    pub(crate) size: usize,
    pub(crate) data: T,
}

impl<T: TreeNode> IndexTree<T> {
    /// Create a tree owning `root`.
    pub fn new(root: T) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            root: NodeId::new(0, 0),
        };
        tree.root = tree.alloc(root);
        tree
    }

    /// Store `value` as a detached node and return its handle.
    ///
    /// The node takes part in addressing once it is linked with one of the insert
    /// operations, such as [`IndexTree::append`].
    pub fn create_node(&mut self, value: T) -> NodeId {
        self.alloc(value)
    }

    /// The root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of addressable positions in the tree (the root's size).
    pub fn size(&self) -> usize {
        self.slot(self.root).size
    }

    /// Read view of a node, or `None` if `id` is stale.
    pub fn get(&self, id: NodeId) -> Option<NodeRef<'_, T>> {
        self.checked(id).ok().map(|slot| NodeRef::new(self, id, slot))
    }

    /// Mutable access to a node's value.
    ///
    /// Use this to flip the tombstone flag, then call [`IndexTree::update_ancestors_size`].
    /// Content edits of inline nodes must go through [`IndexTree::set_value`] so that the
    /// cached sizes follow.
    pub fn data_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.checked_mut(id).ok().map(|slot| &mut slot.data)
    }

    /// Visit every node overlapping the range `(from, to)`, left to right.
    ///
    /// A node that the range only partially enters is reported after its visited
    /// descendants; a node fully inside the range is descended into but not reported.
    /// Inline nodes are always reported. A collapsed range visits nothing.
    pub fn nodes_between<F>(&self, from: usize, to: usize, mut callback: F) -> Result<(), TreeError>
    where
        F: FnMut(NodeRef<'_, T>),
    {
        if from > to {
            return Err(TreeError::InvertedRange { from, to });
        }
        let size = self.size();
        if from > size {
            return Err(TreeError::IndexOutOfRange { index: from, size });
        }
        if to > size {
            return Err(TreeError::IndexOutOfRange { index: to, size });
        }
        self.visit_between(self.root, from, to, &mut callback);
        Ok(())
    }

    /// Postorder walk over the live nodes: descendants before the node itself.
    pub fn traverse<F>(&self, mut callback: F)
    where
        F: FnMut(NodeRef<'_, T>),
    {
        self.visit_postorder(self.root, false, &mut callback);
    }

    /// Postorder walk over every linked node, tombstoned subtrees included.
    ///
    /// Meant for collecting tombstones before pruning them with [`IndexTree::remove_child`].
    pub fn traverse_all<F>(&self, mut callback: F)
    where
        F: FnMut(NodeRef<'_, T>),
    {
        self.visit_postorder(self.root, true, &mut callback);
    }

    /// Split the tree at `index` across up to `depth` levels.
    ///
    /// Starting at the position `index` resolves to, the holding node is split and the
    /// walk moves to its parent, so afterwards `index` sits on a node boundary at each of
    /// the split levels. The root is never split. Returns the position `index` resolved to.
    #[instrument(level = "trace", skip(self))]
    pub fn split(&mut self, index: usize, depth: usize) -> Result<TreePos, TreeError> {
        let pos = self.find_tree_pos(index, true)?;

        let mut node = pos.node;
        let mut offset = pos.offset;
        for _ in 0..depth {
            if node == self.root {
                break;
            }
            self.split_node(node, offset)?;

            let parent = self.slot(node).parent.ok_or(TreeError::InvalidPosition)?;
            let next = self.find_offset(parent, node)?;
            offset = if offset == 0 { next } else { next + 1 };
            node = parent;
        }

        Ok(pos)
    }

    /// Resolve a linear index to a [`TreePos`].
    ///
    /// With `prefer_inline`, a position touching an inline node resolves inside it.
    /// Without it, a position right after a child resolves to the boundary after that
    /// child rather than into the child or before its next sibling.
    pub fn find_tree_pos(&self, index: usize, prefer_inline: bool) -> Result<TreePos, TreeError> {
        self.resolve(self.root, index, prefer_inline)
    }

    /// Resolve `index`, counted from the start of `start`'s content, to a position in
    /// its subtree.
    fn resolve(&self, start: NodeId, index: usize, prefer_inline: bool) -> Result<TreePos, TreeError> {
        let mut node = start;
        let mut index = index;
        loop {
            let size = self.size_of(node);
            if index > size {
                return Err(TreeError::IndexOutOfRange { index, size });
            }
            if self.is_inline_of(node) {
                return Ok(TreePos::new(node, index));
            }

            let children = self.live_children(node);
            let mut pos = 0;
            let mut descend = None;
            for (offset, &child) in children.iter().enumerate() {
                let remaining = index - pos;
                let padded = self.padded_size_of(child);
                let inline = self.is_inline_of(child);

                // Either side of an inline node: stay inside it.
                if prefer_inline && inline && self.size_of(child) >= remaining {
                    descend = Some((child, remaining));
                    break;
                }
                // Left side of the child.
                if remaining == 0 {
                    return Ok(TreePos::new(node, offset));
                }
                // Right side of the child.
                if !prefer_inline && padded == remaining {
                    return Ok(TreePos::new(node, offset + 1));
                }
                // Inside the child; skip the open token of a block.
                if padded > remaining {
                    let skip = usize::from(!inline);
                    descend = Some((child, remaining - skip));
                    break;
                }
                pos += padded;
            }

            match descend {
                Some((child, child_index)) => {
                    node = child;
                    index = child_index;
                }
                None => return Ok(TreePos::new(node, children.len())),
            }
        }
    }

    /// Convert a position to a root-to-leaf [`Path`].
    pub fn tree_pos_to_path(&self, pos: TreePos) -> Result<Path, TreeError> {
        self.checked(pos.node)?;

        let mut path = Vec::new();
        let mut node = pos.node;
        if self.is_inline_of(node) {
            let size = self.size_of(node);
            if pos.offset > size {
                return Err(TreeError::IndexOutOfRange {
                    index: pos.offset,
                    size,
                });
            }
            let parent = self.slot(node).parent.ok_or(TreeError::InvalidPosition)?;
            let offset = self
                .live_offset(parent, node)
                .ok_or(TreeError::InvalidPosition)?;
            path.push(self.left_siblings_size(parent, offset) + pos.offset);
            node = parent;
        } else {
            let count = self.live_children(node).len();
            if pos.offset > count {
                return Err(TreeError::IndexOutOfRange {
                    index: pos.offset,
                    size: count,
                });
            }
            if self.has_inline_child_of(node) {
                path.push(self.left_siblings_size(node, pos.offset));
            } else {
                path.push(pos.offset);
            }
        }

        while let Some(parent) = self.slot(node).parent {
            let offset = self
                .live_offset(parent, node)
                .ok_or(TreeError::InvalidPosition)?;
            path.push(offset);
            node = parent;
        }
        if node != self.root {
            return Err(TreeError::InvalidPosition);
        }

        path.reverse();
        Ok(path)
    }

    /// Resolve a [`Path`] to a position.
    pub fn path_to_tree_pos(&self, path: &[usize]) -> Result<TreePos, TreeError> {
        let invalid = || TreeError::InvalidPath(path.to_vec());
        let Some((&last, steps)) = path.split_last() else {
            return Err(invalid());
        };

        let mut node = self.root;
        for &step in steps {
            node = *self.live_children(node).get(step).ok_or_else(invalid)?;
        }

        if self.has_inline_child_of(node) {
            return self.find_inline_pos(node, last).ok_or_else(invalid);
        }
        if self.live_children(node).len() < last {
            return Err(invalid());
        }
        Ok(TreePos::new(node, last))
    }

    /// Linear index of the position right before `node`.
    pub fn index_of(&self, node: NodeId) -> Result<usize, TreeError> {
        self.checked(node)?;

        let mut index = 0;
        let mut current = node;
        while current != self.root {
            let parent = self.slot(current).parent.ok_or(TreeError::InvalidPosition)?;
            let offset = self
                .live_offset(parent, current)
                .ok_or(TreeError::InvalidPosition)?;
            index += self.left_siblings_size(parent, offset);

            // Leaving a block crosses its open token.
            if current != node && !self.is_inline_of(current) {
                index += 1;
            }
            current = parent;
        }
        Ok(index)
    }

    /// Linear index of a position; the inverse of [`IndexTree::find_tree_pos`].
    pub fn tree_pos_to_index(&self, pos: TreePos) -> Result<usize, TreeError> {
        self.checked(pos.node)?;

        if self.is_inline_of(pos.node) {
            let size = self.size_of(pos.node);
            if pos.offset > size {
                return Err(TreeError::IndexOutOfRange {
                    index: pos.offset,
                    size,
                });
            }
            return Ok(self.index_of(pos.node)? + pos.offset);
        }

        let count = self.live_children(pos.node).len();
        if pos.offset > count {
            return Err(TreeError::IndexOutOfRange {
                index: pos.offset,
                size: count,
            });
        }
        let base = if pos.node == self.root {
            0
        } else {
            self.index_of(pos.node)? + 1
        };
        Ok(base + self.left_siblings_size(pos.node, pos.offset))
    }

    /// Path of the position at `index`.
    pub fn index_to_path(&self, index: usize) -> Result<Path, TreeError> {
        let pos = self.find_tree_pos(index, true)?;
        self.tree_pos_to_path(pos)
    }

    /// Linear index of the position at `path`.
    pub fn path_to_index(&self, path: &[usize]) -> Result<usize, TreeError> {
        let pos = self.path_to_tree_pos(path)?;
        self.tree_pos_to_index(pos)
    }

    /// The node that follows `pos` in postorder.
    ///
    /// Inside an inline node that is the node itself; at its end, the next live sibling or
    /// else the parent. For a block position, the block itself when `pos` is after its last
    /// child, else the leftmost descendant of the child at the offset.
    pub fn find_postorder_right(&self, pos: TreePos) -> Result<Option<NodeId>, TreeError> {
        let TreePos { node, offset } = pos;
        let slot = self.checked(node)?;

        if self.is_inline_of(node) {
            if slot.size == offset {
                return Ok(self.next_sibling(node).or(slot.parent));
            }
            return Ok(Some(node));
        }

        let children = self.live_children(node);
        if children.len() == offset {
            return Ok(Some(node));
        }
        let child = children.get(offset).ok_or(TreeError::IndexOutOfRange {
            index: offset,
            size: children.len(),
        })?;
        Ok(Some(self.leftmost_of(*child)))
    }

    /// Strict ancestors of `node`, root first.
    pub fn ancestors(&self, node: NodeId) -> Result<Vec<NodeId>, TreeError> {
        let mut parent = self.checked(node)?.parent;
        let mut out = Vec::new();
        while let Some(p) = parent {
            out.push(p);
            parent = self.slot(p).parent;
        }
        out.reverse();
        Ok(out)
    }

    /// The deepest node on both ancestor chains.
    ///
    /// When one node is an ancestor of the other, that node is returned. Nodes in
    /// disconnected subtrees have no common ancestor.
    pub fn find_common_ancestor(&self, a: NodeId, b: NodeId) -> Result<Option<NodeId>, TreeError> {
        let mut chain_a = self.ancestors(a)?;
        chain_a.push(a);
        let mut chain_b = self.ancestors(b)?;
        chain_b.push(b);

        Ok(chain_a
            .iter()
            .zip(chain_b.iter())
            .take_while(|(x, y)| x == y)
            .last()
            .map(|(x, _)| *x))
    }

    /// Leftmost live descendant of `node`; `node` itself when inline or childless.
    pub fn find_leftmost(&self, node: NodeId) -> Result<NodeId, TreeError> {
        self.checked(node)?;
        Ok(self.leftmost_of(node))
    }

    // --- internals ---

    fn alloc(&mut self, data: T) -> NodeId {
        let size = if data.is_inline() {
            data.content_len()
        } else {
            0
        };
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.nodes[idx] = Some(Slot::new(generation, size, data));
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            (idx as u32, generation)
        } else {
            let generation = 1_u32;
            self.nodes.push(Some(Slot::new(generation, size, data)));
            self.generations.push(generation);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            ((self.nodes.len() - 1) as u32, generation)
        };
        NodeId::new(idx, generation)
    }

    /// Free `id` and its whole subtree, returning the value stored at `id`.
    pub(crate) fn free_subtree(&mut self, id: NodeId) -> T {
        let Slot { children, data, .. } = self.nodes[id.idx()].take().expect("dangling NodeId");
        self.free_list.push(id.idx());

        let mut stack = children;
        while let Some(child) = stack.pop() {
            if let Some(slot) = self.nodes[child.idx()].take() {
                self.free_list.push(child.idx());
                stack.extend(slot.children);
            }
        }
        data
    }

    fn visit_between<F>(&self, node: NodeId, from: usize, to: usize, callback: &mut F)
    where
        F: FnMut(NodeRef<'_, T>),
    {
        if from == to {
            return;
        }

        let mut pos = 0;
        for child in self.live_children(node) {
            let padded = self.padded_size_of(child);
            // The child's padded span [pos, pos + padded) overlaps (from, to).
            if from < pos + padded && pos < to {
                let inline = self.is_inline_of(child);
                let size = self.size_of(child);
                // A block's window starts after its open token.
                let start = pos + usize::from(!inline);
                let child_from = from.saturating_sub(start);
                let child_to = (to - start).min(size);
                if !inline {
                    self.visit_between(child, child_from, child_to, callback);
                }

                // The range leaves the child on either side.
                if from < start || to - start > size || inline {
                    callback(self.node_ref(child));
                }
            }
            pos += padded;
        }
    }

    fn visit_postorder<F>(&self, node: NodeId, include_removed: bool, callback: &mut F)
    where
        F: FnMut(NodeRef<'_, T>),
    {
        for &child in &self.slot(node).children {
            if include_removed || !self.is_removed_of(child) {
                self.visit_postorder(child, include_removed, callback);
            }
        }
        callback(self.node_ref(node));
    }

    /// Resolve the content offset of a node holding inline children.
    ///
    /// Offsets that land on a block child's boundary resolve to a child offset of `node`.
    fn find_inline_pos(&self, node: NodeId, offset: usize) -> Option<TreePos> {
        if self.size_of(node) < offset {
            return None;
        }

        let children = self.live_children(node);
        let mut offset = offset;
        for (at, &child) in children.iter().enumerate() {
            let padded = self.padded_size_of(child);
            if self.is_inline_of(child) {
                if offset <= padded {
                    return Some(TreePos::new(child, offset));
                }
            } else if offset == 0 {
                return Some(TreePos::new(node, at));
            } else if offset < padded {
                // Inside the block; skip its open token.
                return self.resolve(child, offset - 1, true).ok();
            }
            offset -= padded;
        }
        Some(TreePos::new(node, children.len()))
    }

    fn leftmost_of(&self, node: NodeId) -> NodeId {
        let mut node = node;
        while !self.is_inline_of(node) {
            match self.live_children(node).first() {
                Some(&first) => node = first,
                None => break,
            }
        }
        node
    }

    /// Sum of the padded sizes of the first `offset` live children of `parent`.
    fn left_siblings_size(&self, parent: NodeId, offset: usize) -> usize {
        self.live_children(parent)
            .into_iter()
            .take(offset)
            .map(|child| self.padded_size_of(child))
            .sum()
    }

    fn node_ref(&self, id: NodeId) -> NodeRef<'_, T> {
        NodeRef::new(self, id, self.slot(id))
    }
}

impl<T> IndexTree<T> {
    /// Returns true if `id` refers to a node in the arena.
    ///
    /// A `NodeId` is considered live if its slot exists and its generation matches
    /// the current generation stored in that slot.
    /// See [`NodeId`] docs for the generational semantics.
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.checked(id).is_ok()
    }

    pub(crate) fn checked(&self, id: NodeId) -> Result<&Slot<T>, TreeError> {
        self.nodes
            .get(id.idx())
            .and_then(|n| n.as_ref())
            .filter(|n| n.generation == id.1)
            .ok_or(TreeError::DanglingNode(id))
    }

    pub(crate) fn checked_mut(&mut self, id: NodeId) -> Result<&mut Slot<T>, TreeError> {
        self.nodes
            .get_mut(id.idx())
            .and_then(|n| n.as_mut())
            .filter(|n| n.generation == id.1)
            .ok_or(TreeError::DanglingNode(id))
    }

    /// Access a slot by a handle taken from the arena itself; panics if `id` is stale.
    pub(crate) fn slot(&self, id: NodeId) -> &Slot<T> {
        self.nodes[id.idx()].as_ref().expect("dangling NodeId")
    }

    /// Mutable counterpart of [`IndexTree::slot`]; panics if `id` is stale.
    pub(crate) fn slot_mut(&mut self, id: NodeId) -> &mut Slot<T> {
        self.nodes[id.idx()].as_mut().expect("dangling NodeId")
    }
}

impl<T> Slot<T> {
    fn new(generation: u32, size: usize, data: T) -> Self {
        Self {
            generation,
            parent: None,
            children: Vec::new(),
            size,
            data,
        }
    }
}
